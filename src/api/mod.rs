// API module - HTTP endpoints

pub mod attendance;
pub mod auth;
pub mod checkin;
pub mod members;
pub mod middleware;
pub mod reports;
