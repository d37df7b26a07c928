// Services module - Business logic

pub mod admission;
pub mod localtime;
pub mod qr_badge;
pub mod reporting;
pub mod signature;
pub mod status;
pub mod webhook;
