// Background jobs

pub mod status_sweep;
