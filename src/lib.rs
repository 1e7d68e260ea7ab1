pub mod cli;
pub mod config;
pub mod device;
pub mod protocol;
pub mod telemetry;
pub mod ui;
