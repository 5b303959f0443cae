// Library exports for chanlog

pub mod cli;
pub mod config;
pub mod error;
pub mod logs;

pub use logs::{get_logger, Level};
