pub mod analyze;
pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod http_client;
pub mod output;
pub mod runner;

pub use crate::error::{AppError, ScanError};
