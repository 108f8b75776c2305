#![forbid(unsafe_code)]

pub mod cli;
pub mod config_cmd;
pub mod error;
pub mod logging;
pub mod session;

pub use cli::run_from_env;
pub use error::{CliError, Result};
