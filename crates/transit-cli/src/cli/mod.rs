pub mod commands;
pub mod config;
pub mod logging;

pub use commands::{run, Command};
pub use config::CliConfig;
pub use logging::init_logging;
