//! Process-level plumbing shared by the server binary: layered configuration,
//! home directory resolution and logging initialisation.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    default_logging_config, AppConfig, AppConfigProvider, CliArgs, LoggingConfig, Section,
    ServerConfig,
};
