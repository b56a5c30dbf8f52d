pub mod cli;
pub mod config;
pub mod credential;
pub mod error;
pub mod executor;
pub mod installer;
pub mod manifest;
pub mod oc;
pub mod scratch;
pub mod session;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

pub use error::InstallerError;

use crate::executor::CommandExecutor;

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(filter).finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Runs the full provisioning sequence described by `opts`.
pub fn run_install(opts: &cli::InstallArgs, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let config = config::InstallConfig::from_args(opts);
    debug!("install configuration: {:?}", config);
    installer::Installer::new(config, executor).run()
}
