//! Command-line flags.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::schema::{LogFormat, ServerConfig};

/// Local JSON-backed REST server with live reload.
#[derive(Debug, Parser)]
#[command(name = "json-devserver", version, disable_version_flag = true)]
#[command(about = "Serve a JSON file as a REST API, with static assets and live reload", long_about = None)]
pub struct CliArgs {
    /// Endpoint host.
    #[arg(long, visible_alias = "host")]
    pub hostname: Option<String>,

    /// Endpoint port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory that static assets are read from.
    #[arg(long)]
    pub storage: Option<PathBuf>,

    /// JSON file that collections are read from and written to.
    #[arg(long, visible_alias = "db")]
    pub database: Option<PathBuf>,

    /// Optional TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormatArg>,

    /// Do not reload when the database file changes on disk.
    #[arg(long)]
    pub no_watch: bool,

    /// Print version.
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl CliArgs {
    /// Overwrite config values with every flag that was given.
    pub fn apply_to(&self, config: &mut ServerConfig) {
        if let Some(hostname) = &self.hostname {
            config.listener.hostname = hostname.clone();
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(storage) = &self.storage {
            config.storage.storage_dir = storage.clone();
        }
        if let Some(database) = &self.database {
            config.storage.database = database.clone();
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format.into();
        }
        if self.no_watch {
            config.storage.watch = false;
        }
    }
}
