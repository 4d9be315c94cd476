//! Command line arguments and server settings
//!
//! Settings come from an optional YAML file; values given on the command line win.

use crate::error::ServerError;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Data directory containing config.json
    pub data_dir: PathBuf,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory of static assets served next to the websocket endpoint
    #[arg(short, long)]
    pub assets: Option<PathBuf>,

    /// YAML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub assets_dir: PathBuf,
    /// Upper bound for a single websocket write.
    pub write_wait_ms: u64,
    /// How long the peer may stay silent before the connection is dropped. Only pongs count.
    pub pong_wait_ms: u64,
    /// Requests a connection may have waiting before it is closed.
    pub queue_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8081,
            assets_dir: PathBuf::from("./assets"),
            write_wait_ms: 100_000,
            pong_wait_ms: 120_000,
            queue_capacity: 256,
        }
    }
}

impl ServerSettings {
    pub fn from_file(path: &Path) -> Result<Self, ServerError> {
        let serialized = std::fs::read_to_string(path).map_err(|e| ServerError::SettingsIo {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_yaml::from_str(&serialized).map_err(|e| ServerError::Settings {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn from_args(args: &Args) -> Result<Self, ServerError> {
        let mut settings = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(port) = args.port {
            settings.port = port;
        }

        if let Some(assets) = &args.assets {
            settings.assets_dir = assets.clone();
        }

        settings.validate()?;

        Ok(settings)
    }

    /// Rejects zero timeouts and a zero queue, none of which a connection can run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.queue_capacity == 0 {
            return Err(ServerError::ZeroSetting("queue_capacity"));
        }

        if self.pong_wait_ms == 0 || self.ping_period().is_zero() {
            return Err(ServerError::ZeroSetting("pong_wait_ms"));
        }

        if self.write_wait_ms == 0 {
            return Err(ServerError::ZeroSetting("write_wait_ms"));
        }

        Ok(())
    }

    pub fn write_wait(&self) -> Duration {
        Duration::from_millis(self.write_wait_ms)
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    /// Pings go out a bit more often than the peer timeout so a live peer always has time to answer.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait() * 9 / 10
    }
}
