use clap::Parser;
use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 6379;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the snapshot file
    #[clap(long)]
    dir: Option<String>,
    /// Snapshot file name inside `dir`
    #[clap(long)]
    dbfilename: Option<String>,
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Primary to replicate from, as "<host> <port>"
    #[clap(long)]
    replicaof: Option<String>,
}

/// Immutable server configuration, shared by every connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub dir: Option<String>,
    pub dbfilename: Option<String>,
    pub port: u16,
    pub replicaof: Option<String>,
}

/// Address of the primary this server replicates from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaOf {
    pub host: String,
    pub port: u16,
}

impl ReplicaOf {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: None,
            dbfilename: None,
            port: DEFAULT_PORT,
            replicaof: None,
        }
    }
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            dir: cli.dir,
            dbfilename: cli.dbfilename,
            port: cli.port,
            replicaof: cli.replicaof.filter(|s| !s.trim().is_empty()),
        }
    }
}

impl Config {
    /// Gets args :)
    pub fn from_args() -> Self {
        Cli::parse().into()
    }

    /// `<dir>/<dbfilename>`, when both are configured.
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        match (&self.dir, &self.dbfilename) {
            (Some(dir), Some(file)) => Some(PathBuf::from(dir).join(file)),
            _ => None,
        }
    }

    pub fn replica_of(&self) -> Result<Option<ReplicaOf>, ConfigError> {
        let Some(raw) = &self.replicaof else {
            return Ok(None);
        };
        let invalid = || ConfigError::InvalidReplicaOf(raw.clone());
        let mut parts = raw.split_whitespace();
        let (Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let port = port.parse().map_err(|_| invalid())?;
        Ok(Some(ReplicaOf {
            host: host.to_string(),
            port,
        }))
    }

    /// The parameters readable through `CONFIG GET`.
    pub fn get(&self, name: &str) -> Option<String> {
        match name.to_ascii_lowercase().as_str() {
            "dir" => self.dir.clone(),
            "dbfilename" => self.dbfilename.clone(),
            "port" => Some(self.port.to_string()),
            "replicaof" => self.replicaof.clone(),
            _ => None,
        }
        .filter(|value| !value.is_empty())
    }
}
