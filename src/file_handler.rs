use anyhow::{Context, Result};
use log::{error, info};
use std::io::ErrorKind;
use std::path::Path;

use crate::cli::Config;
use crate::rdb::{self, Rdb};

/// Loads the configured snapshot. A missing path or file, or a snapshot that
/// fails to decode, yields an empty database 0 instead.
pub async fn load_snapshot(config: &Config) -> Rdb {
    let Some(path) = config.snapshot_path() else {
        info!("No snapshot configured, starting with an empty dataset");
        return Rdb::empty();
    };

    match read_rdb_file(&path).await {
        Ok(Some(rdb)) => {
            let keys = rdb.first_database().map_or(0, |db| db.fields.len());
            info!("Loaded snapshot {} ({keys} keys)", path.display());
            rdb
        }
        Ok(None) => {
            info!("Snapshot {} does not exist, starting with an empty dataset", path.display());
            Rdb::empty()
        }
        Err(e) => {
            error!("Failed to load snapshot, starting with an empty dataset: {e:#}");
            Rdb::empty()
        }
    }
}

/// Reads and decodes a snapshot file. `Ok(None)` when the file does not exist.
pub async fn read_rdb_file(path: &Path) -> Result<Option<Rdb>> {
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let rdb = rdb::decode(&contents)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(Some(rdb))
}
