use anyhow::{Context, Result};
use log::info;

use redis_lite::cli::Config;
use redis_lite::db::Store;
use redis_lite::server::Server;
use redis_lite::{file_handler, replica};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_args();
    let replica_of = config.replica_of()?;

    let rdb = file_handler::load_snapshot(&config).await;
    let store = Store::from_snapshot(&rdb);
    info!("Initial dataset: {} keys", store.len().await);
    store.spawn_expiry_sweeper();

    let port = config.port;
    let server = Server::bind(config, store).await?;
    let serving = tokio::spawn(server.run());

    if let Some(master) = replica_of {
        replica::replica_handler(&master, port)
            .await
            .context("replication handshake failed")?;
    }

    serving.await?
}
