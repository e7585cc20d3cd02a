use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::cli::Config;
use crate::client_handler::{handle_client, SharedResources};
use crate::db::Store;
use crate::types::replica::{ReplicationState, Role};

/// Pause after a failed accept, so errors like EMFILE don't spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Listener plus everything the connections share.
pub struct Server {
    listener: TcpListener,
    resources: SharedResources,
}

impl Server {
    /// Binds `0.0.0.0:<port>` from the config.
    pub async fn bind(config: Config, store: Store) -> Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        Self::bind_addr(addr, config, store).await
    }

    pub async fn bind_addr(addr: SocketAddr, config: Config, store: Store) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let role = if config.replicaof.is_some() {
            Role::Slave
        } else {
            Role::Master
        };
        Ok(Self {
            listener,
            resources: SharedResources {
                store,
                config: Arc::new(config),
                replication: Arc::new(ReplicationState::new(role)),
            },
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn resources(&self) -> &SharedResources {
        &self.resources
    }

    /// Accepts connections forever, one task per connection.
    pub async fn run(self) -> Result<()> {
        info!(
            "Listening on {} as {}",
            self.local_addr()?,
            self.resources.replication.role
        );
        loop {
            let Some((stream, peer)) = accepted(self.listener.accept().await) else {
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            };
            debug!("accepted connection from {peer}");
            let resources = self.resources.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_client(stream, resources).await {
                    warn!("connection error ({peer}): {e:#}");
                }
                debug!("connection from {peer} closed");
            });
        }
    }
}

/// A failed accept (EMFILE, a reset before accept) is logged and skipped.
fn accepted<T>(result: io::Result<T>) -> Option<T> {
    result
        .map_err(|e| warn!("failed to accept connection: {e}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::resp::{RespHandler, RespValue};
    use tokio::net::TcpStream;

    #[test]
    fn accept_errors_are_skipped() {
        let emfile = io::Error::from_raw_os_error(24);
        assert!(accepted::<()>(Err(emfile)).is_none());
        assert_eq!(accepted(Ok(7)), Some(7));
    }

    #[tokio::test]
    async fn keeps_serving_after_clients_vanish() -> Result<()> {
        let server =
            Server::bind_addr("127.0.0.1:0".parse()?, Config::default(), Store::new()).await?;
        let addr = server.local_addr()?;
        tokio::spawn(server.run());

        for _ in 0..20 {
            drop(TcpStream::connect(addr).await?);
        }
        let mut client = RespHandler::new(TcpStream::connect(addr).await?);
        client.write_value(RespValue::command(["PING"])).await?;
        assert_eq!(
            client.read_value().await?,
            Some(RespValue::SimpleString("PONG".into()))
        );
        Ok(())
    }
}
