use anyhow::Result;
use log::{debug, warn};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::cli::Config;
use crate::command_dispatcher::dispatch_command;
use crate::db::Store;
use crate::error::RespError;
use crate::types::replica::ReplicationState;
use crate::types::resp::{RespHandler, RespValue};

/// Shared resources passed to command handlers
#[derive(Debug, Clone)]
pub struct SharedResources {
    pub store: Store,
    pub config: Arc<Config>,
    pub replication: Arc<ReplicationState>,
}

/// Serves one connection until the peer disconnects. Requests are handled
/// one at a time. A malformed frame gets an error reply and ends the
/// connection; a failing command only fails that request.
pub async fn handle_client<S>(stream: S, resources: SharedResources) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut handler = RespHandler::new(stream);

    loop {
        let request = match handler.read_request().await {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(RespError::Io(e)) => return Err(e.into()),
            Err(e) => {
                warn!("closing connection: {e}");
                let _ = handler
                    .write_value(RespValue::SimpleError(format!("ERR {e}")))
                    .await;
                return Err(e.into());
            }
        };
        debug!("request: {} {:?}", request.name, request.args);

        let reply = match dispatch_command(&request, &resources).await {
            Ok(reply) => reply,
            Err(e) => {
                debug!("command failed: {e}");
                RespValue::SimpleError(e.to_string())
            }
        };
        handler.write_value(reply).await?;
    }

    Ok(())
}
