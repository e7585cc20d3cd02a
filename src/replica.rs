//! Replica side of the replication handshake.

use log::{error, info};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::cli::ReplicaOf;
use crate::error::HandshakeError;
use crate::types::resp::{RespHandler, RespValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Connecting,
    AwaitPong,
    AwaitReplconf1,
    AwaitReplconf2,
    AwaitFullresync,
    Done,
    Failed,
}

/// The handshake as a state machine: each reply from the primary moves it one
/// step forward and yields the next request to send.
#[derive(Debug)]
pub struct Handshake {
    state: HandshakeState,
    listening_port: u16,
    fullresync: Option<String>,
}

impl Handshake {
    pub fn new(listening_port: u16) -> Self {
        Self {
            state: HandshakeState::Connecting,
            listening_port,
            fullresync: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// The FULLRESYNC line, once the handshake is done.
    pub fn fullresync(&self) -> Option<&str> {
        self.fullresync.as_deref()
    }

    /// The connection is up: returns the first request.
    pub fn connected(&mut self) -> RespValue {
        self.state = HandshakeState::AwaitPong;
        RespValue::command(["PING"])
    }

    /// Feeds one reply. Returns the next request, or `None` once the handshake is done.
    pub fn on_reply(&mut self, reply: &RespValue) -> Result<Option<RespValue>, HandshakeError> {
        use HandshakeState::*;

        let line = match reply {
            RespValue::SimpleString(line) => Some(line.as_str()),
            _ => None,
        };

        let next = match (self.state, line) {
            (AwaitPong, Some("PONG")) => {
                self.state = AwaitReplconf1;
                Some(RespValue::command([
                    "REPLCONF".to_string(),
                    "listening-port".to_string(),
                    self.listening_port.to_string(),
                ]))
            }
            (AwaitReplconf1, Some("OK")) => {
                self.state = AwaitReplconf2;
                Some(RespValue::command(["REPLCONF", "capa", "psync2"]))
            }
            (AwaitReplconf2, Some("OK")) => {
                self.state = AwaitFullresync;
                Some(RespValue::command(["PSYNC", "?", "-1"]))
            }
            (AwaitFullresync, Some(line)) if line.starts_with("FULLRESYNC") => {
                self.state = Done;
                self.fullresync = Some(line.to_string());
                None
            }
            (Done, _) => return Err(HandshakeError::Finished),
            (state, _) => {
                self.state = Failed;
                return Err(HandshakeError::UnexpectedReply {
                    state,
                    reply: reply.encode().trim_end().to_string(),
                });
            }
        };
        Ok(next)
    }
}

/// Runs the handshake over an established connection.
/// Returns the primary's FULLRESYNC line.
pub async fn perform_handshake<S>(
    handler: &mut RespHandler<S>,
    listening_port: u16,
) -> Result<String, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut handshake = Handshake::new(listening_port);
    let mut next = Some(handshake.connected());

    while let Some(request) = next {
        info!("Replica: Sending {}", describe(&request));
        handler.write_value(request).await?;

        let reply = handler
            .read_value()
            .await?
            .ok_or(HandshakeError::ConnectionClosed(handshake.state()))?;
        next = handshake.on_reply(&reply)?;
    }

    let fullresync = handshake.fullresync().unwrap_or_default().to_string();
    info!("Replica: Received {fullresync}");
    Ok(fullresync)
}

/// Connects to the primary and runs the handshake. The snapshot transfer
/// that follows FULLRESYNC is not read.
pub async fn replica_handler(master: &ReplicaOf, listening_port: u16) -> Result<(), HandshakeError> {
    let addr = master.addr();
    info!("Replica: Connecting to master at {addr}");
    let stream = TcpStream::connect(&addr).await?;
    let mut handler = RespHandler::new(stream);

    match perform_handshake(&mut handler, listening_port).await {
        Ok(_) => {
            info!("Replica: Handshake with {addr} complete");
            Ok(())
        }
        Err(e) => {
            error!("Replica: Handshake with {addr} failed: {e}");
            Err(e)
        }
    }
}

fn describe(request: &RespValue) -> String {
    match request {
        RespValue::Array(parts) => parts
            .iter()
            .filter_map(RespValue::as_string)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.encode(),
    }
}
