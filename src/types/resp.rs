use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::RespError;
use crate::parsers::{parse_msg, parse_request_from, RequestProgress};
use crate::types::Request;

/// A RESP value, as read from or written to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    SimpleString(String),
    SimpleError(String),
    Integer(i64),
    BulkString(String),
    NullBulkString,
    Array(Vec<RespValue>),
}

impl RespValue {
    /// An array of bulk strings, the shape every request takes on the wire.
    pub fn command<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RespValue::Array(
            parts
                .into_iter()
                .map(|p| RespValue::BulkString(p.into()))
                .collect(),
        )
    }

    pub fn ok() -> Self {
        RespValue::SimpleString("OK".into())
    }

    pub fn encode(&self) -> String {
        match self {
            RespValue::SimpleString(s) => format!("+{s}\r\n"),
            RespValue::SimpleError(s) => format!("-{s}\r\n"),
            RespValue::Integer(n) => format!(":{n}\r\n"),
            RespValue::BulkString(s) => format!("${}\r\n{s}\r\n", s.len()),
            RespValue::NullBulkString => "$-1\r\n".to_string(),
            RespValue::Array(items) => {
                let mut out = format!("*{}\r\n", items.len());
                for item in items {
                    out.push_str(&item.encode());
                }
                out
            }
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            RespValue::SimpleString(s) | RespValue::BulkString(s) => Some(s.clone()),
            RespValue::Integer(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Reads RESP frames from a stream and writes replies back to it.
pub struct RespHandler<S = TcpStream> {
    stream: S,
    buffer: BytesMut,
    request: RequestProgress,
}

impl<S> RespHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(512),
            request: RequestProgress::default(),
        }
    }

    /// Reads the next request. `Ok(None)` means the peer closed the connection between frames.
    pub async fn read_request(&mut self) -> Result<Option<Request>, RespError> {
        loop {
            if let Some((request, used)) = parse_request_from(&self.buffer, &mut self.request)? {
                self.buffer.advance(used);
                return Ok(Some(request));
            }
            if !self.fill_buffer().await? {
                return Ok(None);
            }
        }
    }

    /// Reads the next value of any RESP type.
    pub async fn read_value(&mut self) -> Result<Option<RespValue>, RespError> {
        loop {
            if let Some((value, used)) = parse_msg(&self.buffer)? {
                self.buffer.advance(used);
                return Ok(Some(value));
            }
            if !self.fill_buffer().await? {
                return Ok(None);
            }
        }
    }

    pub async fn write_value(&mut self, value: RespValue) -> Result<(), RespError> {
        self.stream.write_all(value.encode().as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Returns false on a clean end of stream.
    async fn fill_buffer(&mut self) -> Result<bool, RespError> {
        if self.stream.read_buf(&mut self.buffer).await? == 0 {
            if self.buffer.is_empty() {
                return Ok(false);
            }
            return Err(RespError::ConnectionClosedMidFrame);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_every_reply_shape() {
        assert_eq!(RespValue::SimpleString("PONG".into()).encode(), "+PONG\r\n");
        assert_eq!(
            RespValue::SimpleError("ERR boom".into()).encode(),
            "-ERR boom\r\n"
        );
        assert_eq!(RespValue::Integer(-3).encode(), ":-3\r\n");
        assert_eq!(RespValue::BulkString("hey".into()).encode(), "$3\r\nhey\r\n");
        assert_eq!(RespValue::BulkString(String::new()).encode(), "$0\r\n\r\n");
        assert_eq!(RespValue::NullBulkString.encode(), "$-1\r\n");
        assert_eq!(
            RespValue::command(["dir", "/tmp"]).encode(),
            "*2\r\n$3\r\ndir\r\n$4\r\n/tmp\r\n"
        );
        assert_eq!(RespValue::Array(vec![]).encode(), "*0\r\n");
    }

    #[tokio::test]
    async fn reads_requests_split_across_writes() {
        let (client, server) = tokio::io::duplex(64);
        let mut handler = RespHandler::new(server);

        let writer = tokio::spawn(async move {
            let mut client = client;
            client.write_all(b"*2\r\n$4\r\necho").await.unwrap();
            tokio::task::yield_now().await;
            client.write_all(b"\r\n$3\r\nfoo\r\n").await.unwrap();
            client
        });

        let request = handler.read_request().await.unwrap().unwrap();
        assert_eq!(request, Request::new("echo", vec!["foo".into()]));

        drop(writer.await.unwrap());
        assert!(handler.read_request().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pipelined_requests_arriving_in_pieces() {
        let (client, server) = tokio::io::duplex(64);
        let mut handler = RespHandler::new(server);

        let writer = tokio::spawn(async move {
            let mut client = client;
            for piece in [
                &b"*1\r\n$4\r\nPING\r\n*3\r\n$3\r\nSET"[..],
                b"\r\n$1\r\nk\r\n$5\r\nva",
                b"lue\r\n",
            ] {
                client.write_all(piece).await.unwrap();
                tokio::task::yield_now().await;
            }
            client
        });

        let ping = handler.read_request().await.unwrap().unwrap();
        assert_eq!(ping, Request::new("PING", vec![]));
        let set = handler.read_request().await.unwrap().unwrap();
        assert_eq!(set, Request::new("SET", vec!["k".into(), "value".into()]));

        drop(writer.await.unwrap());
        assert!(handler.read_request().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn eof_inside_a_frame_is_an_error() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut handler = RespHandler::new(server);
        client.write_all(b"*1\r\n$4\r\nPI").await.unwrap();
        drop(client);

        assert!(matches!(
            handler.read_request().await,
            Err(RespError::ConnectionClosedMidFrame)
        ));
    }

    #[tokio::test]
    async fn writes_encoded_values() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut handler = RespHandler::new(server);
        handler
            .write_value(RespValue::SimpleString("OK".into()))
            .await
            .unwrap();

        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"+OK\r\n");
    }
}
