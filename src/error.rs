use thiserror::Error;

/// Errors raised while decoding the binary snapshot (RDB) format.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of snapshot while reading {context}: needed {needed} bytes, {remaining} left")]
    UnexpectedEof {
        context: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("invalid snapshot magic: expected \"REDIS\", found {0:?}")]
    InvalidMagic([u8; 5]),
    #[error("expected a plain length but found a special string encoding (0x{0:02X})")]
    EncodedStringAsLength(u8),
    #[error("unsupported string encoding selector {0}")]
    UnsupportedStringEncoding(u8),
    #[error("unsupported value type 0x{0:02X}")]
    UnsupportedValueType(u8),
}

/// Errors raised while decoding RESP frames off a connection.
#[derive(Debug, Error)]
pub enum RespError {
    #[error("Protocol error: expected {expected}, got '{found}'")]
    UnexpectedByte { expected: &'static str, found: char },
    #[error("Protocol error: line not terminated by CRLF")]
    MissingCrlf,
    #[error("Protocol error: too big inline request")]
    LineTooLong,
    #[error("Protocol error: invalid {kind} length '{value}'")]
    InvalidLength { kind: &'static str, value: String },
    #[error("Protocol error: invalid bulk length {0}")]
    BulkTooLarge(i64),
    #[error("Protocol error: bulk string does not match its declared length {0}")]
    BulkLengthMismatch(usize),
    #[error("Protocol error: empty command")]
    EmptyCommand,
    #[error("connection closed in the middle of a frame")]
    ConnectionClosedMidFrame,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors produced by a single request; they become error replies and the
/// connection keeps serving.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),
    #[error("ERR syntax error")]
    Syntax,
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(String),
}

/// Errors raised while attaching to a primary as a replica.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("unexpected reply while in state {state:?}: {reply}")]
    UnexpectedReply {
        state: crate::replica::HandshakeState,
        reply: String,
    },
    #[error("primary closed the connection while in state {0:?}")]
    ConnectionClosed(crate::replica::HandshakeState),
    #[error("handshake already finished")]
    Finished,
    #[error(transparent)]
    Resp(#[from] RespError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid replicaof value '{0}': expected \"<host> <port>\"")]
    InvalidReplicaOf(String),
}
