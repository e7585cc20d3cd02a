pub mod replica;
pub mod resp;

use std::time::Instant;

/// Value held by a key. Strings are the only type the server stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    String(String),
}

/// Struct to store a key inside the hashmap. It allows you to set an expiry time (optional)
#[derive(Debug, Clone)]
pub struct KeyWithExpiry {
    pub value: ValueType,
    pub expiry: Option<Instant>,
}

impl KeyWithExpiry {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expiry.is_some_and(|at| at <= now)
    }
}

/// One decoded client request: the command name followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub name: String,
    pub args: Vec<String>,
}

impl Request {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Command name folded to upper case for matching.
    pub fn command(&self) -> String {
        self.name.to_ascii_uppercase()
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}
