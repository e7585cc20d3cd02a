use rand::distr::Alphanumeric;
use rand::Rng;
use std::fmt;

pub const REPLICATION_ID_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Slave,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Master => f.write_str("master"),
            Role::Slave => f.write_str("slave"),
        }
    }
}

/// Replication identity of this process. Decided once at startup.
#[derive(Debug, Clone)]
pub struct ReplicationState {
    pub role: Role,
    pub replication_id: String,
    pub offset: u64,
}

impl ReplicationState {
    pub fn new(role: Role) -> Self {
        Self::with_id(role, generate_replication_id())
    }

    pub fn with_id(role: Role, replication_id: impl Into<String>) -> Self {
        Self {
            role,
            replication_id: replication_id.into(),
            offset: 0,
        }
    }

    /// Body of `INFO replication`.
    pub fn info_section(&self) -> String {
        format!(
            "# Replication\r\nrole:{}\r\nmaster_replid:{}\r\nmaster_repl_offset:{}\r\n",
            self.role, self.replication_id, self.offset
        )
    }

    pub fn fullresync_line(&self) -> String {
        format!("FULLRESYNC {} {}", self.replication_id, self.offset)
    }
}

fn generate_replication_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(REPLICATION_ID_LEN)
        .map(char::from)
        .collect()
}
