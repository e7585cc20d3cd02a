//! Decoder for the RDB snapshot format.
//!
//! Only what is needed to seed the store is understood: auxiliary fields,
//! database selection, resize hints, expiry-tagged records and string values.
//! Anything else aborts the decode with a [`DecodeError`].

use bytes::{Buf, Bytes};
use std::collections::HashMap;

use crate::error::DecodeError;
use length::{ensure, read_length};
use string::read_string;

pub mod length;
pub mod string;

pub const MAGIC: &[u8; 5] = b"REDIS";

pub const OPCODE_AUX: u8 = 0xFA;
pub const OPCODE_RESIZEDB: u8 = 0xFB;
pub const OPCODE_EXPIRETIME_MS: u8 = 0xFC;
pub const OPCODE_EXPIRETIME: u8 = 0xFD;
pub const OPCODE_SELECTDB: u8 = 0xFE;
pub const OPCODE_EOF: u8 = 0xFF;

pub const TYPE_STRING: u8 = 0;

/// Auxiliary fields kept after decoding; other keys are read and dropped.
pub const AUX_KEYS: [&str; 4] = ["redis-ver", "redis-bits", "ctime", "used-mem"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdb {
    pub magic: [u8; 5],
    pub version: [u8; 4],
    pub aux: HashMap<String, String>,
    pub databases: Vec<Database>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResizeDb {
    pub hash_table_size: u64,
    pub expire_table_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    pub id: u64,
    pub resize: ResizeDb,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    String(Bytes),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: Bytes,
    pub value: FieldValue,
    /// Absolute unix time in milliseconds, 0 when the key never expires.
    pub expires_at_ms: u64,
}

impl Field {
    pub fn expiry_ms(&self) -> Option<u64> {
        (self.expires_at_ms != 0).then_some(self.expires_at_ms)
    }
}

impl Database {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            resize: ResizeDb::default(),
            fields: Vec::new(),
        }
    }
}

impl Rdb {
    /// The state used when there is no snapshot to load: a single empty database 0.
    pub fn empty() -> Self {
        Self {
            magic: *MAGIC,
            version: *b"0011",
            aux: HashMap::new(),
            databases: vec![Database::new(0)],
        }
    }

    pub fn first_database(&self) -> Option<&Database> {
        self.databases.first()
    }

    /// Keys of the first database, in file order.
    pub fn keys(&self) -> Vec<String> {
        self.first_database()
            .map(|db| {
                db.fields
                    .iter()
                    .map(|f| String::from_utf8_lossy(&f.key).into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Records before any SELECTDB land in database 0.
    fn current_database(&mut self) -> &mut Database {
        if self.databases.is_empty() {
            self.databases.push(Database::new(0));
        }
        let last = self.databases.len() - 1;
        &mut self.databases[last]
    }
}

/// Decodes a whole snapshot. Either every record is decoded or an error is returned.
pub fn decode(contents: &[u8]) -> Result<Rdb, DecodeError> {
    let mut buf = contents;

    ensure(&buf, 9, "header")?;
    let mut magic = [0u8; 5];
    buf.copy_to_slice(&mut magic);
    if &magic != MAGIC {
        return Err(DecodeError::InvalidMagic(magic));
    }
    let mut version = [0u8; 4];
    buf.copy_to_slice(&mut version);

    let mut rdb = Rdb {
        magic,
        version,
        aux: HashMap::new(),
        databases: Vec::new(),
    };

    while buf.has_remaining() {
        let opcode = buf.get_u8();
        match opcode {
            OPCODE_EOF => break,
            OPCODE_AUX => {
                let key = read_string(&mut buf)?;
                let value = read_string(&mut buf)?;
                let key = String::from_utf8_lossy(&key).into_owned();
                if AUX_KEYS.contains(&key.as_str()) {
                    rdb.aux
                        .insert(key, String::from_utf8_lossy(&value).into_owned());
                }
            }
            OPCODE_SELECTDB => {
                let id = read_length(&mut buf)?;
                rdb.databases.push(Database::new(id));
            }
            OPCODE_RESIZEDB => {
                let hash_table_size = read_length(&mut buf)?;
                let expire_table_size = read_length(&mut buf)?;
                rdb.current_database().resize = ResizeDb {
                    hash_table_size,
                    expire_table_size,
                };
            }
            OPCODE_EXPIRETIME => {
                ensure(&buf, 5, "seconds expiry")?;
                let expires_at_ms = u64::from(buf.get_u32_le()) * 1000;
                let value_type = buf.get_u8();
                let field = read_field(value_type, expires_at_ms, &mut buf)?;
                rdb.current_database().fields.push(field);
            }
            OPCODE_EXPIRETIME_MS => {
                ensure(&buf, 9, "milliseconds expiry")?;
                let expires_at_ms = buf.get_u64_le();
                let value_type = buf.get_u8();
                let field = read_field(value_type, expires_at_ms, &mut buf)?;
                rdb.current_database().fields.push(field);
            }
            value_type => {
                let field = read_field(value_type, 0, &mut buf)?;
                rdb.current_database().fields.push(field);
            }
        }
    }

    Ok(rdb)
}

fn read_field(value_type: u8, expires_at_ms: u64, buf: &mut impl Buf) -> Result<Field, DecodeError> {
    let key = read_string(buf)?;
    let value = match value_type {
        TYPE_STRING => FieldValue::String(read_string(buf)?),
        other => return Err(DecodeError::UnsupportedValueType(other)),
    };
    Ok(Field {
        key,
        value,
        expires_at_ms,
    })
}
