use log::{debug, info};

use super::CommandResult;
use crate::types::replica::ReplicationState;
use crate::types::resp::RespValue;
use crate::types::Request;

/// `INFO [section]`. Only the replication section has content.
pub fn handle_info(request: &Request, replication: &ReplicationState) -> CommandResult {
    let section = request.arg(0).unwrap_or("replication");
    let body = if section.eq_ignore_ascii_case("replication") || section.eq_ignore_ascii_case("all")
    {
        replication.info_section()
    } else {
        String::new()
    };
    Ok(RespValue::BulkString(body))
}

/// Acknowledges every REPLCONF; nothing is retained.
pub fn handle_replconf(request: &Request) -> CommandResult {
    if let (Some(option), Some(value)) = (request.arg(0), request.arg(1)) {
        debug!("REPLCONF {option}: {value}");
    }
    Ok(RespValue::ok())
}

/// Always answers with a full resynchronisation. The snapshot transfer that
/// would normally follow is not sent.
pub fn handle_psync(request: &Request, replication: &ReplicationState) -> CommandResult {
    let replication_id = request.arg(0).unwrap_or("?");
    let offset = request.arg(1).unwrap_or("-1");
    info!("PSYNC request: id={replication_id}, offset={offset}");
    Ok(RespValue::SimpleString(replication.fullresync_line()))
}
