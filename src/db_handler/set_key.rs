use std::time::Duration;

use super::CommandResult;
use crate::db::Store;
use crate::error::CommandError;
use crate::types::resp::RespValue;
use crate::types::Request;

/// Pretty self explainatory: used to set a key into the db, `SET key value [PX ms]`
pub async fn set_key(store: &Store, request: &Request) -> CommandResult {
    let (key, value) = match (request.arg(0), request.arg(1)) {
        (Some(key), Some(value)) => (key.to_string(), value.to_string()),
        _ => return Err(CommandError::WrongArity("set".into())),
    };
    let ttl = parse_set_options(&request.args[2..])?;

    store.set(key, value, ttl).await;
    Ok(RespValue::ok())
}

/// Pretty self explainatory: used to get a key from the db
pub async fn get_key(store: &Store, request: &Request) -> CommandResult {
    let key = request.arg(0).unwrap_or_default();
    Ok(match store.get(key).await {
        Some(value) => RespValue::BulkString(value),
        None => RespValue::NullBulkString,
    })
}

fn parse_set_options(options: &[String]) -> Result<Option<Duration>, CommandError> {
    let mut ttl = None;
    let mut options = options.iter();
    while let Some(option) = options.next() {
        if !option.eq_ignore_ascii_case("PX") || ttl.is_some() {
            return Err(CommandError::Syntax);
        }
        let millis: i64 = options
            .next()
            .ok_or(CommandError::Syntax)?
            .parse()
            .map_err(|_| CommandError::NotAnInteger)?;
        if millis <= 0 {
            return Err(CommandError::InvalidExpireTime("set".into()));
        }
        ttl = Some(Duration::from_millis(millis as u64));
    }
    Ok(ttl)
}
