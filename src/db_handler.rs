use log::debug;

use crate::cli::Config;
use crate::db::Store;
use crate::error::CommandError;
use crate::types::resp::RespValue;
use crate::types::Request;

pub mod replica_ops;
pub mod set_key;

pub use set_key::{get_key, set_key};

/// What every handler produces: a reply, or an error that becomes an error reply.
pub type CommandResult = Result<RespValue, CommandError>;

/// Intended to handle the ping command. it the string provided after the ping command or defaults
/// to PONG if nothing ilse is provided
pub fn send_pong(request: &Request) -> CommandResult {
    let payload = request.arg(0).unwrap_or("PONG");
    Ok(echo_reply(payload))
}

pub fn handle_echo(request: &Request) -> CommandResult {
    let message = request.arg(0).unwrap_or_default();
    Ok(echo_reply(message))
}

/// A simple string can't carry CR or LF, so such text goes back as a bulk string.
fn echo_reply(text: &str) -> RespValue {
    if text.contains(|c: char| c == '\r' || c == '\n') {
        RespValue::BulkString(text.to_string())
    } else {
        RespValue::SimpleString(text.to_string())
    }
}

/// `CONFIG GET <name>`: `[name, value]`, or a null bulk string for unknown names.
pub fn handle_config(request: &Request, config: &Config) -> CommandResult {
    let subcommand = request.arg(0).unwrap_or_default();
    if !subcommand.eq_ignore_ascii_case("GET") {
        return Err(CommandError::Syntax);
    }
    let Some(name) = request.arg(1) else {
        return Err(CommandError::WrongArity("config|get".into()));
    };

    Ok(match config.get(name) {
        Some(value) => RespValue::Array(vec![
            RespValue::BulkString(name.to_string()),
            RespValue::BulkString(value),
        ]),
        None => RespValue::NullBulkString,
    })
}

pub async fn handle_key_search(store: &Store, request: &Request) -> CommandResult {
    let pattern = request.arg(0).unwrap_or_default();
    let keys = store.keys(pattern).await;
    debug!("KEYS {pattern}: {} keys", keys.len());
    Ok(RespValue::Array(
        keys.into_iter().map(RespValue::BulkString).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(parts: &[&str]) -> Request {
        Request::new(
            parts[0],
            parts[1..].iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn ping_and_echo() {
        assert_eq!(
            send_pong(&request(&["ping"])),
            Ok(RespValue::SimpleString("PONG".into()))
        );
        assert_eq!(
            handle_echo(&request(&["echo", "foo"])).unwrap().encode(),
            "+foo\r\n"
        );
    }

    #[test]
    fn line_breaks_are_echoed_as_bulk() {
        assert_eq!(
            handle_echo(&request(&["echo", "a\r\n+INJECTED"])).unwrap().encode(),
            "$12\r\na\r\n+INJECTED\r\n"
        );
        assert_eq!(
            send_pong(&request(&["ping", "x\ny"])),
            Ok(RespValue::BulkString("x\ny".into()))
        );
    }

    #[test]
    fn config_get() {
        let config = Config {
            dir: Some("/tmp/data".into()),
            ..Config::default()
        };
        assert_eq!(
            handle_config(&request(&["config", "get", "dir"]), &config),
            Ok(RespValue::command(["dir", "/tmp/data"]))
        );
        assert_eq!(
            handle_config(&request(&["config", "get", "dbfilename"]), &config),
            Ok(RespValue::NullBulkString)
        );
        assert_eq!(
            handle_config(&request(&["config", "set", "dir", "x"]), &config),
            Err(CommandError::Syntax)
        );
    }
}
