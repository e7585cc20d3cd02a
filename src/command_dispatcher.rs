use crate::client_handler::SharedResources;
use crate::db_handler::{
    get_key, handle_config, handle_echo, handle_key_search, replica_ops, send_pong, set_key,
    CommandResult,
};
use crate::error::CommandError;
use crate::types::Request;

/// Dispatch command to the appropriate handler function
pub async fn dispatch_command(request: &Request, resources: &SharedResources) -> CommandResult {
    let argc = request.args.len();

    match request.command().as_str() {
        "PING" if argc <= 1 => send_pong(request),
        "ECHO" if argc == 1 => handle_echo(request),

        // Key-value operations
        "SET" if argc >= 2 => set_key(&resources.store, request).await,
        "GET" if argc == 1 => get_key(&resources.store, request).await,
        "KEYS" if argc == 1 => handle_key_search(&resources.store, request).await,

        // Configuration and metadata
        "CONFIG" if argc >= 1 => handle_config(request, &resources.config),
        "INFO" if argc <= 1 => replica_ops::handle_info(request, &resources.replication),

        // Replication commands
        "REPLCONF" => replica_ops::handle_replconf(request),
        "PSYNC" if argc == 2 => replica_ops::handle_psync(request, &resources.replication),

        "PING" | "ECHO" | "SET" | "GET" | "KEYS" | "CONFIG" | "INFO" | "PSYNC" => Err(
            CommandError::WrongArity(request.name.to_ascii_lowercase()),
        ),
        _ => Err(CommandError::UnknownCommand(request.name.clone())),
    }
}
