pub mod cli;
pub mod client_handler;
pub mod command_dispatcher;
pub mod db;
pub mod db_handler;
pub mod error;
pub mod file_handler;
pub mod parsers;
pub mod rdb;
pub mod replica;
pub mod server;
pub mod types;
