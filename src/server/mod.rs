//! Server core functionality
//!
//! Wires configuration, the file gateway, the staging reaper and the HTTP
//! router into a running server.

pub mod core;

pub use self::core::Server;
