pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod server;
pub mod storage;
pub mod transfer;

pub use config::ServerConfig;
pub use server::Server;
pub use storage::FileGateway;
