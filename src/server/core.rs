use log::{error, info, warn};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::api::{self, AppState};
use crate::config::ServerConfig;
use crate::error::StartupError;
use crate::storage::FileGateway;

pub struct Server {
    listener: TcpListener,
    gateway: Arc<FileGateway>,
    reaper: JoinHandle<()>,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Opens the storage root, starts the staging reaper and binds the
    /// listener. Nothing is served until [`Server::start`].
    pub async fn new(config: ServerConfig) -> Result<Self, StartupError> {
        let config = Arc::new(config);

        let gateway = FileGateway::open(
            config.storage_root_path(),
            &config.staging_dir_name,
            config.default_quota_bytes()?,
        )
        .await?;
        let gateway = Arc::new(gateway);

        let reaper = gateway
            .staging()
            .clone()
            .spawn_reaper(config.reaper_interval(), config.staging_ttl());

        let addr = config.listen_socket();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!("Server bound to {}", addr);
                listener
            }
            Err(source) => {
                error!("Failed to bind to {}: {}", addr, source);
                reaper.abort();
                return Err(StartupError::Bind { addr, source });
            }
        };

        Ok(Self {
            listener,
            gateway,
            reaper,
            config,
        })
    }

    /// Serves requests until Ctrl-C, then stops the reaper
    pub async fn start(self) -> Result<(), StartupError> {
        let public_dir = self.config.public_dir_path();
        match &public_dir {
            Some(dir) => info!("Serving static files from {}", dir.display()),
            None => info!("No static UI directory configured"),
        }

        let state = AppState {
            gateway: Arc::clone(&self.gateway),
            transfer_buffer_size: self.config.transfer_buffer_size,
        };
        let router = api::router(state, public_dir);

        info!(
            "Starting RAX file server on {}",
            self.config.listen_socket()
        );

        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        self.reaper.abort();
        info!("Server stopped");

        result.map_err(StartupError::Serve)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
