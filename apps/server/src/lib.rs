//! # Lockbox Server
//!
//! The vault server binary: an `Axum` REST API over the envelope-encrypted
//! vault, backed by `SurrealDB` and a blob file directory.
//!
//! ## Example
//! ```no_run
//! use lockbox_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder()
//!         .port(8443)
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

mod router;

use anyhow::{Context, Result, anyhow};
use axum_server::Handle;
use lockbox::domain::config::ApiConfig;
use lockbox::kernel::gate::{GateHandle, gate};
use lockbox::vault::VaultState;
use lockbox_database::Database;
use lockbox_storage::BlobStore;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: ApiConfig,
}

impl ServerBuilder {
    /// Set up the server's configuration.
    pub fn config(mut self, cfg: ApiConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    fn validate_ssl_config(&self) -> Result<()> {
        if let Some(ssl) = &self.cfg.server.ssl {
            if !ssl.cert.exists() {
                anyhow::bail!("SSL certificate not found at: {}", ssl.cert.display());
            }
            if !ssl.key.exists() {
                anyhow::bail!("SSL key not found at: {}", ssl.key.display());
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let metadata = ssl.key.metadata()?;
                if metadata.permissions().mode() & 0o077 != 0 {
                    tracing::warn!(
                        "SECURITY: SSL Private Key {} has insecure permissions (should be 600)",
                        ssl.key.display()
                    );
                }
            }
        }
        Ok(())
    }

    /// Spawns the database lifecycle task: connect, bootstrap the schema,
    /// publish the connection through the one-shot gate. Requests accepted
    /// before the gate is set simply wait on it.
    fn spawn_database(&self, handle: GateHandle<Database>) {
        let db_cfg = self.cfg.database.clone();

        tokio::spawn(async move {
            let mut builder =
                Database::builder().url(&db_cfg.url).session(&db_cfg.namespace, &db_cfg.database);
            if let Some(creds) = &db_cfg.credentials {
                builder = builder.auth(&creds.username, &creds.password);
            }

            match builder.init().await {
                Ok(database) => handle.set(database),
                // Dropping the handle closes the gate; requests fail as
                // transient instead of hanging.
                Err(err) => error!(error = %err, "Database initialization failed"),
            }
        });
    }

    /// Consumes the builder and initializes the server.
    ///
    /// # Process
    /// 1. Validates the TLS configuration
    /// 2. Bootstraps the blob store (creates the directory, sweeps stale uploads)
    /// 3. Spawns the database lifecycle task behind the connection gate
    /// 4. Wires the vault slice into the API state
    ///
    /// # Errors
    /// Returns an error if:
    /// * The blob root cannot be created or resolved
    /// * SSL certificate/key files cannot be found
    /// * The vault slice rejects its configuration (token secret, hash cost)
    pub async fn build(self) -> Result<Server> {
        self.validate_ssl_config()?;

        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);
        info!(address = %address, "Initializing server");

        let store = BlobStore::builder()
            .root(&self.cfg.storage.blobs_dir)
            .connect()
            .await
            .context("Failed to initialize the blob store")?;

        let (handle, database) = gate();
        self.spawn_database(handle);

        let state = lockbox::init(&self.cfg, database, store)
            .map_err(|e| anyhow!("Vault bootstrap failed: {e}"))?;

        Ok(Server { cfg: self.cfg, state })
    }
}

/// A fully initialized server instance ready to run.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    cfg: ApiConfig,
    state: VaultState,
}

impl Server {
    /// Returns a new [`ServerBuilder`] to configure the server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Starts the server and runs until the shutdown signal is received.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the configured
    /// address or if TLS setup fails.
    pub async fn run(self) -> Result<()> {
        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);

        info!(
            address = %address,
            ssl = self.cfg.server.ssl.is_some(),
            "Starting server"
        );

        let app = router::init(self.state);

        let handle = Handle::<SocketAddr>::new();
        let shutdown_handle = handle.clone();

        // Shutdown signal listener
        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                return;
            }
            info!("Shutdown signal received, starting graceful shutdown...");
            shutdown_handle.graceful_shutdown(Some(std::time::Duration::from_secs(30)));
        });

        if let Some(ssl_config) = &self.cfg.server.ssl {
            info!("Starting HTTPS server on https://{address}");

            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                &ssl_config.cert,
                &ssl_config.key,
            )
            .await
            .context("Failed to load SSL/TLS certificates")?;

            axum_server::bind_rustls(address, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")?;
        } else {
            info!("Starting HTTP server on http://{address}");

            axum_server::bind(address)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTP server failed")?;
        }

        info!("Server shutdown complete");
        Ok(())
    }
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => {
            res.context("Ctrl+C signal received")?;
        },
        res = terminate => {
            res.context("SIGTERM signal received")?;
        },
    }

    Ok(())
}
