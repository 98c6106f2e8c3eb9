pub mod api;

use crate::cli::ServeArgs;
use self::api::AppState;
use std::error::Error;
use std::net::SocketAddr;
use log::{ info, warn };

pub struct Server {
    addr: String,
    state: AppState,
    tls: Option<(String, String)>,
}

impl Server {
    pub fn new(args: &ServeArgs, state: AppState) -> Self {
        let tls = match (args.enable_tls, &args.tls_cert_path, &args.tls_key_path) {
            (true, Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
            (true, _, _) => {
                warn!("ENABLE_TLS is set but TLS_CERT_PATH/TLS_KEY_PATH are missing; serving plain HTTP.");
                None
            }
            _ => None,
        };
        Self {
            addr: args.server_addr.clone(),
            state,
            tls,
        }
    }

    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()
            .map_err(|e| format!("Invalid server address '{}': {}", self.addr, e))?;
        let app = api::router(self.state);

        match self.tls {
            Some((cert_path, key_path)) => {
                let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                    cert_path,
                    key_path
                ).await?;
                let handle = axum_server::Handle::new();
                let shutdown = handle.clone();
                tokio::spawn(async move {
                    shutdown_signal().await;
                    shutdown.graceful_shutdown(None);
                });

                info!("Chat proxy listening on https://{}", addr);
                axum_server::bind_rustls(addr, tls_config)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await?;
            }
            None => {
                let listener = tokio::net::TcpListener::bind(addr).await
                    .map_err(|e| format!("Failed to bind chat proxy to {}: {}. Try a different port.", addr, e))?;
                info!("Chat proxy listening on http://{}", addr);
                axum::serve(listener, app.into_make_service())
                    .with_graceful_shutdown(shutdown_signal())
                    .await?;
            }
        }

        info!("Chat proxy stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
