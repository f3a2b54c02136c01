mod logging;
mod signals;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use erp_gateway::{Gateway, GatewayConfig};
use erp_rpc::{BackendKind, JsonRpcClient, RecordClient};
use mimalloc::MiMalloc;
use tokio::net::TcpListener;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    let GatewayConfig {
        server,
        backend,
        auth,
        rate_limit,
        logging: log_config,
    } = GatewayConfig::load()?;
    logging::init(&log_config)?;

    let client: Arc<dyn RecordClient> = match backend.kind {
        BackendKind::JsonRpc => {
            let backend_url = backend.url.clone();
            let client =
                Arc::new(JsonRpcClient::new(backend).context("failed to build backend client")?);

            // Log in before serving; a backend that is down now may be up later.
            match client.connect().await {
                Ok(session) => {
                    tracing::info!(
                        url = %backend_url,
                        uid = session.uid,
                        "backend session established"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        url = %backend_url,
                        error = %e,
                        "backend login failed; retrying on first request"
                    );
                }
            }
            client
        }
        BackendKind::Memory => {
            tracing::warn!("serving from the in-memory backend; records are lost on exit");
            Arc::new(erp_gateway::in_memory_backend())
        }
    };

    let addr = format!("{}:{}", server.bind, server.port);
    let gateway = Gateway::new(client, server, auth, &rate_limit)?;
    let app = gateway.router();

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "erp gateway listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = signals::wait_for_shutdown().await {
            tracing::error!(error = %e, "shutdown signal handling failed");
        }
    })
    .await
    .context("server error")?;

    tracing::info!("erp gateway stopped");
    Ok(())
}
