use anyhow::Result;
use axum::handler::Handler;
use axum::middleware;
use std::future::Future;
use tokio::net::TcpListener;

use crate::handler::middleware as handler_middleware;
use crate::handler::proxy::proxy;
use crate::handler::state::ProxyState;

/// Serves every request on `listener` through the proxy until `shutdown`
/// resolves, then lets in-flight requests finish.
pub(crate) async fn serve(
    listener: TcpListener,
    state: ProxyState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    tracing::info!("Starting server on {}...", listener.local_addr()?);

    let make_service = proxy
        .layer(middleware::from_fn(handler_middleware::metrics))
        .with_state(state)
        .into_make_service();
    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
