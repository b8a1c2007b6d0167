use std::future::Future;
use std::net::TcpListener;

use axum::AddExtensionLayer;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use axum::Router;

use crate::context::AppContext;
use crate::cors;
use crate::routes::routes;

/// Wires the `Router` with the full middleware stack —
/// tracing, a concurrency ceiling as the connection pool's natural
/// backpressure, and the shared `AppContext`
/// injected as a request extension. Exposed separately from `run` so
/// integration tests can drive the app in-process via `tower::ServiceExt::
/// oneshot` without binding a real socket.
pub fn build_app(ctx: AppContext) -> Router {
    routes().layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(ConcurrencyLimitLayer::new(64))
            .layer(cors::cors_layer())
            .layer(AddExtensionLayer::new(ctx)),
    )
}

pub fn run(
    listener: TcpListener,
    ctx: AppContext,
) -> anyhow::Result<impl Future<Output = Result<(), hyper::Error>>> {
    let app = build_app(ctx);

    let server = axum::Server::from_tcp(listener)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    Ok(server)
}

/// Waits for Ctrl+C (or, on Unix, SIGTERM) so in-flight requests drain
/// instead of being dropped mid-response.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining in-flight requests");
}
