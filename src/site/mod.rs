//! HTTP front of the protected site.
//!
//! Serves whatever the [`CodeContainer`] currently holds. The server never
//! renders anything itself; it only reads the latest artifact and token state.

use crate::{publisher::TokenState, renderer::CodeContainer};
use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
};
use std::future::Future;
use tokio::{net::TcpListener, sync::watch};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, debug_span, info};
use ulid::Ulid;

mod handlers;

/// Seconds between page reloads in the browser.
pub const PAGE_REFRESH_SECONDS: u64 = 5;

/// Shared, read-only view of the publisher's output.
#[derive(Debug, Clone)]
pub struct SiteState {
    pub container: CodeContainer,
    pub tokens: watch::Receiver<TokenState>,
}

impl SiteState {
    #[must_use]
    pub fn new(container: CodeContainer, tokens: watch::Receiver<TokenState>) -> Self {
        Self { container, tokens }
    }
}

/// Build the site routes.
pub fn router(state: SiteState) -> Router {
    Router::new()
        .route("/", get(handlers::page))
        .route("/code.svg", get(handlers::code))
        .route("/secret.txt", get(handlers::secret))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span)),
        )
        .route("/health", get(handlers::health).options(handlers::health))
        .with_state(state)
}

/// Serve the site on `[::]:port` until `shutdown` resolves.
///
/// # Errors
/// Returns an error if the port cannot be bound or the server fails.
pub async fn serve<F>(port: u16, state: SiteState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let path = request.uri().path();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, request_id)
}
