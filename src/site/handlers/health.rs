use crate::site::SiteState;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Method},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    name: String,
    version: String,
    token: String,
}

/// Report the service name, version and whether a token has been published.
/// The site stays healthy while waiting for its first token.
pub async fn health(method: Method, State(state): State<SiteState>) -> impl IntoResponse {
    let published = state.tokens.borrow().current_token.is_some();

    let health = Health {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        token: if published { "ok" } else { "pending" }.to_string(),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let headers = format!("{}:{}", health.name, health.version)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .unwrap_or_else(|err| {
            debug!("Failed to parse X-App header: {}", err);
            HeaderMap::new()
        });

    (headers, body)
}
