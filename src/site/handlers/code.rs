use crate::{renderer::Artifact, site::SiteState};
use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// The bare SVG, `404` until a code has been rendered.
pub async fn code(State(state): State<SiteState>) -> Response {
    match state.container.snapshot() {
        Artifact::Code(code) => (
            [
                (header::CONTENT_TYPE, "image/svg+xml"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            code.svg,
        )
            .into_response(),
        Artifact::Loading | Artifact::Error(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// The current token as plain text, `503` until one is known.
pub async fn secret(State(state): State<SiteState>) -> Response {
    let token = state.tokens.borrow().current_token.clone();

    match token {
        Some(token) => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            token.to_string(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "token not available yet").into_response(),
    }
}
