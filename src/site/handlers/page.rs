use crate::{
    renderer::Artifact,
    site::{PAGE_REFRESH_SECONDS, SiteState},
};
use axum::{extract::State, http::header, response::IntoResponse};

const LOADING_INDICATOR: &str = "Loading verification code…";

/// The landing page with the current code embedded inline.
pub async fn page(State(state): State<SiteState>) -> impl IntoResponse {
    let body = match state.container.snapshot() {
        Artifact::Loading => format!(r#"<p class="loading">{LOADING_INDICATOR}</p>"#),
        Artifact::Code(code) => format!(r#"<div class="code">{}</div>"#, code.svg),
        Artifact::Error(indicator) => format!(r#"<p class="error">{indicator}</p>"#),
    };

    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        render(&body),
    )
}

fn render(body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="{PAGE_REFRESH_SECONDS}">
<title>Verify this site</title>
</head>
<body>
<h1>Verify this site</h1>
<p>Scan the code with your verification app to confirm you are on the genuine site.</p>
{body}
</body>
</html>
"#
    )
}
