#![allow(clippy::unwrap_used)]

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use qrguard::{
    minter::{Minter, MinterConfig},
    payload::{self, Scanned},
    publisher::{FileSecretSource, TokenPublisher},
    renderer::{Artifact, CodeContainer, CodeOptions, CodeRenderer, QrSvgEncoder},
    site::{self, SiteState},
};
use serde_json::json;
use std::{fs, sync::Arc, time::Duration};
use tower::ServiceExt;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn publisher(source: FileSecretSource) -> TokenPublisher<FileSecretSource> {
    let renderer = CodeRenderer::new(Arc::new(QrSvgEncoder), CodeOptions::default()).unwrap();
    TokenPublisher::new(source, renderer, CodeContainer::new())
}

fn rendered_payload(container: &CodeContainer) -> String {
    match container.snapshot() {
        Artifact::Code(code) => {
            assert!(code.svg.contains("<svg"));
            code.payload
        }
        other => panic!("expected a rendered code, got {other:?}"),
    }
}

#[tokio::test]
async fn secret_file_rotation_renders_only_on_change() {
    let dir = tempfile::tempdir().unwrap();
    let secret = dir.path().join("secret.txt");
    let publisher = publisher(FileSecretSource::new(&secret));
    let state = publisher.subscribe();

    assert_eq!(publisher.container().snapshot(), Artifact::Loading);

    fs::write(&secret, "abc123").unwrap();
    assert!(publisher.tick().await.unwrap());
    assert_eq!(
        rendered_payload(publisher.container()),
        "verification-code:abc123"
    );

    fs::write(&secret, "abc123\n").unwrap();
    assert!(!publisher.tick().await.unwrap());
    assert!(state.borrow().last_fetched_at.is_some());

    fs::write(&secret, "xyz789").unwrap();
    assert!(publisher.tick().await.unwrap());
    let encoded = rendered_payload(publisher.container());
    assert_eq!(
        payload::classify(&encoded),
        Scanned::Candidate("xyz789".to_string())
    );

    fs::remove_file(&secret).unwrap();
    assert!(publisher.tick().await.is_err());
    assert_eq!(
        state.borrow().current_token.as_ref().map(|t| t.as_str().to_string()),
        Some("xyz789".to_string())
    );
}

#[tokio::test]
async fn minted_token_reaches_the_site() {
    let verifier = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "token": "minted-1" })))
        .mount(&verifier)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let secret = dir.path().join("secret.txt");

    let minter = Minter::new(MinterConfig {
        verifier_url: Url::parse(&verifier.uri()).unwrap(),
        domain: "bank.example.com".to_string(),
        ttl_seconds: Some(30),
        secret_file: secret.clone(),
    })
    .unwrap();
    minter.mint_once().await.unwrap();

    let publisher = publisher(FileSecretSource::new(&secret));
    let container = publisher.container().clone();
    let app = site::router(SiteState::new(container, publisher.subscribe()));

    let mut polling = publisher.start_polling(Duration::from_millis(50));
    let mut tokens = polling.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        tokens.wait_for(|state| state.current_token.is_some()),
    )
    .await
    .unwrap()
    .unwrap();

    let response = app
        .clone()
        .oneshot(Request::get("/secret.txt").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"minted-1");

    let response = app
        .oneshot(Request::get("/code.svg").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    polling.stop();
    assert!(!polling.is_running());
}
