use crate::{
    cli::actions::shutdown_signal,
    scanner::{CAMERA_BUFFER, ScanHandle, ScanLoop},
    verification::{VerificationClient, VerifierConfig},
};
use anyhow::Result;
use std::{future::Future, sync::Arc};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines},
    sync::mpsc,
};
use tracing::{debug, warn};

/// Re-arms scanning after an outcome was shown.
pub const CONTINUE_COMMAND: &str = ":continue";
pub const QUIT_COMMAND: &str = ":quit";

#[derive(Debug)]
pub struct Args {
    pub verifier: VerifierConfig,
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Continue,
    Quit,
    Payload(&'a str),
    Blank,
}

fn classify_line(line: &str) -> Line<'_> {
    match line.trim_end_matches(['\r', '\n']) {
        CONTINUE_COMMAND => Line::Continue,
        QUIT_COMMAND => Line::Quit,
        payload if payload.trim().is_empty() => Line::Blank,
        payload => Line::Payload(payload),
    }
}

/// Feed stdin lines to the scan loop and print every outcome change.
///
/// On end of input the last submission is allowed to resolve and its outcome
/// is printed. `:quit` and Ctrl-C cancel it.
///
/// # Errors
/// Returns an error if the verification client cannot be built or stdin fails.
pub async fn execute(args: Args) -> Result<()> {
    let client = VerificationClient::new(args.verifier)?;
    // Lines go through the handle so they stay ordered with `:continue`.
    let (_camera, payloads) = mpsc::channel(CAMERA_BUFFER);
    let scan = ScanLoop::new(Arc::new(client)).spawn(payloads);

    let mut outcome = scan.subscribe();
    let printer = tokio::spawn(async move {
        while outcome.changed().await.is_ok() {
            let state = outcome.borrow_and_update().clone();
            println!("{state}");
        }
    });

    let lines = BufReader::new(tokio::io::stdin()).lines();
    let ended = forward(lines, &scan, shutdown_signal()).await;

    match ended {
        Ok(true) => scan.finish().await,
        _ => scan.stop().await,
    }

    if let Err(e) = printer.await {
        warn!("Outcome printer ended abnormally: {e}");
    }

    ended.map(|_| ())
}

/// Forward input lines to the scan loop.
///
/// Returns `true` when input ended and `false` on `:quit` or `shutdown`.
async fn forward<R, F>(mut lines: Lines<R>, scan: &ScanHandle, shutdown: F) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            () = &mut shutdown => return Ok(false),
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            debug!("input closed");
            return Ok(true);
        };

        match classify_line(&line) {
            Line::Continue => scan.continue_scanning().await,
            Line::Quit => return Ok(false),
            Line::Blank => {}
            Line::Payload(payload) => scan.scan(payload.to_string()).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;
    use std::time::Duration;
    use url::Url;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    async fn verifier(delay: Duration) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "valid": true, "domain": "example.gov.pl" }))
                    .set_delay(delay),
            )
            .mount(&server)
            .await;
        server
    }

    fn spawn_scan(server: &MockServer) -> ScanHandle {
        let url = Url::parse(&format!("{}/verify-token", server.uri())).unwrap();
        let config = VerifierConfig::new(url, SecretString::from("user001".to_string()));
        let (_camera, payloads) = mpsc::channel(CAMERA_BUFFER);
        ScanLoop::new(Arc::new(VerificationClient::new(config).unwrap())).spawn(payloads)
    }

    #[test]
    fn lines_map_to_commands() {
        assert_eq!(classify_line(":continue"), Line::Continue);
        assert_eq!(classify_line(":quit\r"), Line::Quit);
        assert_eq!(classify_line("   "), Line::Blank);
        assert_eq!(
            classify_line("verification-code:XYZ"),
            Line::Payload("verification-code:XYZ")
        );
        assert_eq!(classify_line("hello world"), Line::Payload("hello world"));
    }

    #[tokio::test]
    async fn end_of_input_waits_for_last_result() {
        let server = verifier(Duration::from_millis(300)).await;
        let scan = spawn_scan(&server);
        let outcome = scan.subscribe();

        let lines = BufReader::new(&b"verification-code:XYZ\n"[..]).lines();
        assert!(forward(lines, &scan, std::future::pending()).await.unwrap());
        scan.finish().await;

        assert_eq!(outcome.borrow().domain(), Some("example.gov.pl"));
    }

    #[tokio::test]
    async fn continue_applies_between_lines() {
        let server = verifier(Duration::ZERO).await;
        let scan = spawn_scan(&server);
        let outcome = scan.subscribe();

        let input = b"verification-code:A\n:continue\nverification-code:B\n";
        let lines = BufReader::new(&input[..]).lines();
        assert!(forward(lines, &scan, std::future::pending()).await.unwrap());
        scan.finish().await;

        assert_eq!(server.received_requests().await.unwrap().len(), 2);
        assert_eq!(outcome.borrow().domain(), Some("example.gov.pl"));
    }

    #[tokio::test]
    async fn quit_stops_reading() {
        let server = verifier(Duration::ZERO).await;
        let scan = spawn_scan(&server);

        let lines = BufReader::new(&b":quit\nverification-code:XYZ\n"[..]).lines();
        assert!(!forward(lines, &scan, std::future::pending()).await.unwrap());
        scan.stop().await;

        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
