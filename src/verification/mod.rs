//! Client for the verifier's submit endpoint.
//!
//! One call per candidate token, bounded by a hard timeout. The timeout wraps
//! the whole exchange (connect, send, body) and drops the request future when
//! it fires, so a late response can never be observed.

pub mod error;
pub mod result;

use crate::APP_USER_AGENT;
use anyhow::Result;
use reqwest::{Client, Method, header::CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::{future::Future, time::Duration};
use tokio::time::timeout;
use tracing::{Instrument, info, info_span, warn};
use url::Url;

pub use self::{
    error::VerificationError,
    result::{VerificationResult, Verified, classify_response},
};

/// Header carrying the caller identity.
pub const CALLER_ID_HEADER: &str = "X-User-ID";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can judge a candidate token. Implemented by
/// [`VerificationClient`]; the scan loop only depends on this.
pub trait Verifier: Send + Sync + 'static {
    fn submit(&self, candidate: &str) -> impl Future<Output = VerificationResult> + Send;
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Full URL of the submit endpoint, e.g. `http://verifier:9090/verify-token`.
    pub url: Url,
    pub method: Method,
    pub timeout: Duration,
    pub caller_id: SecretString,
}

impl VerifierConfig {
    #[must_use]
    pub fn new(url: Url, caller_id: SecretString) -> Self {
        Self {
            url,
            method: Method::POST,
            timeout: DEFAULT_TIMEOUT,
            caller_id,
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct VerificationClient {
    client: Client,
    config: VerifierConfig,
}

impl VerificationClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: VerifierConfig) -> Result<Self> {
        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self { client, config })
    }

    /// Submit `candidate` and classify the answer. Never fails: every error is
    /// folded into a failed [`VerificationResult`].
    pub async fn submit(&self, candidate: &str) -> VerificationResult {
        let outcome = self.exchange(candidate).await;

        match &outcome {
            Ok(verified) => info!(domain = %verified.domain, "Token verified"),
            Err(e) => warn!(kind = e.kind(), "Token verification failed: {e:?}"),
        }

        VerificationResult::from(outcome)
    }

    async fn exchange(&self, candidate: &str) -> Result<Verified, VerificationError> {
        let span = info_span!(
            "verifier.submit",
            http.method = %self.config.method,
            url = %self.config.url
        );

        let request = self
            .client
            .request(self.config.method.clone(), self.config.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(CALLER_ID_HEADER, self.config.caller_id.expose_secret())
            .json(&json!({ "token": candidate }));

        let call = async move {
            let response = request.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match timeout(self.config.timeout, call.instrument(span)).await {
            Err(_) => return Err(VerificationError::Timeout),
            Ok(Err(e)) if e.is_timeout() => return Err(VerificationError::Timeout),
            Ok(Err(e)) => return Err(VerificationError::Transport(e.to_string())),
            Ok(Ok(exchange)) => exchange,
        };

        classify_response(status, &body)
    }
}

impl Verifier for VerificationClient {
    async fn submit(&self, candidate: &str) -> VerificationResult {
        Self::submit(self, candidate).await
    }
}
