//! Token minting for the site.
//!
//! The verifier issues tokens on `POST /generate-token`. The minter asks for
//! one on a jittered cadence and writes it to the secret file the publisher
//! reads. The file is replaced atomically so a reader never sees a partial
//! token.

use crate::{APP_USER_AGENT, schedule::ScheduledTask, token::Token};
use anyhow::Result;
use rand::{Rng, SeedableRng, rngs::StdRng};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::time::{Duration, sleep};
use tracing::{Instrument, debug, error, info, info_span, warn};
use url::Url;

pub const DEFAULT_MINT_INTERVAL: Duration = Duration::from_secs(10);
const ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum MintError {
    #[error("verifier unreachable: {0}")]
    Unreachable(String),
    #[error("verifier answered {0}")]
    Status(StatusCode),
    #[error("unexpected mint response: {0}")]
    Malformed(String),
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Serialize)]
struct GenerateTokenRequest<'a> {
    domain: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GenerateTokenResponse {
    token: String,
}

#[derive(Debug, Clone)]
pub struct MinterConfig {
    /// Base URL of the verifier, `/generate-token` is appended.
    pub verifier_url: Url,
    pub domain: String,
    /// Lifetime to request; the verifier default applies when unset.
    pub ttl_seconds: Option<u64>,
    pub secret_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Minter {
    client: Client,
    endpoint: Url,
    config: MinterConfig,
}

impl Minter {
    /// # Errors
    /// Returns an error if the endpoint URL or the HTTP client cannot be built.
    pub fn new(config: MinterConfig) -> Result<Self> {
        let endpoint = config.verifier_url.join("/generate-token")?;
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    #[cfg(test)]
    fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[must_use]
    pub fn secret_file(&self) -> &Path {
        &self.config.secret_file
    }

    /// Ask the verifier for a new token.
    ///
    /// # Errors
    /// Returns `MintError` if the call fails or the answer has no token.
    pub async fn request_token(&self) -> Result<Token, MintError> {
        let span = info_span!("minter.generate", url = %self.endpoint, domain = %self.config.domain);

        async {
            let response = self
                .client
                .post(self.endpoint.clone())
                .json(&GenerateTokenRequest {
                    domain: &self.config.domain,
                    ttl_seconds: self.config.ttl_seconds,
                })
                .send()
                .await
                .map_err(|e| MintError::Unreachable(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(MintError::Status(status));
            }

            let body: GenerateTokenResponse = response
                .json()
                .await
                .map_err(|e| MintError::Malformed(e.to_string()))?;

            Token::parse(&body.token).ok_or_else(|| MintError::Malformed("empty token".into()))
        }
        .instrument(span)
        .await
    }

    /// Request a token and store it in the secret file.
    ///
    /// # Errors
    /// Returns `MintError` if the token cannot be obtained or written.
    pub async fn mint_once(&self) -> Result<Token, MintError> {
        let token = self.request_token().await?;
        write_atomic(&self.config.secret_file, token.as_str()).await?;

        info!(token = %token.redacted(), path = %self.config.secret_file.display(), "Minted token");

        Ok(token)
    }

    /// Mint now, then roughly every `period` (±10%). Each round makes up to
    /// three attempts, backing off 1s then 2s.
    pub fn start(self, period: Duration) -> ScheduledTask {
        let period = if period.is_zero() {
            DEFAULT_MINT_INTERVAL
        } else {
            period
        };

        ScheduledTask::spawn("token-minter", async move {
            let mut rng = StdRng::from_entropy();

            loop {
                for attempt in 1..=ATTEMPTS {
                    if attempt > 1 {
                        let backoff = Duration::from_secs(2u64.pow(attempt - 2));
                        warn!("Backing off for {:?}", backoff);
                        sleep(backoff).await;
                    }

                    match self.mint_once().await {
                        Ok(_) => break,
                        Err(e) => {
                            error!("Error minting token (attempt {attempt}/{ATTEMPTS}): {e}");

                            if attempt == ATTEMPTS {
                                error!("Failed to mint token after {ATTEMPTS} attempts");
                            }
                        }
                    }
                }

                let next = period.mul_f64(rng.gen_range(0.9..1.1));
                debug!("Will mint token in {:?}", next);
                sleep(next).await;
            }
        })
    }
}

/// Write `contents` next to `path` and rename it into place.
///
/// # Errors
/// Returns `MintError::Io` if either step fails.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), MintError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "secret".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let io_err = |source| MintError::Io {
        path: path.to_path_buf(),
        source,
    };

    tokio::fs::write(&tmp, contents).await.map_err(io_err)?;

    if let Err(source) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_err(source));
    }

    Ok(())
}

/// `generate-token` under the base path, with or without a trailing slash.
fn generate_token_url(base: &Url) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    Ok(base.join("generate-token")?)
}
