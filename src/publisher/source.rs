use crate::APP_USER_AGENT;
use reqwest::Client;
use std::{future::Future, path::PathBuf, time::Duration};
use thiserror::Error;
use tracing::{Instrument, debug, info_span};
use url::Url;

const SECRET_SOURCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a secret could not be read. Never fatal: the next poll tick retries.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("secret source unreachable: {0}")]
    Unreachable(String),
    #[error("secret source returned {0}")]
    Status(reqwest::StatusCode),
    #[error("secret source returned an empty token")]
    Empty,
    #[error("failed to read secret file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the current token is read from.
pub trait SecretSource: Send + Sync + 'static {
    /// Read the raw secret text, whitespace included.
    fn read(&self) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// `GET <url>` returning the token as `text/plain`.
#[derive(Debug, Clone)]
pub struct HttpSecretSource {
    url: Url,
    client: Client,
}

impl HttpSecretSource {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: Url) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(SECRET_SOURCE_TIMEOUT)
            .build()?;

        Ok(Self { url, client })
    }
}

impl SecretSource for HttpSecretSource {
    async fn read(&self) -> Result<String, FetchError> {
        let span = info_span!("secret.fetch", http.method = "GET", url = %self.url);

        let response = self
            .client
            .get(self.url.as_str())
            // Always ask for the latest version, never a cached copy.
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .instrument(span)
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        debug!(bytes = body.len(), "secret fetched");

        Ok(body)
    }
}

/// Local file holding the token, as written by the minter.
#[derive(Debug, Clone)]
pub struct FileSecretSource {
    path: PathBuf,
}

impl FileSecretSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SecretSource for FileSecretSource {
    async fn read(&self) -> Result<String, FetchError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// Secret source selected at startup.
#[derive(Debug, Clone)]
pub enum Source {
    Http(HttpSecretSource),
    File(FileSecretSource),
}

impl Source {
    /// `http(s)://` locations are fetched over HTTP, anything else is a file path.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn parse(location: &str) -> anyhow::Result<Self> {
        if location.starts_with("http://") || location.starts_with("https://") {
            Ok(Self::Http(HttpSecretSource::new(Url::parse(location)?)?))
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            Ok(Self::File(FileSecretSource::new(path)))
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Http(source) => source.url.to_string(),
            Self::File(source) => format!("file:{}", source.path.display()),
        }
    }
}

impl SecretSource for Source {
    async fn read(&self) -> Result<String, FetchError> {
        match self {
            Self::Http(source) => source.read().await,
            Self::File(source) => source.read().await,
        }
    }
}
