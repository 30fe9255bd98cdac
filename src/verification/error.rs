use thiserror::Error;

/// Generic text for a rejected token when the verifier gives no reason.
pub const INVALID_TOKEN_FALLBACK: &str = "verification failed.";

/// Every way a submission can fail.
///
/// `Display` is the short, user-safe message shown on the failure screen.
/// `Unauthorized` deliberately renders as an empty string so a rejected token
/// looks the same whatever the verifier's reason was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("timed out.")]
    Timeout,
    #[error("connection error.")]
    Transport(String),
    #[error("malformed response.")]
    MalformedResponse(String),
    #[error("")]
    Unauthorized,
    #[error("server error.")]
    Server(u16),
    #[error("{}", .0.as_deref().unwrap_or(INVALID_TOKEN_FALLBACK))]
    InvalidToken(Option<String>),
}

impl VerificationError {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Unauthorized => "unauthorized",
            Self::Server(_) => "server",
            Self::InvalidToken(_) => "invalid_token",
        }
    }
}
