//! Visual code rendering for the protected site.
//!
//! The renderer owns no state of its own: it encodes a payload with the
//! injected [`Encoder`] and swaps the result into a [`CodeContainer`] in a
//! single step, so readers see either the previous artifact or the new one,
//! never a partial code.

pub mod qr;

use crate::{payload, token::Token};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error};

pub use self::qr::QrSvgEncoder;

/// Shown in place of the code when encoding fails.
pub const ERROR_INDICATOR: &str = "Unable to generate the verification code";

const MIN_SIZE: u32 = 64;
const MAX_SIZE: u32 = 4096;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("payload cannot be encoded: {0}")]
    Encode(String),
    #[error("invalid code options: {0}")]
    Options(String),
}

/// Encodes an opaque string into a scannable 2-D code.
pub trait Encoder: Send + Sync {
    /// Return the complete rendered code (SVG markup for the default encoder).
    ///
    /// # Errors
    /// Returns `RenderError::Encode` if the payload cannot be represented.
    fn encode(&self, payload: &str, options: &CodeOptions) -> Result<String, RenderError>;
}

/// Dimensions and colours of the generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeOptions {
    /// Minimum width and height in pixels.
    pub size: u32,
    /// Keep the quiet-zone margin around the code.
    pub quiet_zone: bool,
    pub dark: String,
    pub light: String,
}

impl CodeOptions {
    /// # Errors
    /// Returns `RenderError::Options` if the size is out of range or a colour is empty.
    pub fn validate(&self) -> Result<(), RenderError> {
        if !(MIN_SIZE..=MAX_SIZE).contains(&self.size) {
            return Err(RenderError::Options(format!(
                "size must be between {MIN_SIZE} and {MAX_SIZE} pixels, got {}",
                self.size
            )));
        }

        for (name, colour) in [("dark", &self.dark), ("light", &self.light)] {
            if colour.trim().is_empty() {
                return Err(RenderError::Options(format!("{name} colour is empty")));
            }
        }

        Ok(())
    }
}

impl Default for CodeOptions {
    fn default() -> Self {
        Self {
            size: 256,
            quiet_zone: true,
            dark: "#000000".to_string(),
            light: "#ffffff".to_string(),
        }
    }
}

/// A successfully rendered code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCode {
    pub payload: String,
    pub svg: String,
}

/// What the container currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// No token has been published yet.
    Loading,
    Code(RenderedCode),
    Error(&'static str),
}

/// The page region that holds the visual code.
#[derive(Debug, Clone)]
pub struct CodeContainer {
    artifact: Arc<watch::Sender<Artifact>>,
}

impl CodeContainer {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Artifact::Loading);
        Self {
            artifact: Arc::new(tx),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Artifact {
        self.artifact.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Artifact> {
        self.artifact.subscribe()
    }

    fn replace(&self, artifact: Artifact) {
        self.artifact.send_replace(artifact);
    }
}

impl Default for CodeContainer {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps tokens into payloads and renders them with the injected encoder.
#[derive(Clone)]
pub struct CodeRenderer {
    encoder: Arc<dyn Encoder>,
    options: CodeOptions,
}

impl CodeRenderer {
    /// # Errors
    /// Returns `RenderError::Options` if `options` are invalid.
    pub fn new(encoder: Arc<dyn Encoder>, options: CodeOptions) -> Result<Self, RenderError> {
        options.validate()?;

        Ok(Self { encoder, options })
    }

    /// Render `token` into `container`, replacing whatever was shown before.
    ///
    /// # Errors
    /// Returns `RenderError::Encode` if the encoder fails; the container then
    /// shows [`ERROR_INDICATOR`].
    pub fn render(&self, container: &CodeContainer, token: &Token) -> Result<(), RenderError> {
        let payload = payload::encode(token);

        match self.encoder.encode(&payload, &self.options) {
            Ok(svg) => {
                debug!(token = %token.redacted(), bytes = svg.len(), "code rendered");
                container.replace(Artifact::Code(RenderedCode { payload, svg }));
                Ok(())
            }
            Err(e) => {
                error!(token = %token.redacted(), "Failed to render code: {e}");
                container.replace(Artifact::Error(ERROR_INDICATOR));
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for CodeRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeRenderer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
