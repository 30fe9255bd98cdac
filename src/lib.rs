//! # qrguard
//!
//! Anti-phishing domain verification with rotating visual codes.
//!
//! A protected site keeps a short-lived token fresh and shows it as a QR code.
//! A trusted mobile client scans that code and asks an isolated verifier
//! whether the token is genuine and which domain it was issued for.
//!
//! ## Site side
//!
//! - [`publisher`] polls a [`publisher::SecretSource`] and re-renders only when
//!   the token actually changes.
//! - [`renderer`] turns a token into a `verification-code:<token>` payload and
//!   stores the encoded code in a [`renderer::CodeContainer`].
//! - [`minter`] asks the verifier for fresh tokens and writes them to the
//!   secret file that the publisher reads.
//! - [`site`] serves the current code over HTTP.
//!
//! ## Mobile side
//!
//! - [`scanner`] consumes decoded payloads, enforces one submission per armed
//!   session and drives the [`outcome`] state machine.
//! - [`verification`] submits a candidate token with a hard timeout and maps
//!   every response onto a [`verification::VerificationResult`].

pub mod cli;
pub mod minter;
pub mod outcome;
pub mod payload;
pub mod publisher;
pub mod renderer;
pub mod scanner;
pub mod schedule;
pub mod site;
pub mod token;
pub mod verification;

pub use self::token::Token;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
