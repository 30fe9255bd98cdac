//! Payload format shared by the site and the scanner.
//!
//! A payload is `<PREFIX><DELIMITER><token>`, e.g. `verification-code:abc123`.
//! Scanners also accept `<PREFIX><token>` for codes produced without the
//! delimiter.

use crate::token::Token;

pub const PREFIX: &str = "verification-code";
pub const DELIMITER: char = ':';

/// Build the payload that gets encoded into the visual code.
#[must_use]
pub fn encode(token: &Token) -> String {
    format!("{PREFIX}{DELIMITER}{token}")
}

/// Classification of a decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scanned {
    /// A recognizable payload; carries the candidate token to submit.
    Candidate(String),
    /// Anything that is not one of ours. Not an error, shown as `info`.
    Unrecognized,
}

/// Extract the candidate token from a decoded payload.
#[must_use]
pub fn classify(raw: &str) -> Scanned {
    let Some(rest) = raw.strip_prefix(PREFIX) else {
        return Scanned::Unrecognized;
    };

    // Missing delimiter: only the literal prefix is stripped.
    let candidate = rest.strip_prefix(DELIMITER).unwrap_or(rest);

    if candidate.is_empty() {
        Scanned::Unrecognized
    } else {
        Scanned::Candidate(candidate.to_string())
    }
}
