use super::error::VerificationError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one submission, produced exactly once per candidate token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerificationResult {
    #[must_use]
    pub fn success(domain: String, message: Option<String>) -> Self {
        Self {
            valid: true,
            domain: Some(domain),
            message,
        }
    }

    #[must_use]
    pub fn failure(error: &VerificationError) -> Self {
        Self {
            valid: false,
            domain: None,
            message: Some(error.to_string()),
        }
    }
}

/// A token the verifier accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub domain: String,
    pub message: Option<String>,
}

impl From<Result<Verified, VerificationError>> for VerificationResult {
    fn from(outcome: Result<Verified, VerificationError>) -> Self {
        match outcome {
            Ok(verified) => Self::success(verified.domain, verified.message),
            Err(error) => Self::failure(&error),
        }
    }
}

/// Map a verifier response onto a result.
///
/// Checked in order: the body must be JSON, then `401` means a rejected
/// token, any other non-2xx is a server error, and finally the body must have
/// the `{valid, domain?, message?}` shape.
///
/// # Errors
/// Returns the matching `VerificationError` for every failure branch.
pub fn classify_response(status: StatusCode, body: &[u8]) -> Result<Verified, VerificationError> {
    let json: Value = serde_json::from_slice(body)
        .map_err(|e| VerificationError::MalformedResponse(e.to_string()))?;

    if status == StatusCode::UNAUTHORIZED {
        return Err(VerificationError::Unauthorized);
    }

    if !status.is_success() {
        return Err(VerificationError::Server(status.as_u16()));
    }

    let response: VerificationResult = serde_json::from_value(json)
        .map_err(|e| VerificationError::MalformedResponse(e.to_string()))?;

    if response.valid {
        Ok(Verified {
            domain: response.domain.unwrap_or_default(),
            message: response.message,
        })
    } else {
        Err(VerificationError::InvalidToken(
            response.message.filter(|message| !message.trim().is_empty()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::error::INVALID_TOKEN_FALLBACK;

    fn classify(status: u16, body: &str) -> Result<Verified, VerificationError> {
        classify_response(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body.as_bytes(),
        )
    }

    #[test]
    fn valid_response_carries_domain() {
        assert_eq!(
            classify(200, r#"{"valid":true,"domain":"example.gov.pl"}"#),
            Ok(Verified {
                domain: "example.gov.pl".to_string(),
                message: None,
            })
        );
    }

    #[test]
    fn valid_response_without_domain_uses_empty_domain() {
        let verified = classify(200, r#"{"valid":true}"#);
        assert_eq!(verified.map(|v| v.domain), Ok(String::new()));
    }

    #[test]
    fn invalid_response_uses_server_message() {
        assert_eq!(
            classify(200, r#"{"valid":false,"message":"Token expired"}"#),
            Err(VerificationError::InvalidToken(Some("Token expired".into())))
        );
    }

    #[test]
    fn invalid_response_without_message_falls_back() {
        let result: VerificationResult = classify(200, r#"{"valid":false,"message":""}"#).into();
        assert_eq!(result.message.as_deref(), Some(INVALID_TOKEN_FALLBACK));
        assert!(!result.valid);
    }

    #[test]
    fn unauthorized_has_empty_message() {
        let outcome = classify(401, r#"{"detail":"Invalid signature"}"#);
        assert_eq!(outcome, Err(VerificationError::Unauthorized));

        let result = VerificationResult::from(outcome);
        assert_eq!(result.message.as_deref(), Some(""));
        assert_eq!(result.domain, None);
    }

    #[test]
    fn other_statuses_are_server_errors() {
        for status in [400, 403, 404, 500, 503] {
            assert_eq!(
                classify(status, r#"{"detail":"nope"}"#),
                Err(VerificationError::Server(status))
            );
        }
    }

    #[test]
    fn unparseable_body_wins_over_status() {
        for status in [200, 401, 500] {
            assert!(matches!(
                classify(status, "<html>bad gateway</html>"),
                Err(VerificationError::MalformedResponse(_))
            ));
        }
        assert!(matches!(
            classify(200, ""),
            Err(VerificationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn json_of_the_wrong_shape_is_malformed() {
        assert!(matches!(
            classify(200, r#"{"token":"abc"}"#),
            Err(VerificationError::MalformedResponse(_))
        ));
        assert!(matches!(
            classify(200, r#"{"valid":"yes"}"#),
            Err(VerificationError::MalformedResponse(_))
        ));
    }
}
