//! The user-visible verification state.
//!
//! ```text
//! idle --unrecognized--> info
//! idle --submitted-----> pending --resolved(valid)----> success
//!                                --resolved(invalid)--> failed
//! success | failed | info | pending --continue--> idle
//! ```
//!
//! Result data lives inside the variants, so going back to `idle` drops the
//! previous domain and message in the same step.

use crate::verification::VerificationResult;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutcomeState {
    #[default]
    Idle,
    Pending,
    Success(VerificationResult),
    Failed(VerificationResult),
    /// A code was scanned but it is not a verification code.
    Info {
        payload: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Unrecognized { payload: String },
    Submitted,
    Resolved(VerificationResult),
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The event has no meaning in the current state; nothing changed.
    Ignored,
}

impl OutcomeState {
    /// The state reached from `self` on `event`. Total and deterministic.
    #[must_use]
    pub fn next(&self, event: Event) -> (Self, Transition) {
        match (self, event) {
            (Self::Idle, Event::Unrecognized { payload }) => {
                (Self::Info { payload }, Transition::Applied)
            }
            (Self::Idle, Event::Submitted) => (Self::Pending, Transition::Applied),
            (Self::Pending, Event::Resolved(result)) => {
                if result.valid {
                    (Self::Success(result), Transition::Applied)
                } else {
                    (Self::Failed(result), Transition::Applied)
                }
            }
            (_, Event::Continue) => (Self::Idle, Transition::Applied),
            (state, _) => (state.clone(), Transition::Ignored),
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Success(_) => "success",
            Self::Failed(_) => "failed",
            Self::Info { .. } => "info",
        }
    }

    /// `success`, `failed` and `info` wait for the user to continue.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Failed(_) | Self::Info { .. })
    }

    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        match self {
            Self::Success(result) => result.domain.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(result) | Self::Failed(result) => result.message.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for OutcomeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle: ready to scan"),
            Self::Pending => write!(f, "pending: verifying"),
            Self::Success(result) => write!(
                f,
                "success: verified domain {}",
                result.domain.as_deref().unwrap_or_default()
            ),
            Self::Failed(result) => match result.message.as_deref() {
                Some(message) if !message.is_empty() => write!(f, "failed: {message}"),
                _ => write!(f, "failed: token rejected"),
            },
            Self::Info { .. } => write!(f, "info: not a verification code"),
        }
    }
}

/// Holds the current [`OutcomeState`]; transitions are the only way it changes.
#[derive(Debug, Default)]
pub struct OutcomeMachine {
    state: OutcomeState,
}

impl OutcomeMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &OutcomeState {
        &self.state
    }

    pub fn apply(&mut self, event: Event) -> Transition {
        let (next, transition) = self.state.next(event);
        self.state = next;
        transition
    }
}
