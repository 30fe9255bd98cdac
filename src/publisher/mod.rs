//! Token publishing for the protected site.
//!
//! A [`TokenPublisher`] reads the [`SecretSource`] on a fixed cadence and
//! re-renders the code only when the token changes. Ticks run one after the
//! other in a single task, so an older fetch can never overwrite a newer token.
//! Failed fetches are logged and leave [`TokenState`] untouched.

pub mod source;

use crate::{
    renderer::{CodeContainer, CodeRenderer},
    schedule::ScheduledTask,
    token::Token,
};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::{
    sync::watch,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

pub use self::source::{FetchError, FileSecretSource, HttpSecretSource, SecretSource, Source};

/// What the site currently publishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    pub current_token: Option<Token>,
    /// Time of the last successful fetch, changed or not.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

pub struct TokenPublisher<S> {
    source: S,
    renderer: CodeRenderer,
    container: CodeContainer,
    state: watch::Sender<TokenState>,
}

impl<S: SecretSource> TokenPublisher<S> {
    #[must_use]
    pub fn new(source: S, renderer: CodeRenderer, container: CodeContainer) -> Self {
        let (state, _rx) = watch::channel(TokenState::default());

        Self {
            source,
            renderer,
            container,
            state,
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TokenState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn container(&self) -> &CodeContainer {
        &self.container
    }

    /// Read the secret source and return the trimmed token.
    ///
    /// # Errors
    /// Returns `FetchError` if the source cannot be read or holds only whitespace.
    pub async fn refresh_once(&self) -> Result<Token, FetchError> {
        let raw = self.source.read().await?;

        Token::parse(&raw).ok_or(FetchError::Empty)
    }

    /// Record a freshly fetched token, rendering it if it differs from the
    /// current one. Returns `true` when the token changed.
    pub fn publish(&self, token: Token) -> bool {
        let now = Utc::now();
        let mut changed = false;

        self.state.send_modify(|state| {
            state.last_fetched_at = Some(now);
            if state.current_token.as_ref() != Some(&token) {
                state.current_token = Some(token.clone());
                changed = true;
            }
        });

        if changed {
            info!(token = %token.redacted(), "Publishing new token");

            // A render failure is shown in the container; polling goes on.
            if let Err(e) = self.renderer.render(&self.container, &token) {
                warn!("Token published without a code: {e}");
            }
        }

        changed
    }

    /// One poll tick: fetch, then publish on change.
    ///
    /// # Errors
    /// Returns `FetchError` if the fetch failed; state is left unchanged.
    pub async fn tick(&self) -> Result<bool, FetchError> {
        let token = self.refresh_once().await?;

        Ok(self.publish(token))
    }

    /// Poll every `period`, starting immediately.
    pub fn start_polling(self, period: Duration) -> PollingHandle {
        let state = self.subscribe();
        let period = if period.is_zero() {
            Duration::from_secs(1)
        } else {
            period
        };

        let task = ScheduledTask::spawn("token-publisher", async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match self.tick().await {
                    Ok(true) => {}
                    Ok(false) => debug!("token unchanged"),
                    Err(e) => warn!("Failed to fetch token, retrying in {:?}: {e}", period),
                }
            }
        });

        PollingHandle { task, state }
    }
}

/// Control handle returned by [`TokenPublisher::start_polling`].
#[derive(Debug)]
pub struct PollingHandle {
    task: ScheduledTask,
    state: watch::Receiver<TokenState>,
}

impl PollingHandle {
    /// A handle with nothing behind it; `stop` is a no-op.
    #[must_use]
    pub fn idle() -> Self {
        let (_tx, state) = watch::channel(TokenState::default());

        Self {
            task: ScheduledTask::idle("token-publisher"),
            state,
        }
    }

    /// Cancel polling, including a pending timer or fetch. Idempotent.
    pub fn stop(&mut self) {
        self.task.stop();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    #[must_use]
    pub fn state(&self) -> TokenState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn current_token(&self) -> Option<Token> {
        self.state.borrow().current_token.clone()
    }

    #[must_use]
    pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().last_fetched_at
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TokenState> {
        self.state.clone()
    }
}
