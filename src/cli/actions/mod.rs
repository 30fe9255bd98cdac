pub mod scan;
pub mod site;
pub mod verify;

// The match over every action lives in `run`.
mod run;

#[derive(Debug)]
pub enum Action {
    Site(site::Args),
    Scan(scan::Args),
    Verify(verify::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}

/// Resolve on Ctrl-C. A failure to install the handler is logged and
/// treated as never resolving.
pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
