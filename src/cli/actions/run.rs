use crate::cli::actions::{Action, scan, site, verify};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Site(args) => site::execute(args).await,
        Action::Scan(args) => scan::execute(args).await,
        Action::Verify(args) => verify::execute(args).await,
    }
}
