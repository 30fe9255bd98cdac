use crate::verification::{VerificationClient, VerifierConfig};
use anyhow::{Result, anyhow};

#[derive(Debug)]
pub struct Args {
    pub token: String,
    pub verifier: VerifierConfig,
}

/// Submit a single token and print the result as JSON.
/// # Errors
/// Returns an error if the client cannot be built or the token is not valid.
pub async fn execute(args: Args) -> Result<()> {
    let client = VerificationClient::new(args.verifier)?;
    let result = client.submit(args.token.trim()).await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.valid {
        Ok(())
    } else {
        Err(anyhow!("verification failed"))
    }
}
