use crate::{
    cli::actions::shutdown_signal,
    minter::{Minter, MinterConfig},
    publisher::{Source, TokenPublisher},
    renderer::{CodeContainer, CodeOptions, CodeRenderer, QrSvgEncoder},
    schedule::ScheduledTask,
    site::{self, SiteState},
};
use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub source: Source,
    pub poll_interval: Duration,
    pub options: CodeOptions,
    pub minter: Option<MintArgs>,
}

#[derive(Debug)]
pub struct MintArgs {
    pub config: MinterConfig,
    pub interval: Duration,
}

/// Run the minter (if configured), the publisher and the HTTP server until Ctrl-C.
/// # Errors
/// Returns an error if the renderer options are invalid or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    let renderer = CodeRenderer::new(Arc::new(QrSvgEncoder), args.options)?;
    let container = CodeContainer::new();

    let mut minter = match args.minter {
        Some(mint) => {
            info!(
                domain = %mint.config.domain,
                path = %mint.config.secret_file.display(),
                "Minting tokens every {:?}",
                mint.interval
            );
            Minter::new(mint.config)?.start(mint.interval)
        }
        None => ScheduledTask::idle("token-minter"),
    };

    info!(source = %args.source.describe(), "Polling secret every {:?}", args.poll_interval);

    let publisher = TokenPublisher::new(args.source, renderer, container.clone());
    let state = SiteState::new(container, publisher.subscribe());
    let mut polling = publisher.start_polling(args.poll_interval);

    let served = site::serve(args.port, state, shutdown_signal()).await;

    polling.stop();
    minter.stop();

    served
}
