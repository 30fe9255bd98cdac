use crate::{
    cli::actions::{Action, scan, site, verify},
    minter::MinterConfig,
    publisher::Source,
    renderer::CodeOptions,
    verification::VerifierConfig,
};
use anyhow::{Context, Result, anyhow};
use reqwest::Method;
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Turn parsed arguments into a typed [`Action`].
///
/// # Errors
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("site", sub_m)) => site_action(sub_m),
        Some(("scan", sub_m)) => Ok(Action::Scan(scan::Args {
            verifier: verifier_config(sub_m)?,
        })),
        Some(("verify", sub_m)) => Ok(Action::Verify(verify::Args {
            token: sub_m
                .get_one::<String>("token")
                .cloned()
                .context("missing required argument: <token>")?,
            verifier: verifier_config(sub_m)?,
        })),
        _ => Err(anyhow!("missing subcommand")),
    }
}

fn site_action(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let location = matches
        .get_one::<String>("secret-source")
        .context("missing required argument: --secret-source")?;
    let source = Source::parse(location).context("invalid QRGUARD_SECRET_SOURCE")?;

    let poll_interval = Duration::from_millis(
        matches
            .get_one::<u64>("poll-interval")
            .copied()
            .unwrap_or(10_000),
    );

    let options = CodeOptions {
        size: matches.get_one::<u32>("code-size").copied().unwrap_or(256),
        quiet_zone: !matches.get_flag("no-margin"),
        ..CodeOptions::default()
    };

    let minter = match matches.get_one::<String>("mint-url") {
        Some(url) => Some(site::MintArgs {
            config: MinterConfig {
                verifier_url: Url::parse(url).context("invalid QRGUARD_MINT_URL")?,
                domain: matches
                    .get_one::<String>("mint-domain")
                    .cloned()
                    .context("missing required argument: --mint-domain")?,
                ttl_seconds: matches.get_one::<u64>("mint-ttl").copied(),
                secret_file: matches
                    .get_one::<String>("secret-file")
                    .map_or_else(|| PathBuf::from("secret.txt"), PathBuf::from),
            },
            interval: Duration::from_secs(
                matches.get_one::<u64>("mint-interval").copied().unwrap_or(10),
            ),
        }),
        None => None,
    };

    Ok(Action::Site(site::Args {
        port,
        source,
        poll_interval,
        options,
        minter,
    }))
}

fn verifier_config(matches: &clap::ArgMatches) -> Result<VerifierConfig> {
    let url = matches
        .get_one::<String>("verifier-url")
        .context("missing required argument: --verifier-url")?;
    let url = Url::parse(url).context("invalid QRGUARD_VERIFIER_URL")?;

    let caller_id = matches
        .get_one::<String>("caller-id")
        .cloned()
        .context("missing required argument: --caller-id")?;

    let method = matches
        .get_one::<String>("verifier-method")
        .map_or(Ok(Method::POST), |m| Method::from_bytes(m.as_bytes()))
        .context("invalid QRGUARD_VERIFIER_METHOD")?;

    let timeout = Duration::from_millis(
        matches
            .get_one::<u64>("verifier-timeout")
            .copied()
            .unwrap_or(10_000),
    );

    Ok(VerifierConfig::new(url, SecretString::from(caller_id))
        .with_method(method)
        .with_timeout(timeout))
}
