use clap::{Arg, Command};

#[must_use]
pub fn command() -> Command {
    Command::new("site")
        .about("Publish the rotating verification code over HTTP")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("QRGUARD_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("secret-source")
                .long("secret-source")
                .help("Where to read the current token: an http(s) URL or a file path")
                .default_value("secret.txt")
                .env("QRGUARD_SECRET_SOURCE"),
        )
        .arg(
            Arg::new("poll-interval")
                .long("poll-interval")
                .help("Milliseconds between secret source reads")
                .default_value("10000")
                .env("QRGUARD_POLL_INTERVAL")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("code-size")
                .long("code-size")
                .help("Minimum width and height of the code in pixels")
                .default_value("256")
                .env("QRGUARD_CODE_SIZE")
                .value_parser(clap::value_parser!(u32).range(64..=4096)),
        )
        .arg(
            Arg::new("no-margin")
                .long("no-margin")
                .help("Render the code without a quiet zone")
                .env("QRGUARD_NO_MARGIN")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("mint-url")
                .long("mint-url")
                .help("Verifier base URL; when set, tokens are minted into --secret-file")
                .env("QRGUARD_MINT_URL")
                .requires("mint-domain"),
        )
        .arg(
            Arg::new("mint-domain")
                .long("mint-domain")
                .help("Domain embedded in minted tokens")
                .env("QRGUARD_MINT_DOMAIN"),
        )
        .arg(
            Arg::new("mint-ttl")
                .long("mint-ttl")
                .help("Lifetime of minted tokens in seconds")
                .env("QRGUARD_MINT_TTL")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("mint-interval")
                .long("mint-interval")
                .help("Seconds between minted tokens")
                .default_value("10")
                .env("QRGUARD_MINT_INTERVAL")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("secret-file")
                .long("secret-file")
                .help("File the minter writes tokens to")
                .default_value("secret.txt")
                .env("QRGUARD_SECRET_FILE"),
        )
}
