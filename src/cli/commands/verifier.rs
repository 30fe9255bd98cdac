use clap::{Arg, Command};

/// Flags describing how to reach the verifier's submit endpoint.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("verifier-url")
                .long("verifier-url")
                .help("Verifier submit endpoint, example: http://verifier:9090/verify-token")
                .env("QRGUARD_VERIFIER_URL")
                .required(true),
        )
        .arg(
            Arg::new("verifier-method")
                .long("verifier-method")
                .help("HTTP method used to submit tokens")
                .default_value("POST")
                .env("QRGUARD_VERIFIER_METHOD")
                .value_parser(["POST", "PUT"]),
        )
        .arg(
            Arg::new("verifier-timeout")
                .long("verifier-timeout")
                .help("Submission timeout in milliseconds")
                .default_value("10000")
                .env("QRGUARD_VERIFIER_TIMEOUT")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("caller-id")
                .long("caller-id")
                .help("Caller identity sent in the X-User-ID header")
                .env("QRGUARD_CALLER_ID")
                .required(true),
        )
}
