mod logging;
mod site;
mod verifier;

pub use self::logging::validator_log_level;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let scan = verifier::with_args(
        Command::new("scan")
            .about("Read decoded payloads from stdin, one per line, and verify them"),
    );

    let verify = verifier::with_args(
        Command::new("verify").about("Submit one token and print the result").arg(
            Arg::new("token")
                .help("Token to verify")
                .required(true),
        ),
    );

    let command = Command::new("qrguard")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(site::command())
        .subcommand(scan)
        .subcommand(verify);

    logging::with_args(command)
}
