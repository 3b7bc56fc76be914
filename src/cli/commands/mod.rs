use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Pure clap command definitions with zero business logic
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("config")
                .default_value("config.yaml")
                .env("DBDIAG_CONFIG")
                .help("Path to the YAML configuration file")
                .long("config")
                .short('c')
                .value_name("PATH")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            Arg::new("db")
                .env("DBDIAG_DB")
                .help("Check only the database with this ID")
                .long("db")
                .short('d')
                .value_name("ID"),
        )
        .arg(
            Arg::new("key-file")
                .env("DB_SECRET_KEY_FILE")
                .help("Read the secret key from a file instead of DB_SECRET_KEY")
                .long("key-file")
                .long_help(
                    "Read the secret key from a file instead of the DB_SECRET_KEY\n\
                    environment variable.\n\n\
                    On Unix the file must not be readable by group or others."
                )
                .short('k')
                .value_name("PATH")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            Arg::new("legacy-obfuscated-key")
                .env("DB_LEGACY_OBFUSCATED_KEY")
                .help("Base64 XOR-obfuscated key, for migrating old deployments")
                .long("legacy-obfuscated-key")
                .long_help(
                    "Base64 encoded key XOR-obfuscated with the configured secret key.\n\n\
                    Only for migrating deployments that stored the key this way.\n\
                    XOR obfuscation provides no cryptographic protection."
                )
                .value_name("B64")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("encrypt")
                .action(ArgAction::SetTrue)
                .help("Encrypt a password read from the terminal or stdin and exit")
                .long("encrypt")
                .conflicts_with_all(["db", "format", "metrics-file", "strict"]),
        )
        .arg(
            Arg::new("timeout")
                .default_value("30")
                .env("DBDIAG_TIMEOUT")
                .help("Deadline in seconds for each database check, at most one day")
                .long("timeout")
                .short('t')
                .value_name("SECS")
                .value_parser(clap::value_parser!(u64).range(1..=86_400)),
        )
        .arg(
            Arg::new("concurrency")
                .default_value("0")
                .env("DBDIAG_CONCURRENCY")
                .help("Maximum checks running at once, 0 for no limit")
                .long("concurrency")
                .value_name("N")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("format")
                .default_value("text")
                .env("DBDIAG_FORMAT")
                .help("Report format")
                .long("format")
                .value_name("FORMAT")
                .value_parser(["text", "json"]),
        )
        .arg(
            Arg::new("metrics-file")
                .env("DBDIAG_METRICS_FILE")
                .help("Write a Prometheus textfile with the run results")
                .long("metrics-file")
                .long_help(
                    "Write the run results in the Prometheus text format, for the\n\
                    node exporter textfile collector.\n\n\
                    Example: /var/lib/node_exporter/textfile/dbdiag.prom"
                )
                .value_name("PATH")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            Arg::new("strict")
                .action(ArgAction::SetTrue)
                .help("Exit with an error if any target fails when checking all databases")
                .long("strict"),
        )
        .arg(
            Arg::new("verbose")
                .action(ArgAction::Count)
                .help("Increase log verbosity, -vv for debug")
                .long("verbose")
                .short('v'),
        )
        .arg(
            Arg::new("quiet")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Only log errors")
                .long("quiet")
                .short('q'),
        )
}
