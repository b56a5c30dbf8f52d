use camino::Utf8PathBuf;
use clap::builder::NonEmptyStringValueParser;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, ValueEnum};

use crate::config::DEFAULT_USERNAME;

const EXAMPLE: &str = "Example: odfdr-installer --url api.cluster.example.com:6443 --password abc --rhceph-password user:xyz";

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(flatten)]
    pub install: InstallArgs,
}

#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    /// OpenShift API URL (e.g. api.cluster.example.com:6443)
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub url: String,

    /// OpenShift username
    #[arg(long, default_value = DEFAULT_USERNAME)]
    pub username: String,

    /// OpenShift password
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub password: String,

    /// RHCEPH repository credential, passed to `oc registry login --auth-basic`
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub rhceph_password: String,

    /// Directory receiving the kubeconfig, pull-secret and manifest files of the run
    #[arg(long, default_value = ".")]
    pub work_dir: Utf8PathBuf,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,

    /// Do not run, just show what would be done
    #[arg(long)]
    pub dry_run: bool,
}

/// Represents log levels for controlling the verbosity of logging output.
///
/// Maps directly to the levels of the `tracing` crate. `--log-level debug`
/// also shows every `oc` invocation (with secrets redacted).
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// What to print when the command line is rejected.
///
/// The clap error is followed by the usage line and an example invocation.
pub fn usage_message(err: &clap::Error) -> String {
    let mut cmd = Cli::command();
    format!(
        "{}\n{}\n{}",
        err.render().to_string().trim_end(),
        cmd.render_usage(),
        EXAMPLE
    )
}

/// Parses the process arguments.
///
/// `--help` and `--version` behave as usual. Any other parse failure prints
/// [`usage_message`] to stdout and exits with status 1.
pub fn parse_args() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            println!("{}", usage_message(&e));
            std::process::exit(1);
        }
    }
}
