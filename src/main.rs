mod commands;
mod config;
mod error;
mod extractor;
mod loader;
mod report;
mod resolver;
mod types;
mod validate;
mod watch;

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::report::{EXIT_FATAL, OutputFormat};
use crate::validate::Options;

/// Check that every link in a directory of markdown guides resolves.
#[derive(Parser)]
#[command(name = "validate-docs", version, about = "Link-integrity checker for markdown guides")]
struct Cli {
    /// Output format [default: text, or json when CI=true]
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Skip links with a URI scheme instead of classifying them
    #[arg(long)]
    ignore_external: bool,

    /// Worker threads for extraction and resolution [default: available cores]
    #[arg(long, short)]
    jobs: Option<NonZeroUsize>,

    /// Path to the documentation corpus root
    root: PathBuf,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, short)]
    verbose: bool,

    /// Re-run whenever a file under the root changes
    #[arg(long)]
    watch: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format = cli.format.unwrap_or_else(commands::default_format);
    let defaults = Options::default();
    let options = Options {
        ignore_external: cli.ignore_external,
        jobs: cli.jobs.unwrap_or(defaults.jobs),
    };

    let outcome = if cli.watch {
        watch::run(&cli.root, options, format)
    } else {
        commands::check(&cli.root, options, format)
    };

    return match outcome {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(EXIT_FATAL)
        },
    };
}

/// Install a stderr subscriber so log lines never mix with the report on stdout.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_err| return EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
