#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode};
use std::env;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "salvage: move items from old game profiles into gifts for a live server",
    long_about = None
)]
struct Cli {
    /// Enable debug logging for salvage.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (overrides SALVAGE_FORMAT).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }

    fn default_filter(&self) -> &'static str {
        if self.verbose || env::var("DEBUG").is_ok() {
            "salvage=debug,salvage_core=debug,info"
        } else if self.quiet {
            "warn"
        } else {
            "salvage=info,salvage_core=info,warn"
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Migrate every profile",
        long_about = "Reconcile every exported profile, enqueue one gift per profile, and write the residual profiles.",
        after_help = "EXAMPLES:\n    # Migrate with ./salvage.toml or defaults\n    salvage run\n\n    # Preview without writing anything\n    salvage run --dry-run\n\n    # Point at explicit inputs\n    salvage run --profiles old/ --templates items.json --json"
    )]
    Run(cmd::run::RunArgs),

    #[command(
        about = "Show what a run would do to one profile",
        long_about = "Reconcile one exported profile in memory and list every item's verdict and every splice.",
        after_help = "EXAMPLES:\n    # Inspect one profile\n    salvage plan oldProfile/alice.json\n\n    # Emit machine-readable output\n    salvage plan oldProfile/alice.json --json"
    )]
    Plan(cmd::plan::PlanArgs),

    #[command(
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    salvage completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

/// Logs go to stderr so stdout stays clean for reports.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_env("SALVAGE_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));

    let format = env::var("SALVAGE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.default_filter());

    let output = cli.output_mode();

    let result = match cli.command {
        Commands::Run(ref args) => cmd::run::run_run(args, output).map(|report| {
            if report.has_failures() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }),
        Commands::Plan(ref args) => cmd::plan::run_plan(args, output).map(|()| ExitCode::SUCCESS),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command).map(|()| ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(error = %format!("{err:#}"), "command failed");
            let _ = output::render_error(output, &CliError::from_anyhow(&err));
            ExitCode::from(2)
        }
    }
}
