//! CLI tool to filter, map and reduce lines of text with inline expressions.
//!
//! Usage:
//!   linepipe -f '$.includes("ERROR")' -m 'R.split(" ")' app.log
//!   seq 1 10 | linepipe -r sum

use clap::{CommandFactory, Parser};
use linepipe::{PipelineSpec, Source, run};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Process lines from files or stdin with filter, map and reduce expressions.
///
/// `$` is the current line, `i` its index and `R` a library of curried
/// helpers. A bare `R.fn` is applied to the line.
#[derive(Parser)]
#[command(name = "linepipe", version)]
struct Cli {
    /// Drop empty and whitespace-only lines before filtering
    #[arg(short, long)]
    ignore: bool,

    /// Print results as JSON (one pretty document after --reduce)
    #[arg(short, long)]
    json: bool,

    /// Keep lines for which EXPR is truthy
    #[arg(short, long, value_name = "EXPR")]
    filter: Option<String>,

    /// Replace each line with the result of EXPR
    #[arg(short, long, value_name = "EXPR")]
    map: Option<String>,

    /// length, min, max, sum, avg, concat, or an expression over acc, $ and i
    #[arg(short, long, value_name = "FUNC|EXPR")]
    reduce: Option<String>,

    /// Log pipeline shape and line counts on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Input files, read in order as one stream (default: stdin)
    files: Vec<PathBuf>,
}

impl Cli {
    fn pipeline_spec(&self) -> PipelineSpec {
        PipelineSpec {
            ignore_blank: self.ignore,
            filter: self.filter.clone(),
            map: self.map.clone(),
            reduce: self.reduce.clone(),
            json: self.json,
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let spec = cli.pipeline_spec();
    if !spec.has_actions() {
        return match Cli::command().print_help() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("linepipe: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let sources = Source::from_paths(&cli.files);
    debug!(sources = sources.len(), "starting");

    let stdout = io::stdout();
    match run(&spec, sources, BufWriter::new(stdout.lock())) {
        Ok(summary) => {
            debug!(?summary, "done");
            ExitCode::SUCCESS
        }
        Err(e) if e.is_broken_pipe() => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("linepipe: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
