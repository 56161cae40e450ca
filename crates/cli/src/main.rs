//! revdump: dump the history of a repository tree.
//!
//! `revdump [options] <URL>` writes a dump stream of the tree at URL to
//! standard output (or `--outfile`). Progress and diagnostics go to stderr.

mod commands;
mod connect;
mod parse;

use std::fs::File;
use std::io::{self, BufWriter};
use std::process;

use revdump_core::{DumpError, DumpResult, OutputTarget};
use revdump_engine::{DumpSummary, Dumper};
use tracing::info;

use commands::build_cli;
use parse::{matches_to_invocation, Invocation, Verbosity};

fn init_tracing(verbosity: Verbosity) {
    // --quiet   → "off"
    // --verbose → RUST_LOG if set, otherwise "debug"
    // default   → per-revision progress from the revdump crates
    let filter = match verbosity {
        Verbosity::Quiet => tracing_subscriber::EnvFilter::new("off"),
        Verbosity::Verbose => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "debug".into()),
        Verbosity::Normal => tracing_subscriber::EnvFilter::new("revdump_engine=info,revdump=info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let matches = build_cli().get_matches();

    let invocation = match matches_to_invocation(&matches) {
        Ok(invocation) => invocation,
        Err(DumpError::MissingUrl) => {
            eprintln!("{}", build_cli().render_usage());
            process::exit(1);
        }
        Err(e) => {
            eprintln!("revdump: {}", e);
            process::exit(1);
        }
    };

    init_tracing(invocation.verbosity);
    if invocation.verbosity != Verbosity::Quiet {
        for warning in &invocation.warnings {
            eprintln!("revdump: warning: {}", warning);
        }
    }

    match run(invocation) {
        Ok(_) => process::exit(0),
        Err(e) => {
            eprintln!("revdump: {}", e);
            process::exit(1);
        }
    }
}

fn run(invocation: Invocation) -> DumpResult<DumpSummary> {
    // Removed with all spool files when dropped
    let scratch = tempfile::Builder::new().prefix("revdump").tempdir()?;
    let options = invocation.options.scratch_dir(scratch.path());
    let mut repo = connect::open_repository(&invocation.session)?;

    let output = options.output.clone();
    let mut dumper = Dumper::new(&mut repo, options);
    let summary = match output {
        OutputTarget::Stdout => dumper.run(BufWriter::new(io::stdout().lock()))?,
        OutputTarget::File(path) => dumper.run(BufWriter::new(File::create(path)?))?,
    };

    info!(
        revisions = summary.revisions_dumped,
        first = ?summary.first,
        last = ?summary.last,
        bytes = summary.bytes_written,
        "Dump complete"
    );
    Ok(summary)
}
