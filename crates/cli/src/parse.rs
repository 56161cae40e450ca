//! ArgMatches → run configuration.
//!
//! Produces the [`SessionConfig`] handed to the repository backend, the
//! [`DumpOptions`] for the export, the log verbosity and any warnings about
//! deprecated options.

use clap::ArgMatches;
use revdump_core::{DumpError, DumpOptions, DumpResult, OutputTarget, RevSpec, RevisionRange, SessionConfig};

/// How much progress output the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// No log output
    Quiet,
    /// Per-revision progress
    Normal,
    /// Debug output
    Verbose,
}

/// Everything the binary needs to run one export.
#[derive(Debug)]
pub struct Invocation {
    pub session: SessionConfig,
    pub options: DumpOptions,
    pub verbosity: Verbosity,
    pub warnings: Vec<String>,
}

fn string(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.get_one::<String>(id).cloned()
}

/// `--stop N` used to mean `-r 0:N`.
fn stop_range(value: &str) -> DumpResult<RevisionRange> {
    let end = match RevisionRange::parse(value)? {
        RevisionRange {
            start: Some(start),
            end,
        } if start == end => end,
        _ => {
            return Err(DumpError::InvalidRevisionRange {
                spec: value.to_string(),
            })
        }
    };
    Ok(RevisionRange::new(RevSpec::Number(0), end))
}

/// Convert clap ArgMatches into an Invocation.
pub fn matches_to_invocation(matches: &ArgMatches) -> DumpResult<Invocation> {
    let mut warnings = Vec::new();
    let mut options = DumpOptions::new()
        .incremental(matches.get_flag("incremental"))
        .keep_revnums(matches.get_flag("keep-revnums"))
        .use_deltas(matches.get_flag("deltas"));

    if let Some(stop) = matches.get_one::<String>("stop") {
        warnings.push(
            "the '--stop' option is deprecated, use '--revision'; dumps of a \
             subdirectory will differ from older versions"
                .to_string(),
        );
        options = options.range(stop_range(stop)?);
    }
    if let Some(rev) = matches.get_one::<String>("revision") {
        options = options.range(RevisionRange::parse(rev)?);
    }
    if let Some(prefix) = string(matches, "prefix") {
        options = options.user_prefix(prefix);
    }
    if let Some(path) = string(matches, "outfile") {
        options = options.output(OutputTarget::File(path.into()));
    }

    for flag in ["online", "dump-uuid"] {
        if matches.get_flag(flag) {
            warnings.push(format!("the '--{}' option is deprecated", flag));
        }
    }
    if matches.get_one::<String>("download-dir").is_some() {
        warnings.push("the '--download-dir' option is deprecated".to_string());
    }
    if matches.get_flag("no-check-certificate") {
        warnings.push("the '--no-check-certificate' option is deprecated and will be ignored".to_string());
    }

    let url = string(matches, "url").ok_or(DumpError::MissingUrl)?;
    let session = SessionConfig {
        url,
        username: string(matches, "username"),
        password: string(matches, "password"),
        non_interactive: matches.get_flag("non-interactive"),
        no_auth_cache: matches.get_flag("no-auth-cache"),
    };

    let verbosity = if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };

    Ok(Invocation {
        session,
        options,
        verbosity,
        warnings,
    })
}
