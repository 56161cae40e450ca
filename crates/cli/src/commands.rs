//! Argument definitions for the `revdump` binary.

use clap::{Arg, ArgAction, Command};

/// Build the top-level command.
pub fn build_cli() -> Command {
    Command::new("revdump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Dump the history of a remote repository tree")
        .override_usage("revdump [options] <URL>")
        .arg(
            Arg::new("url")
                .value_name("URL")
                .help("Repository URL, optionally pointing below the repository root"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Be quiet"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Print extra progress"),
        )
        .arg(
            Arg::new("username")
                .short('u')
                .long("username")
                .value_name("NAME")
                .help("User name"),
        )
        .arg(
            Arg::new("password")
                .short('p')
                .long("password")
                .value_name("PASSWORD")
                .help("Password"),
        )
        .arg(
            Arg::new("revision")
                .short('r')
                .long("revision")
                .value_name("REV")
                .help("Revision number or range: N, N:M, HEAD"),
        )
        .arg(
            Arg::new("deltas")
                .long("deltas")
                .action(ArgAction::SetTrue)
                .help("Use deltas in dump output"),
        )
        .arg(
            Arg::new("incremental")
                .long("incremental")
                .action(ArgAction::SetTrue)
                .help("Dump incrementally"),
        )
        .arg(
            Arg::new("no-auth-cache")
                .long("no-auth-cache")
                .action(ArgAction::SetTrue)
                .help("Do not cache authentication tokens"),
        )
        .arg(
            Arg::new("non-interactive")
                .long("non-interactive")
                .action(ArgAction::SetTrue)
                .help("Do no interactive prompting"),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .value_name("PREFIX")
                .help("Prepend PREFIX to every dumped path"),
        )
        .arg(
            Arg::new("keep-revnums")
                .long("keep-revnums")
                .action(ArgAction::SetTrue)
                .help("Write source revision numbers instead of sequential ones"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .value_name("FILE")
                .help("Write the dump to FILE instead of standard output"),
        )
        // Deprecated options, accepted with a warning
        .arg(
            Arg::new("stop")
                .long("stop")
                .value_name("REV")
                .hide(true),
        )
        .arg(
            Arg::new("online")
                .long("online")
                .action(ArgAction::SetTrue)
                .hide(true),
        )
        .arg(
            Arg::new("dump-uuid")
                .long("dump-uuid")
                .action(ArgAction::SetTrue)
                .hide(true),
        )
        .arg(
            Arg::new("download-dir")
                .short('d')
                .long("download-dir")
                .value_name("DIR")
                .hide(true),
        )
        .arg(
            Arg::new("no-check-certificate")
                .long("no-check-certificate")
                .action(ArgAction::SetTrue)
                .hide(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = build_cli().try_get_matches_from(["revdump", "-q", "-v", "file:///r.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_deprecated_options_are_hidden() {
        let help = build_cli().render_help().to_string();
        assert!(help.contains("--keep-revnums"));
        assert!(!help.contains("--stop"));
        assert!(!help.contains("--download-dir"));
    }
}
