//! Dump configuration
//!
//! [`DumpOptions`] configures one export run and [`SessionConfig`] carries
//! the settings handed to the repository access layer. Both are built with
//! `Default` plus consuming builder methods and are not mutated afterwards;
//! the orchestrator resolves `HEAD` and auto-detected bounds into its own
//! run state.

use crate::error::{DumpError, DumpResult};
use crate::types::Revnum;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Token naming the latest revision
pub const HEAD_TOKEN: &str = "HEAD";

/// One side of a revision range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevSpec {
    /// Explicit revision number
    Number(Revnum),
    /// Latest revision touching the export path
    Head,
}

impl RevSpec {
    fn parse_side(side: &str, whole: &str) -> DumpResult<Self> {
        if side == HEAD_TOKEN {
            return Ok(RevSpec::Head);
        }
        side.parse::<Revnum>()
            .map(RevSpec::Number)
            .map_err(|_| DumpError::InvalidRevisionRange {
                spec: whole.to_string(),
            })
    }

    /// Explicit number, if any
    pub fn number(&self) -> Option<Revnum> {
        match self {
            RevSpec::Number(n) => Some(*n),
            RevSpec::Head => None,
        }
    }
}

impl fmt::Display for RevSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevSpec::Number(n) => write!(f, "{}", n),
            RevSpec::Head => f.write_str(HEAD_TOKEN),
        }
    }
}

/// Requested revision range `[start, end]`
///
/// A missing start means "auto-detect the first revision touching the path".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionRange {
    /// First revision, `None` when not given
    pub start: Option<RevSpec>,
    /// Last revision
    pub end: RevSpec,
}

impl Default for RevisionRange {
    fn default() -> Self {
        RevisionRange {
            start: None,
            end: RevSpec::Head,
        }
    }
}

impl RevisionRange {
    /// Range with both ends given
    pub fn new(start: RevSpec, end: RevSpec) -> Self {
        RevisionRange {
            start: Some(start),
            end,
        }
    }

    /// Range covering a single revision
    pub fn single(rev: Revnum) -> Self {
        Self::new(RevSpec::Number(rev), RevSpec::Number(rev))
    }

    /// Range from revision 0 through `end`
    pub fn up_to(end: Revnum) -> Self {
        Self::new(RevSpec::Number(0), RevSpec::Number(end))
    }

    /// Parse `N`, `N:M`, `HEAD`, `N:HEAD` or `HEAD:HEAD`
    ///
    /// Both sides of a range must be present and an explicit start may not
    /// exceed an explicit end.
    pub fn parse(spec: &str) -> DumpResult<Self> {
        let invalid = || DumpError::InvalidRevisionRange {
            spec: spec.to_string(),
        };

        match spec.split_once(':') {
            None => match RevSpec::parse_side(spec, spec)? {
                RevSpec::Head => Ok(Self::new(RevSpec::Head, RevSpec::Head)),
                RevSpec::Number(n) => Ok(Self::single(n)),
            },
            Some((start, end)) => {
                if start.is_empty() || end.is_empty() {
                    return Err(invalid());
                }
                let start = RevSpec::parse_side(start, spec)?;
                let end = RevSpec::parse_side(end, spec)?;
                if let (RevSpec::Number(s), RevSpec::Number(e)) = (start, end) {
                    if s > e {
                        return Err(invalid());
                    }
                }
                Ok(Self::new(start, end))
            }
        }
    }
}

impl FromStr for RevisionRange {
    type Err = DumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Where the dump stream goes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputTarget {
    /// Standard output
    #[default]
    Stdout,
    /// A file, created or truncated
    File(PathBuf),
}

/// Options for one export run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOptions {
    /// Requested revision range
    pub range: RevisionRange,
    /// Output destination
    pub output: OutputTarget,
    /// Assume the loader already has the state before the start revision
    pub incremental: bool,
    /// Write source revision numbers instead of sequential ones
    pub keep_revnums: bool,
    /// Write delta-encoded file bodies (format version 3)
    pub use_deltas: bool,
    /// String prepended verbatim to every node path
    pub user_prefix: Option<String>,
    /// Directory for buffering file content
    pub scratch_dir: PathBuf,
}

impl Default for DumpOptions {
    fn default() -> Self {
        DumpOptions {
            range: RevisionRange::default(),
            output: OutputTarget::Stdout,
            incremental: false,
            keep_revnums: false,
            use_deltas: false,
            user_prefix: None,
            scratch_dir: std::env::temp_dir(),
        }
    }
}

impl DumpOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the revision range
    pub fn range(mut self, range: RevisionRange) -> Self {
        self.range = range;
        self
    }

    /// Set the output destination
    pub fn output(mut self, output: OutputTarget) -> Self {
        self.output = output;
        self
    }

    /// Enable or disable incremental mode
    pub fn incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Keep source revision numbers in the output
    pub fn keep_revnums(mut self, keep: bool) -> Self {
        self.keep_revnums = keep;
        self
    }

    /// Write delta-encoded bodies
    pub fn use_deltas(mut self, deltas: bool) -> Self {
        self.use_deltas = deltas;
        self
    }

    /// Prepend `prefix` to every node path
    pub fn user_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_prefix = Some(prefix.into());
        self
    }

    /// Set the scratch directory
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Dump format version implied by the options
    pub fn format_version(&self) -> u32 {
        if self.use_deltas {
            3
        } else {
            2
        }
    }
}

/// Settings for the repository access session
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Repository URL
    pub url: String,
    /// User name for authentication
    pub username: Option<String>,
    /// Password for authentication
    pub password: Option<String>,
    /// Never prompt for credentials
    pub non_interactive: bool,
    /// Do not cache credentials
    pub no_auth_cache: bool,
}

impl SessionConfig {
    /// Create a session configuration for a URL
    pub fn new(url: impl Into<String>) -> Self {
        SessionConfig {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("non_interactive", &self.non_interactive)
            .field("no_auth_cache", &self.no_auth_cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_number() {
        let range = RevisionRange::parse("42").unwrap();
        assert_eq!(range, RevisionRange::single(42));
    }

    #[test]
    fn test_parse_head() {
        let range = RevisionRange::parse("HEAD").unwrap();
        assert_eq!(range.start, Some(RevSpec::Head));
        assert_eq!(range.end, RevSpec::Head);
    }

    #[test]
    fn test_parse_ranges() {
        assert_eq!(
            RevisionRange::parse("5:8").unwrap(),
            RevisionRange::new(RevSpec::Number(5), RevSpec::Number(8))
        );
        assert_eq!(
            RevisionRange::parse("3:HEAD").unwrap(),
            RevisionRange::new(RevSpec::Number(3), RevSpec::Head)
        );
        assert_eq!(
            RevisionRange::parse("HEAD:HEAD").unwrap(),
            RevisionRange::new(RevSpec::Head, RevSpec::Head)
        );
        assert_eq!(
            RevisionRange::parse("4:4").unwrap(),
            RevisionRange::single(4)
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for spec in ["", ":", "5:", ":5", "abc", "5:x", "8:5", "-1", "1:2:3", "head"] {
            let err = RevisionRange::parse(spec).unwrap_err();
            assert!(
                matches!(err, DumpError::InvalidRevisionRange { .. }),
                "expected rejection of {:?}",
                spec
            );
        }
    }

    #[test]
    fn test_from_str() {
        let range: RevisionRange = "1:2".parse().unwrap();
        assert_eq!(range.end, RevSpec::Number(2));
    }

    #[test]
    fn test_default_range_is_auto() {
        let range = RevisionRange::default();
        assert_eq!(range.start, None);
        assert_eq!(range.end, RevSpec::Head);
    }

    #[test]
    fn test_format_version() {
        assert_eq!(DumpOptions::new().format_version(), 2);
        assert_eq!(DumpOptions::new().use_deltas(true).format_version(), 3);
    }

    #[test]
    fn test_builder() {
        let opts = DumpOptions::new()
            .range(RevisionRange::up_to(9))
            .incremental(true)
            .keep_revnums(true)
            .user_prefix("vendor/")
            .scratch_dir("/tmp/x");

        assert_eq!(opts.range.start, Some(RevSpec::Number(0)));
        assert!(opts.incremental);
        assert!(opts.keep_revnums);
        assert_eq!(opts.user_prefix.as_deref(), Some("vendor/"));
        assert_eq!(opts.scratch_dir, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_session_config_redacts_password() {
        let mut cfg = SessionConfig::new("file:///tmp/h.json");
        cfg.password = Some("hunter2".to_string());
        let debug = format!("{:?}", cfg);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
