//! Repository URL → backend session.
//!
//! Only the in-memory backend is available: `file://<history>.json` opens a
//! JSON history and an optional `#sub/path` fragment selects the exported
//! tree. Other schemes are rejected.

use revdump_core::{DumpError, DumpResult, SessionConfig};
use revdump_engine::MemoryRepository;
use std::path::Path;
use tracing::debug;

const FILE_SCHEME: &str = "file://";

/// Split a history URL into the history file and the path below the root.
pub fn split_url(url: &str) -> DumpResult<(&str, &str)> {
    let unsupported = || DumpError::UnsupportedUrl {
        url: url.to_string(),
    };
    let rest = url.strip_prefix(FILE_SCHEME).ok_or_else(unsupported)?;
    let (file, sub_path) = rest.split_once('#').unwrap_or((rest, ""));
    if !file.ends_with(".json") {
        return Err(unsupported());
    }
    Ok((file, sub_path.trim_matches('/')))
}

/// Open a session for `config`.
pub fn open_repository(config: &SessionConfig) -> DumpResult<MemoryRepository> {
    let (file, sub_path) = split_url(&config.url)?;
    if config.username.is_some() || config.password.is_some() {
        debug!("credentials are not used by local histories");
    }
    debug!(
        file,
        sub_path,
        non_interactive = config.non_interactive,
        no_auth_cache = config.no_auth_cache,
        "opening repository"
    );
    let repo = MemoryRepository::load(Path::new(file))?;
    Ok(repo.with_url(config.url.clone()).at_path(sub_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use revdump_engine::RepositoryAccess;
    use std::io::Write;

    #[test]
    fn test_split_url() {
        assert_eq!(split_url("file:///data/r.json").unwrap(), ("/data/r.json", ""));
        assert_eq!(
            split_url("file:///data/r.json#/trunk/lib/").unwrap(),
            ("/data/r.json", "trunk/lib")
        );
    }

    #[test]
    fn test_unsupported_urls() {
        for url in ["svn://host/repo", "https://host/repo", "file:///repo", "r.json"] {
            assert!(matches!(
                split_url(url),
                Err(DumpError::UnsupportedUrl { .. })
            ));
        }
    }

    #[test]
    fn test_open_repository() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{ "revisions": [ {{ "changes": [ {{ "action": "add", "path": "trunk", "kind": "dir" }} ] }} ] }}"#
        )
        .unwrap();

        let url = format!("file://{}#trunk", file.path().display());
        let mut repo = open_repository(&SessionConfig::new(url.clone())).unwrap();
        assert_eq!(repo.url(), url);
        assert_eq!(repo.session_path(), "trunk");
        assert_eq!(repo.latest_revision().unwrap(), 1);
    }

    #[test]
    fn test_open_missing_file() {
        let config = SessionConfig::new("file:///definitely/not/here.json");
        assert!(matches!(open_repository(&config), Err(DumpError::Io(_))));
    }
}
