//! Rewriting of container paths that run through deployed archives.
//!
//! A container may report a location such as
//! `/deploy/app.ear/web.war/WEB-INF/classes` where `app.ear` is a real file
//! on disk and everything after it lives inside that archive. The rewrite
//! finds the physical archive and turns every later deployable boundary into
//! an explicit `!` nesting marker.

use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::{VfsError, VfsResult};
use crate::locator::{percent_decode, Locator};

static DEPLOYABLE_BOUNDARY: OnceLock<Regex> = OnceLock::new();

fn deployable_boundary() -> &'static Regex {
    DEPLOYABLE_BOUNDARY.get_or_init(|| Regex::new(r"\.[ehjprsw]ar/").expect("valid regex"))
}

/// Rewrite a container path into a synthetic `zip:` locator.
///
/// The first boundary (left to right) whose prefix is an existing regular
/// file is the physical archive. `/srv/app.ear/web.war/WEB-INF/classes`
/// becomes `zip:/srv/app.ear!/web.war!/WEB-INF/classes`.
///
/// # Errors
///
/// [`VfsError::AmbiguousArchivePath`] if no boundary prefix is a file.
pub fn rewrite_nested_archive_path(path: &str) -> VfsResult<Locator> {
    for boundary in deployable_boundary().find_iter(path) {
        let archive = &path[..boundary.end() - 1];
        if !Path::new(&percent_decode(archive)).is_file() {
            continue;
        }

        let rest = &path[boundary.end()..];
        let nested = deployable_boundary().replace_all(rest, |caps: &Captures| {
            format!("{}!/", &caps[0][..caps[0].len() - 1])
        });

        let rewritten = if nested.is_empty() {
            archive.to_string()
        } else {
            format!("{}!/{}", archive, nested)
        };
        return Ok(Locator::new("zip", rewritten));
    }

    Err(VfsError::AmbiguousArchivePath {
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn slash(path: &Path) -> String {
        path.to_string_lossy().replace('\\', "/")
    }

    #[test]
    fn test_rewrites_nested_war_inside_ear() {
        let temp = TempDir::new().unwrap();
        let ear = temp.path().join("app.ear");
        fs::write(&ear, b"ear").unwrap();

        let input = format!("{}/web.war/WEB-INF/classes", slash(&ear));
        let locator = rewrite_nested_archive_path(&input).unwrap();

        assert_eq!(locator.scheme(), "zip");
        assert_eq!(
            locator.path(),
            format!("{}!/web.war!/WEB-INF/classes", slash(&ear))
        );

        let chain = locator.archive_chain().unwrap();
        assert_eq!(chain.archive, ear);
        assert_eq!(chain.nested, vec!["web.war".to_string()]);
        assert_eq!(chain.entry.as_deref(), Some("WEB-INF/classes"));
    }

    #[test]
    fn test_archive_root_without_inner_path() {
        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("lib.jar");
        fs::write(&jar, b"jar").unwrap();

        let locator = rewrite_nested_archive_path(&format!("{}/", slash(&jar))).unwrap();
        assert_eq!(locator.path(), slash(&jar));
    }

    #[test]
    fn test_skips_boundary_that_is_a_directory() {
        let temp = TempDir::new().unwrap();
        let exploded = temp.path().join("tools.jar");
        fs::create_dir_all(&exploded).unwrap();
        let ear = exploded.join("app.ear");
        fs::write(&ear, b"ear").unwrap();

        let input = format!("{}/lib/util.jar/", slash(&ear));
        let locator = rewrite_nested_archive_path(&input).unwrap();
        assert_eq!(locator.path(), format!("{}!/lib/util.jar!/", slash(&ear)));
    }

    #[test]
    fn test_no_verified_boundary_is_ambiguous() {
        let temp = TempDir::new().unwrap();
        let input = format!("{}/missing.war/WEB-INF/classes", slash(temp.path()));

        let err = rewrite_nested_archive_path(&input).unwrap_err();
        assert!(matches!(err, VfsError::AmbiguousArchivePath { ref path } if *path == input));
        assert!(err.is_fatal());
    }
}
