//! Location model for resource origins.
//!
//! A [`Locator`] identifies a place resources can be found in: a directory, an
//! archive, an entry inside an archive, or a location inside a
//! container-specific virtual filesystem. It is URL-shaped
//! (`scheme:path?query`) without claiming to be a valid URL. Archive locators
//! nest a second scheme inside the path, e.g.
//! `jar:file:/opt/app/lib/core.jar!/META-INF/MANIFEST.MF`.
//!
//! Two locators are equal when their normalized external forms are equal;
//! this is what the scan orchestrator uses to de-duplicate candidates.
//!
//! # Example
//!
//! ```
//! use resource_scanner::locator::Locator;
//!
//! let locator: Locator = "JAR:file:/lib/core.jar!/META-INF/MANIFEST.MF".parse().unwrap();
//! assert_eq!(locator.scheme(), "jar");
//! assert_eq!(locator.path(), "file:/lib/core.jar!/META-INF/MANIFEST.MF");
//! assert!(locator.has_archive_in_path());
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Scheme of plain local filesystem locators.
pub const FILE_SCHEME: &str = "file";

/// Schemes that address an archive (or an entry in it) through a nested locator.
pub const ARCHIVE_SCHEMES: &[&str] = &["jar", "zip", "wsjar"];

/// Extensions recognized as archives when they appear in a locator.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["jar", "zip", "war", "ear"];

/// Extensions that may appear as nested archives inside another archive.
pub const NESTABLE_EXTENSIONS: &[&str] = &["jar", "zip", "war", "ear", "sar", "har", "par", "rar"];

/// Path probed to surface archive-backed locations.
///
/// Every archive on a search path is expected to carry a manifest entry, so
/// probing for it returns one locator per archive.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Errors produced when parsing a locator from its external form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocatorError {
    /// The input has no `scheme:` prefix.
    #[error("locator '{0}' has no scheme")]
    MissingScheme(String),

    /// The scheme contains characters outside `[A-Za-z0-9+.-]`.
    #[error("locator '{input}' has an invalid scheme '{scheme}'")]
    InvalidScheme { input: String, scheme: String },
}

/// An immutable, URL-like location identifier.
#[derive(Debug, Clone)]
pub struct Locator {
    scheme: String,
    path: String,
    query: Option<String>,
}

impl Locator {
    /// Create a locator from a scheme and an opaque path.
    ///
    /// The scheme is lower-cased; the path is kept verbatim.
    pub fn new(scheme: impl AsRef<str>, path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.as_ref().to_ascii_lowercase(),
            path: path.into(),
            query: None,
        }
    }

    /// Parse a locator from its external form.
    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        let (scheme, rest) = input
            .split_once(':')
            .ok_or_else(|| LocatorError::MissingScheme(input.to_string()))?;

        if !is_valid_scheme(scheme) {
            return Err(LocatorError::InvalidScheme {
                input: input.to_string(),
                scheme: scheme.to_string(),
            });
        }

        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (rest, None),
        };

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            path: path.to_string(),
            query,
        })
    }

    /// Create a `file:` locator for a filesystem path.
    ///
    /// Directories get a trailing `/`, matching what a resource lookup for the
    /// empty path reports. The path is percent-encoded so that
    /// [`to_file_path`](Self::to_file_path) returns it unchanged.
    pub fn from_path(path: &Path) -> Self {
        let mut text = percent_encode_path(&path.to_string_lossy().replace('\\', "/"));
        if !text.starts_with('/') {
            text.insert(0, '/');
        }
        if path.is_dir() && !text.ends_with('/') {
            text.push('/');
        }
        Self::new(FILE_SCHEME, text)
    }

    /// Create a `jar:` locator for an entry inside a local archive file.
    pub fn archive_entry(archive: &Path, entry: &str) -> Self {
        let file = Self::from_path(archive);
        Self::new(
            "jar",
            format!("{}!/{}", file.external_form(), entry.trim_start_matches('/')),
        )
    }

    /// The lower-cased scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The scheme-specific path, without the query.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query-like fragment after `?`, if any.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Normalized external string form; the identity of this locator.
    pub fn external_form(&self) -> String {
        match &self.query {
            Some(query) => format!("{}:{}?{}", self.scheme, self.path, query),
            None => format!("{}:{}", self.scheme, self.path),
        }
    }

    /// A copy of this locator with a different scheme.
    pub fn with_scheme(&self, scheme: &str) -> Self {
        Self {
            scheme: scheme.to_ascii_lowercase(),
            path: self.path.clone(),
            query: self.query.clone(),
        }
    }

    /// Whether this is a plain `file:` locator.
    pub fn is_file_scheme(&self) -> bool {
        self.scheme == FILE_SCHEME
    }

    /// Whether this locator uses one of the [`ARCHIVE_SCHEMES`].
    pub fn is_archive_scheme(&self) -> bool {
        ARCHIVE_SCHEMES.contains(&self.scheme.as_str())
    }

    /// Whether the external form names an archive file, optionally followed by
    /// an entry (`…/core.jar` or `…/core.jar!/…`).
    pub fn has_archive_in_path(&self) -> bool {
        archive_in_path_pattern().is_match(&self.external_form())
    }

    /// Whether an archive extension appears anywhere in the external form.
    pub fn contains_archive_marker(&self) -> bool {
        let external = self.external_form().to_ascii_lowercase();
        ARCHIVE_EXTENSIONS
            .iter()
            .any(|ext| external.contains(&format!(".{}", ext)))
    }

    /// Last non-empty `/` segment of the path.
    pub fn file_name(&self) -> Option<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).next_back()
    }

    /// Percent-decoded path as a filesystem path, for `file:` style locators.
    pub fn to_file_path(&self) -> PathBuf {
        PathBuf::from(percent_decode(&self.path))
    }

    /// Locate the local file or directory backing this locator.
    ///
    /// Tries, in order: the decoded path itself, the decoded path cut at the
    /// first archive boundary (`….jar!`), and the raw external form with any
    /// archive schemes stripped (also with `%20` turned into spaces). Returns
    /// `None` when nothing on disk matches.
    pub fn backing_file(&self) -> Option<PathBuf> {
        let decoded = percent_decode(&self.path);

        if self.is_file_scheme() {
            let candidate = PathBuf::from(&decoded);
            if candidate.exists() {
                return Some(candidate);
            }
        }

        let candidate = PathBuf::from(cut_at_archive_boundary(strip_nested_schemes(&decoded)));
        if candidate.exists() {
            return Some(candidate);
        }

        let external = self.external_form();
        let raw = cut_at_archive_boundary(strip_nested_schemes(&external));
        let candidate = PathBuf::from(raw);
        if candidate.exists() {
            return Some(candidate);
        }

        let candidate = PathBuf::from(raw.replace("%20", " "));
        if candidate.exists() {
            return Some(candidate);
        }

        None
    }

    /// Split an archive locator into its outer archive file, the chain of
    /// nested archives inside it, and the trailing entry path.
    ///
    /// `zip:/srv/app.ear!/web.war!/WEB-INF/classes` yields archive
    /// `/srv/app.ear`, nested `["web.war"]`, entry `WEB-INF/classes`.
    pub fn archive_chain(&self) -> Option<ArchiveChain> {
        let decoded = percent_decode(&self.path);
        let inner = strip_nested_schemes(&decoded);
        let mut parts = inner.split('!');

        let archive = parts.next().filter(|s| !s.is_empty())?;
        let mut nested = Vec::new();
        let mut entry = None;

        for part in parts {
            let name = part.trim_start_matches('/');
            if name.is_empty() {
                continue;
            }
            if entry.is_none() && has_nestable_extension(name) {
                nested.push(name.to_string());
            } else {
                entry = Some(match entry {
                    Some(prefix) => format!("{}!{}", prefix, part),
                    None => name.to_string(),
                });
            }
        }

        Some(ArchiveChain {
            archive: PathBuf::from(archive),
            nested,
            entry,
        })
    }
}

/// An archive locator decomposed by [`Locator::archive_chain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveChain {
    /// The physical archive file.
    pub archive: PathBuf,

    /// Entry names of archives nested inside `archive`, outermost first.
    pub nested: Vec<String>,

    /// Entry path after the innermost archive, if any.
    pub entry: Option<String>,
}

impl PartialEq for Locator {
    fn eq(&self, other: &Self) -> bool {
        self.external_form() == other.external_form()
    }
}

impl Eq for Locator {}

impl Hash for Locator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.external_form().hash(state);
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.external_form())
    }
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn archive_in_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\.(jar|zip|war|ear)(!.*|$)").unwrap())
}

fn archive_boundary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\.(jar|zip|war|ear)!").unwrap())
}

/// Whether a name ends in one of the [`NESTABLE_EXTENSIONS`].
pub fn has_nestable_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            NESTABLE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Whether a filesystem path ends in one of the [`ARCHIVE_EXTENSIONS`].
pub fn has_archive_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ARCHIVE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Strip leading archive/file scheme prefixes (`jar:`, `wsjar:`, `zip:`, `file:`).
fn strip_nested_schemes(mut text: &str) -> &str {
    loop {
        let stripped = ["jar:", "wsjar:", "zip:", "file:"]
            .iter()
            .find_map(|prefix| text.strip_prefix(prefix));
        match stripped {
            Some(rest) => text = rest,
            None => return text,
        }
    }
}

/// Cut a path right after the first archive extension followed by `!`.
fn cut_at_archive_boundary(text: &str) -> &str {
    match archive_boundary_pattern().find(text) {
        Some(m) => &text[..m.end() - 1],
        None => text,
    }
}

/// Decode `%XX` escapes; malformed escapes are kept verbatim.
pub fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = hex {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

/// Percent-encode the characters of a filesystem path that would otherwise be
/// read back differently: `%`, space, `?` and `#`.
pub fn percent_encode_path(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' => encoded.push_str("%25"),
            ' ' => encoded.push_str("%20"),
            '?' => encoded.push_str("%3F"),
            '#' => encoded.push_str("%23"),
            _ => encoded.push(c),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_plain_file_locator() {
        let locator = Locator::parse("file:/opt/app/classes/").unwrap();
        assert_eq!(locator.scheme(), "file");
        assert_eq!(locator.path(), "/opt/app/classes/");
        assert_eq!(locator.query(), None);
        assert!(locator.is_file_scheme());
    }

    #[test]
    fn test_parse_splits_query() {
        let locator = Locator::parse("bundle://7.0:1/?fragment=x").unwrap();
        assert_eq!(locator.path(), "//7.0:1/");
        assert_eq!(locator.query(), Some("fragment=x"));
        assert_eq!(locator.external_form(), "bundle://7.0:1/?fragment=x");
    }

    #[test]
    fn test_parse_rejects_missing_scheme() {
        assert_eq!(
            Locator::parse("/no/scheme"),
            Err(LocatorError::MissingScheme("/no/scheme".to_string()))
        );
        assert!(matches!(
            Locator::parse("1ab:/x"),
            Err(LocatorError::InvalidScheme { .. })
        ));
    }

    #[test]
    fn test_equality_uses_normalized_form() {
        let a = Locator::parse("JAR:file:/a.jar!/").unwrap();
        let b = Locator::parse("jar:file:/a.jar!/").unwrap();
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn test_from_path_marks_directories() {
        let temp = TempDir::new().unwrap();
        let dir = Locator::from_path(temp.path());
        assert!(dir.path().ends_with('/'));

        let file_path = temp.path().join("a.txt");
        std::fs::write(&file_path, b"x").unwrap();
        let file = Locator::from_path(&file_path);
        assert!(file.path().ends_with("/a.txt"));
    }

    #[test]
    fn test_archive_detection() {
        let jar = Locator::parse("file:/lib/core.jar").unwrap();
        assert!(jar.has_archive_in_path());

        let entry = Locator::parse("jar:file:/lib/core.jar!/META-INF/MANIFEST.MF").unwrap();
        assert!(entry.has_archive_in_path());
        assert!(entry.is_archive_scheme());

        let dir = Locator::parse("file:/lib/classes/").unwrap();
        assert!(!dir.has_archive_in_path());
        assert!(!dir.contains_archive_marker());

        let streamed = Locator::parse("http://repo/core.jar.download").unwrap();
        assert!(!streamed.has_archive_in_path());
        assert!(streamed.contains_archive_marker());
    }

    #[test]
    fn test_backing_file_cuts_archive_entry() {
        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("core.jar");
        std::fs::write(&jar, b"not really a jar").unwrap();

        let locator = Locator::archive_entry(&jar, MANIFEST_PATH);
        assert_eq!(locator.backing_file(), Some(jar.clone()));

        let missing = Locator::parse("jar:file:/does/not/exist.jar!/x").unwrap();
        assert_eq!(missing.backing_file(), None);
    }

    #[test]
    fn test_backing_file_decodes_spaces() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("with space");
        std::fs::create_dir(&dir).unwrap();

        let encoded = dir.to_string_lossy().replace(' ', "%20");
        let locator = Locator::new(FILE_SCHEME, encoded);
        assert_eq!(locator.backing_file(), Some(dir));
    }

    #[test]
    fn test_archive_chain_nested() {
        let locator = Locator::parse("zip:/srv/app.ear!/web.war!/WEB-INF/classes").unwrap();
        let chain = locator.archive_chain().unwrap();
        assert_eq!(chain.archive, PathBuf::from("/srv/app.ear"));
        assert_eq!(chain.nested, vec!["web.war".to_string()]);
        assert_eq!(chain.entry.as_deref(), Some("WEB-INF/classes"));
    }

    #[test]
    fn test_archive_chain_manifest_entry() {
        let locator = Locator::parse("jar:file:/lib/core.jar!/META-INF/MANIFEST.MF").unwrap();
        let chain = locator.archive_chain().unwrap();
        assert_eq!(chain.archive, PathBuf::from("/lib/core.jar"));
        assert!(chain.nested.is_empty());
        assert_eq!(chain.entry.as_deref(), Some("META-INF/MANIFEST.MF"));
    }

    #[test]
    fn test_file_name() {
        let locator = Locator::parse("vfs:/deploy/app.war/").unwrap();
        assert_eq!(locator.file_name(), Some("app.war"));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("/a%20b/c"), "/a b/c");
        assert_eq!(percent_decode("/bad%2"), "/bad%2");
        assert_eq!(percent_decode("/bad%zz"), "/bad%zz");
        assert_eq!(percent_decode("%41%42"), "AB");
    }

    #[test]
    fn test_from_path_round_trips_escape_like_names() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("build%41out");
        std::fs::create_dir(&dir).unwrap();
        let spaced = temp.path().join("with space?.txt");
        std::fs::write(&spaced, b"x").unwrap();

        let locator = Locator::from_path(&dir);
        assert!(locator.path().contains("build%2541out"));
        assert_eq!(locator.to_file_path(), dir);

        let file = Locator::from_path(&spaced);
        assert_eq!(file.query(), None);
        assert_eq!(file.to_file_path(), spaced);
    }

    #[test]
    fn test_archive_entry_with_escape_like_archive_name() {
        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("lib%20x.jar");
        std::fs::write(&jar, b"j").unwrap();

        let locator = Locator::archive_entry(&jar, MANIFEST_PATH);
        let chain = locator.archive_chain().unwrap();
        assert_eq!(chain.archive, jar);
    }

    proptest! {
        #[test]
        fn test_external_form_reparses_to_equal_locator(
            scheme in "[a-z][a-z0-9+.-]{0,8}",
            path in "[a-zA-Z0-9/!._-]{0,40}",
        ) {
            let locator = Locator::new(&scheme, path);
            let reparsed = Locator::parse(&locator.external_form()).unwrap();
            prop_assert_eq!(reparsed, locator);
        }
    }
}
