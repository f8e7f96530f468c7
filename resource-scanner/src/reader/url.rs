use std::any::Any;
use std::fs::File;
use std::io;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use tracing::debug;

use super::{ReaderError, ReaderResult, ResourceReader};
use crate::locator::Locator;
use crate::vfs::FileReader;

pub const URL_PREFIX: &str = "url:";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

fn is_http(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.starts_with("http:") || lower.starts_with("https:")
}

fn http_get(url: &str) -> reqwest::Result<Response> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()?
        .get(url)
        .send()?
        .error_for_status()
}

/// GET `url` and return the response body as a stream.
pub(crate) fn fetch_url(url: &str) -> io::Result<FileReader> {
    let response = http_get(url).map_err(io::Error::other)?;
    Ok(Box::new(response))
}

/// `url:` prefixed locations and bare `http(s):` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlResourceReader;

impl UrlResourceReader {
    fn strip_prefix(path: &str) -> &str {
        if is_http(path) {
            path
        } else {
            path.split_once(':').map_or(path, |(_, rest)| rest)
        }
    }
}

impl ResourceReader for UrlResourceReader {
    fn name(&self) -> &str {
        "url"
    }

    fn order(&self) -> i64 {
        -20
    }

    fn can_read(&self, path: &str, _context: Option<&dyn Any>) -> bool {
        path.starts_with(URL_PREFIX) || is_http(path)
    }

    fn exists(&self, path: &str, context: Option<&dyn Any>) -> bool {
        self.can_read(path, context) && matches!(self.load(path, context), Ok(Some(_)))
    }

    fn load(&self, path: &str, context: Option<&dyn Any>) -> ReaderResult<Option<FileReader>> {
        if !self.can_read(path, context) {
            return Ok(None);
        }

        let url = Self::strip_prefix(path);
        debug!(url, "Opening url");

        if is_http(url) {
            let response = http_get(url).map_err(|source| ReaderError::Http {
                url: url.to_string(),
                source,
            })?;
            return Ok(Some(Box::new(response)));
        }

        let locator = Locator::parse(url).map_err(|e| ReaderError::Vfs(e.into()))?;
        if !locator.is_file_scheme() {
            return Ok(None);
        }

        let file = File::open(locator.to_file_path()).map_err(|source| ReaderError::Io {
            path: url.to_string(),
            source,
        })?;
        Ok(Some(Box::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_strip_prefix() {
        assert_eq!(
            UrlResourceReader::strip_prefix("url:file:/tmp/a.txt"),
            "file:/tmp/a.txt"
        );
        assert_eq!(
            UrlResourceReader::strip_prefix("HTTP://example.com/a"),
            "HTTP://example.com/a"
        );
    }

    #[test]
    fn test_loads_file_url() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("remote.txt");
        std::fs::write(&file, b"over the wire").unwrap();
        let path = format!("url:{}", Locator::from_path(&file));

        let reader = UrlResourceReader;
        assert!(reader.exists(&path, None));

        let mut content = String::new();
        reader
            .load(&path, None)
            .unwrap()
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "over the wire");
    }

    #[test]
    fn test_missing_file_url_is_error() {
        let reader = UrlResourceReader;
        let path = "url:file:/definitely/not/here.txt";
        assert!(matches!(reader.load(path, None), Err(ReaderError::Io { .. })));
        assert!(!reader.exists(path, None));
    }

    #[test]
    fn test_ignores_other_paths() {
        let reader = UrlResourceReader;
        assert!(!reader.can_read("classpath:a.txt", None));
        assert!(reader.load("/plain/file", None).unwrap().is_none());
    }
}
