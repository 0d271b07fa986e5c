//! Retrieval of named text resources, either remote urls or local files.

use std::fs::read;
use std::io::ErrorKind;
use std::path::PathBuf;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use thiserror::Error;

use crate::report::decode;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{resource} does not exist")]
    NotFound { resource: String },
    #[error("failed to fetch {resource}: status {status}")]
    Status { resource: String, status: u16 },
    #[error("failed to fetch {resource}")]
    Transport { resource: String, source: reqwest::Error },
    #[error("could not read {resource}")]
    Io { resource: String, source: std::io::Error },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

/// Something that can produce the text of a named resource.
///
/// Implementations must be usable from several threads at once, because sheets for different
/// locales are fetched in parallel.
pub trait Fetch: Sync {
    fn fetch_text(&self, resource: &str) -> Result<String, FetchError>;
}

/// Fetches `http://` and `https://` resources over the network and reads anything else from the
/// local filesystem.
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn fetch_url(&self, url: &str) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport { resource: url.to_owned(), source };
        let response = self.client.get(url).send().map_err(transport)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound { resource: url.to_owned() });
        }
        if !status.is_success() {
            return Err(FetchError::Status { resource: url.to_owned(), status: status.as_u16() });
        }
        response.text().map_err(transport)
    }

    fn fetch_file(path: &str) -> Result<String, FetchError> {
        match read(PathBuf::from(path)) {
            Ok(bytes) => Ok(decode(&bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(FetchError::NotFound { resource: path.to_owned() })
            }
            Err(source) => Err(FetchError::Io { resource: path.to_owned(), source }),
        }
    }
}

impl Fetch for Fetcher {
    fn fetch_text(&self, resource: &str) -> Result<String, FetchError> {
        if is_url(resource) {
            self.fetch_url(resource)
        } else {
            Self::fetch_file(resource)
        }
    }
}

pub fn is_url(resource: &str) -> bool {
    resource.starts_with("https://") || resource.starts_with("http://")
}

#[cfg(test)]
mod tests {
    use std::fs::{remove_file, write};

    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://raw.githubusercontent.com/a/b.csv"));
        assert!(!is_url("data/en/Action.csv"));
        assert!(!is_url("C:\\data\\Action.csv"));
    }

    #[test]
    fn test_local_file() {
        let path = std::env::temp_dir().join(format!("raidloca-fetch-{}.txt", std::process::id()));
        write(&path, "\u{feff}0.0 \"--sync--\"\n").unwrap();
        let text = Fetcher::new().fetch_text(&path.to_string_lossy()).unwrap();
        assert_eq!(text, "0.0 \"--sync--\"\n");
        _ = remove_file(&path);
    }

    #[test]
    fn test_missing_local_file() {
        let result = Fetcher::new().fetch_text("surely/not/here.txt");
        assert!(result.is_err_and(|e| e.is_not_found()));
    }
}
