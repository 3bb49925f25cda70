//! Property resources: local files and URLs
//!
//! URL loading needs the `http` feature. `file:` URLs are read from disk.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorKind, LoadErrorKind, Result};
use crate::properties::Properties;

/// A location properties can be loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// A file on the local filesystem
    File(PathBuf),
    /// A `http`, `https` or `file` URL
    Url(String),
}

impl Resource {
    /// Create a file resource
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Resource::File(path.into())
    }

    /// Create a URL resource, rejecting malformed URLs
    pub fn url(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        validate_url(&url)?;
        Ok(Resource::Url(url))
    }

    /// Check whether the resource can be opened.
    ///
    /// Files and `file:` URLs must name an existing regular file. Remote
    /// URLs are not fetched here; a failed request surfaces when reading.
    pub fn can_be_opened(&self) -> bool {
        match self {
            Resource::File(path) => path.is_file(),
            Resource::Url(url) => local_path(url).map_or(true, |path| path.is_file()),
        }
    }

    /// Read the whole resource as text.
    ///
    /// A resource that does not exist yields a `ResourceNotFound` error,
    /// a failed HTTP request an `HttpError`.
    pub fn read_to_string(&self) -> Result<String> {
        match self {
            Resource::File(path) => read_file(path, &self.to_string()),
            Resource::Url(url) => fetch_url(url),
        }
    }

    /// Read and parse the resource
    pub fn load(&self) -> Result<Properties> {
        let text = self.read_to_string()?;
        Properties::parse(&text).map_err(|mut e| {
            if let Some(loc) = e.source_location.as_mut() {
                loc.file = self.to_string();
            }
            e
        })
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::File(path) => write!(f, "File: {}", path.display()),
            Resource::Url(url) => write!(f, "URL {}", url),
        }
    }
}

/// Whether `err` means the resource is simply not there
pub fn is_missing(err: &Error) -> bool {
    matches!(
        err.kind,
        ErrorKind::Load(LoadErrorKind::ResourceNotFound { .. })
            | ErrorKind::Load(LoadErrorKind::HttpError { .. })
    )
}

fn read_file(path: &Path, display: &str) -> Result<String> {
    if !path.exists() {
        return Err(Error::resource_not_found(display));
    }
    std::fs::read_to_string(path).map_err(|e| {
        Error::io(path.display().to_string(), &e)
            .with_help(format!("Error reading properties from {}", display))
    })
}

#[cfg(feature = "http")]
fn validate_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).map_err(|e| Error::invalid_url(raw, e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" | "file" => Ok(()),
        other => Err(Error::invalid_url(
            raw,
            format!("Unsupported URL scheme '{}'", other),
        )),
    }
}

#[cfg(not(feature = "http"))]
fn validate_url(raw: &str) -> Result<()> {
    if raw.contains("://") || raw.starts_with("file:") {
        Ok(())
    } else {
        Err(Error::invalid_url(raw, "missing URL scheme"))
    }
}

/// Local path named by a `file:` URL
#[cfg(feature = "http")]
fn local_path(raw: &str) -> Option<PathBuf> {
    url::Url::parse(raw)
        .ok()
        .filter(|u| u.scheme() == "file")
        .and_then(|u| u.to_file_path().ok())
}

#[cfg(not(feature = "http"))]
fn local_path(raw: &str) -> Option<PathBuf> {
    raw.strip_prefix("file://").map(PathBuf::from)
}

#[cfg(feature = "http")]
fn fetch_url(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw).map_err(|e| Error::invalid_url(raw, e.to_string()))?;

    if parsed.scheme() == "file" {
        let path = local_path(raw).ok_or_else(|| Error::invalid_url(raw, "not a local file path"))?;
        return read_file(&path, &format!("URL {}", raw));
    }

    log::trace!("Fetching properties from {}", raw);
    let response = ureq::get(raw).call().map_err(|e| match &e {
        ureq::Error::StatusCode(code) => {
            Error::http_request_failed(raw, Some(*code), format!("HTTP {}", code))
        }
        ureq::Error::Io(io_err) => {
            Error::http_request_failed(raw, None, format!("Connection error: {}", io_err))
        }
        _ => Error::http_request_failed(raw, None, e.to_string()),
    })?;

    response
        .into_body()
        .read_to_string()
        .map_err(|e| Error::http_request_failed(raw, None, e.to_string()))
}

#[cfg(not(feature = "http"))]
fn fetch_url(raw: &str) -> Result<String> {
    if let Some(path) = local_path(raw) {
        return read_file(&path, &format!("URL {}", raw));
    }
    Err(Error::http_disabled())
}
