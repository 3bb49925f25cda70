//! Error types for propconf
//!
//! Errors are structured: a kind, the property key or resource involved,
//! an optional source location, and an actionable help message.

use std::fmt;

/// Result type alias for propconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for propconf operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Property key (or output path) the error relates to
    pub path: Option<String>,
    /// Source location (file, line) if available
    pub source_location: Option<SourceLocation>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Location in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed `.properties` content
    Parse,
    /// Error while loading a resource
    Load(LoadErrorKind),
    /// Circular property definition detected
    CircularReference,
    /// Output target cannot be written
    InvalidOutput,
    /// I/O error
    Io,
    /// Internal error (bug in propconf)
    Internal,
}

/// Specific loading error categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadErrorKind {
    /// File or URL could not be opened
    ResourceNotFound { resource: String },
    /// URL could not be parsed
    InvalidUrl { url: String },
    /// HTTP request failed
    HttpError { url: String, status: Option<u16> },
    /// URL loading is disabled
    HttpDisabled,
    /// Ant path pattern is empty or malformed
    InvalidPattern { pattern: String },
}

impl Error {
    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            path: None,
            source_location: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create a circular definition error.
    ///
    /// `chain` lists the keys in the order they were visited, ending with
    /// the key that closed the cycle.
    pub fn circular_reference(key: impl Into<String>, chain: Vec<String>) -> Self {
        let chain_str = chain.join(" --> ");
        Self {
            kind: ErrorKind::CircularReference,
            path: Some(key.into()),
            source_location: None,
            help: Some("Break the circular definition by removing one of the references".into()),
            cause: Some(format!("Chain: {}", chain_str)),
        }
    }

    /// Create a resource not found error
    pub fn resource_not_found(resource: impl Into<String>) -> Self {
        let res = resource.into();
        Self {
            kind: ErrorKind::Load(LoadErrorKind::ResourceNotFound {
                resource: res.clone(),
            }),
            path: None,
            source_location: None,
            help: Some(format!(
                "Check that {} exists, or enable quiet mode to skip missing resources",
                res
            )),
            cause: None,
        }
    }

    /// Create an invalid URL error
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Load(LoadErrorKind::InvalidUrl { url: url.into() }),
            path: None,
            source_location: None,
            help: Some("Use an absolute URL such as https://host/app.properties".into()),
            cause: Some(message.into()),
        }
    }

    /// Create an HTTP request failed error
    pub fn http_request_failed(
        url: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        let url_str = url.into();
        Self {
            kind: ErrorKind::Load(LoadErrorKind::HttpError {
                url: url_str.clone(),
                status,
            }),
            path: None,
            source_location: None,
            help: Some(format!(
                "Check that the URL '{}' is accessible and returns properties content",
                url_str
            )),
            cause: Some(message.into()),
        }
    }

    /// Create an HTTP disabled error
    pub fn http_disabled() -> Self {
        Self {
            kind: ErrorKind::Load(LoadErrorKind::HttpDisabled),
            path: None,
            source_location: None,
            help: Some("Build with the 'http' feature to load http(s) URLs".into()),
            cause: None,
        }
    }

    /// Create an invalid ant pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Load(LoadErrorKind::InvalidPattern {
                pattern: pattern.into(),
            }),
            path: None,
            source_location: None,
            help: Some("Provide an ant path pattern such as /etc/app/**/*.properties".into()),
            cause: Some(message.into()),
        }
    }

    /// Create an invalid output target error
    pub fn invalid_output(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidOutput,
            path: Some(path.into()),
            source_location: None,
            help: Some("The output must be a file path, not a directory".into()),
            cause: Some(message.into()),
        }
    }

    /// Create an I/O error
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self {
            kind: ErrorKind::Io,
            path: Some(path.into()),
            source_location: None,
            help: None,
            cause: Some(err.to_string()),
        }
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add source location to the error
    pub fn with_source_location(mut self, loc: SourceLocation) -> Self {
        self.source_location = Some(loc);
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Create an internal error (bug in propconf)
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            path: None,
            source_location: None,
            help: Some("This is likely a bug in propconf. Please report it.".into()),
            cause: Some(message.into()),
        }
    }

    /// Whether this error is a circular definition
    pub fn is_circular(&self) -> bool {
        self.kind == ErrorKind::CircularReference
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Parse => write!(f, "Parse error")?,
            ErrorKind::Load(l) => match l {
                LoadErrorKind::ResourceNotFound { resource } => {
                    write!(f, "Properties could not be loaded from {}", resource)?
                }
                LoadErrorKind::InvalidUrl { url } => write!(f, "Badly formed URL: {}", url)?,
                LoadErrorKind::HttpError { url, status } => {
                    write!(f, "HTTP request failed: {}", url)?;
                    if let Some(s) = status {
                        write!(f, " (status {})", s)?;
                    }
                }
                LoadErrorKind::HttpDisabled => write!(f, "URL loading is disabled")?,
                LoadErrorKind::InvalidPattern { pattern } => {
                    write!(f, "Invalid ant path pattern: '{}'", pattern)?
                }
            },
            ErrorKind::CircularReference => write!(f, "Circular property definition detected")?,
            ErrorKind::InvalidOutput => write!(f, "Invalid output file")?,
            ErrorKind::Io => write!(f, "I/O error")?,
            ErrorKind::Internal => write!(f, "Internal error")?,
        }

        if let Some(path) = &self.path {
            write!(f, "\n  Key: {}", path)?;
        }

        if let Some(loc) = &self.source_location {
            write!(f, "\n  File: {}", loc.file)?;
            if let Some(line) = loc.line {
                write!(f, ":{}", line)?;
            }
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
