use std::{fmt::Display, time::Duration};

use hyper::{http::uri::InvalidUri, StatusCode};
use tokio::time::error::Elapsed;
use tracing::{error, warn};

/// Struct to represent when the library encounters an error,
///
#[derive(Debug)]
pub struct Error {
    category: ErrorCategory,
}

/// Error returned when the metadata service answers w/ a non-success status code,
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFetchError {
    /// Status code returned by the server
    ///
    pub status: StatusCode,
    /// Url that was requested
    ///
    pub url: String,
}

impl Display for HttpFetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "http status code: {} while fetching url {}",
            self.status.as_u16(),
            self.url
        )
    }
}

impl std::error::Error for HttpFetchError {}

impl Error {
    /// There was insuffecient data to complete a process
    ///
    pub fn invalid_operation(reason: &'static str) -> Self {
        error!("Error while executing an operation, reason: {reason}");
        Error {
            category: ErrorCategory::InvalidOperation(reason),
        }
    }

    /// Returns an error that indicates the server responded w/ a non-success status code,
    ///
    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Error {
            category: ErrorCategory::HttpStatus(HttpFetchError {
                status,
                url: url.into(),
            }),
        }
    }

    /// Returns an error that indicates the request did not complete in time,
    ///
    pub fn timeout(duration: Duration, url: impl Into<String>, source: Elapsed) -> Self {
        let url = url.into();
        warn!("Request to {url} did not complete within {duration:?}");
        Error {
            category: ErrorCategory::Timeout {
                duration,
                url,
                source,
            },
        }
    }

    /// Returns an error that indicates a data-format issue, the raw body is kept for diagnosis,
    ///
    pub fn data_format(body: impl Into<String>, source: serde_json::Error) -> Self {
        Error {
            category: ErrorCategory::DataFormat {
                body: body.into(),
                source,
            },
        }
    }

    /// Returns the status error if the server responded w/ a non-success status code,
    ///
    pub fn http_fetch_error(&self) -> Option<&HttpFetchError> {
        match &self.category {
            ErrorCategory::HttpStatus(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the underlying transport error if the request could not be made,
    ///
    /// A request that exceeds its timeout is not a hyper error, check `is_timeout()` instead.
    ///
    pub fn transport(&self) -> Option<&hyper::Error> {
        match &self.category {
            ErrorCategory::Transport(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the raw body that could not be parsed,
    ///
    pub fn body(&self) -> Option<&str> {
        match &self.category {
            ErrorCategory::DataFormat { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    /// Returns true if the request exceeded its timeout,
    ///
    pub fn is_timeout(&self) -> bool {
        matches!(self.category, ErrorCategory::Timeout { .. })
    }

    /// Returns true if a host pattern could not be compiled,
    ///
    pub fn is_invalid_pattern(&self) -> bool {
        matches!(self.category, ErrorCategory::InvalidPattern(_))
    }
}

#[derive(Debug)]
enum ErrorCategory {
    Transport(hyper::Error),
    Timeout {
        duration: Duration,
        url: String,
        source: Elapsed,
    },
    HttpStatus(HttpFetchError),
    DataFormat { body: String, source: serde_json::Error },
    InvalidPattern(glob::PatternError),
    InvalidUri(InvalidUri),
    SystemEnvironment(std::io::Error),
    InvalidOperation(&'static str),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.category {
            ErrorCategory::Transport(err) => Some(err),
            ErrorCategory::HttpStatus(err) => Some(err),
            ErrorCategory::DataFormat { source, .. } => Some(source),
            ErrorCategory::InvalidPattern(err) => Some(err),
            ErrorCategory::InvalidUri(err) => Some(err),
            ErrorCategory::SystemEnvironment(err) => Some(err),
            ErrorCategory::Timeout { source, .. } => Some(source),
            ErrorCategory::InvalidOperation(_) => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.category {
            ErrorCategory::Transport(err) => {
                write!(f, "while querying metadata endpoint: {err}")
            }
            ErrorCategory::Timeout { duration, url, .. } => {
                write!(f, "timed out after {duration:?} while fetching url {url}")
            }
            ErrorCategory::HttpStatus(err) => {
                write!(f, "while querying metadata endpoint: {err}")
            }
            ErrorCategory::DataFormat { body, source } => {
                write!(f, "while parsing json blob {body}: {source}")
            }
            ErrorCategory::InvalidPattern(err) => write!(f, "invalid host pattern, {err}"),
            ErrorCategory::InvalidUri(err) => write!(f, "invalid uri, {err}"),
            ErrorCategory::SystemEnvironment(err) => write!(f, "system i/o error, {err}"),
            ErrorCategory::InvalidOperation(reason) => write!(f, "invalid operation, {reason}"),
        }
    }
}

impl From<InvalidUri> for Error {
    fn from(value: InvalidUri) -> Self {
        error!("Error parsing uri, {value}");
        Self {
            category: ErrorCategory::InvalidUri(value),
        }
    }
}

impl From<hyper::Error> for Error {
    fn from(value: hyper::Error) -> Self {
        error!("Error making http request, {value}");
        Self {
            category: ErrorCategory::Transport(value),
        }
    }
}

impl From<hyper::http::Error> for Error {
    fn from(value: hyper::http::Error) -> Self {
        error!("Error building http request, {value}");
        Self::invalid_operation("could not build the metadata request")
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        error!("Error w/ system i/o, {value}");
        Self {
            category: ErrorCategory::SystemEnvironment(value),
        }
    }
}

impl From<glob::PatternError> for Error {
    fn from(value: glob::PatternError) -> Self {
        error!("Error compiling host pattern, {value}");
        Self {
            category: ErrorCategory::InvalidPattern(value),
        }
    }
}
