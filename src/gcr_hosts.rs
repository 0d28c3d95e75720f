use std::sync::OnceLock;

use glob::{MatchOptions, Pattern};
use tracing::trace;

use crate::Error;

/// Hosts that serve Google Container Registry,
///
/// Parts of a host can be a glob, for example `*.gcr.io` matches `foo.gcr.io` and `bar.gcr.io`.
///
pub const GCR_HOST_PATTERNS: [&str; 3] = ["container.cloud.google.com", "gcr.io", "*.gcr.io"];

/// Shell glob semantics, `*` stops at a path separator and matching is case-sensitive
///
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Ordered set of compiled host patterns,
///
#[derive(Debug, Clone)]
pub struct GcrHosts {
    patterns: Vec<Pattern>,
}

impl GcrHosts {
    /// Compiles patterns, returns an error on the first pattern that is not a valid glob
    ///
    pub fn new<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<Self, Error> {
        let patterns = patterns
            .into_iter()
            .map(Pattern::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Compiles patterns, skipping any that are not valid globs
    ///
    pub fn lenient<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Self {
        let patterns = patterns
            .into_iter()
            .filter_map(|pattern| match Pattern::new(pattern) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    trace!(pattern, "Skipping invalid host pattern, {err}");
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    /// Returns true if host matches any pattern,
    ///
    pub fn is_container_registry_host(&self, host: impl AsRef<str>) -> bool {
        let host = host.as_ref();

        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(host, MATCH_OPTIONS))
    }

    /// Returns the compiled patterns in order,
    ///
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Pattern::as_str)
    }
}

impl Default for GcrHosts {
    fn default() -> Self {
        Self::lenient(GCR_HOST_PATTERNS)
    }
}

/// Returns true if GCR credentials should be used for host,
///
pub fn is_container_registry_host(host: impl AsRef<str>) -> bool {
    gcr_hosts().is_container_registry_host(host)
}

/// Default host set, compiled on first use
///
fn gcr_hosts() -> &'static GcrHosts {
    static GCR_HOSTS: OnceLock<GcrHosts> = OnceLock::new();

    GCR_HOSTS.get_or_init(GcrHosts::default)
}
