use std::path::PathBuf;
use thiserror::Error;

use crate::search::SearchScope;

/// Errors produced by the navigation core.
///
/// Access, enumeration and validation conditions are normally absorbed by the
/// services (they surface as `None`, empty listings or events). Only
/// persistence failures of explicit mutations reach the caller as `Err`.
#[derive(Error, Debug)]
pub enum NavError {
    /// No live grant covers the path; recoverable by prompting.
    #[error("access denied: {0}")]
    AccessDenied(PathBuf),
    /// Reading a directory failed; recoverable by retry or re-grant.
    #[error("failed to enumerate {path}: {source}")]
    EnumerationFailed {
        /// Directory that failed to enumerate.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A persisted token no longer validates.
    #[error("stale grant for {0}")]
    StaleGrant(PathBuf),
    /// Informational: a group shrank during validation.
    #[error("group {name} lost {removed} item(s) during validation")]
    ValidationPruned {
        /// Group display name.
        name: String,
        /// Number of pruned items.
        removed: usize,
    },
    /// Durable storage failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Document encode/decode failure.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Errors returned by persistence collaborators.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored bytes could not be decoded.
    #[error("corrupt store {name}: {message}")]
    Corrupt {
        /// Store file or key name.
        name: String,
        /// Human-readable decode failure.
        message: String,
    },
}

/// Runtime configuration for a [`Navigator`](crate::Navigator) session.
///
/// Plain data with builder-style setters; every field has a sensible default.
#[derive(Clone, Debug)]
pub struct NavigatorConfig {
    /// Application-private directory holding `grants.json` and `groups.json`.
    pub data_dir: PathBuf,
    /// The user's home root; global search requires a grant covering it.
    pub home_dir: PathBuf,
    /// Show dot-prefixed entries in listings.
    pub show_hidden: bool,
    /// Lower-case directory extensions presented as opaque packages.
    pub package_extensions: Vec<String>,
    /// Hard cap on accumulated global search results.
    pub search_result_cap: usize,
    /// Index scopes handed to the global search collaborator.
    pub search_scopes: Vec<SearchScope>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        let home_dir = home_dir().unwrap_or_else(|| PathBuf::from("/"));
        Self {
            data_dir: home_dir.join(".local/share").join(APP_DIR_NAME),
            home_dir,
            show_hidden: false,
            package_extensions: ["app", "bundle", "framework", "pkg", "photoslibrary"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            search_result_cap: 5_000,
            search_scopes: vec![SearchScope::Local, SearchScope::Network, SearchScope::UserHome],
        }
    }
}

const APP_DIR_NAME: &str = "file-nav";

impl NavigatorConfig {
    /// Builds a config from the process environment.
    ///
    /// `XDG_DATA_HOME` wins over `$HOME/.local/share` for the data directory.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
            cfg.data_dir = PathBuf::from(xdg).join(APP_DIR_NAME);
        }
        cfg
    }

    /// Set the data directory.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
    /// Set the home root used for the global search probe.
    pub fn home_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.home_dir = dir.into();
        self
    }
    /// Show hidden entries in listings.
    pub fn show_hidden(mut self, yes: bool) -> Self {
        self.show_hidden = yes;
        self
    }
    /// Replace the package extension list. Extensions are lower-cased and
    /// should be given without a leading dot.
    pub fn package_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.package_extensions = exts
            .into_iter()
            .map(|s| s.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }
    /// Set the global search result cap (at least 1).
    pub fn search_result_cap(mut self, cap: usize) -> Self {
        self.search_result_cap = cap.max(1);
        self
    }
    /// Replace the scopes handed to the search index.
    pub fn search_scopes(mut self, scopes: impl IntoIterator<Item = SearchScope>) -> Self {
        self.search_scopes = scopes.into_iter().collect();
        self
    }
}

pub(crate) fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
}
