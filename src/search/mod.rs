//! Workspace search: query/result types, the strategy seam and the
//! orchestrator that picks between the external tool and the in-process scan.
pub mod args;
pub mod fallback;
pub mod ndjson;
pub mod orchestrator;
pub mod process;
pub mod registry;
pub mod timed;

use crate::config::{size_limit_or_default, SearchSettings};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub use args::SearchArgumentBuilder;
pub use fallback::FallbackScanStrategy;
pub use orchestrator::SearchOrchestrator;
pub use process::ProcessSearchStrategy;
pub use registry::StrategyRegistry;
pub use timed::{timed, Timed};

pub const NO_RESULTS: &str = "No results found";
pub const NO_WORKSPACE: &str = "No workspace open";
pub const SEARCH_FAILED: &str = "Error during search";

/// Patterns shorter than this (in chars) are never dispatched.
pub const MIN_PATTERN_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub pattern: String,
    pub scope_paths: Vec<PathBuf>,
    pub max_results: usize,
    pub max_columns: usize,
    /// Size limit in ripgrep notation, e.g. `1M`.
    pub max_file_size: String,
    pub exclude_globs: Vec<String>,
    pub include_globs: Vec<String>,
    pub include_hidden: bool,
}

impl SearchQuery {
    pub fn new(pattern: impl Into<String>, scope_paths: Vec<PathBuf>) -> Self {
        Self::from_settings(pattern, scope_paths, &SearchSettings::default())
    }

    pub fn from_settings(
        pattern: impl Into<String>,
        scope_paths: Vec<PathBuf>,
        settings: &SearchSettings,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            scope_paths,
            max_results: settings.max_results,
            max_columns: settings.max_columns,
            max_file_size: settings.max_file_size.clone(),
            exclude_globs: settings.exclude_patterns.clone(),
            include_globs: settings.include_patterns.clone(),
            include_hidden: !settings.exclude_hidden,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Byte threshold the in-process scanner applies per file.
    pub fn max_file_size_bytes(&self) -> u64 {
        size_limit_or_default(&self.max_file_size)
    }

    pub fn pattern_chars(&self) -> usize {
        self.pattern.chars().count()
    }
}

/// Name of the icon shown next to a result, derived from the file type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IconRef(pub String);

impl IconRef {
    pub fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let name = match ext.as_deref() {
            Some("rs") => "rust",
            Some("py") => "python",
            Some("js" | "mjs" | "cjs" | "jsx") => "javascript",
            Some("ts" | "tsx") => "typescript",
            Some("go") => "go",
            Some("json") => "json",
            Some("toml") => "settings",
            Some("yaml" | "yml") => "settings",
            Some("md" | "markdown") => "markdown",
            Some("sh" | "bash" | "zsh") => "terminal",
            Some("png" | "jpg" | "jpeg" | "gif" | "bmp" | "ico" | "webp" | "svg" | "tiff") => {
                "image"
            }
            _ => "file",
        };
        IconRef(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub file: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in chars.
    pub column: usize,
    pub text: String,
    pub preview: String,
    pub icon: IconRef,
}

impl SearchMatch {
    /// Match as produced by a strategy; `preview` and `icon` are filled in by
    /// the orchestrator.
    pub fn raw(file: PathBuf, line: usize, column: usize, text: String) -> Self {
        Self {
            file,
            line,
            column,
            text,
            preview: String::new(),
            icon: IconRef(String::new()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResultSet {
    pub matches: Vec<SearchMatch>,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl SearchResultSet {
    pub fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Self::default()
        }
    }

    pub fn with_message(query: &str, message: &str) -> Self {
        Self {
            query: query.to_string(),
            message: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn from_matches(query: &str, matches: Vec<SearchMatch>) -> Self {
        Self {
            matches,
            query: query.to_string(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// A way of answering a [`SearchQuery`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn is_available(&self) -> bool;

    async fn search(&self, query: &SearchQuery) -> Result<SearchResultSet>;
}
