//! Argument list for the external search tool.
use crate::error::{Result, RfscopeError};
use std::path::PathBuf;

const BASE_FLAGS: &[&str] = &["--json", "--fixed-strings", "--ignore-case"];

/// Collects options and emits them as
/// `[query, base flags, option flags, paths]`, whatever order the setters
/// were called in.
///
/// A query starting with `-` is emitted as the single token
/// `--regexp=<query>` so the tool cannot read it as a flag.
#[derive(Debug, Clone, Default)]
pub struct SearchArgumentBuilder {
    query: Option<String>,
    max_columns: Option<usize>,
    max_file_size: Option<String>,
    hidden: bool,
    includes: Vec<String>,
    excludes: Vec<String>,
    paths: Vec<PathBuf>,
}

impl SearchArgumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// If a query was already set.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        assert!(
            self.query.is_none(),
            "SearchArgumentBuilder::query called more than once"
        );
        self.query = Some(query.into());
        self
    }

    pub fn max_columns(mut self, columns: usize) -> Self {
        self.max_columns = Some(columns);
        self
    }

    pub fn max_file_size(mut self, size: impl Into<String>) -> Self {
        self.max_file_size = Some(size.into());
        self
    }

    pub fn exclude<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(globs.into_iter().map(Into::into));
        self
    }

    pub fn include<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(globs.into_iter().map(Into::into));
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<Vec<String>> {
        let query = self
            .query
            .ok_or_else(|| RfscopeError::InvalidArguments("no search query set".to_string()))?;

        let mut args = Vec::with_capacity(BASE_FLAGS.len() + self.paths.len() + 8);
        args.push(query_token(query));
        args.extend(BASE_FLAGS.iter().map(|flag| flag.to_string()));

        if let Some(columns) = self.max_columns {
            args.push("--max-columns".to_string());
            args.push(columns.to_string());
        }
        if let Some(size) = self.max_file_size {
            args.push("--max-filesize".to_string());
            args.push(size);
        }
        if self.hidden {
            args.push("--hidden".to_string());
        }
        for glob in self.includes {
            args.push("--glob".to_string());
            args.push(glob);
        }
        for glob in self.excludes {
            args.push("--glob".to_string());
            args.push(format!("!{glob}"));
        }

        args.extend(
            self.paths
                .iter()
                .map(|path| path.to_string_lossy().into_owned()),
        );
        Ok(args)
    }
}

fn query_token(query: String) -> String {
    if query.starts_with('-') {
        format!("--regexp={query}")
    } else {
        query
    }
}
