use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RfscopeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Search tool unavailable: {0}")]
    Unavailable(String),

    #[error("{tool} did not finish within {after:?}")]
    Timeout { tool: String, after: Duration },

    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Search process exited with {}: {stderr}", describe_code(.code))]
    ProcessExit { code: Option<i32>, stderr: String },

    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to load asset '{id}': {reason}")]
    AssetLoad { id: String, reason: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("An unexpected error occurred: {0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

impl RfscopeError {
    /// Errors after which the orchestrator should try the fallback strategy.
    pub fn is_strategy_failure(&self) -> bool {
        matches!(
            self,
            RfscopeError::Unavailable(_)
                | RfscopeError::Timeout { .. }
                | RfscopeError::ProcessExit { .. }
                | RfscopeError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RfscopeError>;
