//! rfscope: workspace content search with ripgrep-first dispatch, an
//! in-process fallback scanner, bounded content caches and a chunked,
//! scroll-driven preview renderer.
pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod grammar;
pub mod metrics;
pub mod search;
pub mod tui;
pub mod view;
pub mod walker;

pub use app::RfscopeApp;
pub use config::Config;
pub use error::{Result, RfscopeError};
pub use search::{
    FallbackScanStrategy, ProcessSearchStrategy, SearchMatch, SearchOrchestrator, SearchQuery,
    SearchResultSet, SearchStrategy,
};
