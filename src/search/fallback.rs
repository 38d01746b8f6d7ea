//! In-process scanner used when the external tool is missing or fails.
use super::{SearchMatch, SearchQuery, SearchResultSet, SearchStrategy};
use crate::config::SearchSettings;
use crate::error::{Result, RfscopeError};
use crate::metrics::Metrics;
use crate::walker::{enumerate_files, WalkOptions};
use async_trait::async_trait;
use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

enum ScanOutcome {
    Found(SearchMatch),
    NoMatch,
    Skipped,
}

pub struct FallbackScanStrategy {
    max_candidates: usize,
    batch_size: usize,
    concurrency: usize,
    max_line_length: usize,
    metrics: Arc<Metrics>,
}

impl Default for FallbackScanStrategy {
    fn default() -> Self {
        Self::new(&SearchSettings::default())
    }
}

impl FallbackScanStrategy {
    pub fn new(settings: &SearchSettings) -> Self {
        Self {
            max_candidates: settings.max_candidates,
            batch_size: settings.batch_size.max(1),
            concurrency: settings.concurrency.max(1),
            max_line_length: settings.max_line_length,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    async fn candidates(&self, query: &SearchQuery) -> Result<Vec<PathBuf>> {
        let roots = query.scope_paths.clone();
        let options = WalkOptions {
            include_globs: query.include_globs.clone(),
            exclude_globs: query.exclude_globs.clone(),
            include_hidden: query.include_hidden,
            limit: self.max_candidates,
        };

        tokio::task::spawn_blocking(move || enumerate_files(&roots, &options))
            .await
            .map_err(|e| RfscopeError::Other(format!("file enumeration panicked: {e}")))?
    }
}

#[async_trait]
impl SearchStrategy for FallbackScanStrategy {
    fn name(&self) -> &'static str {
        "scan"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResultSet> {
        let regex = Arc::new(
            RegexBuilder::new(&regex::escape(&query.pattern))
                .case_insensitive(true)
                .build()?,
        );
        let max_size = query.max_file_size_bytes();
        let files = self.candidates(query).await?;
        debug!("Scanning {} candidate files", files.len());

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut matches: Vec<SearchMatch> = Vec::new();

        for batch in files.chunks(self.batch_size) {
            if matches.len() >= query.max_results {
                break;
            }

            let found = Arc::new(AtomicUsize::new(matches.len()));
            let mut workers = JoinSet::new();

            for (index, path) in batch.iter().enumerate() {
                if found.load(Ordering::Relaxed) >= query.max_results {
                    break;
                }
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| RfscopeError::Other(e.to_string()))?;

                let path = path.clone();
                let regex = Arc::clone(&regex);
                let found = Arc::clone(&found);
                let max_line_length = self.max_line_length;
                workers.spawn(async move {
                    let _permit = permit;
                    let outcome = scan_file(path, &regex, max_size, max_line_length).await;
                    if matches!(outcome, ScanOutcome::Found(_)) {
                        found.fetch_add(1, Ordering::Relaxed);
                    }
                    (index, outcome)
                });
            }

            let mut batch_matches = Vec::new();
            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok((index, ScanOutcome::Found(found))) => {
                        self.metrics.files_scanned.inc();
                        batch_matches.push((index, found));
                    }
                    Ok((_, ScanOutcome::NoMatch)) => self.metrics.files_scanned.inc(),
                    Ok((_, ScanOutcome::Skipped)) => self.metrics.files_skipped.inc(),
                    Err(e) => warn!("Scan task failed: {e}"),
                }
            }

            batch_matches.sort_by_key(|(index, _)| *index);
            for (_, found) in batch_matches {
                if matches.len() >= query.max_results {
                    break;
                }
                matches.push(found);
            }
        }

        self.metrics.matches_found.inc_by(matches.len() as u64);
        Ok(SearchResultSet::from_matches(&query.pattern, matches))
    }
}

async fn scan_file(
    path: PathBuf,
    regex: &Regex,
    max_size: u64,
    max_line_length: usize,
) -> ScanOutcome {
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.len() <= max_size => {}
        _ => return ScanOutcome::Skipped,
    }
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Skipping {}: {}", path.display(), e);
            return ScanOutcome::Skipped;
        }
    };
    let Ok(text) = String::from_utf8(bytes) else {
        return ScanOutcome::Skipped;
    };

    match find_first(&text, regex, max_line_length) {
        Some(hit) => ScanOutcome::Found(SearchMatch::raw(path, hit.line, hit.column, hit.text)),
        None => ScanOutcome::NoMatch,
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct LineHit {
    pub line: usize,
    pub column: usize,
    pub text: String,
}

/// First match of `regex` in `text`, located by scanning for the newlines
/// around it. `None` if there is no match or its line is longer than
/// `max_line_length` chars.
pub fn find_first(text: &str, regex: &Regex, max_line_length: usize) -> Option<LineHit> {
    let found = regex.find(text)?;
    let bytes = text.as_bytes();
    let start = found.start();

    let line_start = memchr::memrchr(b'\n', &bytes[..start]).map_or(0, |i| i + 1);
    let line_end = memchr::memchr(b'\n', &bytes[start..]).map_or(bytes.len(), |i| start + i);
    let line = text[line_start..line_end].trim_end_matches('\r');
    if line.chars().count() > max_line_length {
        return None;
    }

    Some(LineHit {
        line: memchr::memchr_iter(b'\n', &bytes[..line_start]).count() + 1,
        column: text[line_start..start].chars().count() + 1,
        text: line.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn literal(pattern: &str) -> Regex {
        RegexBuilder::new(&regex::escape(pattern))
            .case_insensitive(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_find_first_positions() {
        let text = "alpha\r\nbeta\n  gamma TODO\n";
        let hit = find_first(text, &literal("todo"), 500).unwrap();
        assert_eq!(
            hit,
            LineHit {
                line: 3,
                column: 9,
                text: "  gamma TODO".to_string()
            }
        );
    }

    #[test]
    fn test_find_first_escapes_regex_metacharacters() {
        let hit = find_first("let x = a.b(c);", &literal("a.b("), 500).unwrap();
        assert_eq!(hit.column, 9);
        assert!(find_first("axb(", &literal("a.b("), 500).is_none());
    }

    #[test]
    fn test_long_line_is_skipped() {
        let text = format!("{} needle", "x".repeat(600));
        assert!(find_first(&text, &literal("needle"), 500).is_none());
    }

    #[tokio::test]
    async fn test_scan_respects_order_and_caps() {
        let dir = TempDir::new().unwrap();
        for name in ["a.txt", "b.txt", "c.txt", "d.txt"] {
            fs::write(dir.path().join(name), format!("first\nfind me in {name}\n")).unwrap();
        }
        fs::write(dir.path().join("e.bin"), [0xff, 0xfe, b'f', b'i', b'n', b'd']).unwrap();

        let settings = SearchSettings {
            batch_size: 2,
            ..SearchSettings::default()
        };
        let strategy = FallbackScanStrategy::new(&settings);
        let query = SearchQuery::new("FIND ME", vec![dir.path().to_path_buf()]).with_max_results(3);

        let results = strategy.search(&query).await.unwrap();
        let files: Vec<_> = results
            .matches
            .iter()
            .map(|m| m.file.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files, vec!["a.txt", "b.txt", "c.txt"]);
        assert!(results.matches.iter().all(|m| m.line == 2 && m.column == 1));
    }

    #[tokio::test]
    async fn test_scan_skips_oversized_and_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.txt"), format!("needle{}", "x".repeat(4096))).unwrap();
        fs::write(dir.path().join("latin1.txt"), [b'n', b'e', b'e', b'd', b'l', b'e', 0xe9]).unwrap();
        fs::write(dir.path().join("ok.txt"), "a needle").unwrap();

        let strategy = FallbackScanStrategy::default();
        let mut query = SearchQuery::new("needle", vec![dir.path().to_path_buf()]);
        query.max_file_size = "1K".to_string();

        let results = strategy.search(&query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results.matches[0].file.ends_with("ok.txt"));
        assert_eq!(results.matches[0].column, 3);
    }
}
