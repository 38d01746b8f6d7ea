use rfscope::config::SearchSettings;
use rfscope::search::{
    FallbackScanStrategy, ProcessSearchStrategy, SearchOrchestrator, SearchQuery, SearchStrategy,
    NO_RESULTS,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.rs"), "fn main() {}\n// TODO: tidy\n").unwrap();
    fs::write(dir.path().join("b.py"), "import os\n\n\n# todo: remove\n").unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/c.md"), "# notes\n\nsee todo list\n").unwrap();
    dir
}

fn scope(dir: &TempDir) -> Vec<PathBuf> {
    vec![dir.path().to_path_buf()]
}

#[tokio::test]
async fn test_missing_tool_falls_back_to_scanner() {
    let dir = workspace();
    let primary = ProcessSearchStrategy::with_binary(dir.path().join("no-such-rg"));
    assert!(!primary.is_available().await);

    let orchestrator =
        SearchOrchestrator::new(Arc::new(primary), Arc::new(FallbackScanStrategy::default()));
    let results = orchestrator.search(&SearchQuery::new("TODO", scope(&dir))).await;

    assert_eq!(results.strategy.as_deref(), Some("scan"));
    assert_eq!(results.message, None);
    let found: Vec<_> = results
        .matches
        .iter()
        .map(|m| (m.file.strip_prefix(dir.path()).unwrap().to_path_buf(), m.line, m.column))
        .collect();
    assert_eq!(
        found,
        vec![
            (PathBuf::from("a.rs"), 2, 4),
            (PathBuf::from("b.py"), 4, 3),
            (PathBuf::from("src/c.md"), 3, 5),
        ]
    );
    assert_eq!(results.matches[0].preview, "// TODO: tidy");
}

#[tokio::test]
async fn test_scanner_reports_no_results() {
    let dir = workspace();
    let orchestrator = SearchOrchestrator::new(
        Arc::new(ProcessSearchStrategy::with_binary(dir.path().join("missing"))),
        Arc::new(FallbackScanStrategy::default()),
    );
    let results = orchestrator.search(&SearchQuery::new("zebra", scope(&dir))).await;
    assert!(results.is_empty());
    assert_eq!(results.message.as_deref(), Some(NO_RESULTS));
}

#[cfg(unix)]
mod fake_tool {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;

    /// Writes an executable that identifies as ripgrep and then runs `body`.
    fn fake_rg(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("rg");
        let script = format!(
            "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo 'ripgrep 14.0.0'; exit 0; fi\n{body}\n"
        );
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn record(path: &Path, line: usize, text: &str, start: usize) -> String {
        serde_json::json!({
            "type": "match",
            "data": {
                "path": {"text": path.to_string_lossy()},
                "lines": {"text": format!("{text}\n")},
                "line_number": line,
                "absolute_offset": 0,
                "submatches": [{"match": {"text": "TODO"}, "start": start, "end": start + 4}]
            }
        })
        .to_string()
    }

    fn emit(lines: &[String]) -> String {
        let mut body = String::from("cat <<'EOF'\n");
        for line in lines {
            body.push_str(line);
            body.push('\n');
        }
        body.push_str("EOF\nexit 0");
        body
    }

    fn orchestrator(primary: ProcessSearchStrategy) -> SearchOrchestrator {
        SearchOrchestrator::new(Arc::new(primary), Arc::new(FallbackScanStrategy::default()))
    }

    #[tokio::test]
    #[serial]
    async fn test_tool_matches_are_parsed_in_order() {
        let dir = workspace();
        let a = dir.path().join("a.rs");
        let body = emit(&[
            r#"{"type":"begin","data":{"path":{"text":"a.rs"}}}"#.to_string(),
            record(&a, 2, "// TODO: tidy", 3),
            record(&a, 9, "    TODO", 4),
            r#"{"type":"summary","data":{}}"#.to_string(),
        ]);
        let rg = fake_rg(dir.path(), &body);

        let results = orchestrator(ProcessSearchStrategy::with_binary(rg))
            .search(&SearchQuery::new("TODO", scope(&dir)))
            .await;

        assert_eq!(results.strategy.as_deref(), Some("ripgrep"));
        let positions: Vec<_> = results.matches.iter().map(|m| (m.line, m.column)).collect();
        assert_eq!(positions, vec![(2, 4), (9, 5)]);
        assert_eq!(results.matches[1].preview, "TODO");
    }

    #[tokio::test]
    #[serial]
    async fn test_exit_one_means_no_results() {
        let dir = workspace();
        let rg = fake_rg(dir.path(), "exit 1");

        let results = orchestrator(ProcessSearchStrategy::with_binary(rg))
            .search(&SearchQuery::new("TODO", scope(&dir)))
            .await;
        assert_eq!(results.strategy.as_deref(), Some("ripgrep"));
        assert_eq!(results.message.as_deref(), Some(NO_RESULTS));
    }

    #[tokio::test]
    #[serial]
    async fn test_tool_error_exit_falls_back() {
        let dir = workspace();
        let rg = fake_rg(dir.path(), "echo 'regex parse error' >&2\nexit 2");

        let results = orchestrator(ProcessSearchStrategy::with_binary(rg))
            .search(&SearchQuery::new("TODO", scope(&dir)))
            .await;
        assert_eq!(results.strategy.as_deref(), Some("scan"));
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    #[serial]
    async fn test_malformed_lines_are_skipped() {
        let dir = workspace();
        let a = dir.path().join("a.rs");
        let body = emit(&[
            "{not json".to_string(),
            record(&a, 2, "// TODO: tidy", 3),
            r#"{"type":"match","data":{"lines":{"text":"x"}}}"#.to_string(),
        ]);
        let rg = fake_rg(dir.path(), &body);

        let results = orchestrator(ProcessSearchStrategy::with_binary(rg))
            .search(&SearchQuery::new("TODO", scope(&dir)))
            .await;
        assert_eq!(results.strategy.as_deref(), Some("ripgrep"));
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn test_hung_tool_times_out_and_falls_back() {
        let dir = workspace();
        let rg = fake_rg(dir.path(), "exec sleep 5");
        let primary =
            ProcessSearchStrategy::with_binary(rg).with_timeout(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let results = orchestrator(primary)
            .search(&SearchQuery::new("TODO", scope(&dir)))
            .await;

        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(results.strategy.as_deref(), Some("scan"));
    }

    #[tokio::test]
    #[serial]
    async fn test_results_are_capped_at_max_results() {
        let dir = workspace();
        let a = dir.path().join("a.rs");
        let lines: Vec<_> = (1..=20).map(|n| record(&a, n, "TODO", 0)).collect();
        let rg = fake_rg(dir.path(), &emit(&lines));

        let query = SearchQuery::new("TODO", scope(&dir)).with_max_results(5);
        let results = orchestrator(ProcessSearchStrategy::with_binary(rg))
            .search(&query)
            .await;
        assert_eq!(results.len(), 5);
        assert_eq!(results.matches[4].line, 5);
    }

    #[tokio::test]
    #[serial]
    async fn test_dash_query_reaches_tool_as_pattern() {
        let dir = workspace();
        fs::write(dir.path().join("flags.txt"), "alpha\nrun with -v flag\n").unwrap();
        let flags = dir.path().join("flags.txt");
        let outside = Path::new("/elsewhere/benches/line_index.rs");
        let body = format!(
            "if [ \"$1\" = \"--regexp=-v\" ]; then\n{}\nfi\n{}",
            emit(&[record(&flags, 2, "run with -v flag", 9)]),
            emit(&[record(outside, 1, "use criterion", 0)]),
        );
        let rg = fake_rg(dir.path(), &body);

        let results = orchestrator(ProcessSearchStrategy::with_binary(rg))
            .search(&SearchQuery::new("-v", scope(&dir)))
            .await;

        assert_eq!(results.strategy.as_deref(), Some("ripgrep"));
        assert_eq!(results.len(), 1);
        assert!(results
            .matches
            .iter()
            .all(|m| m.text.contains("-v") && m.file.starts_with(dir.path())));
    }
}

/// Runs against the real `rg` when one is installed.
#[tokio::test]
async fn test_dash_queries_with_installed_ripgrep() {
    let strategy = ProcessSearchStrategy::new(&SearchSettings::default());
    if !strategy.is_available().await {
        return;
    }
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "alpha\nrun with -v flag\nthen --files here\n").unwrap();
    let orchestrator =
        SearchOrchestrator::new(Arc::new(strategy), Arc::new(FallbackScanStrategy::default()));

    for pattern in ["-v", "--files", "--version"] {
        let results = orchestrator.search(&SearchQuery::new(pattern, scope(&dir))).await;
        assert_eq!(results.strategy.as_deref(), Some("ripgrep"), "{pattern}");
        assert!(results.matches.iter().all(|m| {
            m.text.to_lowercase().contains(pattern) && m.file.starts_with(dir.path())
        }));
        let expected = if pattern == "--version" { 0 } else { 1 };
        assert_eq!(results.len(), expected, "{pattern}");
    }
}
