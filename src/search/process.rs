//! Search backed by an external `rg` process.
use super::{ndjson, SearchArgumentBuilder, SearchQuery, SearchResultSet, SearchStrategy};
use crate::config::SearchSettings;
use crate::error::{Result, RfscopeError};
use crate::metrics::Metrics;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::OnceCell;

const TOOL: &str = "ripgrep";
const RG_BINARY: &str = if cfg!(windows) { "rg.exe" } else { "rg" };
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ProcessSearchStrategy {
    candidates: Vec<PathBuf>,
    timeout: Duration,
    binary: OnceCell<Option<PathBuf>>,
    metrics: Arc<Metrics>,
}

impl ProcessSearchStrategy {
    /// Probes the configured path, then the binaries bundled next to the
    /// running executable, then `rg` on `PATH`.
    pub fn new(settings: &SearchSettings) -> Self {
        let mut candidates = Vec::new();
        if let Some(configured) = &settings.ripgrep_path {
            candidates.push(configured.clone());
        }
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            candidates.push(exe_dir.join(RG_BINARY));
            candidates.push(exe_dir.join("bin").join(RG_BINARY));
        }
        candidates.push(PathBuf::from(RG_BINARY));

        Self {
            candidates,
            timeout: settings.process_timeout(),
            binary: OnceCell::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Uses exactly `binary`, with no other probing.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            candidates: vec![binary.into()],
            timeout: SearchSettings::default().process_timeout(),
            binary: OnceCell::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The resolved binary. Probed on first use only.
    pub async fn binary(&self) -> Option<&Path> {
        self.binary
            .get_or_init(|| async {
                for candidate in &self.candidates {
                    if probe(candidate).await {
                        info!("Using {} at {}", TOOL, candidate.display());
                        return Some(candidate.clone());
                    }
                    debug!("No usable {} at {}", TOOL, candidate.display());
                }
                warn!("{TOOL} not found, searches will use the in-process scanner");
                None
            })
            .await
            .as_deref()
    }

    async fn run(&self, binary: &Path, args: &[String]) -> Result<ProcessOutput> {
        debug!("Spawning {} {:?}", binary.display(), args);
        let mut child = Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| RfscopeError::Other("failed to capture stdout".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| RfscopeError::Other("failed to capture stderr".to_string()))?;

        let finished = tokio::time::timeout(self.timeout, async {
            let (out, err, status) = tokio::join!(
                read_all(&mut stdout),
                read_all(&mut stderr),
                child.wait()
            );
            Ok::<_, std::io::Error>((out?, err?, status?))
        })
        .await;

        let (stdout, stderr, status) = match finished {
            Ok(result) => result?,
            Err(_) => {
                let _ = child.kill().await;
                self.metrics.process_timeouts.inc();
                return Err(RfscopeError::Timeout {
                    tool: TOOL.to_string(),
                    after: self.timeout,
                });
            }
        };

        match status.code() {
            Some(0) | Some(1) => Ok(ProcessOutput { stdout }),
            code => Err(RfscopeError::ProcessExit {
                code,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            }),
        }
    }

    fn parse(&self, stdout: &[u8], query: &SearchQuery) -> SearchResultSet {
        let text = String::from_utf8_lossy(stdout);
        let mut matches = Vec::new();

        for (index, line) in text.lines().enumerate() {
            if matches.len() >= query.max_results {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            match ndjson::parse_line(line, index + 1) {
                Ok(Some(found)) => matches.push(found),
                Ok(None) => {}
                Err(e) => {
                    self.metrics.malformed_records.inc();
                    warn!("Skipping {TOOL} output: {e}");
                }
            }
        }

        SearchResultSet::from_matches(&query.pattern, matches)
    }
}

struct ProcessOutput {
    stdout: Vec<u8>,
}

async fn read_all<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

async fn probe(binary: &Path) -> bool {
    let output = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(PROBE_TIMEOUT, output).await {
        Ok(Ok(output)) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|first| first.to_ascii_lowercase().contains(TOOL))
            .unwrap_or(false),
        _ => false,
    }
}

#[async_trait]
impl SearchStrategy for ProcessSearchStrategy {
    fn name(&self) -> &'static str {
        TOOL
    }

    async fn is_available(&self) -> bool {
        self.binary().await.is_some()
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResultSet> {
        let binary = self
            .binary()
            .await
            .ok_or_else(|| RfscopeError::Unavailable(format!("{TOOL} binary not found")))?
            .to_path_buf();

        let args = SearchArgumentBuilder::new()
            .query(&query.pattern)
            .max_columns(query.max_columns)
            .max_file_size(&query.max_file_size)
            .hidden(query.include_hidden)
            .include(query.include_globs.iter().cloned())
            .exclude(query.exclude_globs.iter().cloned())
            .with_paths(query.scope_paths.iter().cloned())
            .build()?;

        let output = self.run(&binary, &args).await?;
        Ok(self.parse(&output.stdout, query))
    }
}
