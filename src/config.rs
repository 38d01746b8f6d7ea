use crate::cache::EvictionPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub preview: PreviewSettings,

    #[serde(default)]
    pub list: ListSettings,
}

/// Search configuration surface. Field names mirror the keys users put in
/// the `[search]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub exclude_hidden: bool,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_results: usize,
    pub max_columns: usize,
    pub max_file_size: String,
    pub process_timeout_ms: u64,
    pub ripgrep_path: Option<PathBuf>,
    pub max_candidates: usize,
    pub batch_size: usize,
    pub concurrency: usize,
    pub max_line_length: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            exclude_hidden: true,
            include_patterns: vec![],
            exclude_patterns: vec![
                "**/node_modules/**".to_string(),
                "**/.git/**".to_string(),
                "**/target/**".to_string(),
            ],
            max_results: 1000,
            max_columns: 500,
            max_file_size: "1M".to_string(),
            process_timeout_ms: 10_000,
            ripgrep_path: None,
            max_candidates: 3000,
            batch_size: 50,
            concurrency: 16,
            max_line_length: 500,
        }
    }
}

impl SearchSettings {
    pub fn process_timeout(&self) -> Duration {
        Duration::from_millis(self.process_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub content_capacity: usize,
    pub rendered_capacity: usize,
    pub eviction: EvictionPolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            content_capacity: 50,
            rendered_capacity: 50,
            eviction: EvictionPolicy::Fifo,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    pub chunk_size: usize,
    pub adjacent_chunks: usize,
    pub lazy_threshold_bytes: usize,
    pub line_cache_capacity: usize,
    pub load_threshold: usize,
    pub line_height: usize,
    pub cache_max_lines: usize,
    pub theme: String,
    pub asset_timeout_ms: u64,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            adjacent_chunks: 1,
            lazy_threshold_bytes: 256 * 1024,
            line_cache_capacity: 2000,
            load_threshold: 20,
            line_height: 1,
            cache_max_lines: 2000,
            theme: "dark".to_string(),
            asset_timeout_ms: 500,
        }
    }
}

impl PreviewSettings {
    pub fn asset_timeout(&self) -> Duration {
        Duration::from_millis(self.asset_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListSettings {
    pub threshold: usize,
    pub buffer_size: usize,
    pub item_height: usize,
}

impl Default for ListSettings {
    fn default() -> Self {
        Self {
            threshold: 200,
            buffer_size: 10,
            item_height: 1,
        }
    }
}

const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Byte threshold for `value`, or 1 MiB when it does not parse.
pub fn size_limit_or_default(value: &str) -> u64 {
    parse_size_limit(value).unwrap_or(DEFAULT_MAX_FILE_SIZE)
}

/// Parses a size limit the way ripgrep's `--max-filesize` does: a number with
/// an optional `K`, `M` or `G` suffix, each a power of 1024.
pub fn parse_size_limit(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (digits, multiplier) = match value.chars().last()? {
        'k' | 'K' => (&value[..value.len() - 1], 1024),
        'm' | 'M' => (&value[..value.len() - 1], 1024 * 1024),
        'g' | 'G' => (&value[..value.len() - 1], 1024 * 1024 * 1024),
        _ => (value, 1),
    };
    digits.trim().parse::<u64>().ok()?.checked_mul(multiplier)
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_path()?;
        if let Some(path) = config_path {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn find_config_path() -> Result<Option<PathBuf>> {
        if let Some(xdg_config) = dirs::config_dir() {
            let xdg_path = xdg_config.join("rfscope/config.toml");
            if xdg_path.exists() {
                return Ok(Some(xdg_path));
            }
        }

        if let Some(home) = dirs::home_dir() {
            let home_path = home.join(".rfscope.toml");
            if home_path.exists() {
                return Ok(Some(home_path));
            }
        }

        let current_path = Path::new(".rfscope.toml");
        if current_path.exists() {
            return Ok(Some(current_path.to_path_buf()));
        }

        Ok(None)
    }

    fn validate(&self) -> Result<()> {
        if parse_size_limit(&self.search.max_file_size).is_none() {
            anyhow::bail!(
                "search.max_file_size '{}' is not a valid size (expected e.g. 512K, 1M)",
                self.search.max_file_size
            );
        }
        if self.preview.chunk_size == 0 {
            anyhow::bail!("preview.chunk_size must be greater than zero");
        }
        if self.list.item_height == 0 || self.preview.line_height == 0 {
            anyhow::bail!("row heights must be greater than zero");
        }
        if self.search.batch_size == 0 || self.search.concurrency == 0 {
            anyhow::bail!("search.batch_size and search.concurrency must be greater than zero");
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
