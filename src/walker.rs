use crate::error::Result;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use log::debug;
use std::path::{Path, PathBuf};

/// Candidate selection for the in-process scanner.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub include_hidden: bool,
    pub limit: usize,
}

/// Lists files under `roots`, honouring `.gitignore` and the glob overrides,
/// sorted by file name within each directory and capped at `options.limit`.
pub fn enumerate_files(roots: &[PathBuf], options: &WalkOptions) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for root in roots {
        if files.len() >= options.limit {
            break;
        }
        for entry in walk_root(root, options)? {
            if files.len() >= options.limit {
                break;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                files.push(entry.into_path());
            }
        }
    }

    Ok(files)
}

fn walk_root(root: &Path, options: &WalkOptions) -> Result<ignore::Walk> {
    let mut overrides = OverrideBuilder::new(root);
    for glob in &options.include_globs {
        overrides.add(glob)?;
    }
    for glob in &options.exclude_globs {
        overrides.add(&format!("!{glob}"))?;
    }

    Ok(WalkBuilder::new(root)
        .hidden(!options.include_hidden)
        .git_global(true)
        .git_ignore(true)
        .git_exclude(true)
        .require_git(false)
        .overrides(overrides.build()?)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build())
}
