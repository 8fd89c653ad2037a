//! Include/exclude path filtering for recognizers
//!
//! Patterns use gitignore syntax and are matched relative to the watched
//! root:
//! 1. Exclude patterns (highest priority)
//! 2. Editor temp files (optional)
//! 3. Include patterns (empty = everything)

use dirwatch_core::{FileRecord, MonitorError, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};

/// Decides which records a recognizer reports
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    include: Option<Gitignore>,
    exclude: Option<Gitignore>,
    skip_temp_files: bool,
}

impl PathFilter {
    /// Build a filter from gitignore-style patterns
    pub fn new(root: &Path, include: &[String], exclude: &[String]) -> Result<Self> {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());

        Ok(Self {
            include: build_patterns(&root, include)?,
            exclude: build_patterns(&root, exclude)?,
            root,
            skip_temp_files: false,
        })
    }

    /// Filter that accepts every path
    pub fn accept_all(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            include: None,
            exclude: None,
            skip_temp_files: false,
        }
    }

    /// Also reject editor swap/backup files and OS metadata files
    pub fn skip_temp_files(mut self, skip: bool) -> Self {
        self.skip_temp_files = skip;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if a path passes the filter
    pub fn accepts(&self, path: &Path, is_dir: bool) -> bool {
        if let Some(ref exclude) = self.exclude {
            if self.hits(exclude, path, is_dir) {
                return false;
            }
        }

        if self.skip_temp_files && is_temp_file(path) {
            return false;
        }

        match self.include {
            Some(ref include) => self.hits(include, path, is_dir),
            None => true,
        }
    }

    pub fn accepts_record(&self, record: &FileRecord) -> bool {
        self.accepts(record.absolute_path(), record.is_directory())
    }

    /// Number of active pattern sources
    pub fn active_sources(&self) -> usize {
        let mut count = 0;
        if self.include.is_some() {
            count += 1;
        }
        if self.exclude.is_some() {
            count += 1;
        }
        if self.skip_temp_files {
            count += 1;
        }
        count
    }

    fn hits(&self, patterns: &Gitignore, path: &Path, is_dir: bool) -> bool {
        // Parent matching requires the path to live under the root
        if path.starts_with(&self.root) && path != self.root {
            patterns.matched_path_or_any_parents(path, is_dir).is_ignore()
        } else {
            patterns.matched(path, is_dir).is_ignore()
        }
    }
}

fn build_patterns(root: &Path, patterns: &[String]) -> Result<Option<Gitignore>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GitignoreBuilder::new(root);
    for pattern in patterns {
        builder
            .add_line(None, pattern)
            .map_err(|e| MonitorError::Config(format!("bad pattern {:?}: {}", pattern, e)))?;
    }

    let gitignore = builder
        .build()
        .map_err(|e| MonitorError::Config(e.to_string()))?;
    Ok(Some(gitignore))
}

/// Vim/Emacs swap and backup files, macOS and Windows metadata files
fn is_temp_file(path: &Path) -> bool {
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if [".swp", ".swo", ".swn", ".swm"].iter().any(|ext| filename.ends_with(ext)) {
        return true;
    }

    if filename.ends_with('~') || filename.starts_with(".#") {
        return true;
    }

    if filename.len() > 1 && filename.starts_with('#') && filename.ends_with('#') {
        return true;
    }

    matches!(filename, ".DS_Store" | "Thumbs.db" | "desktop.ini") || filename.starts_with("._")
}
