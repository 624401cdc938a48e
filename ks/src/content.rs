//! Content knowledge source - file-level access to a repository checkout
//!
//! `LocalContentSource` roots all operations at a repository checkout and
//! refuses paths that escape it. Searches use the grep crates over a
//! walkdir file walk, with glob filtering on file names.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use grep_matcher::Matcher;
use grep_regex::RegexMatcherBuilder;
use grep_searcher::sinks::UTF8;
use grep_searcher::{BinaryDetection, SearcherBuilder};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::SourceError;
use crate::types::{DirEntry, FileMatch};

/// File-level queries against a codebase
///
/// Same concurrency contract as [`crate::StructureSource`]: stateless,
/// shareable, cancellation-safe.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Read a file's full contents
    async fn read_file(&self, path: &str) -> Result<String, SourceError>;

    /// List immediate entries of a directory
    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, SourceError>;

    /// Search file contents for a regex pattern under `root`
    ///
    /// `root` may carry a glob file filter after a `:` separator, e.g.
    /// `src:*.rs`. Returns at most `max_results` matching lines.
    async fn search_files(&self, pattern: &str, root: &str, max_results: usize)
    -> Result<Vec<FileMatch>, SourceError>;
}

/// Content source over a local repository checkout
pub struct LocalContentSource {
    root: PathBuf,
}

impl LocalContentSource {
    /// Create a source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!(?root, "LocalContentSource::new: called");
        Self { root }
    }

    /// Check that the root directory exists and is readable
    pub fn health_check(&self) -> bool {
        self.root.is_dir()
    }

    /// Resolve a relative path inside the root, rejecting escapes
    fn resolve(&self, path: &str) -> Result<PathBuf, SourceError> {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            return Err(SourceError::PathEscape(path.to_string()));
        }
        for component in candidate.components() {
            if matches!(component, Component::ParentDir) {
                return Err(SourceError::PathEscape(path.to_string()));
            }
        }
        Ok(self.root.join(candidate))
    }

    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }
}

#[async_trait]
impl ContentSource for LocalContentSource {
    async fn read_file(&self, path: &str) -> Result<String, SourceError> {
        debug!(%path, "LocalContentSource::read_file: called");
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(SourceError::NotFound(path.to_string()));
        }
        Ok(tokio::fs::read_to_string(&full).await?)
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, SourceError> {
        debug!(%path, "LocalContentSource::list_directory: called");
        let full = self.resolve(path)?;
        if !full.is_dir() {
            return Err(SourceError::NotFound(path.to_string()));
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&full).await?;
        while let Some(entry) = dir.next_entry().await? {
            let file_type = entry.file_type().await?;
            entries.push(DirEntry {
                path: self.display_path(&entry.path()),
                is_dir: file_type.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn search_files(
        &self,
        pattern: &str,
        root: &str,
        max_results: usize,
    ) -> Result<Vec<FileMatch>, SourceError> {
        debug!(%pattern, %root, %max_results, "LocalContentSource::search_files: called");

        // Optional glob file filter: "src:*.rs"
        let (subdir, file_glob) = match root.split_once(':') {
            Some((dir, glob)) => (dir, Some(glob)),
            None => (root, None),
        };

        let search_root = if subdir.is_empty() || subdir == "." {
            self.root.clone()
        } else {
            self.resolve(subdir)?
        };
        if !search_root.exists() {
            return Err(SourceError::NotFound(subdir.to_string()));
        }

        let matcher = RegexMatcherBuilder::new()
            .case_insensitive(true)
            .build(pattern)
            .map_err(|e| SourceError::InvalidResponse(format!("invalid pattern: {}", e)))?;

        let glob_matcher = file_glob.and_then(|g| glob::Pattern::new(g).ok());

        let files: Vec<PathBuf> = if search_root.is_file() {
            vec![search_root.clone()]
        } else {
            WalkDir::new(&search_root)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| {
                    if let Some(ref glob) = glob_matcher {
                        e.path()
                            .file_name()
                            .and_then(|n| n.to_str())
                            .map(|n| glob.matches(n))
                            .unwrap_or(false)
                    } else {
                        true
                    }
                })
                .map(|e| e.path().to_path_buf())
                .collect()
        };

        let mut matches = Vec::new();
        let mut searcher = SearcherBuilder::new()
            .binary_detection(BinaryDetection::quit(b'\x00'))
            .build();

        'files: for file_path in files {
            let display = self.display_path(&file_path);
            let result = searcher.search_path(
                &matcher,
                &file_path,
                UTF8(|line_num, line| {
                    if matches.len() >= max_results {
                        return Ok(false);
                    }
                    if matcher.is_match(line.as_bytes()).unwrap_or(false) {
                        matches.push(FileMatch {
                            path: display.clone(),
                            line: line_num,
                            text: line.trim_end().to_string(),
                        });
                    }
                    Ok(true)
                }),
            );
            if let Err(e) = result {
                // Binary or unreadable files are skipped, not fatal
                debug!(?file_path, error = %e, "search_files: skipping file");
            }
            if matches.len() >= max_results {
                break 'files;
            }
        }

        Ok(matches)
    }
}
