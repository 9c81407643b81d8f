//! Ingress layer
//!
//! The only component that touches the filesystem. Discovers input files
//! under configured roots (honouring `.gitignore`) and loads them with a
//! bounded number of concurrent reads, a size cap and a per-read timeout.
//! An entry that cannot be walked or a file that cannot be loaded is returned
//! as an error for that path; only a missing root aborts.

use crate::error::ParseError;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Limits applied while loading files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngressConfig {
    /// Largest file accepted, in bytes
    pub max_file_bytes: u64,
    /// Time allowed for one read
    pub read_timeout: Duration,
    /// Concurrent reads
    pub workers: usize,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024, // 10MB
            read_timeout: Duration::from_millis(5_000),
            workers: std::thread::available_parallelism().map_or(4, usize::from),
        }
    }
}

/// Files found under the roots, plus entries the walk could not read
#[derive(Debug, Default)]
pub struct Discovery {
    /// Accepted files, sorted and deduplicated
    pub files: Vec<PathBuf>,
    /// Unreadable entries, in walk order
    pub failed: Vec<ParseError>,
}

/// One loaded (or failed) input file
#[derive(Debug)]
pub struct Loaded {
    /// File path
    pub path: PathBuf,
    /// Text, or the reason it could not be read
    pub text: Result<String, ParseError>,
}

/// Trusted boundary between the filesystem and the parsers
#[derive(Debug, Clone, Default)]
pub struct IngressLayer {
    config: IngressConfig,
}

impl IngressLayer {
    /// Create layer with limits
    #[inline]
    #[must_use]
    pub fn new(config: IngressConfig) -> Self {
        Self { config }
    }

    /// Configured limits
    #[inline]
    #[must_use]
    pub fn config(&self) -> &IngressConfig {
        &self.config
    }

    /// Find files under `roots` accepted by `accept`
    ///
    /// A root may be a directory (walked recursively, following links and
    /// honouring ignore files) or a single file (taken as is).
    ///
    /// # Errors
    /// Returns `ParseError::MissingRoot` if a root does not exist
    pub fn discover<F>(&self, roots: &[PathBuf], accept: F) -> Result<Discovery, ParseError>
    where
        F: Fn(&Path) -> bool,
    {
        let mut found = Discovery::default();
        for root in roots {
            if !root.exists() {
                return Err(ParseError::MissingRoot(root.clone()));
            }
            if root.is_file() {
                found.files.push(root.clone());
                continue;
            }
            for entry in WalkBuilder::new(root).follow_links(true).build() {
                match entry {
                    Ok(entry) => {
                        let is_file = entry.file_type().is_some_and(|t| t.is_file());
                        if is_file && accept(entry.path()) {
                            found.files.push(entry.into_path());
                        }
                    }
                    Err(err) => {
                        warn!(root = %root.display(), error = %err, "unreadable entry");
                        found.failed.push(ParseError::Walk {
                            path: walk_error_path(&err).unwrap_or(root).to_path_buf(),
                            message: err.to_string(),
                        });
                    }
                }
            }
        }
        found.files.sort();
        found.files.dedup();
        debug!(count = found.files.len(), failed = found.failed.len(), "discovered files");
        Ok(found)
    }

    /// Load every path concurrently; results are sorted by path
    pub async fn load_all(&self, paths: Vec<PathBuf>) -> Vec<Loaded> {
        let permits = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks = JoinSet::new();

        for path in paths {
            let permits = Arc::clone(&permits);
            let config = self.config;
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let text = load_one(&path, &config).await;
                Loaded { path, text }
            });
        }

        let mut loaded = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(item) => {
                    if let Err(err) = &item.text {
                        warn!(path = %item.path.display(), error = %err, "failed to load file");
                    }
                    loaded.push(item);
                }
                Err(err) => loaded.push(Loaded {
                    path: PathBuf::new(),
                    text: Err(ParseError::Task(err.to_string())),
                }),
            }
        }
        loaded.sort_by(|a, b| a.path.cmp(&b.path));
        loaded
    }
}

fn walk_error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path),
        ignore::Error::Loop { child, .. } => Some(child),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            walk_error_path(err)
        }
        ignore::Error::Partial(errs) => errs.iter().find_map(walk_error_path),
        _ => None,
    }
}

/// Read one file within the configured limits
///
/// # Errors
/// Returns error if the file is missing, too large, slow or not UTF-8
pub async fn load_one(path: &Path, config: &IngressConfig) -> Result<String, ParseError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| ParseError::io_error(path, e))?;
    if meta.len() > config.max_file_bytes {
        return Err(ParseError::TooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            max: config.max_file_bytes,
        });
    }

    let bytes = tokio::time::timeout(config.read_timeout, tokio::fs::read(path))
        .await
        .map_err(|_| ParseError::Timeout {
            path: path.to_path_buf(),
            after: config.read_timeout,
        })?
        .map_err(|e| ParseError::io_error(path, e))?;

    String::from_utf8(bytes).map_err(|_| ParseError::NotUtf8(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, text: &[u8]) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn discover_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.md", b"b");
        write(dir.path(), "nested/a.md", b"a");
        write(dir.path(), "c.txt", b"c");

        let layer = IngressLayer::default();
        let found = layer
            .discover(&[dir.path().to_path_buf()], |p| {
                p.extension().is_some_and(|e| e == "md")
            })
            .unwrap();

        assert!(found.failed.is_empty());
        let names: Vec<_> = found
            .files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["b.md", "nested/a.md"]);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_link_is_reported_not_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", b"a");
        std::os::unix::fs::symlink(dir.path().join("gone.md"), dir.path().join("link.md")).unwrap();

        let found = IngressLayer::default()
            .discover(&[dir.path().to_path_buf()], |_| true)
            .unwrap();

        assert_eq!(found.files, vec![dir.path().join("a.md")]);
        assert_eq!(found.failed.len(), 1);
        let err = &found.failed[0];
        assert!(!err.is_fatal());
        assert_eq!(err.path(), Some(&dir.path().join("link.md")));
        assert_eq!(err.to_finding().error_type, tracemark_artifact::ErrorType::File);
    }

    #[test]
    fn missing_root_is_fatal() {
        let layer = IngressLayer::default();
        let err = layer
            .discover(&[PathBuf::from("/definitely/not/here")], |_| true)
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn load_all_reports_per_file_failures() {
        let dir = TempDir::new().unwrap();
        let ok = write(dir.path(), "ok.md", b"# fine\n");
        let big = write(dir.path(), "big.md", &[b'x'; 64]);
        let binary = write(dir.path(), "bin.md", &[0xff, 0xfe, 0x00]);
        let missing = dir.path().join("gone.md");

        let layer = IngressLayer::new(IngressConfig {
            max_file_bytes: 32,
            ..IngressConfig::default()
        });
        let loaded = layer
            .load_all(vec![ok.clone(), big.clone(), binary.clone(), missing.clone()])
            .await;

        assert_eq!(loaded.len(), 4);
        let by_path = |p: &Path| loaded.iter().find(|l| l.path == p).unwrap();
        assert_eq!(by_path(&ok).text.as_deref().unwrap(), "# fine\n");
        assert!(matches!(by_path(&big).text, Err(ParseError::TooLarge { .. })));
        assert!(matches!(by_path(&binary).text, Err(ParseError::NotUtf8(_))));
        assert!(matches!(by_path(&missing).text, Err(ParseError::Io { .. })));
    }
}
