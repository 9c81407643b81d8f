//! Template registry using moka
//!
//! Templates are loaded once per run and read-only afterwards. Parsed
//! templates are cached by content hash so identical template text is only
//! parsed once, whichever path it was loaded from.

use crate::error::TemplateError;
use crate::template::Template;
use moka::future::Cache;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracemark_artifact::{ArtifactKind, ContentHash};
use tracing::{debug, info};

/// Templates by artifact kind
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    parsed: Cache<ContentHash, Arc<Template>>,
    by_kind: BTreeMap<ArtifactKind, Arc<Template>>,
}

impl TemplateRegistry {
    /// Create empty registry with cache capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            parsed: Cache::new(max_capacity),
            by_kind: BTreeMap::new(),
        }
    }

    /// Load every `.md` template in a directory, in file name order
    ///
    /// # Errors
    /// Returns error if the directory is missing or unreadable, or if any
    /// template is invalid
    pub async fn load_dir(&mut self, dir: &Path) -> Result<usize, TemplateError> {
        if !dir.is_dir() {
            return Err(TemplateError::MissingDir(dir.to_path_buf()));
        }

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| TemplateError::io_error(dir, e))?;
        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TemplateError::io_error(dir, e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "md") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| TemplateError::io_error(path, e))?;
            self.register(path, &text).await?;
        }
        info!(dir = %dir.display(), count = paths.len(), "loaded templates");
        Ok(paths.len())
    }

    /// Parse (or reuse) a template and index it by kind
    ///
    /// # Errors
    /// Returns error if the template is invalid or another template already
    /// governs its kind
    pub async fn register(&mut self, path: &Path, text: &str) -> Result<Arc<Template>, TemplateError> {
        let hash = ContentHash::compute(text.as_bytes());
        let template = if let Some(cached) = self.parsed.get(&hash).await {
            debug!(path = %path.display(), hash = %hash.short(), "template cache hit");
            cached
        } else {
            let template = Arc::new(Template::parse(path, text)?);
            self.parsed.insert(hash, Arc::clone(&template)).await;
            template
        };

        if let Some(existing) = self.by_kind.get(template.kind()) {
            if existing.hash() != template.hash() {
                return Err(TemplateError::DuplicateKind {
                    kind: template.kind().clone(),
                    first: existing.path().to_path_buf(),
                    second: path.to_path_buf(),
                });
            }
        }
        self.by_kind
            .insert(template.kind().clone(), Arc::clone(&template));
        Ok(template)
    }

    /// Template governing a kind
    #[inline]
    #[must_use]
    pub fn template_for(&self, kind: &ArtifactKind) -> Option<&Arc<Template>> {
        self.by_kind.get(kind)
    }

    /// Kinds with a registered template, sorted
    pub fn kinds(&self) -> impl Iterator<Item = &ArtifactKind> {
        self.by_kind.keys()
    }

    /// Number of kinds with a template
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    /// Whether no template is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}

impl Default for TemplateRegistry {
    /// Create registry with default cache capacity (1,000 templates)
    fn default() -> Self {
        Self::new(1_000)
    }
}
