//! Validation orchestrator
//!
//! # Workflow
//! 1. Discover artifacts and source files under the configured roots
//! 2. Load them concurrently through the ingress layer
//! 3. Parse every document in parallel on a pool of `io.workers` threads:
//!    kind, markers, signals, structure
//! 4. Merge all signals into the registry on one thread and freeze it
//! 5. Run registry-wide checks, score and report
//!
//! Only a missing root or a broken template aborts a run. Everything else,
//! unreadable files included, becomes a finding.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::report::{Report, Summary};
use crate::scoring::score;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracemark_artifact::{Artifact, ArtifactKind, ErrorType, Findings, KindResolver, ValidationError};
use tracemark_parser::{
    CodeParser, CodeScan, Discovery, DocumentParser, DocumentSignals, IngressLayer, Language,
};
use tracemark_symbol::{check_cross_references, check_traceability, IdGrammar, Registry, RegistryBuilder};
use tracemark_template::{check_structure, TemplateRegistry, Weights};
use tracing::{debug, info};

/// Which groups of checks a run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckSet {
    /// Everything
    #[default]
    All,
    /// Orphans, duplicates and coverage only
    CrossReferences,
    /// Code markers only
    Traceability,
}

impl CheckSet {
    fn documents(self) -> bool {
        self == CheckSet::All
    }

    fn cross_references(self) -> bool {
        matches!(self, CheckSet::All | CheckSet::CrossReferences)
    }

    fn traceability(self) -> bool {
        matches!(self, CheckSet::All | CheckSet::Traceability)
    }
}

/// Per-artifact result of a run
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    /// Artifact path
    pub path: PathBuf,
    /// Resolved kind
    pub kind: Option<ArtifactKind>,
    /// Kind, template and structure findings for this artifact
    pub findings: Findings,
}

/// Everything a run produced before scoring
#[derive(Debug)]
pub struct Run {
    /// Frozen identifier registry
    pub registry: Registry,
    /// Artifacts in path order
    pub documents: Vec<DocumentOutcome>,
    /// Number of source files scanned
    pub code_files: usize,
    /// Findings of the selected check groups
    pub findings: Findings,
}

/// Validation engine
///
/// Holds the immutable per-run inputs: configuration, kind rules, templates
/// and the identifier grammar. Each [`Engine::run`] starts from scratch.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    kinds: KindResolver,
    templates: TemplateRegistry,
    grammar: IdGrammar,
    parser: DocumentParser,
    ingress: IngressLayer,
    pool: rayon::ThreadPool,
}

impl Engine {
    /// Create engine, loading templates from the configured directory
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or a template cannot be
    /// loaded
    pub async fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let mut kinds = config.kind_resolver()?;

        let mut templates = TemplateRegistry::default();
        if let Some(dir) = &config.template_dir {
            let count = templates.load_dir(dir).await?;
            info!(count, dir = %dir.display(), "templates loaded");
        }
        for kind in templates.kinds() {
            kinds.add_known(kind.clone());
        }

        let grammar = config.grammar();
        let parser = DocumentParser::new(grammar.clone()).with_phase_order(config.policies.phase_order);
        let ingress = IngressLayer::new(config.io.ingress());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(ingress.config().workers.max(1))
            .thread_name(|i| format!("tracemark-parse-{i}"))
            .build()?;

        Ok(Self {
            config,
            kinds,
            templates,
            grammar,
            parser,
            ingress,
            pool,
        })
    }

    /// Engine configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Loaded templates
    #[inline]
    #[must_use]
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Run the selected checks over the configured roots
    ///
    /// # Errors
    /// Returns `EngineError::Ingress` if a configured root does not exist
    pub async fn run(&self, checks: CheckSet) -> Result<Run, EngineError> {
        let config = &self.config;
        let mut findings = Findings::new();

        let artifact_walk = self.ingress.discover(&config.artifact_roots, |p| {
            config.is_artifact(p) && !self.is_template(p)
        })?;
        let code_walk = if checks.traceability() {
            self.ingress.discover(&config.code_roots, |p| {
                Language::from_path(p).is_some() && !config.is_artifact(p)
            })?
        } else {
            Discovery::default()
        };
        info!(
            artifacts = artifact_walk.files.len(),
            code_files = code_walk.files.len(),
            unreadable = artifact_walk.failed.len() + code_walk.failed.len(),
            "discovered inputs"
        );
        for err in artifact_walk.failed.iter().chain(&code_walk.failed) {
            findings.checked(ErrorType::File, 1);
            findings.push(err.to_finding());
        }

        let artifacts = self.load(artifact_walk.files, &mut findings).await;
        let sources = self.load(code_walk.files, &mut findings).await;

        let (parsed, scans): (Vec<(DocumentOutcome, DocumentSignals)>, Vec<CodeScan>) =
            self.pool.install(|| {
                let parsed = artifacts
                    .par_iter()
                    .map(|(path, text)| self.analyze(path, text))
                    .collect();
                let scans = sources
                    .par_iter()
                    .map(|(path, text)| CodeParser::new(&self.grammar).parse(path, text))
                    .collect();
                (parsed, scans)
            });
        debug!(documents = parsed.len(), sources = scans.len(), "parsing finished");

        let mut builder = RegistryBuilder::new();
        let mut documents = Vec::with_capacity(parsed.len());
        for (outcome, signals) in parsed {
            builder.note_kind(outcome.kind.as_ref());
            for definition in signals.definitions {
                builder.define(definition);
            }
            for reference in signals.references {
                builder.reference(reference);
            }
            for instruction in signals.instructions {
                builder.instruct(instruction);
            }
            if checks.documents() {
                findings.merge(outcome.findings.clone());
            }
            documents.push(outcome);
        }
        let code_files = scans.len();
        for scan in scans {
            for marker in scan.markers {
                builder.bind(marker);
            }
            findings.merge(scan.findings);
        }

        let registry = builder.freeze();
        info!(
            identifiers = registry.len(),
            references = registry.reference_count(),
            code_markers = registry.code_marker_count(),
            "registry frozen"
        );

        if checks.cross_references() {
            findings.merge(check_cross_references(
                &registry,
                config.policies.duplicate_definitions,
            ));
        }
        if checks.traceability() {
            if config.code_roots.is_empty() {
                info!("no code roots configured, every to_code identifier is uncovered");
            }
            findings.merge(check_traceability(&registry, config.traceability.mode));
        }

        Ok(Run {
            registry,
            documents,
            code_files,
            findings,
        })
    }

    /// Run, score and report
    ///
    /// With `focus`, only findings located in that artifact are reported and
    /// the weight table follows its kind; check counts stay run-wide.
    ///
    /// # Errors
    /// Returns error if the run fails or `focus` is not among the artifacts
    pub async fn validate(&self, checks: CheckSet, focus: Option<&Path>) -> Result<Report, EngineError> {
        let run = self.run(checks).await?;

        let selected: Vec<&DocumentOutcome> = match focus {
            Some(target) => {
                let docs: Vec<_> = run
                    .documents
                    .iter()
                    .filter(|d| same_file(&d.path, target))
                    .collect();
                if docs.is_empty() {
                    return Err(EngineError::UnknownArtifact(target.to_path_buf()));
                }
                docs
            }
            None => run.documents.iter().collect(),
        };
        let weights = self.weights(selected.iter().map(|d| d.kind.as_ref()));

        let findings = if focus.is_some() {
            let keep: Vec<String> = selected
                .iter()
                .map(|d| d.path.to_string_lossy().replace('\\', "/"))
                .collect();
            only(run.findings, |f| keep.contains(&f.path))
        } else {
            run.findings
        };

        let summary = Summary {
            artifacts: selected.len(),
            code_files: run.code_files,
            identifiers: run.registry.len(),
            references: run.registry.reference_count(),
            code_markers: run.registry.code_marker_count(),
            ..Summary::default()
        };
        let card = score(&findings, &weights);
        let report = Report::new(card, self.config.scoring.threshold, summary, findings.into_items());
        info!(
            score = report.score,
            status = %report.status,
            findings = report.errors.len(),
            "validation complete"
        );
        Ok(report)
    }

    fn is_template(&self, path: &Path) -> bool {
        self.config
            .template_dir
            .as_ref()
            .is_some_and(|dir| path.starts_with(dir))
    }

    async fn load(&self, paths: Vec<PathBuf>, findings: &mut Findings) -> Vec<(PathBuf, String)> {
        findings.checked(ErrorType::File, paths.len());
        let mut texts = Vec::with_capacity(paths.len());
        for loaded in self.ingress.load_all(paths).await {
            match loaded.text {
                Ok(text) => texts.push((loaded.path, text)),
                Err(err) => findings.push(err.to_finding()),
            }
        }
        texts
    }

    /// Kind, parse and structure checks for one artifact
    fn analyze(&self, path: &Path, text: &str) -> (DocumentOutcome, DocumentSignals) {
        let artifact = Artifact::new(path, text);
        let resolution = self.kinds.resolve(path, artifact.explicit_kind());

        let mut findings = Findings::new();
        findings.checked(ErrorType::Kind, 1);
        findings.extend(resolution.findings);

        let artifact = artifact.with_kind(resolution.kind);
        let mut doc = self.parser.parse(&artifact);
        let template = artifact.kind().and_then(|k| self.templates.template_for(k));
        if let Some(template) = template {
            template.inherit_attrs(&mut doc.signals.definitions);
        }
        let structure = check_structure(
            &artifact,
            &doc,
            template.map(Arc::as_ref),
            self.config.policies.unknown_sections,
        );
        findings.merge(std::mem::take(&mut doc.findings));
        findings.merge(structure);

        debug!(
            path = %path.display(),
            kind = ?artifact.kind(),
            blocks = doc.blocks.len(),
            markerless = doc.markerless,
            findings = findings.items().len(),
            "artifact parsed"
        );

        let outcome = DocumentOutcome {
            path: path.to_path_buf(),
            kind: artifact.kind().cloned(),
            findings,
        };
        (outcome, doc.signals)
    }

    /// Kind-specific weights when every artifact shares one kind
    fn weights<'a, I>(&self, mut kinds: I) -> Weights
    where
        I: Iterator<Item = Option<&'a ArtifactKind>>,
    {
        let Some(Some(first)) = kinds.next() else {
            return self.config.scoring.weights;
        };
        if kinds.all(|k| k == Some(first)) {
            let template = self.templates.template_for(first).map(Arc::as_ref);
            self.config.weights_for(first, template)
        } else {
            self.config.scoring.weights
        }
    }
}

/// Keep findings matching `keep`, with every check count
fn only(findings: Findings, keep: impl Fn(&ValidationError) -> bool) -> Findings {
    let mut kept = Findings::new();
    for category in ErrorType::ALL {
        kept.checked(category, findings.checks(category));
    }
    kept.extend(findings.into_items().into_iter().filter(|f| keep(f)));
    kept
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, text: &str) {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn check_sets_select_groups() {
        assert!(CheckSet::All.documents());
        assert!(!CheckSet::CrossReferences.documents());
        assert!(CheckSet::CrossReferences.cross_references());
        assert!(!CheckSet::CrossReferences.traceability());
        assert!(CheckSet::Traceability.traceability());
        assert!(!CheckSet::Traceability.cross_references());
    }

    #[test]
    fn only_keeps_check_counts() {
        let mut findings = Findings::new();
        findings.checked(ErrorType::Structure, 5);
        findings.push(ValidationError::structure("a.md", "x"));
        findings.push(ValidationError::structure("b.md", "y"));

        let kept = only(findings, |f| f.path == "a.md");
        assert_eq!(kept.items().len(), 1);
        assert_eq!(kept.checks(ErrorType::Structure), 5);
    }

    #[tokio::test]
    async fn missing_root_aborts_the_run() {
        let config = EngineConfig::new().with_artifact_root("/definitely/not/here");
        let engine = Engine::new(config).await.unwrap();
        let err = engine.run(CheckSet::All).await.unwrap_err();
        assert!(matches!(err, EngineError::Ingress(_)));
    }

    #[tokio::test]
    async fn template_dir_is_not_validated_as_artifacts() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "docs/templates/PRD.md", "---\nkind: PRD\n---\n");
        write(
            dir.path(),
            "docs/PRD.md",
            "---\nkind: PRD\n---\n- [ ] `p1` - **ID**: `sys-fr-login`\n",
        );

        let config = EngineConfig::new()
            .with_artifact_root(dir.path().join("docs"))
            .with_template_dir(dir.path().join("docs/templates"));
        let engine = Engine::new(config).await.unwrap();
        assert_eq!(engine.templates().len(), 1);

        let run = engine.run(CheckSet::All).await.unwrap();
        assert_eq!(run.documents.len(), 1);
        assert_eq!(run.documents[0].kind, Some(ArtifactKind::new("PRD")));
        assert!(run.registry.lookup("sys-fr-login").is_some());
    }

    #[tokio::test]
    async fn parser_pool_follows_io_workers() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::new().with_artifact_root(dir.path()).with_workers(2);
        let engine = Engine::new(config).await.unwrap();
        assert_eq!(engine.config().io.workers, Some(2));
        assert_eq!(engine.pool.current_num_threads(), 2);
    }

    #[tokio::test]
    async fn unknown_focus_is_an_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "docs/a.md", "# A\n");
        let engine = Engine::new(EngineConfig::new().with_artifact_root(dir.path()))
            .await
            .unwrap();
        let err = engine
            .validate(CheckSet::All, Some(Path::new("nowhere.md")))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownArtifact(_)));
    }
}
