//! Project driver: enumerates files, folds per-file concept maps into one
//! project model and runs the post-processors over it.

use std::path::{Path, PathBuf};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::concept::{Concept, ConceptMap, Project};
use crate::config::ExtractorConfig;
use crate::error::FileError;
use crate::postprocess::run_post_processors;
use crate::source::imports::path_string;
use crate::source::{collect_source_files, SourceProvider};
use crate::traverse::{TraversalContext, Traverser};
use crate::unify::Unifier;

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Traversed and merged; `concepts` is the number it contributed.
    Processed { concepts: usize },
    /// The provider reported no program for the file.
    NoProgram,
    /// Parsing, traversal or per-file unification failed.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
}

/// Per-file outcomes of one run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub files: Vec<FileOutcome>,
}

impl RunReport {
    pub fn processed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Processed { .. }))
    }

    pub fn without_program(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::NoProgram))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed { .. }))
    }

    /// Failed files with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files.iter().filter_map(|outcome| match &outcome.status {
            FileStatus::Failed { reason } => Some((outcome.path.as_path(), reason.as_str())),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.files.iter().filter(|outcome| pred(&outcome.status)).count()
    }
}

/// Final model plus the run report.
#[derive(Debug)]
pub struct ProjectResult {
    pub concepts: ConceptMap,
    pub report: RunReport,
}

/// Runs the extraction pipeline over a project.
pub struct Extractor<P: SourceProvider> {
    provider: P,
    config: ExtractorConfig,
    traverser: Traverser,
    show_progress: bool,
}

impl<P: SourceProvider> Extractor<P> {
    pub fn new(provider: P, config: ExtractorConfig) -> Self {
        Self {
            provider,
            config,
            traverser: Traverser::default(),
            show_progress: false,
        }
    }

    /// Show a progress bar on stderr while files are processed.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Replace the traverser, e.g. one with a custom extractor table.
    pub fn traverser(mut self, traverser: Traverser) -> Self {
        self.traverser = traverser;
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract the concept model of the project at `root`.
    ///
    /// Per-file failures are logged and recorded in the report; only
    /// pipeline-level failures (enumeration, global unification, a
    /// post-processor invariant) are returned as errors.
    #[tracing::instrument(skip_all, fields(root = %root.display()))]
    pub fn process_project(&self, root: &Path) -> anyhow::Result<ProjectResult> {
        let root = root
            .canonicalize()
            .with_context(|| format!("cannot access project root {}", root.display()))?;
        let files = collect_source_files(&root, &self.config)?;
        info!(files = files.len(), "extracting concepts");

        let progress = self.progress_bar(files.len());
        let mut seed = ConceptMap::new();
        seed.push(Concept::Project(Project {
            root_path: path_string(&root),
        }));

        let (concepts, outcomes) = files.iter().fold(
            (seed, Vec::with_capacity(files.len())),
            |(accumulator, mut outcomes), file| {
                progress.set_message(relative_display(&root, file));
                let (accumulator, status) = match self.process_file(&root, file) {
                    Ok(Some(concepts)) => {
                        let count = concepts.len();
                        debug!(path = %file.display(), concepts = count, "file processed");
                        (accumulator.merge(concepts), FileStatus::Processed { concepts: count })
                    }
                    Ok(None) => {
                        debug!(path = %file.display(), "no program for file");
                        (accumulator, FileStatus::NoProgram)
                    }
                    Err(err) => {
                        warn!(path = %file.display(), error = %err, "skipping file");
                        (accumulator, FileStatus::Failed { reason: err.to_string() })
                    }
                };
                progress.inc(1);
                outcomes.push(FileOutcome {
                    path: file.clone(),
                    status,
                });
                (accumulator, outcomes)
            },
        );
        progress.finish_and_clear();

        let mut concepts = Unifier::global().unify(concepts)?;
        run_post_processors(&mut concepts, &root)?;

        let report = RunReport { files: outcomes };
        info!(
            processed = report.processed(),
            skipped = report.without_program(),
            failed = report.failed(),
            concepts = concepts.len(),
            "extraction finished"
        );
        Ok(ProjectResult { concepts, report })
    }

    /// Traverse one file and unify its concepts at the project root.
    fn process_file(&self, root: &Path, file: &Path) -> Result<Option<ConceptMap>, FileError> {
        let Some(program) = self.provider.program(root, file)? else {
            return Ok(None);
        };
        let ctx = TraversalContext::new(root, &program);
        let concepts = self.traverser.traverse(&ctx)?;
        Ok(Some(Unifier::for_path(root).unify(concepts)?))
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>4}/{len:4} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar
    }
}

fn relative_display(root: &Path, file: &Path) -> String {
    file.strip_prefix(root).unwrap_or(file).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::ConceptKind;
    use crate::error::ProviderError;
    use crate::source::{Program, TreeSitterProvider};
    use std::fs;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, text) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        dir
    }

    fn extract(dir: &TempDir) -> ProjectResult {
        Extractor::new(TreeSitterProvider::new(), ExtractorConfig::default())
            .process_project(dir.path())
            .unwrap()
    }

    #[test]
    fn test_outcomes_per_file() {
        let dir = project(&[
            ("tsconfig.json", r#"{ "include": ["src"] }"#),
            ("src/a.ts", "export function a() {}\n"),
            ("src/broken.ts", "function (\n"),
            ("scripts/tool.ts", "const x = 1;\n"),
        ]);
        let result = extract(&dir);

        let statuses: Vec<(String, &FileStatus)> = result
            .report
            .files
            .iter()
            .map(|o| (o.path.file_name().unwrap().to_string_lossy().into_owned(), &o.status))
            .collect();
        assert_eq!(statuses.len(), 3);
        assert_eq!(result.report.processed(), 1);
        assert_eq!(result.report.without_program(), 1);
        assert_eq!(result.report.failed(), 1);
        assert!(statuses
            .iter()
            .any(|(name, status)| name == "tool.ts" && **status == FileStatus::NoProgram));
        let (failed, reason) = result.report.failures().next().unwrap();
        assert!(failed.ends_with("src/broken.ts"));
        assert!(reason.contains("syntax error"));

        let modules: Vec<&str> = result
            .concepts
            .get(ConceptKind::Module)
            .iter()
            .filter_map(|c| c.as_module())
            .map(|m| m.path.as_str())
            .collect();
        assert_eq!(modules, vec!["./src/a.ts"]);
    }

    #[test]
    fn test_project_seed_survives() {
        let dir = project(&[("a.ts", "export const a = 1;\n")]);
        let result = extract(&dir);
        let seeds = result.concepts.get(ConceptKind::Project);
        assert_eq!(seeds.len(), 1);
        let root = path_string(&dir.path().canonicalize().unwrap());
        assert_eq!(seeds[0].as_project().unwrap().root_path, root);
    }

    struct FailingProvider;

    impl SourceProvider for FailingProvider {
        fn program(&self, _root: &Path, file: &Path) -> Result<Option<Program>, ProviderError> {
            Err(ProviderError::Io {
                path: file.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "boom"),
            })
        }
    }

    #[test]
    fn test_provider_failures_are_not_fatal() {
        let dir = project(&[("a.ts", "let a;\n"), ("b.ts", "let b;\n")]);
        let result = Extractor::new(FailingProvider, ExtractorConfig::default())
            .process_project(dir.path())
            .unwrap();
        assert_eq!(result.report.failed(), 2);
        assert!(result.concepts.get(ConceptKind::Module).is_empty());
        assert_eq!(result.concepts.get(ConceptKind::Project).len(), 1);
    }

    #[test]
    fn test_deeply_nested_file_is_skipped() {
        let deep = format!("export const s = {};\n", vec!["\"a\""; 20_000].join(" + "));
        let dir = project(&[("gen.ts", deep.as_str()), ("other.ts", "export function other() {}\n")]);
        let result = extract(&dir);

        assert_eq!(result.report.processed(), 1);
        assert_eq!(result.report.failed(), 1);
        let (failed, reason) = result.report.failures().next().unwrap();
        assert!(failed.ends_with("gen.ts"));
        assert!(reason.contains("nested deeper"));
        assert_eq!(result.concepts.get(ConceptKind::Function).len(), 1);
        assert!(result.concepts.get(ConceptKind::Variable).is_empty());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let result = Extractor::new(TreeSitterProvider::new(), ExtractorConfig::default())
            .process_project(&missing);
        assert!(result.is_err());
    }
}
