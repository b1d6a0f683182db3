//! Extractor configuration.
//!
//! Read from `lce.yaml` (or `.lce.yaml`) at the project root when present.
//! Every field is optional.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ExtractError;

/// File names probed at the project root, in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["lce.yaml", ".lce.yaml"];

/// Output location relative to the project root.
pub const OUTPUT_PATH: &str = ".reports/jqa/ts-output.json";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractorConfig {
    /// Indent the JSON output (default: false)
    #[serde(default)]
    pub pretty_print: bool,
    /// Glob patterns for project-relative paths to leave out (e.g. "**/generated/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Whether `*.test.ts` / `*.spec.ts` files are analyzed (default: true)
    #[serde(default)]
    pub include_test_files: Option<bool>,
}

impl ExtractorConfig {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| ExtractError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Locate a configuration file at the project root.
    pub fn discover(root: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Load the configuration of a project, falling back to defaults when
    /// no configuration file exists.
    pub fn load(root: &Path) -> Result<Self, ExtractError> {
        match Self::discover(root) {
            Some(path) => Self::parse_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn should_include_test_files(&self) -> bool {
        self.include_test_files.unwrap_or(true)
    }

    /// Compile `excluded_paths` into a matcher. Invalid patterns are
    /// logged and skipped.
    pub fn exclusion_matcher(&self) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(err) => warn!(pattern = %pattern, error = %err, "ignoring invalid exclusion pattern"),
            }
        }
        builder.build().unwrap_or_else(|err| {
            warn!(error = %err, "failed to compile exclusion patterns");
            GlobSet::empty()
        })
    }

    /// Check a project-relative path against `excluded_paths`.
    pub fn is_path_excluded(&self, relative: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }
        self.exclusion_matcher().is_match(relative)
    }
}
