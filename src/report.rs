//! Output of the concept model.
//!
//! - JSON: the model keyed by concept-kind id, written to
//!   `.reports/jqa/ts-output.json` under the project root
//! - Summary: colored terminal digest of a run

use std::fs;
use std::path::{Path, PathBuf};

use colored::*;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::concept::{Concept, ConceptKind, ConceptMap};
use crate::config::OUTPUT_PATH;
use crate::driver::ProjectResult;
use crate::error::ExtractError;

// =============================================================================
// JSON Format
// =============================================================================

/// Serialize the model as one JSON object keyed by concept-kind id.
pub fn to_json(concepts: &ConceptMap, pretty: bool) -> Result<String, ExtractError> {
    let mut document = Map::new();
    for (kind, list) in concepts.iter() {
        document.insert(kind.id().to_string(), serde_json::to_value(list)?);
    }
    let document = Value::Object(document);
    let json = if pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    Ok(json)
}

/// Read a model back from its JSON form.
pub fn from_json(json: &str) -> Result<ConceptMap, ExtractError> {
    let document: Map<String, Value> = serde_json::from_str(json)?;
    let mut concepts = ConceptMap::new();
    for (id, records) in document {
        let kind = ConceptKind::from_id(&id)
            .ok_or_else(|| ExtractError::invariant(format!("unknown concept kind {id:?}")))?;
        let Value::Array(records) = records else {
            return Err(ExtractError::invariant(format!("{id} is not an array")));
        };
        for record in records {
            concepts.push(Concept::from_value(kind, record)?);
        }
    }
    Ok(concepts)
}

/// Write the model to the output location under `root`.
///
/// Best effort: failures are logged and `None` is returned.
pub fn write_output(root: &Path, concepts: &ConceptMap, pretty: bool) -> Option<PathBuf> {
    let path = root.join(OUTPUT_PATH);
    let json = match to_json(concepts, pretty) {
        Ok(json) => json,
        Err(err) => {
            warn!(error = %err, "failed to serialize concepts");
            return None;
        }
    };
    if let Some(dir) = path.parent() {
        if let Err(err) = fs::create_dir_all(dir) {
            warn!(path = %dir.display(), error = %err, "failed to create output directory");
        }
    }
    match fs::write(&path, json) {
        Ok(()) => {
            info!(path = %path.display(), "wrote concepts");
            Some(path)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to write concepts");
            None
        }
    }
}

// =============================================================================
// Summary Format
// =============================================================================

/// Print a colored digest of a run to stdout.
pub fn write_summary(root: &Path, result: &ProjectResult, output: Option<&Path>) {
    let report = &result.report;
    println!();
    println!("{} {}", "lce-ts".bold(), root.display());
    println!(
        "  files: {} processed, {} without program, {}",
        report.processed().to_string().green(),
        report.without_program().to_string().yellow(),
        failed_count(report.failed())
    );

    for kind in ConceptKind::ALL {
        let count = result.concepts.get(kind).len();
        if count > 0 {
            println!("  {:<24} {}", kind.id(), count);
        }
    }

    for (path, reason) in report.failures() {
        let shown = path.strip_prefix(root).unwrap_or(path);
        println!("  {} {}: {}", "✗".red(), shown.display(), reason.dimmed());
    }

    match output {
        Some(path) => println!("  {} {}", "→".cyan(), path.display()),
        None => println!("  {}", "output not written".yellow()),
    }
}

fn failed_count(failed: usize) -> ColoredString {
    let text = format!("{failed} failed");
    if failed == 0 {
        text.normal()
    } else {
        text.red().bold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::{DependencyEdge, Fqn, Module, Project, ReferenceKind};
    use tempfile::TempDir;

    fn sample() -> ConceptMap {
        let mut map = ConceptMap::new();
        map.push(Concept::Project(Project {
            root_path: "/p".to_string(),
        }));
        map.push(Concept::Module(Module {
            fqn: Fqn::module("./a.ts"),
            path: "./a.ts".to_string(),
        }));
        map.push(Concept::DependencyEdge(DependencyEdge {
            source_fqn: Fqn::module("./a.ts"),
            target_fqn: Fqn::unresolved("console"),
            reference_kind: ReferenceKind::Read,
        }));
        map
    }

    #[test]
    fn test_json_is_keyed_by_kind() {
        let json = to_json(&sample(), false).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["typescript-module"][0]["path"], "./a.ts");
        assert_eq!(value["typescript-module"][0]["fqn"], "\"./a.ts\"");
        assert_eq!(value["dependency-edge"][0]["referenceKind"], "read");
        assert_eq!(value["typescript-project"][0]["rootPath"], "/p");
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_pretty_output_is_indented() {
        let json = to_json(&sample(), true).unwrap();
        assert!(json.contains("\n  \""));
    }

    #[test]
    fn test_roundtrip() {
        let map = sample();
        let json = to_json(&map, true).unwrap();
        assert_eq!(from_json(&json).unwrap(), map);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = from_json(r#"{"widget": []}"#).unwrap_err();
        assert!(err.to_string().contains("widget"));
    }

    #[test]
    fn test_write_output_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = write_output(dir.path(), &sample(), false).unwrap();
        assert_eq!(path, dir.path().join(".reports/jqa/ts-output.json"));
        let written = fs::read_to_string(path).unwrap();
        assert_eq!(from_json(&written).unwrap(), sample());
    }

    #[test]
    fn test_write_output_failure_is_not_raised() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".reports"), "not a directory").unwrap();
        assert!(write_output(dir.path(), &sample(), false).is_none());
    }
}
