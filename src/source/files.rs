//! Source file enumeration.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::ExtractorConfig;

/// Extensions of TypeScript sources.
pub const SOURCE_EXTENSIONS: [&str; 4] = ["ts", "tsx", "mts", "cts"];

/// Collect the TypeScript sources below `root`, sorted by path.
///
/// Declaration files (`*.d.ts`) are left out, as are hidden directories,
/// `node_modules`, and paths matched by the configured exclusions. Entries
/// that cannot be read (dangling links, unreadable directories) are logged
/// and skipped; only an unreadable `root` is an error.
pub fn collect_source_files(root: &Path, config: &ExtractorConfig) -> anyhow::Result<Vec<PathBuf>> {
    let excluded = config.exclusion_matcher();
    let include_tests = config.should_include_test_files();

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || keep_entry(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() > 0 => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !is_source_file(path) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        if excluded.is_match(relative) {
            debug!(path = %relative.display(), "excluded by configuration");
            continue;
        }
        if !include_tests && is_test_file(path) {
            debug!(path = %relative.display(), "skipping test file");
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

fn keep_entry(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    !(name.starts_with('.') || name == "node_modules")
}

/// Whether `path` is a TypeScript source (declaration files excluded).
pub fn is_source_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
        return false;
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    SOURCE_EXTENSIONS.contains(&ext)
}

fn is_test_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let stem = name.split('.').next().unwrap_or(name);
    let rest = &name[stem.len()..];
    rest.starts_with(".test.") || rest.starts_with(".spec.")
}
