//! Command-line interface for lce-ts.

use clap::Parser;
use std::path::PathBuf;

use crate::config::ExtractorConfig;
use crate::driver::Extractor;
use crate::report;
use crate::source::TreeSitterProvider;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Extract declarations, types and dependencies from a TypeScript project.
///
/// The concept model is written as JSON to `.reports/jqa/ts-output.json`
/// below the project root.
#[derive(Parser)]
#[command(name = "lce-ts")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project root directory
    pub path: PathBuf,

    /// Indent the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Path to configuration YAML file (default: lce.yaml at the project root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Run an extraction.
///
/// Returns [`EXIT_FAILED`] when the model could not be written.
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    if !cli.path.is_dir() {
        eprintln!("Error: {:?} is not a directory", cli.path);
        return Ok(EXIT_ERROR);
    }

    let loaded = match &cli.config {
        Some(path) => ExtractorConfig::parse_file(path),
        None => ExtractorConfig::load(&cli.path),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error parsing configuration: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    let pretty = cli.pretty || config.pretty_print;

    let extractor = Extractor::new(TreeSitterProvider::new(), config).show_progress(!cli.no_progress);
    let result = extractor.process_project(&cli.path)?;

    let root = cli.path.canonicalize()?;
    let output = report::write_output(&root, &result.concepts, pretty);
    report::write_summary(&root, &result, output.as_deref());

    match output {
        Some(_) => Ok(EXIT_SUCCESS),
        None => Ok(EXIT_FAILED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::parse_from(["lce-ts", "proj", "--pretty", "--config", "x.yaml", "--no-progress"]);
        assert_eq!(cli.path, PathBuf::from("proj"));
        assert!(cli.pretty);
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
        assert!(cli.no_progress);

        let cli = Cli::parse_from(["lce-ts", "."]);
        assert!(!cli.pretty);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_run_writes_output() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.ts"), "export const a = 1;\n").unwrap();
        let cli = Cli::parse_from(["lce-ts", dir.path().to_str().unwrap(), "--no-progress"]);
        assert_eq!(run(&cli).unwrap(), EXIT_SUCCESS);
        assert!(dir.path().join(".reports/jqa/ts-output.json").is_file());
    }

    #[test]
    fn test_invalid_path_and_config() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let cli = Cli::parse_from(["lce-ts", missing.to_str().unwrap()]);
        assert_eq!(run(&cli).unwrap(), EXIT_ERROR);

        fs::write(dir.path().join("lce.yaml"), "excludedPaths: [unclosed\n").unwrap();
        let cli = Cli::parse_from(["lce-ts", dir.path().to_str().unwrap(), "--no-progress"]);
        assert_eq!(run(&cli).unwrap(), EXIT_ERROR);
    }
}
