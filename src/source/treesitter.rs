//! Tree-sitter backed source provider.
//!
//! Files are parsed with the TypeScript grammar (TSX for `.tsx`). Which
//! files form the program is decided by `tsconfig.json` at the project
//! root: its `files`, `include` and `exclude` entries are honored, and a
//! project without one includes every source file.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use serde::Deserialize;
use streaming_iterator::StreamingIterator;
use tracing::{debug, warn};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, Tree};

use super::imports::{path_string, ModuleResolver};
use super::semantic::ScopeModel;
use super::{exceeds_depth, Program, SourceProvider, MAX_TREE_DEPTH};
use crate::concept::Fqn;
use crate::error::ProviderError;

static TYPESCRIPT: Lazy<Language> = Lazy::new(|| tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into());
static TSX: Lazy<Language> = Lazy::new(|| tree_sitter_typescript::LANGUAGE_TSX.into());

const ERROR_QUERY: &str = "(ERROR) @error";

/// Default [`SourceProvider`].
#[derive(Default)]
pub struct TreeSitterProvider {
    projects: RefCell<HashMap<PathBuf, Rc<ProjectFiles>>>,
}

impl TreeSitterProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn project(&self, root: &Path) -> Rc<ProjectFiles> {
        self.projects
            .borrow_mut()
            .entry(root.to_path_buf())
            .or_insert_with(|| Rc::new(ProjectFiles::load(root)))
            .clone()
    }
}

impl SourceProvider for TreeSitterProvider {
    fn program(&self, root: &Path, file: &Path) -> Result<Option<Program>, ProviderError> {
        let relative = path_string(file.strip_prefix(root).unwrap_or(file));
        if !self.project(root).contains(&relative) {
            debug!(path = %relative, "not part of the tsconfig program");
            return Ok(None);
        }

        let source = fs::read(file).map_err(|source| ProviderError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let tree = parse(file, &source)?;

        let source: Rc<[u8]> = Rc::from(source);
        let semantic = ScopeModel::build(
            &tree,
            source.clone(),
            Fqn::module(&path_string(file)),
            ModuleResolver::for_file(file),
        );
        Ok(Some(Program::new(
            file.to_path_buf(),
            source,
            tree,
            Box::new(semantic),
        )))
    }
}

fn language_for(file: &Path) -> &'static Language {
    match file.extension().and_then(|e| e.to_str()) {
        Some("tsx") => &TSX,
        _ => &TYPESCRIPT,
    }
}

/// Parse a file, rejecting trees that contain syntax errors or nest
/// deeper than [`MAX_TREE_DEPTH`].
pub fn parse(file: &Path, source: &[u8]) -> Result<Tree, ProviderError> {
    let language = language_for(file);
    let mut parser = Parser::new();
    parser.set_language(language)?;
    let tree = parser.parse(source, None).ok_or(ProviderError::NoTree)?;

    let root = tree.root_node();
    if exceeds_depth(root, MAX_TREE_DEPTH) {
        return Err(ProviderError::TooDeep {
            limit: MAX_TREE_DEPTH,
        });
    }
    if root.has_error() {
        let (line, column) = first_error(language, root, source);
        return Err(ProviderError::Syntax { line, column });
    }
    Ok(tree)
}

/// 1-indexed position of the first error or missing node.
fn first_error(language: &Language, root: Node<'_>, source: &[u8]) -> (usize, usize) {
    let mut first: Option<tree_sitter::Point> = None;
    if let Ok(query) = Query::new(language, ERROR_QUERY) {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, source);
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let at = capture.node.start_position();
                if first.map_or(true, |f| at < f) {
                    first = Some(at);
                }
            }
        }
    }
    let missing = first_missing(root).map(|n| n.start_position());
    let position = match (first, missing) {
        (Some(a), Some(b)) => a.min(b),
        (a, b) => a.or(b).unwrap_or_else(|| root.start_position()),
    };
    (position.row + 1, position.column + 1)
}

fn first_missing(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().filter(|c| c.has_error()).find_map(first_missing)
}

#[derive(Debug, Default, Deserialize)]
struct TsConfig {
    #[serde(default)]
    files: Option<Vec<String>>,
    #[serde(default)]
    include: Option<Vec<String>>,
    #[serde(default)]
    exclude: Option<Vec<String>>,
}

/// File membership of the program described by `tsconfig.json`.
#[derive(Debug, Default)]
struct ProjectFiles {
    files: Vec<String>,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl ProjectFiles {
    fn load(root: &Path) -> Self {
        let path = root.join("tsconfig.json");
        let Ok(text) = fs::read_to_string(&path) else {
            return Self::default();
        };
        match serde_json::from_str::<TsConfig>(&strip_jsonc(&text)) {
            Ok(config) => Self::from_config(config),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable tsconfig.json");
                Self::default()
            }
        }
    }

    fn from_config(config: TsConfig) -> Self {
        let files: Vec<String> = config
            .files
            .unwrap_or_default()
            .iter()
            .map(|f| f.trim_start_matches("./").to_string())
            .collect();
        // `files` alone restricts the program to exactly those files
        let include = match config.include {
            Some(patterns) => Some(patterns),
            None if files.is_empty() => None,
            None => Some(Vec::new()),
        };
        Self {
            files,
            include: include.map(|p| glob_set(&p)),
            exclude: config.exclude.map(|p| glob_set(&p)),
        }
    }

    fn contains(&self, relative: &str) -> bool {
        if self.files.iter().any(|f| f == relative) {
            return true;
        }
        if self.exclude.as_ref().is_some_and(|ex| ex.is_match(relative)) {
            return false;
        }
        self.include.as_ref().map_or(true, |inc| inc.is_match(relative))
    }
}

fn glob_set(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = tsconfig_pattern(pattern);
        match GlobBuilder::new(&pattern).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => warn!(pattern = %pattern, error = %err, "ignoring invalid tsconfig pattern"),
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// A tsconfig entry without wildcards or extension names a directory.
fn tsconfig_pattern(raw: &str) -> String {
    let pattern = raw.trim_start_matches("./").trim_end_matches('/');
    let last = pattern.rsplit('/').next().unwrap_or(pattern);
    let is_glob = pattern.contains(['*', '?']);
    if !is_glob && !last.contains('.') {
        format!("{}/**", pattern)
    } else {
        pattern.to_string()
    }
}

/// Drop comments and trailing commas, which tsconfig files commonly use.
fn strip_jsonc(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = ' ';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
            }
            (',', _) => {
                let rest: String = chars.clone().collect();
                let closes = rest
                    .trim_start()
                    .starts_with(['}', ']']);
                if !closes {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_reports_syntax_error_position() {
        let err = parse(Path::new("a.ts"), b"const x = ;\nfunction f( {").unwrap_err();
        match err {
            ProviderError::Syntax { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_rejects_deep_nesting() {
        let deep = format!("export const s = {};\n", vec!["\"a\""; 20_000].join(" + "));
        match parse(Path::new("gen.ts"), deep.as_bytes()).unwrap_err() {
            ProviderError::TooDeep { limit } => assert_eq!(limit, MAX_TREE_DEPTH),
            other => panic!("unexpected error: {other}"),
        }

        let shallow = format!("export const s = {};\n", vec!["\"a\""; 100].join(" + "));
        assert!(parse(Path::new("gen.ts"), shallow.as_bytes()).is_ok());
    }

    #[test]
    fn test_tsx_uses_tsx_grammar() {
        assert!(parse(Path::new("view.tsx"), b"const v = <div>{1}</div>;\n").is_ok());
    }

    #[test]
    fn test_strip_jsonc() {
        let text = "{\n // comment\n \"include\": [\"src\", /* x */ \"lib//y\",],\n}";
        let config: TsConfig = serde_json::from_str(&strip_jsonc(text)).unwrap();
        assert_eq!(
            config.include,
            Some(vec!["src".to_string(), "lib//y".to_string()])
        );
    }

    #[test]
    fn test_tsconfig_membership() {
        let files = ProjectFiles::from_config(TsConfig {
            files: None,
            include: Some(vec!["src".to_string()]),
            exclude: Some(vec!["src/**/*.test.ts".to_string()]),
        });
        assert!(files.contains("src/a.ts"));
        assert!(files.contains("src/deep/b.ts"));
        assert!(!files.contains("src/a.test.ts"));
        assert!(!files.contains("scripts/build.ts"));

        let only_files = ProjectFiles::from_config(TsConfig {
            files: Some(vec!["./main.ts".to_string()]),
            include: None,
            exclude: None,
        });
        assert!(only_files.contains("main.ts"));
        assert!(!only_files.contains("other.ts"));

        assert!(ProjectFiles::default().contains("anything.ts"));
    }

    #[test]
    fn test_provider_builds_program() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        fs::write(&file, "export function f() {}\n").unwrap();

        let provider = TreeSitterProvider::new();
        let program = provider.program(dir.path(), &file).unwrap().unwrap();
        assert_eq!(program.root_node().kind(), "program");

        let function = program.root_node().named_child(0).unwrap().named_child(0).unwrap();
        let fqn = program.semantic().declared_fqn(function).unwrap();
        assert!(fqn.as_str().ends_with("/a.ts\".f"));
    }

    #[test]
    fn test_provider_skips_files_outside_program() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tsconfig.json"), r#"{ "include": ["src"] }"#).unwrap();
        let file = dir.path().join("tool.ts");
        fs::write(&file, "export const x = 1;\n").unwrap();

        let provider = TreeSitterProvider::new();
        assert!(provider.program(dir.path(), &file).unwrap().is_none());
    }
}
