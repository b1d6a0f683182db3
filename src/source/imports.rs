//! Module specifier resolution.

use std::path::{Component, Path, PathBuf};

use crate::concept::Fqn;

/// Resolves import specifiers written in one file to module FQNs.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    importer_dir: PathBuf,
}

impl ModuleResolver {
    pub fn for_file(file: &Path) -> Self {
        Self {
            importer_dir: file.parent().map(Path::to_path_buf).unwrap_or_default(),
        }
    }

    /// FQN of the module a specifier denotes.
    ///
    /// Relative specifiers are resolved against the file system the way the
    /// compiler's module resolution does for plain `.ts` projects; when no
    /// candidate exists the lexical path with a `.ts` extension is used, so
    /// the reference is still recorded. Bare specifiers name packages and
    /// are kept verbatim.
    pub fn resolve(&self, specifier: &str) -> Fqn {
        if !is_path_specifier(specifier) {
            return Fqn::module(specifier);
        }
        let base = normalize(&self.importer_dir.join(specifier));
        let located = candidates(&base)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .unwrap_or_else(|| fallback(&base));
        Fqn::module(&path_string(&located))
    }
}

pub fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier == "."
        || specifier == ".."
        || Path::new(specifier).is_absolute()
}

/// Forward-slashed string form of a path.
pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Resolve `.` and `..` components without touching the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

const JS_TO_TS: [(&str, &str); 4] = [(".js", ".ts"), (".jsx", ".tsx"), (".mjs", ".mts"), (".cjs", ".cts")];

fn has_ts_extension(path: &str) -> bool {
    [".ts", ".tsx", ".mts", ".cts"]
        .iter()
        .any(|ext| path.ends_with(ext))
}

fn candidates(base: &Path) -> Vec<PathBuf> {
    let raw = path_string(base);
    let mut out = Vec::new();
    for (js, ts) in JS_TO_TS {
        if let Some(stem) = raw.strip_suffix(js) {
            out.push(PathBuf::from(format!("{}{}", stem, ts)));
        }
    }
    if has_ts_extension(&raw) {
        out.push(base.to_path_buf());
    }
    for ext in [".ts", ".tsx", ".d.ts"] {
        out.push(PathBuf::from(format!("{}{}", raw, ext)));
    }
    out.push(base.join("index.ts"));
    out.push(base.join("index.tsx"));
    out
}

fn fallback(base: &Path) -> PathBuf {
    let raw = path_string(base);
    if has_ts_extension(&raw) {
        return base.to_path_buf();
    }
    for (js, ts) in JS_TO_TS {
        if let Some(stem) = raw.strip_suffix(js) {
            return PathBuf::from(format!("{}{}", stem, ts));
        }
    }
    PathBuf::from(format!("{}.ts", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_bare_specifier_is_package() {
        let resolver = ModuleResolver::for_file(Path::new("/p/src/a.ts"));
        assert_eq!(resolver.resolve("lodash").as_str(), "\"lodash\"");
        assert_eq!(resolver.resolve("@scope/pkg/sub").as_str(), "\"@scope/pkg/sub\"");
    }

    #[test]
    fn test_missing_relative_falls_back_to_lexical_path() {
        let resolver = ModuleResolver::for_file(Path::new("/p/src/a.ts"));
        assert_eq!(resolver.resolve("./b").as_str(), "\"/p/src/b.ts\"");
        assert_eq!(resolver.resolve("../lib/c.js").as_str(), "\"/p/lib/c.ts\"");
    }

    #[test]
    fn test_resolves_existing_files() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("widgets")).unwrap();
        fs::write(src.join("a.ts"), "").unwrap();
        fs::write(src.join("view.tsx"), "").unwrap();
        fs::write(src.join("widgets/index.ts"), "").unwrap();

        let resolver = ModuleResolver::for_file(&src.join("a.ts"));
        let expect = |relative: &str| Fqn::module(&path_string(&src.join(relative)));
        assert_eq!(resolver.resolve("./view"), expect("view.tsx"));
        assert_eq!(resolver.resolve("./widgets"), expect("widgets/index.ts"));
        assert_eq!(resolver.resolve("./a.js"), expect("a.ts"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/p/src/../lib/./x")), PathBuf::from("/p/lib/x"));
    }
}
