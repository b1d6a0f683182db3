//! Fully qualified names.
//!
//! An FQN is the quoted path of the declaring module followed by the
//! lexical nesting path inside it:
//!
//! ```text
//! "./src/main.ts".Outer.inner
//! ```
//!
//! Three shapes occur in practice:
//! - project declarations: module path is absolute while a file is being
//!   traversed and `./`-relative after unification
//! - package references: module path is a bare specifier (`"lodash".debounce`)
//! - unresolved references: a bare name without module part (`Promise`)

use std::fmt;

use serde::{Deserialize, Serialize};

/// A fully qualified declaration name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fqn(String);

impl Fqn {
    /// FQN of a module, i.e. its quoted path.
    pub fn module(path: &str) -> Self {
        Fqn(format!("\"{}\"", path.replace('\\', "/")))
    }

    /// Marker for a reference that could not be resolved to any module.
    pub fn unresolved(name: &str) -> Self {
        Fqn(name.to_string())
    }

    /// Wrap an already formatted FQN string.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Fqn(raw.into())
    }

    /// Append a nested declaration name.
    pub fn child(&self, name: &str) -> Self {
        Fqn(format!("{}.{}", self.0, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The unquoted module path, if this FQN has a module part.
    pub fn module_path(&self) -> Option<&str> {
        let rest = self.0.strip_prefix('"')?;
        let end = rest.find('"')?;
        Some(&rest[..end])
    }

    /// The nesting path after the module part (`Outer.inner`), if any.
    pub fn member_path(&self) -> Option<&str> {
        let module_len = self.module_path()?.len() + 2;
        self.0[module_len..].strip_prefix('.')
    }

    /// FQN of the declaring module.
    pub fn module_fqn(&self) -> Option<Fqn> {
        self.module_path().map(Fqn::module)
    }

    /// Whether this FQN names a module itself.
    pub fn is_module(&self) -> bool {
        self.module_path()
            .map(|p| p.len() + 2 == self.0.len())
            .unwrap_or(false)
    }

    /// Whether the module part is a project-relative path.
    pub fn is_project_local(&self) -> bool {
        self.module_path()
            .map(|p| p.starts_with("./"))
            .unwrap_or(false)
    }

    /// Re-express the module part relative to `root`.
    ///
    /// Absolute module paths below `root` become `./`-relative; those
    /// outside it become `../`-relative and so never count as project
    /// local. An empty root, package specifiers, unresolved names and
    /// paths that are already relative come back unchanged, so rebasing
    /// twice at the same root is a no-op.
    pub fn rebased(&self, root: &str) -> Fqn {
        let root = root.trim_end_matches('/');
        if root.is_empty() {
            return self.clone();
        }
        let Some(path) = self.module_path() else {
            return self.clone();
        };
        let relative = match path.strip_prefix(root).and_then(|rest| rest.strip_prefix('/')) {
            Some(relative) => format!("./{}", relative),
            None if path.starts_with('/') && root.starts_with('/') => relative_outside(path, root),
            None => return self.clone(),
        };

        let mut rebased = Fqn::module(&relative);
        if let Some(members) = self.member_path() {
            rebased.0.push('.');
            rebased.0.push_str(members);
        }
        rebased
    }

    /// Replace the leading `module.first` segment pair by `target`.
    ///
    /// Used when an exported name is an alias of some other declaration.
    pub fn with_head_replaced(&self, target: &Fqn) -> Fqn {
        match self.member_path().and_then(|m| m.split_once('.')) {
            Some((_, rest)) => target.child(rest),
            None => target.clone(),
        }
    }

    /// The first nesting segment (the top-level declaration name).
    pub fn head_member(&self) -> Option<&str> {
        self.member_path()
            .map(|m| m.split('.').next().unwrap_or(m))
    }
}

impl fmt::Display for Fqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fqn {
    fn from(raw: &str) -> Self {
        Fqn(raw.to_string())
    }
}

/// `../`-relative form of an absolute path lying outside `root`.
fn relative_outside(path: &str, root: &str) -> String {
    let path_parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let root_parts: Vec<&str> = root.split('/').filter(|p| !p.is_empty()).collect();
    let common = path_parts
        .iter()
        .zip(&root_parts)
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts = vec![".."; root_parts.len() - common];
    parts.extend(&path_parts[common..]);
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_and_child() {
        let module = Fqn::module("/work/app/src/main.ts");
        assert_eq!(module.as_str(), "\"/work/app/src/main.ts\"");
        assert!(module.is_module());

        let nested = module.child("Outer").child("inner");
        assert_eq!(nested.as_str(), "\"/work/app/src/main.ts\".Outer.inner");
        assert_eq!(nested.module_path(), Some("/work/app/src/main.ts"));
        assert_eq!(nested.member_path(), Some("Outer.inner"));
        assert_eq!(nested.head_member(), Some("Outer"));
        assert_eq!(nested.module_fqn(), Some(module));
        assert!(!nested.is_module());
    }

    #[test]
    fn test_rebase_under_root() {
        let fqn = Fqn::module("/work/app/src/main.ts").child("f");
        let rebased = fqn.rebased("/work/app");
        assert_eq!(rebased.as_str(), "\"./src/main.ts\".f");
        assert!(rebased.is_project_local());
    }

    #[test]
    fn test_rebase_is_idempotent() {
        let fqn = Fqn::module("/work/app/src/main.ts").child("C").child("m");
        let once = fqn.rebased("/work/app/");
        let twice = once.rebased("/work/app/");
        assert_eq!(once, twice);
        assert_eq!(once.rebased(""), once);
    }

    #[test]
    fn test_rebase_leaves_foreign_names() {
        let package = Fqn::module("lodash").child("debounce");
        assert_eq!(package.rebased("/work/app"), package);

        let unresolved = Fqn::unresolved("Promise");
        assert_eq!(unresolved.rebased("/work/app"), unresolved);
        assert_eq!(unresolved.module_path(), None);

    }

    #[test]
    fn test_rebase_outside_root() {
        let shared = Fqn::module("/work/shared/x.ts").child("X");
        let rebased = shared.rebased("/work/app");
        assert_eq!(rebased.as_str(), "\"../shared/x.ts\".X");
        assert!(!rebased.is_project_local());
        assert_eq!(rebased.rebased("/work/app"), rebased);

        // sibling directory sharing the root as a string prefix
        let sibling = Fqn::module("/work/application/x.ts").child("y");
        assert_eq!(sibling.rebased("/work/app").as_str(), "\"../application/x.ts\".y");
    }

    #[test]
    fn test_with_head_replaced() {
        let reference = Fqn::module("./src/index.ts").child("default").child("inner");
        let target = Fqn::module("./src/widget.ts").child("Widget");
        assert_eq!(
            reference.with_head_replaced(&target).as_str(),
            "\"./src/widget.ts\".Widget.inner"
        );
    }
}
