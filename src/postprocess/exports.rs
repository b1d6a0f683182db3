use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use super::PostProcessor;
use crate::concept::{ConceptKind, ConceptMap, Fqn};
use crate::error::ExtractError;

/// Bound on chains of aliased exports.
const MAX_CHAIN: usize = 16;

/// Rewrites references made through import bindings to the declarations
/// the exporting modules actually bind.
///
/// An import of `default` or of a re-exported name is recorded as
/// `"./b.ts".default` or `"./index.ts".Widget` during traversal, since the
/// importing file cannot see what `b.ts` exports. With the whole model
/// available such FQNs are replaced by the FQN of the exported declaration.
pub struct ExportResolution;

impl PostProcessor for ExportResolution {
    fn name(&self) -> &'static str {
        "export-resolution"
    }

    fn post_process(&self, concepts: &mut ConceptMap, _root: &Path) -> Result<(), ExtractError> {
        let mut table = ExportTable::build(concepts);
        concepts.visit_fqns_mut(&mut |fqn| {
            if let Some(resolved) = table.resolve(fqn) {
                *fqn = resolved;
            }
        });
        Ok(())
    }
}

type ExportKey = (Fqn, String);

#[derive(Debug, Default)]
struct ExportTable {
    /// (module, exported name) to the exported FQN.
    named: HashMap<ExportKey, Fqn>,
    /// `export * from` targets per module.
    stars: HashMap<Fqn, Vec<Fqn>>,
    declared: HashSet<Fqn>,
    resolved: HashMap<ExportKey, Option<Fqn>>,
}

impl ExportTable {
    fn build(concepts: &ConceptMap) -> Self {
        let mut table = ExportTable::default();
        for concept in concepts.get(ConceptKind::Export) {
            let Some(export) = concept.as_export() else {
                continue;
            };
            let module = export.source_file_path.clone();
            if export.identifier == "*" && export.alias.is_none() {
                table
                    .stars
                    .entry(module)
                    .or_default()
                    .push(export.decl_fqn.clone());
            } else {
                table
                    .named
                    .entry((module, export.exported_name().to_string()))
                    .or_insert_with(|| export.decl_fqn.clone());
            }
        }
        for (kind, list) in concepts.iter() {
            if kind.is_fqn_identified() {
                table
                    .declared
                    .extend(list.iter().filter_map(|c| c.fqn().cloned()));
            }
        }
        table
    }

    /// The FQN `fqn` denotes once exports are followed, or `None` when it
    /// names a declaration already (or nothing known).
    fn resolve(&mut self, fqn: &Fqn) -> Option<Fqn> {
        let module = fqn.module_fqn()?;
        let head = fqn.head_member()?;
        let key = (module, head.to_string());
        let target = match self.resolved.get(&key) {
            Some(target) => target.clone(),
            None => {
                let target = self.denote(&key.0, &key.1, &mut HashSet::new(), 0);
                self.resolved.insert(key.clone(), target.clone());
                target
            }
        };
        let target = target?;
        if target == key.0.child(&key.1) {
            return None;
        }
        Some(fqn.with_head_replaced(&target))
    }

    /// Declaration bound to `name` in `module`. Named exports are searched
    /// breadth-first along `export *` edges, visiting each module once; each
    /// (module, name) pair is entered at most once per lookup.
    fn denote(&self, module: &Fqn, name: &str, seen: &mut HashSet<ExportKey>, depth: usize) -> Option<Fqn> {
        if depth > MAX_CHAIN || !seen.insert((module.clone(), name.to_string())) {
            return None;
        }
        let own = module.child(name);
        if self.declared.contains(&own) {
            return Some(own);
        }

        let mut queue = VecDeque::from([module.clone()]);
        let mut visited: HashSet<Fqn> = HashSet::from([module.clone()]);
        while let Some(current) = queue.pop_front() {
            if let Some(target) = self.named.get(&(current.clone(), name.to_string())) {
                return Some(self.follow(target, seen, depth));
            }
            let candidate = current.child(name);
            if current != *module && self.declared.contains(&candidate) {
                return Some(candidate);
            }
            for star in self.stars.get(&current).into_iter().flatten() {
                if visited.insert(star.clone()) {
                    queue.push_back(star.clone());
                }
            }
        }
        None
    }

    /// Follow an export target further; a target that leads nowhere is
    /// kept as is.
    fn follow(&self, target: &Fqn, seen: &mut HashSet<ExportKey>, depth: usize) -> Fqn {
        let next = match (target.module_fqn(), target.head_member()) {
            (Some(module), Some(head)) => self.denote(&module, head, seen, depth + 1),
            _ => None,
        };
        match next {
            Some(next) => target.with_head_replaced(&next),
            None => target.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::{
        Concept, Coordinates, DependencyEdge, ExportDeclaration, ExportKind, FunctionDeclaration,
        ImportDeclaration, ReferenceKind, TypeDesc,
    };

    fn function(module: &str, name: &str) -> Concept {
        Concept::Function(FunctionDeclaration {
            fqn: Fqn::module(module).child(name),
            function_name: name.to_string(),
            parameters: Vec::new(),
            return_type: TypeDesc::primitive("void"),
            type_parameters: Vec::new(),
            is_async: false,
            coordinates: Coordinates {
                file_name: module.to_string(),
                start_line: 1,
                start_column: 1,
                end_line: 1,
                end_column: 1,
            },
        })
    }

    fn export(module: &str, identifier: &str, alias: Option<&str>, decl: Fqn, is_default: bool) -> Concept {
        Concept::Export(ExportDeclaration {
            identifier: identifier.to_string(),
            alias: alias.map(str::to_string),
            decl_fqn: decl,
            is_default,
            kind: ExportKind::Value,
            source_file_path: Fqn::module(module),
        })
    }

    fn edge(target: Fqn) -> Concept {
        Concept::DependencyEdge(DependencyEdge {
            source_fqn: Fqn::module("./main.ts").child("run"),
            target_fqn: target,
            reference_kind: ReferenceKind::Call,
        })
    }

    fn resolve(map: &mut ConceptMap) -> Vec<String> {
        ExportResolution.post_process(map, Path::new("/")).unwrap();
        map.get(ConceptKind::DependencyEdge)
            .iter()
            .filter_map(|c| c.as_dependency_edge())
            .map(|e| e.target_fqn.to_string())
            .collect()
    }

    #[test]
    fn test_default_and_alias_exports() {
        let mut map = ConceptMap::new();
        map.push(function("./b.ts", "impl"));
        map.push(export("./b.ts", "impl", None, Fqn::module("./b.ts").child("impl"), true));
        map.push(export("./b.ts", "impl", Some("run2"), Fqn::module("./b.ts").child("impl"), false));
        map.push(edge(Fqn::module("./b.ts").child("default")));
        map.push(edge(Fqn::module("./b.ts").child("run2")));
        map.push(edge(Fqn::module("./b.ts").child("impl")));
        assert_eq!(
            resolve(&mut map),
            vec!["\"./b.ts\".impl", "\"./b.ts\".impl", "\"./b.ts\".impl"]
        );
    }

    #[test]
    fn test_reexport_chains() {
        let mut map = ConceptMap::new();
        map.push(function("./w.ts", "w"));
        map.push(function("./u.ts", "u"));
        map.push(export("./w.ts", "w", None, Fqn::module("./w.ts").child("w"), false));
        map.push(export("./index.ts", "w", Some("Widget"), Fqn::module("./w.ts").child("w"), false));
        map.push(export("./index.ts", "*", None, Fqn::module("./u.ts"), false));
        map.push(export("./u.ts", "u", None, Fqn::module("./u.ts").child("u"), false));
        map.push(edge(Fqn::module("./index.ts").child("Widget")));
        map.push(edge(Fqn::module("./index.ts").child("u")));
        map.push(edge(Fqn::module("./index.ts").child("missing")));
        map.push(Concept::Import(ImportDeclaration {
            importer: Fqn::module("./main.ts"),
            source: "./index".to_string(),
            imported_name: "Widget".to_string(),
            alias: None,
            target: Fqn::module("./index.ts").child("Widget"),
            is_type_only: false,
        }));

        assert_eq!(
            resolve(&mut map),
            vec!["\"./w.ts\".w", "\"./u.ts\".u", "\"./index.ts\".missing"]
        );
        let import = map.get(ConceptKind::Import)[0].as_import().unwrap();
        assert_eq!(import.target.as_str(), "\"./w.ts\".w");
    }

    #[test]
    fn test_cycles_terminate() {
        let mut map = ConceptMap::new();
        map.push(export("./a.ts", "x", Some("y"), Fqn::module("./b.ts").child("y"), false));
        map.push(export("./b.ts", "y", Some("y"), Fqn::module("./a.ts").child("y"), false));
        map.push(edge(Fqn::module("./a.ts").child("y")));
        let targets = resolve(&mut map);
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn test_declarations_are_never_renamed() {
        let mut map = ConceptMap::new();
        map.push(function("./a.ts", "h"));
        map.push(function("./a.ts", "g"));
        map.push(export("./a.ts", "g", Some("h"), Fqn::module("./a.ts").child("g"), false));
        ExportResolution.post_process(&mut map, Path::new("/")).unwrap();
        let fqns: Vec<&str> = map
            .get(ConceptKind::Function)
            .iter()
            .filter_map(|c| c.fqn())
            .map(Fqn::as_str)
            .collect();
        assert_eq!(fqns, vec!["\"./a.ts\".h", "\"./a.ts\".g"]);
    }

    #[test]
    fn test_star_cycles_between_barrels() {
        let barrels: Vec<String> = (1..=5).map(|i| format!("./b{i}.ts")).collect();
        let mut map = ConceptMap::new();
        for from in &barrels {
            for to in &barrels {
                if from != to {
                    map.push(export(from, "*", None, Fqn::module(to), false));
                }
            }
        }
        map.push(function("./c.ts", "found"));
        map.push(export("./b4.ts", "*", None, Fqn::module("./c.ts"), false));
        map.push(edge(Fqn::module("./b1.ts").child("Missing")));
        map.push(edge(Fqn::module("./b2.ts").child("found")));
        map.push(edge(Fqn::module("./b4.ts").child("found")));

        assert_eq!(
            resolve(&mut map),
            vec!["\"./b1.ts\".Missing", "\"./c.ts\".found", "\"./c.ts\".found"]
        );
    }
}
