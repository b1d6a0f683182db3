//! End-to-end tests for the extraction pipeline over temporary projects.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use lce::concept::{Concept, ConceptKind, ConceptMap, Dependency, Project};
use lce::postprocess::run_post_processors;
use lce::source::{SourceProvider, TreeSitterProvider};
use lce::{report, ExtractError, ExtractorConfig, Extractor, Fqn, TraversalContext, Traverser, Unifier};

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("should create temp dir");
    for (name, text) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }
    dir
}

fn dependencies(concepts: &ConceptMap) -> Vec<&Dependency> {
    concepts
        .get(ConceptKind::Dependency)
        .iter()
        .filter_map(Concept::as_dependency)
        .collect()
}

fn find<'a>(concepts: &'a ConceptMap, source: &str, target: &str) -> Option<&'a Dependency> {
    dependencies(concepts)
        .into_iter()
        .find(|d| d.source_fqn.as_str() == source && d.target_fqn.as_str() == target)
}

/// Per-file maps, each traversed and unified at the root.
fn file_maps(root: &Path, names: &[&str]) -> Vec<ConceptMap> {
    let provider = TreeSitterProvider::new();
    names
        .iter()
        .map(|name| {
            let program = provider.program(root, &root.join(name)).unwrap().unwrap();
            let ctx = TraversalContext::new(root, &program);
            let map = Traverser::default().traverse(&ctx).unwrap();
            Unifier::for_path(root).unify(map).unwrap()
        })
        .collect()
}

fn finish(root: &Path, maps: Vec<ConceptMap>) -> ConceptMap {
    let mut seed = ConceptMap::new();
    seed.push(Concept::Project(Project {
        root_path: root.display().to_string(),
    }));
    let merged = maps.into_iter().fold(seed, ConceptMap::merge);
    let mut concepts = Unifier::global().unify(merged).unwrap();
    run_post_processors(&mut concepts, root).unwrap();
    concepts
}

#[test]
fn test_cross_file_type_reference() {
    let dir = project(&[
        ("a.ts", "import { B } from \"./b\";\nexport function f(p: B): void {}\n"),
        ("b.ts", "export class B {}\n"),
    ]);
    let concepts = lce::process_project(dir.path()).unwrap();

    let dependency = find(&concepts, "\"./a.ts\".f", "\"./b.ts\".B").expect("f should depend on B");
    assert_eq!(dependency.cardinality, 1);
    assert_eq!(dependency.target_type, "class-declaration");

    let import = find(&concepts, "\"./a.ts\"", "\"./b.ts\".B").expect("module should import B");
    assert_eq!(import.cardinality, 1);

    let module_dependencies: Vec<_> = concepts
        .get(ConceptKind::ModuleDependency)
        .iter()
        .filter_map(Concept::as_module_dependency)
        .collect();
    assert_eq!(module_dependencies.len(), 1);
    assert_eq!(module_dependencies[0].source_module, Fqn::module("./a.ts"));
    assert_eq!(module_dependencies[0].target_module, Fqn::module("./b.ts"));
    assert_eq!(module_dependencies[0].cardinality, 2);
}

#[test]
fn test_external_references_are_kept() {
    let dir = project(&[(
        "main.ts",
        "import { debounce } from \"lodash\";\nexport function run() { debounce(); Math.max(1, 2); }\n",
    )]);
    let concepts = lce::process_project(dir.path()).unwrap();

    let package = find(&concepts, "\"./main.ts\".run", "\"lodash\".debounce").unwrap();
    assert!(package.is_external());
    let global = find(&concepts, "\"./main.ts\".run", "Math").unwrap();
    assert!(global.is_external());
    assert!(concepts.get(ConceptKind::ModuleDependency).is_empty());
}

#[test]
fn test_imports_outside_the_root_are_relative() {
    let dir = project(&[
        ("app/main.ts", "import { X } from \"../shared/x\";\nexport function run(x: X) {}\n"),
        ("shared/x.ts", "export interface X {}\n"),
    ]);
    let concepts = lce::process_project(&dir.path().join("app")).unwrap();

    let dependency = find(&concepts, "\"./main.ts\".run", "\"../shared/x.ts\".X").unwrap();
    assert!(dependency.is_external());
    assert_eq!(concepts.get(ConceptKind::Module).len(), 1);
    assert!(concepts.get(ConceptKind::ModuleDependency).is_empty());
}

#[test]
fn test_default_import_resolves_to_declaration() {
    let dir = project(&[
        ("main.ts", "import make from \"./factory\";\nexport function run() { make(); }\n"),
        ("factory.ts", "function create() { return 1; }\nexport default create;\n"),
    ]);
    let concepts = lce::process_project(dir.path()).unwrap();

    let call = find(&concepts, "\"./main.ts\".run", "\"./factory.ts\".create").unwrap();
    assert_eq!(call.target_type, "function-declaration");
    let import = concepts
        .get(ConceptKind::Import)
        .iter()
        .filter_map(Concept::as_import)
        .next()
        .unwrap();
    assert_eq!(import.target.as_str(), "\"./factory.ts\".create");
}

#[test]
fn test_same_named_nested_functions() {
    let dir = project(&[(
        "main.ts",
        "function a() { function helper() {} helper(); }\nfunction b() { function helper() {} helper(); }\n",
    )]);
    let concepts = lce::process_project(dir.path()).unwrap();

    let mut fqns: Vec<&str> = concepts
        .get(ConceptKind::Function)
        .iter()
        .filter_map(Concept::fqn)
        .map(Fqn::as_str)
        .collect();
    fqns.sort();
    assert_eq!(
        fqns,
        vec![
            "\"./main.ts\".a",
            "\"./main.ts\".a.helper",
            "\"./main.ts\".b",
            "\"./main.ts\".b.helper",
        ]
    );
    assert!(find(&concepts, "\"./main.ts\".a", "\"./main.ts\".a.helper").is_some());
    assert!(find(&concepts, "\"./main.ts\".b", "\"./main.ts\".b.helper").is_some());
}

#[test]
fn test_skipped_files_contribute_nothing() {
    let dir = project(&[
        ("tsconfig.json", "{\n  // sources only\n  \"include\": [\"src/**/*\"],\n}\n"),
        ("src/ok.ts", "export const ok = true;\n"),
        ("src/broken.ts", "export const = ;\n"),
        ("tools/gen.ts", "export const gen = 1;\n"),
    ]);
    let result = Extractor::new(TreeSitterProvider::new(), ExtractorConfig::default())
        .process_project(dir.path())
        .unwrap();

    assert_eq!(result.report.files.len(), 3);
    assert_eq!(result.report.processed(), 1);
    assert_eq!(result.report.failed(), 1);
    assert_eq!(result.report.without_program(), 1);
    assert_eq!(result.concepts.get(ConceptKind::Module).len(), 1);
    assert_eq!(result.concepts.get(ConceptKind::Variable).len(), 1);
}

#[test]
fn test_configured_exclusions() {
    let dir = project(&[
        ("lce.yaml", "excludedPaths:\n  - \"generated/**\"\nincludeTestFiles: false\n"),
        ("app.ts", "export const app = 1;\n"),
        ("app.test.ts", "export const t = 1;\n"),
        ("generated/api.ts", "export const api = 1;\n"),
    ]);
    let concepts = lce::process_project(dir.path()).unwrap();
    let paths: Vec<&str> = concepts
        .get(ConceptKind::Module)
        .iter()
        .filter_map(Concept::as_module)
        .map(|m| m.path.as_str())
        .collect();
    assert_eq!(paths, vec!["./app.ts"]);
}

#[test]
fn test_merge_order_does_not_change_dependencies() {
    let dir = project(&[
        ("a.ts", "import { g } from \"./b\";\nexport function f() { g(); g(); }\n"),
        ("b.ts", "import { f } from \"./a\";\nexport function g() { f(); }\n"),
        ("c.ts", "import * as b from \"./b\";\nexport const h = () => b.g();\n"),
    ]);
    let root = dir.path().canonicalize().unwrap();
    let names = ["a.ts", "b.ts", "c.ts"];

    let forward = finish(&root, file_maps(&root, &names));
    let mut reversed_maps = file_maps(&root, &names);
    reversed_maps.reverse();
    let reversed = finish(&root, reversed_maps);

    assert_eq!(
        forward.get(ConceptKind::Dependency),
        reversed.get(ConceptKind::Dependency)
    );
    assert_eq!(
        forward.get(ConceptKind::ModuleDependency),
        reversed.get(ConceptKind::ModuleDependency)
    );
    let twice = find(&forward, "\"./a.ts\".f", "\"./b.ts\".g").unwrap();
    assert_eq!(twice.cardinality, 2);
}

#[test]
fn test_unification_is_idempotent() {
    let dir = project(&[
        ("src/a.ts", "import { B } from \"./b\";\nexport class A extends B { run(): B { return this; } }\n"),
        ("src/b.ts", "export class B {}\nexport const limit = 10;\n"),
    ]);
    let root = dir.path().canonicalize().unwrap();
    let concepts = lce::process_project(&root).unwrap();

    let again = Unifier::for_path(&root).unify(concepts.clone()).unwrap();
    assert_eq!(again, concepts);
    let global = Unifier::global().unify(concepts.clone()).unwrap();
    assert_eq!(global, concepts);
    assert!(concepts.duplicate_fqns().is_empty());
}

#[test]
fn test_json_roundtrip_of_project_model() {
    let dir = project(&[
        ("main.ts", "export enum Mode { A = 1, B = \"b\" }\nexport const big = 12345678901234567890n;\nexport interface Shape { area(): number }\n"),
    ]);
    let concepts = lce::process_project(dir.path()).unwrap();
    let json = report::to_json(&concepts, true).unwrap();
    assert!(json.contains("\"enum-declaration\""));
    assert!(json.contains("\"12345678901234567890\""));
    assert_eq!(report::from_json(&json).unwrap(), concepts);
}

#[test]
fn test_missing_project_seed_fails_the_run() {
    let dir = project(&[("a.ts", "export function f() {}\nf();\n")]);
    let root = dir.path().canonicalize().unwrap();
    let merged = file_maps(&root, &["a.ts"])
        .into_iter()
        .fold(ConceptMap::new(), ConceptMap::merge);
    let mut concepts = Unifier::global().unify(merged).unwrap();

    let err = run_post_processors(&mut concepts, &root).unwrap_err();
    assert!(matches!(err, ExtractError::Invariant(_)));
}

#[test]
fn test_conflicting_project_seeds_are_rejected() {
    let mut map = ConceptMap::new();
    for root in ["/one", "/two"] {
        map.push(Concept::Project(Project {
            root_path: root.to_string(),
        }));
    }
    let err = Unifier::global().unify(map).unwrap_err();
    assert!(matches!(err, ExtractError::Invariant(_)));
}
