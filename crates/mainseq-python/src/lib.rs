use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator, Tree};
use walkdir::WalkDir;

use mainseq_core::config::ProjectConfig;
use mainseq_core::scanner::{ScanOutput, SourceScanner};
use mainseq_core::types::{
    ClassFact, ComponentDescriptor, ComponentId, ComponentKind, DependencyFact,
};

/// Base class names that mark a class as explicitly abstract.
const ABSTRACT_BASE_NAMES: &[&str] = &["ABC", "ABCMeta", "Protocol"];

/// Python source scanner using tree-sitter.
///
/// Discovery follows the import system: a directory is a package only if it
/// holds an `__init__.py`, and a module is reachable only through package
/// directories. Identifiers are dotted paths relative to the scanned root.
pub struct PythonScanner {
    language: Language,
    class_query: Query,
    import_query: Query,
    import_from_query: Query,
    exclude: GlobSet,
}

/// One raw import reference before resolution. `level` counts leading dots
/// (0 for absolute imports), `member` is the imported name in a
/// `from x import y` form.
#[derive(Debug, Clone)]
struct RawImport {
    level: usize,
    module: Option<String>,
    member: Option<String>,
}

/// Discovered components with their source files and the namespace used for
/// import resolution.
struct ModuleTable {
    files: Vec<(ComponentId, ComponentKind, PathBuf)>,
    namespace: BTreeSet<String>,
}

impl PythonScanner {
    pub fn new(config: &ProjectConfig) -> Result<Self> {
        let language: Language = tree_sitter_python::LANGUAGE.into();

        let class_query = Query::new(&language, r#"(class_definition) @class"#)
            .context("failed to compile class query")?;
        let import_query = Query::new(&language, r#"(import_statement) @import"#)
            .context("failed to compile import query")?;
        let import_from_query = Query::new(&language, r#"(import_from_statement) @import"#)
            .context("failed to compile import-from query")?;

        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude_patterns {
            let glob = Glob::new(pattern)
                .with_context(|| format!("invalid exclude pattern '{pattern}'"))?;
            builder.add(glob);
        }
        let exclude = builder.build().context("failed to build exclude set")?;

        Ok(Self {
            language,
            class_query,
            import_query,
            import_from_query,
            exclude,
        })
    }

    fn parse(&self, content: &str) -> Result<Tree> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .context("failed to set Python language")?;
        parser
            .parse(content, None)
            .context("failed to parse Python file")
    }

    /// Enumerate modules and packages under `root`.
    fn discover(&self, root: &Path) -> Result<ModuleTable> {
        let mut rel_files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    eprintln!("Warning: {e}");
                    continue;
                }
            };
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "py") {
                continue;
            }
            let rel = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            if self.exclude.is_match(&rel_str) {
                continue;
            }
            rel_files.push(rel);
        }

        let package_dirs: BTreeSet<PathBuf> = rel_files
            .iter()
            .filter(|p| p.file_name().is_some_and(|n| n == "__init__.py"))
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect();

        let mut files = Vec::new();
        let mut namespace = BTreeSet::new();
        for rel in &rel_files {
            let Some(parent) = rel.parent() else { continue };
            if !ancestors_are_packages(parent, &package_dirs) {
                continue;
            }

            let is_init = rel.file_name().is_some_and(|n| n == "__init__.py");
            let (id, kind) = if is_init {
                if parent.as_os_str().is_empty() {
                    // an __init__.py directly at the root has no name
                    // relative to the analyzed tree
                    continue;
                }
                (dotted(parent), ComponentKind::Package)
            } else {
                let stem = match rel.file_stem() {
                    Some(stem) => stem.to_string_lossy().to_string(),
                    None => continue,
                };
                let id = if parent.as_os_str().is_empty() {
                    stem
                } else {
                    format!("{}.{stem}", dotted(parent))
                };
                (id, ComponentKind::Module)
            };

            namespace.insert(id.clone());
            files.push((ComponentId::new(&id), kind, root.join(rel)));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(ModuleTable { files, namespace })
    }

    fn extract_class_facts(&self, tree: &Tree, content: &str, owner: &ComponentId) -> Vec<ClassFact> {
        let mut facts = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.class_query, tree.root_node(), content.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                facts.push(class_fact(capture.node, content, owner));
            }
        }
        facts
    }

    fn extract_imports(&self, tree: &Tree, content: &str) -> Vec<RawImport> {
        let mut imports = Vec::new();

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.import_query, tree.root_node(), content.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                collect_plain_import(capture.node, content, &mut imports);
            }
        }

        let mut cursor = QueryCursor::new();
        let mut matches =
            cursor.matches(&self.import_from_query, tree.root_node(), content.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                collect_from_import(capture.node, content, &mut imports);
            }
        }

        imports
    }
}

impl SourceScanner for PythonScanner {
    fn language(&self) -> &'static str {
        "python"
    }

    fn scan(&self, root: &Path) -> Result<ScanOutput> {
        let table = self.discover(root)?;

        let parsed: Vec<(ComponentId, ComponentKind, Vec<ClassFact>, Vec<RawImport>)> = table
            .files
            .par_iter()
            .filter_map(|(id, kind, path)| {
                let content = match std::fs::read_to_string(path) {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("Warning: failed to read {}: {e}", path.display());
                        return None;
                    }
                };
                let tree = match self.parse(&content) {
                    Ok(t) => t,
                    Err(e) => {
                        eprintln!("Warning: failed to parse {}: {e}", path.display());
                        return None;
                    }
                };
                let classes = self.extract_class_facts(&tree, &content, id);
                let imports = self.extract_imports(&tree, &content);
                Some((id.clone(), *kind, classes, imports))
            })
            .collect();

        let mut output = ScanOutput::default();
        for (id, kind, _) in &table.files {
            output.descriptors.push(ComponentDescriptor {
                identifier: id.clone(),
                kind: *kind,
            });
        }
        for (id, kind, classes, imports) in parsed {
            output.class_facts.extend(classes);
            for import in imports {
                let target = resolve_import(&id, kind, &import, &table.namespace);
                output.dependency_facts.push(DependencyFact {
                    origin: id.clone(),
                    target,
                });
            }
        }

        Ok(output)
    }
}

/// Every directory between the root and `dir` (inclusive) must be a package
/// for its files to be importable.
fn ancestors_are_packages(dir: &Path, packages: &BTreeSet<PathBuf>) -> bool {
    let mut current = dir;
    loop {
        if current.as_os_str().is_empty() {
            return true;
        }
        if !packages.contains(current) {
            return false;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return true,
        }
    }
}

fn dotted(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(".")
}

fn node_text(node: Node, content: &str) -> String {
    content[node.byte_range()].to_string()
}

fn class_fact(node: Node, content: &str, owner: &ComponentId) -> ClassFact {
    let explicit_abstract_marker = node
        .child_by_field_name("superclasses")
        .map(|args| has_abstract_base(args, content))
        .unwrap_or(false);

    let mut has_unimplemented_members = false;
    let mut has_public_constructor = false;
    if let Some(body) = node.child_by_field_name("body") {
        let mut walk = body.walk();
        for child in body.named_children(&mut walk) {
            let (func, decorated) = match child.kind() {
                "function_definition" => (Some(child), None),
                "decorated_definition" => (
                    child
                        .child_by_field_name("definition")
                        .filter(|d| d.kind() == "function_definition"),
                    Some(child),
                ),
                _ => (None, None),
            };
            let Some(func) = func else { continue };

            let abstract_decorator = decorated
                .map(|d| decorator_marks_abstract(d, content))
                .unwrap_or(false);
            if abstract_decorator || only_raises_not_implemented(func, content) {
                has_unimplemented_members = true;
            }
            let is_init = func
                .child_by_field_name("name")
                .map(|n| node_text(n, content) == "__init__")
                .unwrap_or(false);
            if is_init {
                has_public_constructor = true;
            }
        }
    }

    ClassFact {
        owner: owner.clone(),
        has_unimplemented_members,
        explicit_abstract_marker,
        has_public_constructor,
    }
}

fn has_abstract_base(args: Node, content: &str) -> bool {
    let mut walk = args.walk();
    for child in args.named_children(&mut walk) {
        let text = node_text(child, content);
        if child.kind() == "keyword_argument" {
            if text.replace(' ', "").starts_with("metaclass=") && text.ends_with("ABCMeta") {
                return true;
            }
        } else {
            let base = text.rsplit('.').next().unwrap_or("");
            let base = base.split('[').next().unwrap_or("");
            if ABSTRACT_BASE_NAMES.contains(&base) {
                return true;
            }
        }
    }
    false
}

fn decorator_marks_abstract(decorated: Node, content: &str) -> bool {
    let mut walk = decorated.walk();
    for child in decorated.named_children(&mut walk) {
        if child.kind() == "decorator" && node_text(child, content).contains("abstractmethod") {
            return true;
        }
    }
    false
}

fn only_raises_not_implemented(func: Node, content: &str) -> bool {
    let Some(body) = func.child_by_field_name("body") else {
        return false;
    };
    let mut walk = body.walk();
    let mut statements: Vec<Node> = body.named_children(&mut walk).collect();

    // a docstring does not make the body implemented
    if let Some(first) = statements.first() {
        let is_docstring = first.kind() == "expression_statement"
            && first.named_child(0).is_some_and(|n| n.kind() == "string");
        if is_docstring {
            statements.remove(0);
        }
    }

    statements.len() == 1
        && statements[0].kind() == "raise_statement"
        && node_text(statements[0], content).contains("NotImplementedError")
}

fn collect_plain_import(node: Node, content: &str, out: &mut Vec<RawImport>) {
    let mut walk = node.walk();
    for name in node.children_by_field_name("name", &mut walk) {
        let module = match name.kind() {
            "aliased_import" => name
                .child_by_field_name("name")
                .map(|n| node_text(n, content)),
            _ => Some(node_text(name, content)),
        };
        if let Some(module) = module {
            out.push(RawImport {
                level: 0,
                module: Some(module),
                member: None,
            });
        }
    }
}

fn collect_from_import(node: Node, content: &str, out: &mut Vec<RawImport>) {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return;
    };
    let (level, module) = match module_node.kind() {
        "relative_import" => {
            let text = node_text(module_node, content);
            let level = text.chars().take_while(|c| *c == '.').count();
            let rest = text.trim_start_matches('.');
            let module = (!rest.is_empty()).then(|| rest.to_string());
            (level, module)
        }
        _ => (0, Some(node_text(module_node, content))),
    };

    let mut walk = node.walk();
    let mut pushed = false;
    for name in node.children_by_field_name("name", &mut walk) {
        let member = match name.kind() {
            "aliased_import" => name
                .child_by_field_name("name")
                .map(|n| node_text(n, content)),
            _ => Some(node_text(name, content)),
        };
        out.push(RawImport {
            level,
            module: module.clone(),
            member,
        });
        pushed = true;
    }
    if !pushed {
        // `from x import *` is a single reference to the module
        out.push(RawImport {
            level,
            module,
            member: None,
        });
    }
}

/// Resolve one raw import against the discovered namespace. Unresolvable
/// references (standard library, third-party, or dots escaping the root)
/// classify as external downstream.
fn resolve_import(
    origin: &ComponentId,
    kind: ComponentKind,
    import: &RawImport,
    namespace: &BTreeSet<String>,
) -> Option<ComponentId> {
    let full = if import.level == 0 {
        import.module.clone()?
    } else {
        let mut parts: Vec<&str> = origin.as_str().split('.').collect();
        // the first dot refers to the origin's own package
        let drops = match kind {
            ComponentKind::Package => import.level - 1,
            ComponentKind::Module => import.level,
        };
        if drops > parts.len() {
            return None;
        }
        parts.truncate(parts.len() - drops);
        let base = parts.join(".");
        match (&import.module, base.is_empty()) {
            (Some(module), true) => module.clone(),
            (Some(module), false) => format!("{base}.{module}"),
            (None, true) => return None,
            (None, false) => base,
        }
    };

    // longest matching dotted prefix wins, starting with the imported member
    let mut candidate = match &import.member {
        Some(member) => format!("{full}.{member}"),
        None => full,
    };
    loop {
        if namespace.contains(candidate.as_str()) {
            return Some(ComponentId::new(&candidate));
        }
        match candidate.rfind('.') {
            Some(pos) => candidate.truncate(pos),
            None => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn scan(root: &Path) -> ScanOutput {
        PythonScanner::new(&ProjectConfig::default())
            .unwrap()
            .scan(root)
            .unwrap()
    }

    fn descriptor_ids(output: &ScanOutput) -> Vec<(&str, ComponentKind)> {
        output
            .descriptors
            .iter()
            .map(|d| (d.identifier.as_str(), d.kind))
            .collect()
    }

    #[test]
    fn test_discovers_modules_and_packages() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/__init__.py", "");
        write(dir.path(), "app/core.py", "");
        write(dir.path(), "util.py", "");
        // not a package: no __init__.py
        write(dir.path(), "scripts/tool.py", "");

        let output = scan(dir.path());
        assert_eq!(
            descriptor_ids(&output),
            vec![
                ("app", ComponentKind::Package),
                ("app.core", ComponentKind::Module),
                ("util", ComponentKind::Module),
            ]
        );
    }

    #[test]
    fn test_exclude_patterns_skip_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/__init__.py", "");
        write(dir.path(), "app/__pycache__/junk.py", "");

        let output = scan(dir.path());
        assert_eq!(descriptor_ids(&output), vec![("app", ComponentKind::Package)]);
    }

    #[test]
    fn test_abc_base_is_explicit_marker() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "base.py",
            r#"
from abc import ABC, abstractmethod


class Loader(ABC):
    @abstractmethod
    def load(self):
        ...
"#,
        );

        let output = scan(dir.path());
        assert_eq!(output.class_facts.len(), 1);
        let fact = &output.class_facts[0];
        assert!(fact.explicit_abstract_marker, "ABC base marks the class abstract");
        assert!(fact.has_unimplemented_members, "abstractmethod is unimplemented");
        assert!(!fact.has_public_constructor);
    }

    #[test]
    fn test_abcmeta_metaclass_is_explicit_marker() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "base.py",
            r#"
import abc


class Component(metaclass=abc.ABCMeta):
    pass
"#,
        );

        let output = scan(dir.path());
        assert!(output.class_facts[0].explicit_abstract_marker);
    }

    #[test]
    fn test_not_implemented_only_body_is_unimplemented() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "base.py",
            r#"
class Loader:
    def load(self):
        raise NotImplementedError()
"#,
        );

        let output = scan(dir.path());
        let fact = &output.class_facts[0];
        assert!(!fact.explicit_abstract_marker);
        assert!(fact.has_unimplemented_members);
    }

    #[test]
    fn test_plain_class_is_concrete_with_constructor() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "impl.py",
            r#"
class Store:
    def __init__(self, path):
        self.path = path

    def save(self):
        return self.path
"#,
        );

        let output = scan(dir.path());
        let fact = &output.class_facts[0];
        assert!(!fact.explicit_abstract_marker);
        assert!(!fact.has_unimplemented_members);
        assert!(fact.has_public_constructor);
    }

    #[test]
    fn test_absolute_import_resolution() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/__init__.py", "");
        write(dir.path(), "app/util.py", "");
        write(
            dir.path(),
            "app/core.py",
            "import json\nfrom app.util import helper\n",
        );

        let output = scan(dir.path());
        let core_deps: Vec<_> = output
            .dependency_facts
            .iter()
            .filter(|d| d.origin.as_str() == "app.core")
            .collect();
        assert_eq!(core_deps.len(), 2);
        assert_eq!(core_deps[0].target, None, "json is external");
        assert_eq!(
            core_deps[1].target,
            Some(ComponentId::new("app.util")),
            "member import falls back to the owning module"
        );
    }

    #[test]
    fn test_relative_import_resolution() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/__init__.py", "");
        write(dir.path(), "app/util.py", "");
        write(dir.path(), "app/core.py", "from .util import helper\n");

        let output = scan(dir.path());
        let dep = output
            .dependency_facts
            .iter()
            .find(|d| d.origin.as_str() == "app.core")
            .unwrap();
        assert_eq!(dep.target, Some(ComponentId::new("app.util")));
    }

    #[test]
    fn test_package_relative_import_targets_sibling() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/__init__.py", "from . import util\n");
        write(dir.path(), "app/util.py", "");

        let output = scan(dir.path());
        let dep = output
            .dependency_facts
            .iter()
            .find(|d| d.origin.as_str() == "app")
            .unwrap();
        assert_eq!(dep.target, Some(ComponentId::new("app.util")));
    }

    #[test]
    fn test_plain_import_of_internal_module() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/__init__.py", "");
        write(dir.path(), "app/util.py", "");
        write(dir.path(), "main.py", "import app.util\nimport os.path\n");

        let output = scan(dir.path());
        let main_deps: Vec<_> = output
            .dependency_facts
            .iter()
            .filter(|d| d.origin.as_str() == "main")
            .collect();
        assert_eq!(main_deps[0].target, Some(ComponentId::new("app.util")));
        assert_eq!(main_deps[1].target, None, "os.path is external");
    }

    #[test]
    fn test_relative_import_escaping_root_is_external() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/__init__.py", "");
        write(dir.path(), "app/core.py", "from ...far import thing\n");

        let output = scan(dir.path());
        let dep = output
            .dependency_facts
            .iter()
            .find(|d| d.origin.as_str() == "app.core")
            .unwrap();
        assert_eq!(dep.target, None);
    }

    #[test]
    fn test_each_imported_name_counts_once() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/__init__.py", "");
        write(dir.path(), "app/util.py", "");
        write(dir.path(), "app/core.py", "from app.util import first, second\n");

        let output = scan(dir.path());
        let core_deps: Vec<_> = output
            .dependency_facts
            .iter()
            .filter(|d| d.origin.as_str() == "app.core")
            .collect();
        assert_eq!(core_deps.len(), 2, "two names mean two raw references");
        assert!(core_deps
            .iter()
            .all(|d| d.target == Some(ComponentId::new("app.util"))));
    }
}
