use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::frontend::macros::MacroTable;
use crate::pkg::symbol::SymbolReference;

pub const SOURCE_EXTENSION: &str = "jsc";
pub const TARGET_EXTENSION: &str = "java";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModuleKind {
    #[default]
    Standard,
    Abstract,
    Interface,
}

impl ModuleKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ModuleKind::Standard => "class",
            ModuleKind::Abstract => "abstract class",
            ModuleKind::Interface => "interface",
        }
    }
}

/// One parsed `.jsc` file.
#[derive(Debug, Clone)]
pub struct Module {
    pub identifier: String,
    pub package: Option<String>,
    pub kind: ModuleKind,
    pub generics: Vec<String>,
    pub superclass: Option<String>,
    pub contracts: Vec<String>,
    pub symbols: Vec<SymbolReference>,
    pub static_imports: Vec<String>,
    pub macros: MacroTable,
    pub class_scope: Vec<String>,
    pub entry_scope: Vec<String>,
    pub donors: Vec<Module>,
}

impl Module {
    pub fn new(identifier: impl Into<String>, macros: MacroTable) -> Self {
        Self {
            identifier: identifier.into(),
            package: None,
            kind: ModuleKind::Standard,
            generics: Vec::new(),
            superclass: None,
            contracts: Vec::new(),
            symbols: Vec::new(),
            static_imports: Vec::new(),
            macros,
            class_scope: Vec::new(),
            entry_scope: Vec::new(),
            donors: Vec::new(),
        }
    }

    /// `pkg.Name`, or just `Name` for the default package.
    pub fn qualified_name(&self) -> String {
        match &self.package {
            Some(pkg) => format!("{}.{}", pkg, self.identifier),
            None => self.identifier.clone(),
        }
    }

    /// Directory of this module relative to a source or class root.
    pub fn package_dir(&self) -> PathBuf {
        let mut dir = PathBuf::new();
        if let Some(pkg) = &self.package {
            for seg in pkg.split('.').filter(|s| !s.is_empty()) {
                dir.push(seg);
            }
        }
        dir
    }

    /// `a/b/Name.java`
    pub fn source_path(&self) -> PathBuf {
        self.package_dir()
            .join(format!("{}.{}", self.identifier, TARGET_EXTENSION))
    }

    /// Host references first, then each donor's, in donor order.
    pub fn all_symbols(&self) -> impl Iterator<Item = &SymbolReference> {
        self.symbols
            .iter()
            .chain(self.donors.iter().flat_map(|d| d.symbols.iter()))
    }

    fn push_symbols_mut<'a>(&'a mut self, out: &mut Vec<&'a mut SymbolReference>) {
        let Module { symbols, donors, .. } = self;
        out.extend(symbols.iter_mut());
        for donor in donors.iter_mut() {
            out.extend(donor.symbols.iter_mut());
        }
    }
}

/// The file stem of a `.jsc` path, used as the module identifier.
pub fn identifier_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Standalone modules reachable from the entry file through `using`.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    entry: Option<usize>,
    seen: HashSet<String>,
    loading: Vec<String>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `identifier` as part of the graph. Returns `false` when it was
    /// already claimed, in which case the caller must not parse it again.
    pub fn claim(&mut self, identifier: &str) -> bool {
        self.seen.insert(identifier.to_ascii_lowercase())
    }

    /// Marks `identifier` as being parsed. Returns `false` if it already is,
    /// which means the caller is inside a cycle.
    pub fn enter(&mut self, identifier: &str) -> bool {
        let key = identifier.to_ascii_lowercase();
        if self.loading.contains(&key) {
            return false;
        }
        self.loading.push(key);
        true
    }

    pub fn is_loading(&self, identifier: &str) -> bool {
        self.loading.contains(&identifier.to_ascii_lowercase())
    }

    pub fn leave(&mut self, identifier: &str) {
        let key = identifier.to_ascii_lowercase();
        if let Some(pos) = self.loading.iter().rposition(|k| *k == key) {
            self.loading.remove(pos);
        }
    }

    pub fn insert(&mut self, module: Module) -> usize {
        self.seen.insert(module.identifier.to_ascii_lowercase());
        self.modules.push(module);
        self.modules.len() - 1
    }

    pub fn set_entry(&mut self, index: usize) {
        self.entry = Some(index);
    }

    pub fn entry(&self) -> Option<&Module> {
        self.entry.and_then(|i| self.modules.get(i))
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    #[cfg(test)]
    pub fn get(&self, identifier: &str) -> Option<&Module> {
        self.modules
            .iter()
            .find(|m| m.identifier.eq_ignore_ascii_case(identifier))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &SymbolReference> {
        self.modules.iter().flat_map(Module::all_symbols)
    }

    /// Every reference in graph order, mutable, for diagnostic-driven correction.
    pub fn symbols_mut(&mut self) -> Vec<&mut SymbolReference> {
        let mut out = Vec::new();
        for module in self.modules.iter_mut() {
            module.push_symbols_mut(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{Module, ModuleGraph, ModuleKind};
    use crate::frontend::macros::MacroTable;
    use crate::pkg::symbol::SymbolReference;
    use std::path::PathBuf;

    #[test]
    fn paths_follow_package() {
        let mut m = Module::new("Foo", MacroTable::new());
        assert_eq!(m.qualified_name(), "Foo");
        assert_eq!(m.source_path(), PathBuf::from("Foo.java"));
        m.package = Some("com.acme".into());
        assert_eq!(m.qualified_name(), "com.acme.Foo");
        assert_eq!(m.source_path(), PathBuf::from("com").join("acme").join("Foo.java"));
        assert_eq!(ModuleKind::Abstract.keyword(), "abstract class");
    }

    #[test]
    fn graph_claims_are_case_insensitive_and_symbols_include_donors() {
        let mut graph = ModuleGraph::new();
        assert!(graph.claim("Util"));
        assert!(!graph.claim("util"));

        let mut host = Module::new("Main", MacroTable::new());
        host.symbols.push(SymbolReference::new("A", None, vec![]));
        let mut donor = Module::new("Mixin", MacroTable::new());
        donor.symbols.push(SymbolReference::new("B", None, vec![]));
        host.donors.push(donor);
        let idx = graph.insert(host);
        graph.set_entry(idx);

        let raws: Vec<&str> = graph.symbols().map(|s| s.raw()).collect();
        assert_eq!(raws, vec!["A", "B"]);
        assert_eq!(graph.symbols_mut().len(), 2);
        assert!(!graph.claim("MAIN"));
        assert_eq!(graph.entry().map(|m| m.identifier.as_str()), Some("Main"));
    }

    #[test]
    fn enter_detects_cycles() {
        let mut graph = ModuleGraph::new();
        assert!(graph.enter("a"));
        assert!(graph.enter("b"));
        assert!(!graph.enter("A"));
        assert!(graph.is_loading("B"));
        graph.leave("b");
        assert!(!graph.is_loading("b"));
        assert!(graph.enter("b"));
    }
}
