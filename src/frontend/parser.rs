// Purpose: Build Modules from segmented statements and pull in referenced files.
// Inputs/Outputs: Consumes statements for one file; returns its Module and grows the shared graph.
// Invariants: Modules only ever gain statements; each identifier is parsed at most once as a graph member.
// Gotchas: `using`/`ext` paths resolve against the including file's directory.

use anyhow::{Context, bail};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::frontend::directive::Directive;
use crate::frontend::macros::MacroTable;
use crate::frontend::module::{Module, ModuleGraph, SOURCE_EXTENSION, identifier_for};
use crate::frontend::segment::segment;
use crate::frontend::suggest::did_you_mean;
use crate::pkg::library::LibrarySet;

pub struct ModuleParser<'a> {
    libraries: &'a LibrarySet,
    default_macros: &'a MacroTable,
}

impl<'a> ModuleParser<'a> {
    pub fn new(libraries: &'a LibrarySet, default_macros: &'a MacroTable) -> Self {
        Self {
            libraries,
            default_macros,
        }
    }

    /// Loads `path` as the entry module of `graph`, together with every file
    /// it reaches through `using`.
    pub fn load_entry(&self, graph: &mut ModuleGraph, path: &Path) -> anyhow::Result<()> {
        graph.claim(&identifier_for(path));
        let module = self.load_file(graph, path)?;
        let idx = graph.insert(module);
        graph.set_entry(idx);
        Ok(())
    }

    pub fn load_file(&self, graph: &mut ModuleGraph, path: &Path) -> anyhow::Result<Module> {
        let text = read_source(path)?;
        let statements = segment(&text);
        debug!("{}: {} statement(s)", path.display(), statements.len());
        self.parse(graph, &identifier_for(path), parent_dir(path), &statements)
    }

    pub fn parse(
        &self,
        graph: &mut ModuleGraph,
        identifier: &str,
        base_dir: &Path,
        statements: &[String],
    ) -> anyhow::Result<Module> {
        let entered = graph.enter(identifier);
        let parsed = self.parse_statements(graph, identifier, base_dir, statements);
        if entered {
            graph.leave(identifier);
        }
        parsed.with_context(|| format!("while parsing {}", identifier))
    }

    fn parse_statements(
        &self,
        graph: &mut ModuleGraph,
        identifier: &str,
        base_dir: &Path,
        statements: &[String],
    ) -> anyhow::Result<Module> {
        let mut module = Module::new(identifier, self.default_macros.clone());
        let mut position = 0usize;
        for raw in statements {
            let stmt = raw.trim();
            if stmt.is_empty() {
                continue;
            }
            position += 1;
            match Directive::classify(stmt, position) {
                Directive::Package(pkg) => module.package = Some(pkg.to_string()),
                Directive::Header(header) => {
                    module.kind = header.kind;
                    module.generics = header.generics;
                    module.superclass = header.superclass;
                    module.contracts = header.contracts;
                }
                Directive::Import(name) => module.symbols.push(self.libraries.resolve(name, None)),
                Directive::StaticImport(name) => module.static_imports.push(name.to_string()),
                Directive::LibraryImport { library, name } => module
                    .symbols
                    .push(self.libraries.resolve(name, Some(library))),
                Directive::Macro { key, value } => module.macros.insert(key, value),
                Directive::Using(file) => self.include(graph, &module, base_dir, file)?,
                Directive::Extend(file) => {
                    if let Some(donor) = self.load_donor(graph, &module, base_dir, file)? {
                        module.donors.push(donor);
                    }
                }
                Directive::ClassScope(stmt) => module.class_scope.push(stmt),
                Directive::EntryScope(stmt) => module.entry_scope.push(stmt.to_string()),
            }
        }
        Ok(module)
    }

    fn include(
        &self,
        graph: &mut ModuleGraph,
        current: &Module,
        base_dir: &Path,
        file: &str,
    ) -> anyhow::Result<()> {
        let path = base_dir.join(file);
        let identifier = identifier_for(&path);
        if identifier.eq_ignore_ascii_case(&current.identifier) {
            debug!("{}: ignoring using of itself", current.identifier);
            return Ok(());
        }
        if !graph.claim(&identifier) {
            debug!("{}: {} is already part of the build", current.identifier, identifier);
            return Ok(());
        }
        let module = self.load_file(graph, &path)?;
        graph.insert(module);
        Ok(())
    }

    fn load_donor(
        &self,
        graph: &mut ModuleGraph,
        current: &Module,
        base_dir: &Path,
        file: &str,
    ) -> anyhow::Result<Option<Module>> {
        let path = base_dir.join(file);
        let identifier = identifier_for(&path);
        if identifier.eq_ignore_ascii_case(&current.identifier) {
            debug!("{}: ignoring ext of itself", current.identifier);
            return Ok(None);
        }
        if graph.is_loading(&identifier) {
            warn!("{}: ext cycle through {}; skipping", current.identifier, identifier);
            return Ok(None);
        }
        let donor = self.load_file(graph, &path)?;
        if !donor.entry_scope.is_empty() {
            debug!(
                "{}: {} entry-point statement(s) of {} are not merged",
                current.identifier,
                donor.entry_scope.len(),
                donor.identifier
            );
        }
        Ok(Some(donor))
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    if !path.is_file() {
        match sibling_hint(path) {
            Some(help) => bail!("file not found: {}\nhelp: {}", path.display(), help),
            None => bail!("file not found: {}", path.display()),
        }
    }
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn sibling_hint(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    let siblings = fs::read_dir(parent_dir(path))
        .ok()?
        .filter_map(|ent| ent.ok())
        .map(|ent| ent.path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some(SOURCE_EXTENSION))
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()));
    did_you_mean(&name, siblings)
}
