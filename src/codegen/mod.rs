use crate::frontend::macros::MacroTable;
use crate::frontend::module::{Module, ModuleKind};

/// Java source for one Module, one statement per element, macros applied.
///
/// Statements that spanned several physical lines keep their embedded
/// newlines, so the element count is not the file's line count.
pub fn emit(module: &Module) -> Vec<String> {
    let macros = effective_macros(module);
    let mut codegen = Codegen::new(module);
    codegen.emit_unit();
    if macros.is_empty() {
        return codegen.lines;
    }
    codegen
        .lines
        .into_iter()
        .map(|line| macros.apply(&line))
        .collect()
}

/// `emit` joined into file text.
pub fn render(module: &Module) -> String {
    let mut text = emit(module).join("\n");
    text.push('\n');
    text
}

/// The module's own macros plus every donor entry whose key it does not define.
pub fn effective_macros(module: &Module) -> MacroTable {
    let mut table = module.macros.clone();
    for donor in &module.donors {
        table.merge_missing(&donor.macros);
    }
    table
}

struct Codegen<'a> {
    module: &'a Module,
    lines: Vec<String>,
}

impl<'a> Codegen<'a> {
    fn new(module: &'a Module) -> Self {
        Self {
            module,
            lines: Vec::new(),
        }
    }

    fn emit_unit(&mut self) {
        let module = self.module;
        if let Some(pkg) = &module.package {
            self.lines.push(format!("package {};", pkg));
        }
        self.emit_imports();
        self.lines.push(self.type_line());
        if module.kind != ModuleKind::Interface {
            self.lines
                .push("public static void main(String[] args) {".to_string());
            self.lines.extend(module.entry_scope.iter().cloned());
            self.lines.push("}".to_string());
        }
        for donor in &module.donors {
            self.lines.extend(donor.class_scope.iter().cloned());
        }
        self.lines.extend(module.class_scope.iter().cloned());
        self.lines.push("}".to_string());
    }

    fn emit_imports(&mut self) {
        let module = self.module;
        let donor_symbols = module.donors.iter().flat_map(|d| d.symbols.iter());
        for symbol in donor_symbols.chain(module.symbols.iter()) {
            self.lines.push(format!("import {};", symbol.current()));
        }
        for name in &module.static_imports {
            self.lines.push(format!("import static {};", name));
        }
    }

    fn type_line(&self) -> String {
        let module = self.module;
        let mut line = format!("public {} {}", module.kind.keyword(), module.identifier);
        if !module.generics.is_empty() {
            line.push('<');
            line.push_str(&module.generics.join(","));
            line.push('>');
        }
        if let Some(sup) = module.superclass.as_deref().filter(|s| !s.is_empty()) {
            line.push_str(" extends ");
            line.push_str(sup);
        }
        if !module.contracts.is_empty() {
            line.push_str(" implements ");
            line.push_str(&module.contracts.join(","));
        }
        line.push_str(" {");
        line
    }
}
