// Purpose: Frontend module hub: statement segmentation, directive parsing, module model.
// Inputs/Outputs: Exposes the pieces the build session uses to turn `.jsc` files into a ModuleGraph.
// Invariants: Nothing here touches the external toolchain.
// Gotchas: `macros` tables are cloned per module, so edits never leak between files.

pub mod directive;
pub mod macros;
pub mod module;
pub mod parser;
pub mod segment;
pub mod suggest;
