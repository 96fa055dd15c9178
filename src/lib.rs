// Purpose: Define the crate module surface for the jsc build pipeline.
// Inputs/Outputs: Exposes frontend, codegen, build, package and CLI modules to the binary and tests.
// Invariants: The binary goes through `cli` only; other modules never print to the terminal directly.
// Gotchas: `VERSION` relies on `JSC_GIT_COMMIT`, which build.rs always sets.

pub mod build;
pub mod cli;
pub mod codegen;
pub mod compile;
pub mod config;
pub mod frontend;
pub mod pkg;

pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("JSC_GIT_COMMIT"), ")");
