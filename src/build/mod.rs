// Purpose: Drive generate/compile/correct/package for a parsed module graph.
// Inputs/Outputs: Consumes a ModuleGraph and a Toolchain; yields a packaged archive or the compiler's errors.
// Invariants: Only the first located diagnostic per pass is acted on; each retry advances exactly one reference.
// Gotchas: Retries are bounded only by candidate exhaustion, since every successful correction moves a selection forward.

pub mod archive;
pub mod diagnostic;
pub mod staging;
pub mod toolchain;

use anyhow::Context;
use indexmap::IndexSet;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::codegen;
use crate::frontend::module::ModuleGraph;

use self::archive::{class_entries, manifest_text};
use self::diagnostic::{Diagnostic, DiagnosticMatcher};
use self::staging::Staging;
use self::toolchain::{ArchiveRequest, CompileReport, CompileRequest, Toolchain};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Packaged {
        archive: PathBuf,
        /// Compiler stderr of the last pass when it failed without a located
        /// error (bad flag, unreadable classpath, timeout).
        compiler_errors: Vec<String>,
        archiver_errors: Vec<String>,
        corrections: usize,
    },
    Failed {
        /// Compiler stderr exactly as captured.
        diagnostics: String,
    },
}

impl BuildOutcome {
    /// Packaged with neither compiler nor archiver complaints.
    pub fn is_runnable(&self) -> bool {
        matches!(
            self,
            BuildOutcome::Packaged { compiler_errors, archiver_errors, .. }
                if compiler_errors.is_empty() && archiver_errors.is_empty()
        )
    }
}

enum BuildState {
    Generate,
    Compile,
    Diagnose(CompileReport),
    Archive,
    Done(BuildOutcome),
}

pub struct Builder<'a> {
    toolchain: &'a dyn Toolchain,
    staging: &'a Staging,
    archive: PathBuf,
    matcher: DiagnosticMatcher,
}

impl<'a> Builder<'a> {
    pub fn new(toolchain: &'a dyn Toolchain, staging: &'a Staging, archive: PathBuf) -> anyhow::Result<Self> {
        Ok(Self {
            toolchain,
            staging,
            archive,
            matcher: DiagnosticMatcher::new()?,
        })
    }

    pub fn build(&self, graph: &mut ModuleGraph) -> anyhow::Result<BuildOutcome> {
        let mut state = BuildState::Generate;
        let mut sources = Vec::new();
        let mut corrections = 0usize;
        let mut compiler_errors = Vec::new();
        loop {
            state = match state {
                BuildState::Generate => {
                    sources = self.generate(graph)?;
                    BuildState::Compile
                }
                BuildState::Compile => {
                    let request = CompileRequest {
                        classpath: selected_libraries(graph),
                        out_dir: self.staging.bin_dir().to_path_buf(),
                        sources: sources.clone(),
                    };
                    BuildState::Diagnose(self.toolchain.compile(&request)?)
                }
                BuildState::Diagnose(report) => match self.matcher.first(&report.stderr) {
                    None => {
                        if !report.success {
                            warn!(
                                "compiler failed without a located error{}",
                                if report.timed_out { " (timed out)" } else { "" }
                            );
                            for line in &report.stderr {
                                warn!("{}", line);
                            }
                            compiler_errors = report.stderr;
                        }
                        BuildState::Archive
                    }
                    Some(diag) => {
                        if correct(graph, &diag) {
                            corrections += 1;
                            debug!("correction #{} after {}", corrections, diag.text.trim());
                            BuildState::Generate
                        } else {
                            BuildState::Done(BuildOutcome::Failed {
                                diagnostics: report.stderr.join("\n"),
                            })
                        }
                    }
                },
                BuildState::Archive => {
                    let archiver_errors = self.package(graph)?;
                    BuildState::Done(BuildOutcome::Packaged {
                        archive: self.archive.clone(),
                        compiler_errors: std::mem::take(&mut compiler_errors),
                        archiver_errors,
                        corrections,
                    })
                }
                BuildState::Done(outcome) => return Ok(outcome),
            };
        }
    }

    fn generate(&self, graph: &ModuleGraph) -> anyhow::Result<Vec<PathBuf>> {
        let mut sources = Vec::with_capacity(graph.modules().len());
        for module in graph.modules() {
            let text = codegen::render(module);
            sources.push(self.staging.write_source(module, &text)?);
        }
        debug!("generated {} source file(s)", sources.len());
        Ok(sources)
    }

    fn package(&self, graph: &ModuleGraph) -> anyhow::Result<Vec<String>> {
        let entry = graph
            .entry()
            .context("module graph has no entry module")?
            .qualified_name();
        let libraries = selected_libraries(graph);
        let manifest = self.staging.manifest_path();
        fs::write(&manifest, manifest_text(&entry, &libraries))
            .with_context(|| format!("write {}", manifest.display()))?;

        let bin = self.staging.bin_dir();
        let request = ArchiveRequest {
            archive: self.archive.clone(),
            manifest,
            class_dir: bin.to_path_buf(),
            entries: graph
                .modules()
                .iter()
                .flat_map(|m| class_entries(bin, m))
                .collect(),
        };
        let report = self.toolchain.archive(&request)?;
        if report.stderr.is_empty() {
            info!("packaged {}", self.archive.display());
        } else {
            warn!(
                "archiver reported {} error line(s) for {}",
                report.stderr.len(),
                self.archive.display()
            );
        }
        Ok(report.stderr)
    }
}

/// Libraries behind every reference's current selection, first use first.
pub fn selected_libraries(graph: &ModuleGraph) -> Vec<PathBuf> {
    graph
        .symbols()
        .filter_map(|s| s.current_library())
        .map(|p| p.to_path_buf())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

fn correct(graph: &mut ModuleGraph, diag: &Diagnostic) -> bool {
    let line = diag.source_line().unwrap_or_else(|err| {
        warn!("cannot read {}: {:#}", diag.file.display(), err);
        None
    });
    if let Some(line) = line
        && correct_by_line(graph, &line)
    {
        return true;
    }
    correct_loosely(graph, &diag.text)
}

/// Advances the first reference whose emitted import is `line`.
pub fn correct_by_line(graph: &mut ModuleGraph, line: &str) -> bool {
    let line = line.trim_end();
    for symbol in graph.symbols_mut() {
        if line.ends_with(&format!("{};", symbol.current())) {
            let moved = symbol.advance();
            debug!(
                "{} -> {} (by line, candidate {}/{})",
                symbol.raw(),
                symbol.current(),
                symbol.selected_index() + 1,
                symbol.candidates().len()
            );
            return moved;
        }
    }
    false
}

/// Advances the first reference whose raw name appears space-delimited in
/// the diagnostic text. First match only, so it can pick the wrong one.
pub fn correct_loosely(graph: &mut ModuleGraph, text: &str) -> bool {
    for symbol in graph.symbols_mut() {
        if text.contains(&format!(" {} ", symbol.raw())) {
            let moved = symbol.advance();
            debug!(
                "{} -> {} (loose, candidate {}/{})",
                symbol.raw(),
                symbol.current(),
                symbol.selected_index() + 1,
                symbol.candidates().len()
            );
            return moved;
        }
    }
    false
}
