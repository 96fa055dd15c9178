use std::path::{Path, PathBuf};

/// One fully-qualified resolution of a requested type and the archive it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub library: PathBuf,
}

/// A requested external type and its ordered candidate resolutions.
///
/// The selection only moves forward. Once it sits on the last candidate the
/// reference is exhausted and `advance` keeps returning `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolReference {
    raw: String,
    library_hint: Option<String>,
    candidates: Vec<Candidate>,
    selected: usize,
}

impl SymbolReference {
    pub fn new(raw: impl Into<String>, library_hint: Option<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            raw: raw.into(),
            library_hint,
            candidates,
            selected: 0,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn library_hint(&self) -> Option<&str> {
        self.library_hint.as_deref()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn is_resolved(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// The name to emit right now; the raw request when nothing matched.
    pub fn current(&self) -> &str {
        self.candidates
            .get(self.selected)
            .map_or(self.raw.as_str(), |c| c.name.as_str())
    }

    pub fn current_library(&self) -> Option<&Path> {
        self.candidates.get(self.selected).map(|c| c.library.as_path())
    }

    /// Moves to the next candidate. Returns `false` and stays on the last
    /// candidate when there is nothing left to try.
    pub fn advance(&mut self) -> bool {
        if self.selected + 1 < self.candidates.len() {
            self.selected += 1;
            true
        } else {
            self.selected = self.candidates.len().saturating_sub(1);
            false
        }
    }
}
