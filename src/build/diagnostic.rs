use anyhow::Context;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// A compiler error line that points into a generated source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub line: usize,
    /// The complete stderr line the location was taken from.
    pub text: String,
}

impl Diagnostic {
    /// The 1-based source line this diagnostic refers to, if it still exists.
    pub fn source_line(&self) -> anyhow::Result<Option<String>> {
        read_line(&self.file, self.line)
    }
}

pub struct DiagnosticMatcher {
    pattern: Regex,
}

impl DiagnosticMatcher {
    pub fn new() -> anyhow::Result<Self> {
        let pattern = Regex::new(r"^(?P<file>.+?\.java):(?P<line>\d+):(?:\d+:)?\s*error")
            .context("compile diagnostic pattern")?;
        Ok(Self { pattern })
    }

    pub fn parse(&self, line: &str) -> Option<Diagnostic> {
        let caps = self.pattern.captures(line.trim_end())?;
        let file = PathBuf::from(caps.name("file")?.as_str());
        let line_no = caps.name("line")?.as_str().parse::<usize>().ok()?;
        Some(Diagnostic {
            file,
            line: line_no,
            text: line.to_string(),
        })
    }

    /// The first error in `stderr` that has a file and line.
    pub fn first<'a, I>(&self, stderr: I) -> Option<Diagnostic>
    where
        I: IntoIterator<Item = &'a String>,
    {
        stderr.into_iter().find_map(|l| self.parse(l))
    }
}

fn read_line(path: &Path, line: usize) -> anyhow::Result<Option<String>> {
    if line == 0 {
        return Ok(None);
    }
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(text.lines().nth(line - 1).map(str::to_string))
}
