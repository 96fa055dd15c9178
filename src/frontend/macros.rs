use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered token -> replacement table applied to every generated line.
///
/// Keys and values are stored as written in the source (`\"` and `\\` still
/// escaped) and unescaped only when a line is substituted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacroTable {
    entries: IndexMap<String, String>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Adds every entry of `other` whose key is not already present.
    pub fn merge_missing(&mut self, other: &MacroTable) {
        for (key, value) in &other.entries {
            if !self.entries.contains_key(key) {
                self.entries.insert(key.clone(), value.clone());
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Substitutes every entry into `line`, one entry at a time in insertion
    /// order. Each pass sees the output of the previous one.
    pub fn apply(&self, line: &str) -> String {
        let mut out = line.to_string();
        for (key, value) in self.iter() {
            let key = unescape(key);
            if key.is_empty() {
                continue;
            }
            out = out.replace(&key, &unescape(value));
        }
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MacroTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = MacroTable::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

fn unescape(raw: &str) -> String {
    raw.replace("\\\"", "\"").replace("\\\\", "\\")
}
