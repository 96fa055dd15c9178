use strsim::levenshtein;

/// Up to 3 candidates closest to `needle` by edit distance, nearest first.
pub fn suggest(needle: &str, candidates: impl IntoIterator<Item = String>) -> Vec<String> {
    let needle = needle.trim();
    if needle.is_empty() {
        return vec![];
    }

    let max_dist = match needle.len() {
        0..=3 => 1,
        4..=6 => 2,
        7..=10 => 3,
        _ => 4,
    };

    let mut scored: Vec<(usize, String)> = candidates
        .into_iter()
        .filter(|c| !c.is_empty() && c != needle)
        .map(|c| (levenshtein(&needle.to_lowercase(), &c.to_lowercase()), c))
        .filter(|(d, _)| *d <= max_dist)
        .collect();
    scored.sort_by(|(da, a), (db, b)| da.cmp(db).then(a.len().cmp(&b.len())).then(a.cmp(b)));
    scored.dedup_by(|(_, a), (_, b)| a == b);

    scored.into_iter().take(3).map(|(_, s)| s).collect()
}

pub fn did_you_mean(needle: &str, candidates: impl IntoIterator<Item = String>) -> Option<String> {
    let found = suggest(needle, candidates);
    match found.as_slice() {
        [] => None,
        [only] => Some(format!("did you mean `{}`?", only)),
        many => Some(format!(
            "did you mean one of: {}?",
            many.iter()
                .map(|s| format!("`{}`", s))
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}
