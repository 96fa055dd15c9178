// Purpose: Classify one trimmed JSC statement into a directive or a code statement.
// Inputs/Outputs: Takes a statement plus its 1-based non-blank position; returns a tagged Directive.
// Invariants: Classification is first-match-wins in a fixed order; malformed directives fall back to code.
// Gotchas: `pkg` is only honored at position 1 and `#!` headers only at positions 1-2.

use crate::frontend::module::ModuleKind;

const CLASS_SCOPE_KEYWORDS: [&str; 14] = [
    "abstract",
    "class",
    "default",
    "enum",
    "native",
    "private",
    "protected",
    "public",
    "static",
    "transient",
    "void",
    "volatile",
    "svoid",
    "cvar",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    pub kind: ModuleKind,
    pub generics: Vec<String>,
    pub superclass: Option<String>,
    pub contracts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    Package(&'a str),
    Header(Header),
    Import(&'a str),
    StaticImport(&'a str),
    LibraryImport { library: &'a str, name: &'a str },
    Macro { key: String, value: String },
    Using(&'a str),
    Extend(&'a str),
    ClassScope(String),
    EntryScope(&'a str),
}

impl<'a> Directive<'a> {
    /// `stmt` must already be trimmed and non-blank.
    pub fn classify(stmt: &'a str, position: usize) -> Directive<'a> {
        if position == 1
            && let Some(pkg) = stmt.strip_prefix("pkg ").and_then(|r| r.strip_suffix(';'))
        {
            return Directive::Package(pkg.trim());
        }
        if position <= 2
            && let Some(body) = stmt.strip_prefix("#!")
        {
            return Directive::Header(parse_header(body));
        }
        if let Some(rest) = stmt.strip_prefix("import ")
            && let Some(rest) = rest.strip_suffix(';')
        {
            return match rest.trim_start().strip_prefix("static ") {
                Some(name) => Directive::StaticImport(name.trim()),
                None => Directive::Import(rest.trim()),
            };
        }
        if stmt.starts_with("from ")
            && stmt.contains(" import ")
            && let Some((library, name)) = parse_library_import(stmt)
        {
            return Directive::LibraryImport { library, name };
        }
        if let Some(rest) = stmt.strip_prefix("!macro")
            && let Some((key, value)) = parse_macro(rest)
        {
            return Directive::Macro { key, value };
        }
        if let Some(rest) = stmt.strip_prefix("using ")
            && let Some(file) = quoted_file(rest)
        {
            return Directive::Using(file);
        }
        if let Some(rest) = stmt.strip_prefix("ext ")
            && let Some(file) = quoted_file(rest)
        {
            return Directive::Extend(file);
        }
        if is_class_scope(stmt) {
            return Directive::ClassScope(rewrite_class_scope(stmt));
        }
        Directive::EntryScope(stmt)
    }
}

/// Parses the text after `#!`, e.g. `abstract<K, V> Name ext Base impl A, B`.
fn parse_header(body: &str) -> Header {
    let body = body.trim().trim_end_matches(';').trim_end();
    let mut header = Header::default();

    let mut rest = body;
    for (keyword, kind) in [
        ("interface", ModuleKind::Interface),
        ("abstract", ModuleKind::Abstract),
        ("class", ModuleKind::Standard),
    ] {
        if let Some(r) = rest.strip_prefix(keyword) {
            header.kind = kind;
            rest = r;
            break;
        }
    }

    if rest.starts_with('<')
        && let Some(close) = matching_angle(rest)
    {
        header.generics = split_top_level(&rest[1..close]);
        rest = &rest[close + 1..];
    }

    let mut rest = rest.trim_start();
    if !rest.is_empty() && strip_word(rest, "ext").is_none() && strip_word(rest, "impl").is_none() {
        rest = take_type(rest).1.trim_start();
    }
    if let Some(r) = strip_word(rest, "ext") {
        let (sup, r) = take_type(r);
        if !sup.is_empty() {
            header.superclass = Some(sup.to_string());
        }
        rest = r.trim_start();
    }
    if let Some(r) = strip_word(rest, "impl") {
        header.contracts = split_top_level(r);
    }
    header
}

fn strip_word<'s>(s: &'s str, word: &str) -> Option<&'s str> {
    starts_with_word(s, word).then(|| &s[word.len()..])
}

/// Splits one type off the front of `s`. Whitespace ends it only outside `<...>`.
fn take_type(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if s[i..].trim_start().starts_with('<') {
                    continue;
                }
                return (&s[..i], &s[i..]);
            }
            _ => {}
        }
    }
    (s, "")
}

/// Byte index of the `>` closing the `<` at index 0.
fn matching_angle(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits on commas that are not nested inside `<...>`.
fn split_top_level(list: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in list.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    out.push(current);
    out.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `from "lib" import a.b.C;` or `from lib import a.b.C;`
fn parse_library_import(stmt: &str) -> Option<(&str, &str)> {
    let rest = stmt.strip_prefix("from ")?.trim_start();
    let (library, after) = if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.find('"')?;
        (&quoted[..end], &quoted[end + 1..])
    } else {
        let end = rest.find(char::is_whitespace)?;
        (&rest[..end], &rest[end..])
    };
    let name = after
        .trim_start()
        .strip_prefix("import ")?
        .strip_suffix(';')?
        .trim();
    if library.is_empty() || name.is_empty() {
        return None;
    }
    Some((library, name))
}

/// Key sits between the 1st and 2nd unescaped quotes, value between the 3rd
/// and 4th. Escaped quotes stay in the text as `\"`.
fn parse_macro(rest: &str) -> Option<(String, String)> {
    let mut quotes = 0usize;
    let mut prev = '\0';
    let mut key = String::new();
    let mut value = String::new();
    for c in rest.chars() {
        if c == '"' && prev != '\\' {
            quotes += 1;
        } else {
            match quotes {
                1 => key.push(c),
                3 => value.push(c),
                _ => {}
            }
        }
        prev = c;
    }
    if quotes < 2 || key.is_empty() {
        return None;
    }
    Some((key, value))
}

/// The path between the first and last `"` of a `using`/`ext` directive body.
fn quoted_file(rest: &str) -> Option<&str> {
    let body = rest.trim().strip_suffix(';')?.trim_end();
    let start = body.find('"')?;
    let end = body.rfind('"')?;
    if end <= start + 1 {
        return None;
    }
    Some(&body[start + 1..end])
}

fn starts_with_word(stmt: &str, word: &str) -> bool {
    stmt.strip_prefix(word).is_some_and(|rest| {
        rest.chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '$'))
    })
}

fn is_class_scope(stmt: &str) -> bool {
    stmt.starts_with('@') || CLASS_SCOPE_KEYWORDS.iter().any(|k| starts_with_word(stmt, k))
}

/// `svoid f()` becomes `static void f()`; a leading `cvar` marker is dropped.
fn rewrite_class_scope(stmt: &str) -> String {
    if starts_with_word(stmt, "svoid") {
        return format!("static void{}", &stmt["svoid".len()..]);
    }
    if starts_with_word(stmt, "cvar") {
        return stmt["cvar".len()..].trim_start().to_string();
    }
    stmt.to_string()
}
