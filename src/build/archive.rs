use std::fs;
use std::path::{Path, PathBuf};

use crate::frontend::module::Module;

/// Manifest naming the entry class and the libraries it runs against.
/// Spaces in library paths are written as `%20`.
pub fn manifest_text(main_class: &str, libraries: &[PathBuf]) -> String {
    let mut text = format!("Main-Class: {}\n", main_class);
    if !libraries.is_empty() {
        let cp = libraries
            .iter()
            .map(|p| p.to_string_lossy().replace(' ', "%20"))
            .collect::<Vec<_>>()
            .join(" ");
        text.push_str(&format!("Class-Path: {}\n", cp));
    }
    text
}

/// Class files for `module` relative to `bin_dir`: the top-level class,
/// numbered anonymous classes up to the first gap, then named nested classes.
pub fn class_entries(bin_dir: &Path, module: &Module) -> Vec<PathBuf> {
    let rel_dir = module.package_dir();
    let name = &module.identifier;
    let mut entries = vec![rel_dir.join(format!("{}.class", name))];

    // Anonymous classes start at 1; a `$0` is still picked up when present.
    for i in 0usize.. {
        let rel = rel_dir.join(format!("{}${}.class", name, i));
        if bin_dir.join(&rel).is_file() {
            entries.push(rel);
        } else if i >= 1 {
            break;
        }
    }

    let prefix = format!("{}$", name);
    let mut named: Vec<PathBuf> = fs::read_dir(bin_dir.join(&rel_dir))
        .into_iter()
        .flatten()
        .filter_map(|ent| ent.ok())
        .filter_map(|ent| ent.file_name().into_string().ok())
        .filter_map(|file| {
            let inner = file.strip_prefix(&prefix)?.strip_suffix(".class")?;
            let numbered = !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit());
            (!inner.is_empty() && !numbered).then(|| rel_dir.join(&file))
        })
        .collect();
    named.sort();
    entries.extend(named);
    entries
}

#[cfg(test)]
mod tests {
    use super::{class_entries, manifest_text};
    use crate::frontend::macros::MacroTable;
    use crate::frontend::module::Module;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn manifest_escapes_spaces() {
        let text = manifest_text(
            "demo.Main",
            &[PathBuf::from("/opt/rt.jar"), PathBuf::from("/home/me/my libs/a.jar")],
        );
        assert_eq!(
            text,
            "Main-Class: demo.Main\nClass-Path: /opt/rt.jar /home/me/my%20libs/a.jar\n"
        );
        assert_eq!(manifest_text("Main", &[]), "Main-Class: Main\n");
    }

    #[test]
    fn collects_numbered_and_named_nested_classes() {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time drift")
            .as_nanos();
        let bin = std::env::temp_dir().join(format!("jsc-classes-{}-{}", std::process::id(), nonce));
        let pkg = bin.join("demo");
        fs::create_dir_all(&pkg).expect("mkdir");
        for f in ["Main.class", "Main$1.class", "Main$2.class", "Main$4.class", "Main$Node.class", "Other$1.class"] {
            fs::write(pkg.join(f), b"").expect("write class");
        }

        let mut m = Module::new("Main", MacroTable::new());
        m.package = Some("demo".into());
        let entries = class_entries(&bin, &m);
        let rel = PathBuf::from("demo");
        assert_eq!(
            entries,
            vec![
                rel.join("Main.class"),
                rel.join("Main$1.class"),
                rel.join("Main$2.class"),
                rel.join("Main$Node.class"),
            ]
        );

        let _ = fs::remove_dir_all(bin);
    }
}
