// Purpose: Scan class archives and resolve requested type names into candidate lists.
// Inputs/Outputs: Reads archive central directories once; produces SymbolReferences on demand.
// Invariants: Library order and per-archive entry order fix candidate order; results are deduplicated.
// Gotchas: Unreadable archives are skipped with a warning, never fatal.

use anyhow::Context;
use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::frontend::suggest::did_you_mean;
use crate::pkg::symbol::{Candidate, SymbolReference};

#[derive(Debug, Clone)]
pub struct Library {
    pub path: PathBuf,
    /// The toolchain's base library rather than a library-dir archive.
    pub runtime: bool,
    entries: Vec<String>,
}

impl Library {
    fn load(path: PathBuf, runtime: bool) -> Self {
        let entries = read_entries(&path).unwrap_or_else(|err| {
            warn!("skipping library {}: {:#}", path.display(), err);
            Vec::new()
        });
        debug!("library {} has {} entries", path.display(), entries.len());
        Library {
            path,
            runtime,
            entries,
        }
    }

    /// The runtime library is selected by its full path (e.g. `jre`), other
    /// archives by file name.
    fn matches_hint(&self, hint: &str) -> bool {
        if self.runtime {
            return self.path.to_string_lossy().contains(hint);
        }
        self.path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains(hint))
    }
}

/// Every archive a build may resolve imports against, in scan order.
#[derive(Debug, Clone, Default)]
pub struct LibrarySet {
    libraries: Vec<Library>,
}

impl LibrarySet {
    /// Opens `runtime` (when given) and then each archive in order. Archives
    /// that cannot be read stay in the set with no entries.
    pub fn open<I>(runtime: Option<PathBuf>, paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let libraries = runtime
            .map(|rt| Library::load(rt, true))
            .into_iter()
            .chain(paths.into_iter().map(|p| Library::load(p, false)))
            .collect();
        Self { libraries }
    }

    /// The runtime base library (when present) followed by every file in
    /// `library_dir`, sorted by file name.
    pub fn discover(runtime: Option<PathBuf>, library_dir: &Path) -> anyhow::Result<Self> {
        let mut extra = Vec::new();
        for ent in fs::read_dir(library_dir)
            .with_context(|| format!("read_dir {}", library_dir.display()))?
        {
            let p = ent?.path();
            if p.is_file() {
                extra.push(p);
            }
        }
        extra.sort();
        Ok(Self::open(runtime, extra))
    }

    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    /// Resolves `requested` against every library, or only those matching
    /// `hint` when one is given.
    pub fn resolve(&self, requested: &str, hint: Option<&str>) -> SymbolReference {
        let pattern = EntryPattern::new(requested);
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for lib in &self.libraries {
            if let Some(h) = hint
                && !lib.matches_hint(h)
            {
                continue;
            }
            for entry in &lib.entries {
                if let Some(name) = pattern.match_entry(entry)
                    && seen.insert(name.clone())
                {
                    candidates.push(Candidate {
                        name,
                        library: lib.path.clone(),
                    });
                }
            }
        }

        let reference = SymbolReference::new(requested, hint.map(str::to_string), candidates);
        if reference.is_resolved() {
            debug!("{} -> {} candidate(s)", requested, reference.candidates().len());
            return reference;
        }
        let scope = match reference.library_hint() {
            Some(h) => format!(" in libraries matching \"{}\"", h),
            None => String::new(),
        };
        match self.suggest_class(requested) {
            Some(help) => warn!("no matches found for {}{}; {}", requested, scope, help),
            None => warn!("no matches found for {}{}", requested, scope),
        }
        reference
    }

    fn suggest_class(&self, requested: &str) -> Option<String> {
        let leaf = requested.rsplit('.').next().unwrap_or(requested);
        if leaf == "*" {
            return None;
        }
        let names: BTreeSet<String> = self
            .libraries
            .iter()
            .flat_map(|lib| lib.entries.iter())
            .filter_map(|e| e.strip_suffix(".class"))
            .filter_map(|e| e.rsplit('/').next())
            .filter(|leaf| !leaf.contains('$'))
            .map(str::to_string)
            .collect();
        did_you_mean(leaf, names)
    }
}

fn read_entries(path: &Path) -> anyhow::Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let zip = ZipArchive::new(file).context("invalid zip archive")?;
    Ok(zip.file_names().map(str::to_string).collect())
}

/// A requested name converted to archive-path form, e.g. `java.util.List`
/// becomes `/java/util/List` and `java.util.*` becomes the namespace `/java/util/`.
struct EntryPattern {
    needle: String,
    wildcard: bool,
}

impl EntryPattern {
    fn new(requested: &str) -> Self {
        let mut needle = requested.trim().replace('.', "/");
        let wildcard = needle.ends_with('*');
        if wildcard {
            needle.pop();
        }
        if !needle.starts_with('/') {
            needle.insert(0, '/');
        }
        Self { needle, wildcard }
    }

    fn match_entry(&self, entry: &str) -> Option<String> {
        let normalized = format!("/{}", entry.replace('\\', "/"));
        if self.wildcard {
            let idx = normalized.find(&self.needle)?;
            let prefix = normalized.get(1..idx + self.needle.len())?;
            return Some(format!("{}*", prefix.replace('/', ".")));
        }
        let stem = normalized.strip_suffix(".class")?;
        if !stem.ends_with(&self.needle) {
            return None;
        }
        Some(stem.trim_start_matches('/').replace('/', "."))
    }
}

#[cfg(test)]
mod tests {
    use super::{EntryPattern, LibrarySet};
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::SimpleFileOptions;

    fn temp_dir(prefix: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time drift")
            .as_nanos();
        std::env::temp_dir().join(format!("jsc-{}-{}-{}", prefix, std::process::id(), nonce))
    }

    fn write_archive(path: &Path, entries: &[&str]) {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::<u8>::new()));
        let opts = SimpleFileOptions::default();
        for name in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, opts).expect("add dir");
            } else {
                zip.start_file(*name, opts).expect("start file");
                zip.write_all(b"\xca\xfe\xba\xbe").expect("write entry");
            }
        }
        let bytes = zip.finish().expect("finish zip").into_inner();
        fs::write(path, bytes).expect("write archive");
    }

    #[test]
    fn library_hint_resolves_fully_qualified_name() {
        let dir = temp_dir("hint");
        fs::create_dir_all(&dir).expect("mkdir");
        write_archive(&dir.join("mylib.zip"), &["com/", "com/x/", "com/x/Widget.class"]);
        write_archive(&dir.join("other.jar"), &["org/y/Widget.class"]);

        let libs = LibrarySet::discover(None, &dir).expect("discover");
        let r = libs.resolve("com.x.Widget", Some("mylib"));
        assert_eq!(r.selected_index(), 0);
        assert_eq!(r.current(), "com.x.Widget");
        assert_eq!(r.current_library(), Some(dir.join("mylib.zip").as_path()));
        assert_eq!(r.candidates().len(), 1);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn simple_name_collects_ordered_deduplicated_candidates() {
        let dir = temp_dir("order");
        fs::create_dir_all(&dir).expect("mkdir");
        let rt = dir.join("rt.jar");
        write_archive(&rt, &["java/awt/List.class", "java/util/List.class", "java/util/ListIterator.class"]);
        let libdir = dir.join("libs");
        fs::create_dir_all(&libdir).expect("mkdir libs");
        write_archive(&libdir.join("a.jar"), &["java/util/List.class", "org/x/List.class"]);

        let libs = LibrarySet::discover(Some(rt.clone()), &libdir).expect("discover");
        let first = libs.resolve("List", None);
        let names: Vec<&str> = first.candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["java.awt.List", "java.util.List", "org.x.List"]);
        assert_eq!(first.candidates()[1].library, rt);
        assert_eq!(first.candidates()[2].library, libdir.join("a.jar"));

        let second = libs.resolve("List", None);
        assert_eq!(first.candidates(), second.candidates());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn wildcard_matches_enclosing_namespace() {
        let dir = temp_dir("wildcard");
        fs::create_dir_all(&dir).expect("mkdir");
        write_archive(
            &dir.join("lib.jar"),
            &["java/util/List.class", "java/util/concurrent/Future.class", "shade/java/util/Map.class"],
        );
        let libs = LibrarySet::discover(None, &dir).expect("discover");
        let r = libs.resolve("java.util.*", None);
        let names: Vec<&str> = r.candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["java.util.*", "shade.java.util.*"]);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn unreadable_archive_is_skipped() {
        let dir = temp_dir("corrupt");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("broken.jar"), b"not a zip").expect("write");
        write_archive(&dir.join("good.jar"), &["p/Thing.class"]);

        let libs = LibrarySet::discover(None, &dir).expect("discover");
        assert_eq!(libs.libraries().len(), 2);
        assert!(libs.libraries()[0].entries.is_empty());
        assert_eq!(libs.resolve("Thing", None).current(), "p.Thing");
        let missing = libs.resolve("Nope", None);
        assert!(!missing.is_resolved());
        assert_eq!(missing.current(), "Nope");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn runtime_library_hint_matches_full_path() {
        let dir = temp_dir("rt-hint");
        let rt_dir = dir.join("jdk").join("jre").join("lib");
        fs::create_dir_all(&rt_dir).expect("mkdir rt");
        let rt = rt_dir.join("rt.jar");
        write_archive(&rt, &["java/util/List.class"]);
        let libdir = dir.join("libs");
        fs::create_dir_all(&libdir).expect("mkdir libs");
        write_archive(&libdir.join("jre-extras.jar"), &["java/util/List.class", "x/jre/List.class"]);
        write_archive(&libdir.join("other.jar"), &["org/jre/List.class"]);

        let libs = LibrarySet::discover(Some(rt.clone()), &libdir).expect("discover");
        let r = libs.resolve("java.util.List", Some("jre"));
        assert_eq!(r.current(), "java.util.List");
        assert_eq!(r.current_library(), Some(rt.as_path()));

        let leafs = libs.resolve("List", Some("jre"));
        let libraries: Vec<&Path> = leafs.candidates().iter().map(|c| c.library.as_path()).collect();
        assert_eq!(libraries, vec![rt.as_path(), libdir.join("jre-extras.jar").as_path()]);

        let scoped = libs.resolve("java.util.List", Some("other"));
        assert!(!scoped.is_resolved(), "library-dir archives match on file name only");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn entry_pattern_requires_whole_segment_match() {
        let p = EntryPattern::new("List");
        assert_eq!(p.match_entry("java/util/List.class").as_deref(), Some("java.util.List"));
        assert_eq!(p.match_entry("java/util/ArrayList.class"), None);
        assert_eq!(p.match_entry("List.class").as_deref(), Some("List"));
        assert_eq!(p.match_entry("java/util/List$Node.class"), None);
    }
}
