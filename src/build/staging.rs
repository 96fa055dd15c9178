use anyhow::Context;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::frontend::module::Module;

/// Scratch tree for one build: generated sources under `src/`, compiler
/// output under `bin/`.
#[derive(Debug)]
pub struct Staging {
    root: PathBuf,
    src: PathBuf,
    bin: PathBuf,
}

impl Staging {
    /// A staging tree under the system temp dir, keyed by the entry file.
    pub fn create(entry: &Path) -> anyhow::Result<Self> {
        Self::create_in(&std::env::temp_dir(), entry)
    }

    pub fn create_in(base: &Path, entry: &Path) -> anyhow::Result<Self> {
        let root = base.join(format!("jsc-{}-{}", staging_key(entry), std::process::id()));
        let src = root.join("src");
        let bin = root.join("bin");
        for dir in [&src, &bin] {
            fs::create_dir_all(dir)
                .with_context(|| format!("create staging directory {}", dir.display()))?;
        }
        Ok(Self { root, src, bin })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn src_dir(&self) -> &Path {
        &self.src
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("temp.mf")
    }

    pub fn source_file(&self, module: &Module) -> PathBuf {
        self.src.join(module.source_path())
    }

    /// Writes `text` as the module's generated source, creating package dirs.
    pub fn write_source(&self, module: &Module, text: &str) -> anyhow::Result<PathBuf> {
        let path = self.source_file(module);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create package directory {}", parent.display()))?;
        }
        fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn remove(self) -> anyhow::Result<()> {
        fs::remove_dir_all(&self.root)
            .with_context(|| format!("remove staging directory {}", self.root.display()))
    }
}

fn staging_key(entry: &Path) -> String {
    let abs = fs::canonicalize(entry).unwrap_or_else(|_| entry.to_path_buf());
    let mut h = Sha256::new();
    h.update(abs.to_string_lossy().as_bytes());
    let mut key = hex::encode(h.finalize());
    key.truncate(12);
    key
}

#[cfg(test)]
mod tests {
    use super::{Staging, staging_key};
    use crate::frontend::macros::MacroTable;
    use crate::frontend::module::Module;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time drift")
            .as_nanos();
        std::env::temp_dir().join(format!("jsc-{}-{}-{}", prefix, std::process::id(), nonce))
    }

    #[test]
    fn key_is_stable_and_short() {
        let a = staging_key(Path::new("/nowhere/main.jsc"));
        assert_eq!(a.len(), 12);
        assert_eq!(a, staging_key(Path::new("/nowhere/main.jsc")));
        assert_ne!(a, staging_key(Path::new("/nowhere/other.jsc")));
    }

    #[test]
    fn writes_sources_under_package_dirs() {
        let base = temp_dir("staging");
        let staging = Staging::create_in(&base, Path::new("main.jsc")).expect("create");
        assert!(staging.src_dir().is_dir());
        assert!(staging.bin_dir().is_dir());

        let mut m = Module::new("Foo", MacroTable::new());
        m.package = Some("com.acme".into());
        let path = staging.write_source(&m, "package com.acme;\n").expect("write");
        assert_eq!(path, staging.src_dir().join("com").join("acme").join("Foo.java"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "package com.acme;\n");

        let root = staging.root().to_path_buf();
        staging.remove().expect("remove");
        assert!(!root.exists());
        let _ = fs::remove_dir_all(base);
    }
}
