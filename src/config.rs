// Purpose: Persisted user settings: JDK location, library directory, default macros.
// Inputs/Outputs: Reads/writes a pretty-printed JSON file; yields validated paths for a build session.
// Invariants: Missing fields take defaults, so older settings files keep loading.
// Gotchas: `$home` in `library_dir` is expanded at use time, not when the file is written.

use anyhow::{Context, bail};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::frontend::macros::MacroTable;

pub const SETTINGS_ENV: &str = "JSC_SETTINGS";
const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// JDK installation root; `JAVA_HOME` is used when left empty.
    pub toolchain_root: PathBuf,
    pub library_dir: String,
    pub global_macros: MacroTable,
    pub compile_timeout_secs: u64,
    pub archive_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            toolchain_root: PathBuf::new(),
            library_dir: "$home/.jrt-libs".to_string(),
            global_macros: [("#print", "System.out.println")].into_iter().collect(),
            compile_timeout_secs: 120,
            archive_name: "JSCRuntime.jar".to_string(),
        }
    }
}

/// `explicit`, else `$JSC_SETTINGS`, else the platform config directory.
pub fn settings_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(SETTINGS_ENV)
        && !p.is_empty()
    {
        return Ok(PathBuf::from(p));
    }
    let pd = ProjectDirs::from("dev", "jsc", "jsc").context("cannot determine OS config directory")?;
    Ok(pd.config_dir().join(SETTINGS_FILE_NAME))
}

impl Settings {
    /// Loads `path`, writing the defaults there first when it does not exist.
    pub fn load_or_init(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let settings = Settings::default();
            settings.save(path)?;
            info!("wrote default settings to {}", path.display());
            return Ok(settings);
        }
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse settings {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        fs::write(path, text).with_context(|| format!("write {}", path.display()))
    }

    /// The library directory with `$home` expanded, created when missing.
    pub fn library_dir(&self) -> anyhow::Result<PathBuf> {
        let home = BaseDirs::new().map(|b| b.home_dir().to_path_buf());
        let dir = expand_home(&self.library_dir, home.as_deref());
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("cannot create library directory {}", dir.display()))?;
        }
        if !dir.is_dir() {
            bail!("library_dir {} is not a directory", dir.display());
        }
        Ok(dir)
    }

    /// The configured JDK root, which must be an existing directory.
    pub fn toolchain_root(&self) -> anyhow::Result<PathBuf> {
        let root = if self.toolchain_root.as_os_str().is_empty() {
            std::env::var_os("JAVA_HOME").map(PathBuf::from).unwrap_or_default()
        } else {
            self.toolchain_root.clone()
        };
        if root.as_os_str().is_empty() {
            bail!("toolchain_root is not set and JAVA_HOME is empty");
        }
        if !root.is_dir() {
            bail!("toolchain_root {} is not a directory", root.display());
        }
        Ok(root)
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs.max(1))
    }
}

/// `<root>/jre/lib/rt.jar`, or `<root>/lib/rt.jar`, whichever exists first.
pub fn runtime_library(root: &Path) -> Option<PathBuf> {
    [root.join("jre").join("lib").join("rt.jar"), root.join("lib").join("rt.jar")]
        .into_iter()
        .find(|p| p.is_file())
}

fn expand_home(raw: &str, home: Option<&Path>) -> PathBuf {
    match home {
        Some(h) if raw.contains("$home") => PathBuf::from(raw.replace("$home", &h.to_string_lossy())),
        _ => PathBuf::from(raw),
    }
}
