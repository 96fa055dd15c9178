use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::build::staging::Staging;
use crate::build::toolchain::{JdkToolchain, Toolchain};
use crate::build::{BuildOutcome, Builder};
use crate::config::{Settings, runtime_library};
use crate::frontend::module::ModuleGraph;
use crate::frontend::parser::ModuleParser;
use crate::pkg::library::LibrarySet;

/// Everything one invocation needs, resolved once from the settings.
pub struct Session {
    settings: Settings,
    toolchain_root: PathBuf,
    libraries: LibrarySet,
}

pub struct BuildOptions {
    pub keep_staging: bool,
}

impl Session {
    /// Validates the toolchain root and scans every library archive.
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let toolchain_root = settings.toolchain_root()?;
        let library_dir = settings.library_dir()?;
        let libraries = LibrarySet::discover(runtime_library(&toolchain_root), &library_dir)?;
        debug!(
            "toolchain {}, {} librar(ies), {} default macro(s)",
            toolchain_root.display(),
            libraries.libraries().len(),
            settings.global_macros.len()
        );
        Ok(Self {
            settings,
            toolchain_root,
            libraries,
        })
    }

    pub fn with_libraries(settings: Settings, toolchain_root: PathBuf, libraries: LibrarySet) -> Self {
        Self {
            settings,
            toolchain_root,
            libraries,
        }
    }

    pub fn toolchain_root(&self) -> &Path {
        &self.toolchain_root
    }

    pub fn toolchain(&self) -> JdkToolchain {
        JdkToolchain::new(&self.toolchain_root, self.settings.compile_timeout())
    }

    pub fn load_graph(&self, entry: &Path) -> anyhow::Result<ModuleGraph> {
        let parser = ModuleParser::new(&self.libraries, &self.settings.global_macros);
        let mut graph = ModuleGraph::new();
        parser.load_entry(&mut graph, entry)?;
        info!("loaded {} module(s) from {}", graph.modules().len(), entry.display());
        Ok(graph)
    }

    /// Parses `entry`, then generates, compiles and packages it.
    pub fn build_file(
        &self,
        entry: &Path,
        toolchain: &dyn Toolchain,
        options: &BuildOptions,
    ) -> anyhow::Result<BuildOutcome> {
        let mut graph = self.load_graph(entry)?;
        let staging = Staging::create(entry)?;
        debug!("staging in {}", staging.root().display());
        let builder = Builder::new(toolchain, &staging, PathBuf::from(&self.settings.archive_name))?;
        let outcome = builder.build(&mut graph);
        if options.keep_staging {
            info!("kept staging directory {}", staging.root().display());
        } else {
            let root = staging.root().to_path_buf();
            staging
                .remove()
                .with_context(|| format!("cleanup after building {}", root.display()))?;
        }
        outcome
    }
}
