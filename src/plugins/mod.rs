//! Plugin discovery for engines living outside the core binary
//!
//! A plugin is a shared library that exports a [`PluginDeclaration`]
//! under the symbol `openspeech_plugin_declaration`, usually through
//! [`export_plugin!`](crate::export_plugin). Discovery walks the plugin
//! directory (and optionally one level of vendor subdirectories), loads
//! every module it finds and registers the engines each one offers.
//!
//! Discovery is best-effort: a module that fails to load, declares an
//! incompatible ABI, panics, or offers an engine that fails to initialize
//! is logged and skipped. Nothing a single module does can abort the scan.

mod loader;

pub use loader::{DylibLoader, ModuleLoader};

use crate::engine::TtsEngine;
use crate::platform;
use crate::registry::EngineRegistry;
use crate::OpenSpeechError;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Bumped whenever [`PluginDeclaration`] or [`TtsEngine`] change shape
pub const PLUGIN_API_VERSION: u32 = 1;

/// Plugins must be built against the same core release
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exported symbol name, NUL-terminated for the dynamic loader
pub const PLUGIN_ENTRY_SYMBOL: &[u8] = b"openspeech_plugin_declaration\0";

/// Receives engines from a plugin's register function
pub trait PluginRegistrar {
    fn register_engine(&mut self, engine: Box<dyn TtsEngine>);
}

/// Static exported by every plugin module
#[derive(Clone, Copy)]
pub struct PluginDeclaration {
    pub api_version: u32,
    pub core_version: &'static str,
    pub register: fn(&mut dyn PluginRegistrar),
}

/// Export a plugin declaration from a `cdylib`
///
/// ```ignore
/// fn register(registrar: &mut dyn openspeech::plugins::PluginRegistrar) {
///     registrar.register_engine(Box::new(MyEngine::default()));
/// }
///
/// openspeech::export_plugin!(register);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($register:expr) => {
        #[doc(hidden)]
        #[no_mangle]
        #[allow(non_upper_case_globals)]
        pub static openspeech_plugin_declaration: $crate::plugins::PluginDeclaration =
            $crate::plugins::PluginDeclaration {
                api_version: $crate::plugins::PLUGIN_API_VERSION,
                core_version: $crate::plugins::CORE_VERSION,
                register: $register,
            };
    };
}

/// Outcome of one discovery pass
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Module files examined
    pub modules_scanned: usize,

    /// Engine names registered, in discovery order
    pub registered: Vec<String>,

    /// One entry per module or engine that was skipped
    pub failures: Vec<OpenSpeechError>,
}

impl DiscoveryReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Plugin directory scanner
pub struct PluginDiscovery {
    dir: PathBuf,
    scan_subdirectories: bool,
    loader: Box<dyn ModuleLoader>,
}

impl PluginDiscovery {
    /// Scanner over `dir` loading real shared libraries
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_loader(dir, Box::new(DylibLoader))
    }

    pub fn with_loader(dir: impl Into<PathBuf>, loader: Box<dyn ModuleLoader>) -> Self {
        Self {
            dir: dir.into(),
            scan_subdirectories: true,
            loader,
        }
    }

    /// Also look one level down, in vendor subdirectories
    pub fn scan_subdirectories(mut self, enabled: bool) -> Self {
        self.scan_subdirectories = enabled;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Module files under the plugin directory, in a stable order
    pub fn candidates(&self) -> Vec<PathBuf> {
        let max_depth = if self.scan_subdirectories { 2 } else { 1 };
        WalkDir::new(&self.dir)
            .follow_links(false)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable plugin path: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && platform::is_module_file(entry.path()))
            .map(|entry| entry.into_path())
            .collect()
    }

    /// Load every module and register its engines
    ///
    /// A missing plugin directory yields an empty report.
    pub fn discover(&self, registry: &mut EngineRegistry) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        if !self.dir.is_dir() {
            info!("Plugin directory {} not found, no plugins loaded", self.dir.display());
            return report;
        }

        for path in self.candidates() {
            report.modules_scanned += 1;
            let engines = match self.loader.load(&path) {
                Ok(engines) => engines,
                Err(e) => {
                    warn!("Skipping plugin module: {}", e);
                    report.failures.push(e);
                    continue;
                }
            };
            debug!("{} offers {} engines", path.display(), engines.len());

            for engine in engines {
                let name = engine.name().to_string();
                match registry.register(engine) {
                    Ok(()) => report.registered.push(name),
                    Err(e) => {
                        warn!("Engine {} from {} failed to register: {}", name, path.display(), e);
                        report.failures.push(OpenSpeechError::Plugin {
                            path: path.clone(),
                            reason: format!("engine {}: {}", name, e),
                        });
                    }
                }
            }
        }

        info!(
            "Plugin discovery: {} modules, {} engines registered, {} failures",
            report.modules_scanned,
            report.registered.len(),
            report.failures.len()
        );
        report
    }
}
