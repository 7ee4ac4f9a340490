//! Loading engine modules from shared libraries

use super::{PluginDeclaration, PluginRegistrar, CORE_VERSION, PLUGIN_API_VERSION, PLUGIN_ENTRY_SYMBOL};
use crate::engine::{
    ComponentIdentity, ConfigurationParameter, EngineCapabilities, Parameters, TtsEngine,
    VoiceDescriptor,
};
use crate::{OpenSpeechError, Result};
use libloading::{Library, Symbol};
use log::{debug, error};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

/// Turns one module file into the engines it exposes
///
/// Implemented by [`DylibLoader`] for real shared libraries; tests and
/// static builds can supply their own.
pub trait ModuleLoader {
    fn load(&self, path: &Path) -> Result<Vec<Box<dyn TtsEngine>>>;
}

/// Loader for shared libraries exporting `openspeech_plugin_declaration`
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibLoader;

/// Collects engines handed over by a plugin's register function
#[derive(Default)]
struct Collector {
    engines: Vec<Box<dyn TtsEngine>>,
}

impl PluginRegistrar for Collector {
    fn register_engine(&mut self, engine: Box<dyn TtsEngine>) {
        debug!("Plugin offered engine {}", engine.name());
        self.engines.push(engine);
    }
}

fn plugin_error(path: &Path, reason: impl ToString) -> OpenSpeechError {
    OpenSpeechError::Plugin {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Extract a readable message from a panic payload
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

impl ModuleLoader for DylibLoader {
    fn load(&self, path: &Path) -> Result<Vec<Box<dyn TtsEngine>>> {
        debug!("Loading plugin module {}", path.display());

        // SAFETY: loading a foreign library runs its initializers; modules in
        // the plugin directory are trusted by installation.
        let library = unsafe { Library::new(path) }.map_err(|e| plugin_error(path, e))?;

        let declaration = unsafe {
            let symbol: Symbol<*const PluginDeclaration> = library
                .get(PLUGIN_ENTRY_SYMBOL)
                .map_err(|e| plugin_error(path, e))?;
            let ptr = *symbol;
            if ptr.is_null() {
                return Err(plugin_error(path, "null plugin declaration"));
            }
            // SAFETY: the symbol is the static emitted by `export_plugin!`
            *ptr
        };

        if declaration.api_version != PLUGIN_API_VERSION {
            return Err(plugin_error(
                path,
                format!(
                    "api_version mismatch: plugin={}, host={}",
                    declaration.api_version, PLUGIN_API_VERSION
                ),
            ));
        }
        if declaration.core_version != CORE_VERSION {
            return Err(plugin_error(
                path,
                format!(
                    "built against openspeech {}, host is {}",
                    declaration.core_version, CORE_VERSION
                ),
            ));
        }

        let mut collector = Collector::default();
        catch_unwind(AssertUnwindSafe(|| (declaration.register)(&mut collector))).map_err(
            |payload| {
                let msg = panic_message(payload);
                error!("Plugin {} panicked during registration: {}", path.display(), msg);
                plugin_error(path, format!("panic in register: {}", msg))
            },
        )?;

        let library = Arc::new(library);
        Ok(collector
            .engines
            .into_iter()
            .map(|engine| {
                Box::new(PluginEngine {
                    engine,
                    _library: library.clone(),
                }) as Box<dyn TtsEngine>
            })
            .collect())
    }
}

/// Engine created by a plugin, pinned to the library that owns its code
///
/// Field order matters: the engine drops before the library unloads.
struct PluginEngine {
    engine: Box<dyn TtsEngine>,
    _library: Arc<Library>,
}

impl TtsEngine for PluginEngine {
    fn name(&self) -> &str {
        self.engine.name()
    }

    fn version(&self) -> &str {
        self.engine.version()
    }

    fn description(&self) -> String {
        self.engine.description()
    }

    fn capabilities(&self) -> EngineCapabilities {
        self.engine.capabilities()
    }

    fn parameters(&self) -> Vec<ConfigurationParameter> {
        self.engine.parameters()
    }

    fn validate(&self, config: &Parameters) -> Result<()> {
        self.engine.validate(config)
    }

    fn list_voices(&self, config: &Parameters) -> Result<Vec<VoiceDescriptor>> {
        self.engine.list_voices(config)
    }

    fn synthesize(&self, text: &str, voice_id: &str, params: &Parameters) -> Result<Vec<u8>> {
        self.engine.synthesize(text, voice_id, params)
    }

    fn component(&self) -> ComponentIdentity {
        self.engine.component()
    }

    fn registration_attributes(
        &self,
        voice: &VoiceDescriptor,
        config: &Parameters,
    ) -> Result<BTreeMap<String, String>> {
        self.engine.registration_attributes(voice, config)
    }

    fn auxiliary_descriptor(
        &self,
        voice: &VoiceDescriptor,
        config: &Parameters,
    ) -> Result<Option<serde_json::Value>> {
        self.engine.auxiliary_descriptor(voice, config)
    }

    fn initialize(&mut self) -> Result<()> {
        let name = self.engine.name().to_string();
        catch_unwind(AssertUnwindSafe(|| self.engine.initialize())).unwrap_or_else(|payload| {
            Err(OpenSpeechError::Other(format!(
                "engine {} panicked during initialize: {}",
                name,
                panic_message(payload)
            )))
        })
    }

    fn shutdown(&mut self) {
        let name = self.engine.name().to_string();
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| self.engine.shutdown())) {
            error!("Engine {} panicked during shutdown: {}", name, panic_message(payload));
        }
    }
}
