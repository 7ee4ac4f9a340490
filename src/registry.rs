//! Live directory of engines and default-engine resolution

use crate::config::ConfigurationStore;
use crate::engine::{EngineDescriptor, TtsEngine};
use crate::{OpenSpeechError, Result};
use log::{debug, info};
use std::sync::Arc;

/// Engine registry
///
/// Engines are kept in registration order; that order drives the
/// default-engine fallback.
pub struct EngineRegistry {
    store: Arc<ConfigurationStore>,
    engines: Vec<Box<dyn TtsEngine>>,
}

impl EngineRegistry {
    pub fn new(store: Arc<ConfigurationStore>) -> Self {
        Self {
            store,
            engines: Vec::new(),
        }
    }

    pub fn store(&self) -> &Arc<ConfigurationStore> {
        &self.store
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.engines.iter().position(|e| e.name() == name)
    }

    /// Register an engine, replacing any engine of the same name
    ///
    /// A replaced engine is shut down and the newcomer keeps the old slot,
    /// so repeated discovery scans do not reshuffle the fallback order.
    pub fn register(&mut self, mut engine: Box<dyn TtsEngine>) -> Result<()> {
        let name = engine.name().to_string();
        engine.initialize()?;
        self.store.declare_schema(&name, &engine.parameters());

        match self.position(&name) {
            Some(idx) => {
                info!("Replacing engine {}", name);
                let mut old = std::mem::replace(&mut self.engines[idx], engine);
                old.shutdown();
            }
            None => {
                info!("Registered engine {} v{}", name, engine.version());
                self.engines.push(engine);
            }
        }
        Ok(())
    }

    /// Register an engine, failing if the name is taken
    pub fn try_register(&mut self, engine: Box<dyn TtsEngine>) -> Result<()> {
        if self.is_registered(engine.name()) {
            return Err(OpenSpeechError::DuplicateEngine(engine.name().to_string()));
        }
        self.register(engine)
    }

    /// Remove an engine and run its shutdown hook
    pub fn unregister(&mut self, name: &str) -> Result<()> {
        let idx = self
            .position(name)
            .ok_or_else(|| OpenSpeechError::EngineNotFound(name.to_string()))?;
        let mut engine = self.engines.remove(idx);
        engine.shutdown();
        info!("Unregistered engine {}", name);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&dyn TtsEngine> {
        self.engines
            .iter()
            .find(|e| e.name() == name)
            .map(|e| e.as_ref())
            .ok_or_else(|| OpenSpeechError::EngineNotFound(name.to_string()))
    }

    pub fn descriptor(&self, name: &str) -> Result<EngineDescriptor> {
        self.get(name).map(|e| e.descriptor())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Engine names in registration order
    pub fn names(&self) -> Vec<String> {
        self.engines.iter().map(|e| e.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Persist `name` as the configured default engine
    pub fn set_default(&self, name: &str) -> Result<()> {
        if !self.is_registered(name) {
            return Err(OpenSpeechError::EngineNotFound(name.to_string()));
        }
        self.store.set_default_engine(name)
    }

    /// The engine to use when the caller does not pick one
    ///
    /// Explicit default if registered and enabled, else the first enabled
    /// engine in registration order.
    pub fn resolve_default(&self) -> Result<&dyn TtsEngine> {
        let config = self.store.current();

        if let Some(name) = config.default_engine() {
            match self.get(name) {
                Ok(engine) if config.is_enabled(name) => return Ok(engine),
                Ok(_) => debug!("Default engine {} is disabled, falling back", name),
                Err(_) => debug!("Default engine {} is not registered, falling back", name),
            }
        }

        self.engines
            .iter()
            .find(|e| config.is_enabled(e.name()))
            .map(|e| e.as_ref())
            .ok_or(OpenSpeechError::NoEnginesAvailable)
    }

    /// Engines that are enabled and whose configuration validates
    pub fn list_enabled(&self) -> Vec<&dyn TtsEngine> {
        let config = self.store.current();
        self.engines
            .iter()
            .filter(|e| config.is_enabled(e.name()))
            .filter(|e| match e.validate(&self.store.get_engine_config(e.name())) {
                Ok(()) => true,
                Err(err) => {
                    debug!("Skipping {}: {}", e.name(), err);
                    false
                }
            })
            .map(|e| e.as_ref())
            .collect()
    }

    /// Shut down and drop every engine
    pub fn shutdown_all(&mut self) {
        for mut engine in self.engines.drain(..) {
            debug!("Shutting down {}", engine.name());
            engine.shutdown();
        }
    }
}

impl Drop for EngineRegistry {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}
