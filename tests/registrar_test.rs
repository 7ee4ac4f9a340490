//! Voice registrar tests
//!
//! Registration, overwrite, family binding hand-over on unregister,
//! rollback after a failed write, descriptor files and sealed attributes.

mod common;

use common::{store_in, FakeEngine, FAKE_CLSID};
use openspeech::config::{ConfigurationStore, ENCRYPTED_MARKER};
use openspeech::engine::builtin::PipeServiceEngine;
use openspeech::engine::{ConfigurationParameter, Parameters};
use openspeech::voices::{
    attr, ComponentBinding, FileVoiceDirectory, RegisteredVoiceRecord, VoiceDirectory,
};
use openspeech::{EngineRegistry, OpenSpeechError, Result, VoiceRegistrar};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn registrar_in(dir: &Path, store: Arc<ConfigurationStore>) -> VoiceRegistrar {
    let directory = FileVoiceDirectory::open(dir.join("voices.ini")).unwrap();
    VoiceRegistrar::new(store, Box::new(directory), dir.join("voice_configs"))
}

fn two_voice_engine() -> FakeEngine {
    FakeEngine::new("Fake")
        .with_voice("amy", "Amy", "en-GB")
        .with_voice("ben", "Ben", "en-US")
}

/// Directory whose binding writes fail while `fail` is set
struct FlakyDirectory {
    inner: FileVoiceDirectory,
    fail: Arc<AtomicBool>,
}

impl VoiceDirectory for FlakyDirectory {
    fn read_voice(&self, key: &str) -> Result<Option<RegisteredVoiceRecord>> {
        self.inner.read_voice(key)
    }

    fn write_voice(&mut self, record: &RegisteredVoiceRecord) -> Result<()> {
        self.inner.write_voice(record)
    }

    fn delete_voice(&mut self, key: &str) -> Result<bool> {
        self.inner.delete_voice(key)
    }

    fn voice_keys(&self) -> Result<Vec<String>> {
        self.inner.voice_keys()
    }

    fn read_binding(&self, clsid: &str) -> Result<Option<ComponentBinding>> {
        self.inner.read_binding(clsid)
    }

    fn write_binding(&mut self, binding: &ComponentBinding) -> Result<()> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(OpenSpeechError::VoiceDirectory("access denied".into()));
        }
        self.inner.write_binding(binding)
    }

    fn delete_binding(&mut self, clsid: &str) -> Result<()> {
        self.inner.delete_binding(clsid)
    }
}

#[test]
fn test_register_writes_record_and_binding() {
    let dir = TempDir::new().unwrap();
    let engine = two_voice_engine();
    let mut registrar =
        registrar_in(dir.path(), store_in(dir.path())).with_module_path("/opt/openspeech/sapi.so");

    let record = registrar.register(&engine, &engine.voices[0]).unwrap();
    assert_eq!(record.key, "Amy");
    assert_eq!(record.language, "809");
    assert_eq!(record.clsid, FAKE_CLSID);
    assert_eq!(record.module_path.as_deref(), Some("/opt/openspeech/sapi.so"));
    assert_eq!(record.attributes[attr::LANGUAGE], "809");
    assert_eq!(record.attributes[attr::GENDER], "Female");
    assert_eq!(record.attributes[attr::AGE], "Adult");
    assert_eq!(record.attributes[attr::VENDOR], "Test Vendor");
    assert_eq!(record.attributes[attr::NAME], "Amy");

    assert_eq!(registrar.installed_voice("Amy").unwrap(), Some(record));
    let binding = registrar.binding(FAKE_CLSID).unwrap().unwrap();
    assert_eq!(binding.voice, "Amy");
    assert_eq!(binding.module_path.as_deref(), Some("/opt/openspeech/sapi.so"));
}

#[test]
fn test_reregister_overwrites_single_entry() {
    let dir = TempDir::new().unwrap();
    let mut registrar = registrar_in(dir.path(), store_in(dir.path()));

    let first = FakeEngine::new("Fake")
        .with_voice("amy", "Amy", "en-GB")
        .with_attribute("Quality", "low");
    registrar.register(&first, &first.voices[0]).unwrap();

    let second = FakeEngine::new("Fake")
        .with_voice("amy", "Amy", "en-GB")
        .with_attribute("Quality", "high");
    registrar.register(&second, &second.voices[0]).unwrap();

    let installed = registrar.installed_voices().unwrap();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].attributes["Quality"], "high");
}

#[test]
fn test_engine_attributes_cannot_override_language_or_name() {
    let dir = TempDir::new().unwrap();
    let mut registrar = registrar_in(dir.path(), store_in(dir.path()));
    let engine = FakeEngine::new("Fake")
        .with_voice("amy", "Amy", "en-GB")
        .with_attribute(attr::LANGUAGE, "de-DE")
        .with_attribute(attr::NAME, "Imposter");

    let record = registrar.register(&engine, &engine.voices[0]).unwrap();
    assert_eq!(record.attributes[attr::LANGUAGE], "809");
    assert_eq!(record.attributes[attr::NAME], "Amy");
}

#[test]
fn test_locale_resolution_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let mut registrar = registrar_in(dir.path(), store_in(dir.path()));
    let engine = FakeEngine::new("Fake")
        .with_voice("a", "Upper", "en-GB")
        .with_voice("b", "Lower", "en_gb")
        .with_voice("c", "French", "fr")
        .with_voice("d", "Unknown", "xx-YY");

    let languages: Vec<String> = engine
        .voices
        .iter()
        .map(|v| registrar.register(&engine, v).unwrap().language)
        .collect();
    assert_eq!(languages, vec!["809", "809", "40C", "409"]);
}

#[test]
fn test_unregister_hands_binding_to_remaining_voice() {
    let dir = TempDir::new().unwrap();
    let engine = two_voice_engine();
    let mut registrar = registrar_in(dir.path(), store_in(dir.path()));

    registrar.register(&engine, &engine.voices[0]).unwrap();
    registrar.register(&engine, &engine.voices[1]).unwrap();
    // Last registration wins
    assert_eq!(registrar.binding(FAKE_CLSID).unwrap().unwrap().voice, "Ben");

    registrar.unregister("Ben").unwrap();
    assert!(registrar.installed_voice("Ben").unwrap().is_none());
    assert_eq!(registrar.binding(FAKE_CLSID).unwrap().unwrap().voice, "Amy");

    registrar.unregister("Amy").unwrap();
    assert!(registrar.installed_voices().unwrap().is_empty());
    assert!(registrar.binding(FAKE_CLSID).unwrap().is_none());
}

/// PipeService engine over a two-voice definitions file; every voice gets a descriptor
fn pipe_registry(dir: &Path, store: &Arc<ConfigurationStore>) -> EngineRegistry {
    let voices_file = dir.join("voices.json");
    fs::write(
        &voices_file,
        r#"[{"name": "Amy", "locale": "en-GB", "gender": "Female",
             "ttsConfig": {"engine": "azureTTS", "voice_id": "en-GB-SoniaNeural"}},
            {"name": "Ben", "locale": "en-US", "gender": "Male",
             "ttsConfig": {"engine": "azureTTS", "voice_id": "en-US-GuyNeural"}}]"#,
    )
    .unwrap();
    let mut params = Parameters::new();
    params.insert("voicesFile".into(), voices_file.display().to_string());
    store.update_engine_config("PipeService", &params).unwrap();

    let mut registry = EngineRegistry::new(store.clone());
    registry.register(Box::new(PipeServiceEngine::new())).unwrap();
    registry
}

#[test]
fn test_unregister_other_voice_keeps_binding() {
    let dir = TempDir::new().unwrap();
    let store = store_in(dir.path());
    let registry = pipe_registry(dir.path(), &store);
    let mut registrar = registrar_in(dir.path(), store);

    let amy = registrar
        .register_engine_voice(&registry, "PipeService", "Amy")
        .unwrap();
    let ben = registrar
        .register_engine_voice(&registry, "PipeService", "Ben")
        .unwrap();
    let amy_descriptor = amy.config_path.clone().unwrap();
    let ben_descriptor = ben.config_path.clone().unwrap();
    assert!(amy_descriptor.exists());
    let binding = registrar.binding(&ben.clsid).unwrap().unwrap();
    assert_eq!(binding.voice, "Ben");

    registrar.unregister("Amy").unwrap();

    assert!(registrar.installed_voice("Amy").unwrap().is_none());
    assert!(!amy_descriptor.exists());
    assert_eq!(registrar.installed_voice("Ben").unwrap(), Some(ben));
    assert!(ben_descriptor.exists());
    assert_eq!(registrar.binding(&binding.clsid).unwrap(), Some(binding));
}

#[test]
fn test_stuck_descriptor_does_not_strand_binding() {
    let dir = TempDir::new().unwrap();
    let store = store_in(dir.path());
    let registry = pipe_registry(dir.path(), &store);
    let mut registrar = registrar_in(dir.path(), store);

    registrar
        .register_engine_voice(&registry, "PipeService", "Amy")
        .unwrap();
    let ben = registrar
        .register_engine_voice(&registry, "PipeService", "Ben")
        .unwrap();

    // A directory in place of the descriptor cannot be removed as a file
    let ben_descriptor = ben.config_path.clone().unwrap();
    fs::remove_file(&ben_descriptor).unwrap();
    fs::create_dir(&ben_descriptor).unwrap();

    registrar.unregister("Ben").unwrap();

    assert!(registrar.installed_voice("Ben").unwrap().is_none());
    assert_eq!(registrar.binding(&ben.clsid).unwrap().unwrap().voice, "Amy");
}

#[test]
fn test_bracketed_name_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let engine = FakeEngine::new("Fake")
        .with_voice("amy-hd", "Amy [HD]", "en-GB")
        .with_attribute("Description", "\"Warm\" voice ; calm # soft")
        .with_attribute("Padded", "  spaced  ");

    let first = registrar_in(dir.path(), store_in(dir.path()))
        .register(&engine, &engine.voices[0])
        .unwrap();
    assert_eq!(first.key, "Amy [HD]");

    let mut reopened = registrar_in(dir.path(), store_in(dir.path()));
    assert_eq!(reopened.installed_voice("Amy [HD]").unwrap(), Some(first.clone()));

    reopened.register(&engine, &engine.voices[0]).unwrap();
    let mut reopened = registrar_in(dir.path(), store_in(dir.path()));
    let installed = reopened.installed_voices().unwrap();
    assert_eq!(installed, vec![first]);
    assert_eq!(reopened.binding(FAKE_CLSID).unwrap().unwrap().voice, "Amy [HD]");

    reopened.unregister("Amy [HD]").unwrap();
    let reopened = registrar_in(dir.path(), store_in(dir.path()));
    assert!(reopened.installed_voices().unwrap().is_empty());
    assert!(reopened.binding(FAKE_CLSID).unwrap().is_none());
}

#[test]
fn test_binding_ignores_other_families() {
    let dir = TempDir::new().unwrap();
    let mut registrar = registrar_in(dir.path(), store_in(dir.path()));
    let ours = FakeEngine::new("Ours").with_voice("amy", "Amy", "en-GB");
    let theirs = FakeEngine::new("Theirs")
        .with_clsid("{99999999-0000-0000-0000-000000000000}")
        .with_voice("zed", "Zed", "en-US");

    registrar.register(&ours, &ours.voices[0]).unwrap();
    registrar.register(&theirs, &theirs.voices[0]).unwrap();
    registrar.unregister("Amy").unwrap();

    assert!(registrar.binding(FAKE_CLSID).unwrap().is_none());
    assert_eq!(
        registrar
            .binding("{99999999-0000-0000-0000-000000000000}")
            .unwrap()
            .unwrap()
            .voice,
        "Zed"
    );
}

#[test]
fn test_unregister_unknown_voice() {
    let dir = TempDir::new().unwrap();
    let mut registrar = registrar_in(dir.path(), store_in(dir.path()));
    assert!(matches!(
        registrar.unregister("Nobody"),
        Err(OpenSpeechError::VoiceNotFound(_))
    ));
}

#[test]
fn test_failed_binding_write_rolls_back() {
    let dir = TempDir::new().unwrap();
    let fail = Arc::new(AtomicBool::new(false));
    let directory = FlakyDirectory {
        inner: FileVoiceDirectory::open(dir.path().join("voices.ini")).unwrap(),
        fail: fail.clone(),
    };
    let mut registrar = VoiceRegistrar::new(
        store_in(dir.path()),
        Box::new(directory),
        dir.path().join("voice_configs"),
    );

    let original = FakeEngine::new("Fake")
        .with_voice("amy", "Amy", "en-GB")
        .with_attribute("Quality", "low");
    let before = registrar.register(&original, &original.voices[0]).unwrap();

    fail.store(true, Ordering::SeqCst);
    let update = FakeEngine::new("Fake")
        .with_voice("amy", "Amy", "en-GB")
        .with_attribute("Quality", "high");
    let err = registrar.register(&update, &update.voices[0]).unwrap_err();
    assert!(matches!(err, OpenSpeechError::VoiceRegistrationFailed { ref voice, .. } if voice == "Amy"));

    assert_eq!(registrar.installed_voice("Amy").unwrap(), Some(before));
    assert_eq!(registrar.binding(FAKE_CLSID).unwrap().unwrap().voice, "Amy");
}

#[test]
fn test_failed_first_registration_leaves_nothing() {
    let dir = TempDir::new().unwrap();
    let fail = Arc::new(AtomicBool::new(true));
    let directory = FlakyDirectory {
        inner: FileVoiceDirectory::open(dir.path().join("voices.ini")).unwrap(),
        fail,
    };
    let mut registrar = VoiceRegistrar::new(
        store_in(dir.path()),
        Box::new(directory),
        dir.path().join("voice_configs"),
    );
    let engine = two_voice_engine();

    assert!(registrar.register(&engine, &engine.voices[0]).is_err());
    assert!(registrar.installed_voices().unwrap().is_empty());
    assert!(registrar.binding(FAKE_CLSID).unwrap().is_none());
}

#[test]
fn test_secret_attributes_sealed_in_directory() {
    let dir = TempDir::new().unwrap();
    let store = store_in(dir.path());
    let engine = FakeEngine::new("Keyed")
        .with_param(ConfigurationParameter::new("apiKey", "API Key", "").secret())
        .with_voice("amy", "Amy", "en-GB")
        .with_attribute("ApiKey", "zz-voice-secret")
        .with_attribute("Tokens Path", "/models/amy/tokens.txt");
    let mut registry = EngineRegistry::new(store.clone());
    registry.register(Box::new(engine)).unwrap();

    let mut registrar = registrar_in(dir.path(), store);
    let record = registrar
        .register_engine_voice(&registry, "Keyed", "amy")
        .unwrap();

    assert!(record.attributes["ApiKey"].starts_with(ENCRYPTED_MARKER));
    assert_eq!(record.attributes["Tokens Path"], "/models/amy/tokens.txt");

    let on_disk = fs::read_to_string(dir.path().join("voices.ini")).unwrap();
    assert!(!on_disk.contains("zz-voice-secret"));

    let playback = registrar.playback_attributes("Amy").unwrap();
    assert_eq!(playback["ApiKey"], "zz-voice-secret");
}

#[test]
fn test_register_engine_voice_unknown_id() {
    let dir = TempDir::new().unwrap();
    let store = store_in(dir.path());
    let mut registry = EngineRegistry::new(store.clone());
    registry.register(two_voice_engine().boxed()).unwrap();
    let mut registrar = registrar_in(dir.path(), store);

    assert!(matches!(
        registrar.register_engine_voice(&registry, "Fake", "carol"),
        Err(OpenSpeechError::VoiceNotFound(_))
    ));
    assert!(matches!(
        registrar.register_engine_voice(&registry, "Missing", "amy"),
        Err(OpenSpeechError::EngineNotFound(_))
    ));
}

#[test]
fn test_pipe_service_descriptor_lifecycle() {
    let dir = TempDir::new().unwrap();
    let voices_file = dir.path().join("voices.json");
    fs::write(
        &voices_file,
        r#"[{"name": "HelperJenny", "displayName": "Helper Jenny", "locale": "en-US",
             "gender": "Female", "ttsConfig": {"engine": "azureTTS", "voice_id": "en-US-JennyNeural"}}]"#,
    )
    .unwrap();

    let store = store_in(dir.path());
    let mut params = Parameters::new();
    params.insert("voicesFile".into(), voices_file.display().to_string());
    store.update_engine_config("PipeService", &params).unwrap();

    let mut registry = EngineRegistry::new(store.clone());
    registry.register(Box::new(PipeServiceEngine::new())).unwrap();
    let mut registrar = registrar_in(dir.path(), store);

    let record = registrar
        .register_engine_voice(&registry, "PipeService", "HelperJenny")
        .unwrap();
    let descriptor = dir.path().join("voice_configs").join("Helper Jenny.json");
    assert_eq!(record.config_path.as_deref(), Some(descriptor.as_path()));
    assert_eq!(record.attributes["VoiceType"], "PipeService");
    assert_eq!(record.language, "409");

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&descriptor).unwrap()).unwrap();
    assert_eq!(written["ttsConfig"]["voice_id"], "en-US-JennyNeural");

    registrar.unregister("Helper Jenny").unwrap();
    assert!(!descriptor.exists());
}
