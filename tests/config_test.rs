//! Configuration store tests
//!
//! Secrets must never reach the disk in the clear, must survive repeated
//! load/save cycles without double encryption, and a broken document must
//! never stop the store from answering.

mod common;

use common::store_in;
use openspeech::config::{ConfigurationStore, KeyFileProtector, ENCRYPTED_MARKER};
use openspeech::engine::{ConfigurationParameter, Parameters};
use std::fs;
use tempfile::TempDir;

fn azure_schema() -> Vec<ConfigurationParameter> {
    vec![
        ConfigurationParameter::new("subscriptionKey", "Subscription Key", "").secret(),
        ConfigurationParameter::new("region", "Region", ""),
    ]
}

fn params(pairs: &[(&str, &str)]) -> Parameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_missing_file_is_seeded_and_written() {
    let dir = TempDir::new().unwrap();
    let store = store_in(dir.path());

    assert!(dir.path().join("config.json").exists());
    assert_eq!(store.default_engine().as_deref(), Some("SherpaOnnx"));
    assert!(store.is_enabled("SherpaOnnx"));
    assert!(!store.is_enabled("AzureTTS"));
    assert!(store.secure_storage());
}

#[test]
fn test_secret_never_written_in_clear() {
    let dir = TempDir::new().unwrap();
    let store = store_in(dir.path());
    store.declare_schema("AzureTTS", &azure_schema());

    store
        .update_engine_config("AzureTTS", &params(&[("subscriptionKey", "secret123")]))
        .unwrap();

    let on_disk = fs::read_to_string(dir.path().join("config.json")).unwrap();
    assert!(!on_disk.contains("secret123"));
    assert!(on_disk.contains(ENCRYPTED_MARKER));
    // Non-secret values stay readable
    assert!(on_disk.contains("eastus"));

    let reopened = store_in(dir.path());
    let config = reopened.get_engine_config("AzureTTS");
    assert_eq!(config["subscriptionKey"], "secret123");
    assert_eq!(config["region"], "eastus");
}

#[test]
fn test_name_heuristic_seals_undeclared_secrets() {
    let dir = TempDir::new().unwrap();
    let store = store_in(dir.path());

    store
        .update_engine_config("ElevenLabs", &params(&[("apiKey", "sk-live-42")]))
        .unwrap();

    let on_disk = fs::read_to_string(dir.path().join("config.json")).unwrap();
    assert!(!on_disk.contains("sk-live-42"));
    assert_eq!(store.get_engine_config("ElevenLabs")["apiKey"], "sk-live-42");
}

#[test]
fn test_repeated_save_load_does_not_double_encrypt() {
    let dir = TempDir::new().unwrap();
    let store = store_in(dir.path());
    store.declare_schema("AzureTTS", &azure_schema());
    store
        .update_engine_config("AzureTTS", &params(&[("subscriptionKey", "secret123")]))
        .unwrap();

    for _ in 0..3 {
        let store = store_in(dir.path());
        store.declare_schema("AzureTTS", &azure_schema());
        store.flush().unwrap();
    }

    let store = store_in(dir.path());
    assert_eq!(store.get_engine_config("AzureTTS")["subscriptionKey"], "secret123");

    let on_disk = fs::read_to_string(dir.path().join("config.json")).unwrap();
    assert_eq!(on_disk.matches(ENCRYPTED_MARKER).count(), 1);
}

#[test]
fn test_placeholders_resolved_on_read_only() {
    let dir = TempDir::new().unwrap();
    let store = store_in(dir.path());
    std::env::set_var("OPENSPEECH_TEST_REGION", "westeurope");

    store
        .update_engine_config(
            "AzureTTS",
            &params(&[("region", "%OPENSPEECH_TEST_REGION%"), ("endpoint", "%NO_SUCH_VAR_X%")]),
        )
        .unwrap();

    let config = store.get_engine_config("AzureTTS");
    assert_eq!(config["region"], "westeurope");
    assert_eq!(config["endpoint"], "%NO_SUCH_VAR_X%");

    let on_disk = fs::read_to_string(dir.path().join("config.json")).unwrap();
    assert!(on_disk.contains("%OPENSPEECH_TEST_REGION%"));
    assert!(!on_disk.contains("westeurope"));
}

#[test]
fn test_corrupt_file_yields_defaults_and_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ this is not json").unwrap();

    let store = store_in(dir.path());
    let config = store.current();
    assert_eq!(config.default_engine(), Some("SherpaOnnx"));
    assert!(config.engines.contains_key("AzureTTS"));

    assert_eq!(fs::read_to_string(&path).unwrap(), "{ this is not json");
}

#[test]
fn test_foreign_ciphertext_kept_across_saves() {
    let dir = TempDir::new().unwrap();
    let store = store_in(dir.path());
    store.declare_schema("AzureTTS", &azure_schema());
    store
        .update_engine_config("AzureTTS", &params(&[("subscriptionKey", "secret123")]))
        .unwrap();
    let before = fs::read_to_string(dir.path().join("config.json")).unwrap();
    assert!(before.contains(ENCRYPTED_MARKER));

    // Same document, different key: the value cannot be opened
    let other_key = dir.path().join("other.key");
    let foreign = ConfigurationStore::new(
        dir.path().join("config.json"),
        Box::new(KeyFileProtector::new(other_key)),
    );
    foreign.load();
    assert!(!foreign.get_engine_config("AzureTTS").contains_key("subscriptionKey"));

    foreign.set_engine_enabled("AzureTTS", true).unwrap();

    // The original key still opens the value written back by the foreign store
    let store = store_in(dir.path());
    assert!(store.is_enabled("AzureTTS"));
    assert_eq!(store.get_engine_config("AzureTTS")["subscriptionKey"], "secret123");
}

#[test]
fn test_plaintext_when_secure_storage_off() {
    let dir = TempDir::new().unwrap();
    let store = store_in(dir.path());

    let mut config = store.current();
    config.secure_storage = false;
    config
        .engines
        .get_mut("ElevenLabs")
        .unwrap()
        .parameters
        .insert("apiKey".into(), "visible".into());
    store.save(&config).unwrap();

    let on_disk = fs::read_to_string(dir.path().join("config.json")).unwrap();
    assert!(on_disk.contains("visible"));
    assert_eq!(store.get_engine_config("ElevenLabs")["apiKey"], "visible");
}

#[test]
fn test_default_engine_and_enable_persist() {
    let dir = TempDir::new().unwrap();
    let store = store_in(dir.path());
    store.set_engine_enabled("AzureTTS", true).unwrap();
    store.set_default_engine("AzureTTS").unwrap();

    let reopened = store_in(dir.path());
    assert!(reopened.is_enabled("AzureTTS"));
    assert_eq!(reopened.default_engine().as_deref(), Some("AzureTTS"));
}
