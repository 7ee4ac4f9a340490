//! Plugin discovery tests
//!
//! Module files are mostly plain text manifests; a corrupt module goes
//! through the real shared-library loader.

mod common;

use common::{store_in, ManifestLoader};
use openspeech::platform::module_extension;
use openspeech::plugins::{DylibLoader, ModuleLoader, PluginDiscovery};
use openspeech::{EngineRegistry, OpenSpeechError};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn module(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{}.{}", stem, module_extension()))
}

fn discovery(dir: &Path) -> PluginDiscovery {
    PluginDiscovery::with_loader(dir, Box::new(ManifestLoader))
}

#[test]
fn test_missing_directory_is_empty_report() {
    let dir = TempDir::new().unwrap();
    let mut registry = EngineRegistry::new(store_in(dir.path()));

    let report = discovery(&dir.path().join("nope")).discover(&mut registry);
    assert_eq!(report.modules_scanned, 0);
    assert!(report.is_clean());
    assert!(registry.is_empty());
}

#[test]
fn test_corrupt_module_does_not_stop_discovery() {
    let dir = TempDir::new().unwrap();
    let plugins = dir.path().join("plugins");
    fs::create_dir_all(&plugins).unwrap();
    fs::write(module(&plugins, "a_broken"), b"\x00\x01 definitely not a library").unwrap();
    fs::write(module(&plugins, "b_good"), "engines: Acme").unwrap();

    let mut registry = EngineRegistry::new(store_in(dir.path()));
    let report = discovery(&plugins).discover(&mut registry);

    assert_eq!(report.modules_scanned, 2);
    assert_eq!(report.registered, vec!["Acme".to_string()]);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0],
        OpenSpeechError::Plugin { ref path, .. } if path.ends_with(format!("a_broken.{}", module_extension()))
    ));
    assert!(registry.is_registered("Acme"));
}

#[test]
fn test_engine_level_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let plugins = dir.path().join("plugins");
    fs::create_dir_all(&plugins).unwrap();
    fs::write(module(&plugins, "pair"), "engines: Good, !Bad").unwrap();

    let mut registry = EngineRegistry::new(store_in(dir.path()));
    let report = discovery(&plugins).discover(&mut registry);

    assert_eq!(report.registered, vec!["Good".to_string()]);
    assert_eq!(report.failures.len(), 1);
    assert!(!registry.is_registered("Bad"));
}

#[test]
fn test_non_module_files_ignored() {
    let dir = TempDir::new().unwrap();
    let plugins = dir.path().join("plugins");
    fs::create_dir_all(&plugins).unwrap();
    fs::write(plugins.join("README.txt"), "engines: Nope").unwrap();
    fs::write(module(&plugins, "real"), "engines: Yes").unwrap();

    let found = discovery(&plugins).candidates();
    assert_eq!(found, vec![module(&plugins, "real")]);
}

#[test]
fn test_vendor_subdirectories() {
    let dir = TempDir::new().unwrap();
    let plugins = dir.path().join("plugins");
    let vendor = plugins.join("vendor");
    let too_deep = vendor.join("nested");
    fs::create_dir_all(&too_deep).unwrap();
    fs::write(module(&plugins, "top"), "engines: Top").unwrap();
    fs::write(module(&vendor, "vendored"), "engines: Vendored").unwrap();
    fs::write(module(&too_deep, "deep"), "engines: Deep").unwrap();

    let mut registry = EngineRegistry::new(store_in(dir.path()));
    let report = discovery(&plugins).discover(&mut registry);
    assert!(registry.is_registered("Top"));
    assert!(registry.is_registered("Vendored"));
    assert!(!registry.is_registered("Deep"));
    assert_eq!(report.modules_scanned, 2);

    let mut flat = EngineRegistry::new(store_in(dir.path()));
    discovery(&plugins)
        .scan_subdirectories(false)
        .discover(&mut flat);
    assert_eq!(flat.names(), vec!["Top".to_string()]);
}

#[test]
fn test_rescan_replaces_without_duplicates() {
    let dir = TempDir::new().unwrap();
    let plugins = dir.path().join("plugins");
    fs::create_dir_all(&plugins).unwrap();
    fs::write(module(&plugins, "acme"), "engines: Acme, Zed").unwrap();

    let mut registry = EngineRegistry::new(store_in(dir.path()));
    let scanner = discovery(&plugins);
    scanner.discover(&mut registry);
    let report = scanner.discover(&mut registry);

    assert_eq!(report.registered.len(), 2);
    assert_eq!(registry.names(), vec!["Acme".to_string(), "Zed".to_string()]);
}

#[test]
fn test_real_loader_rejects_garbage() {
    let dir = TempDir::new().unwrap();
    let path = module(dir.path(), "garbage");
    fs::write(&path, b"garbage").unwrap();
    assert!(matches!(
        DylibLoader.load(&path),
        Err(OpenSpeechError::Plugin { .. })
    ));
}
