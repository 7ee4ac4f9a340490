//! OpenSpeech command-line entry point
//!
//! Thin front-end over [`Host`]: list engines and voices, install and
//! uninstall voices, edit engine configuration, trigger a plugin rescan.

use anyhow::{bail, Context};
use log::{error, info};
use openspeech::config::RedactedParameters;
use openspeech::engine::Parameters;
use openspeech::Host;
use std::process;

const USAGE: &str = "\
Usage: openspeech [--debug] <command> [args]

Commands:
  engines                          List registered engines
  voices <engine>                  List voices an engine offers
  installed                        List voices in the voice directory
  install <engine> <voice-id>      Register a voice
  uninstall <voice-name>           Remove a registered voice
  rescan                           Re-run plugin discovery
  config get <engine>              Show engine parameters (secrets masked)
  config set <engine> <k=v>...     Update engine parameters
  enable <engine>                  Enable an engine
  disable <engine>                 Disable an engine
  default <engine>                 Make an engine the default";

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let debug_mode = args.iter().any(|arg| arg == "--debug" || arg == "-d");

    if debug_mode {
        // Debug mode: write to openspeech.log
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("openspeech.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open openspeech.log for debug logging: {}", e);
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "OpenSpeech version {} starting (debug mode, logging to openspeech.log)",
            openspeech::VERSION
        );
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Warn)
            .parse_default_env()
            .init();
    }

    let args: Vec<String> = args
        .into_iter()
        .skip(1)
        .filter(|arg| arg != "--debug" && arg != "-d")
        .collect();

    if let Err(e) = run(&args) {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: &[String]) -> anyhow::Result<()> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    if matches!(args.first(), None | Some(&"help") | Some(&"--help") | Some(&"-h")) {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut host = Host::open_default().context("failed to start OpenSpeech host")?;

    match args.as_slice() {
        ["engines"] => {
            let default = host.default_engine().ok();
            for engine in host.engines() {
                let enabled = host.store().is_enabled(&engine.name);
                let marker = if default.as_deref() == Some(engine.name.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} {:<14} {:<8} {}",
                    marker,
                    engine.name,
                    if enabled { "enabled" } else { "disabled" },
                    engine.description
                );
            }
        }
        ["voices", engine] => {
            let voices = host
                .voices(engine)
                .with_context(|| format!("could not list voices for {}", engine))?;
            for voice in voices {
                println!(
                    "{:<40} {:<8} {:<8} {}",
                    voice.id,
                    voice.locale,
                    voice.gender().as_str(),
                    voice.display_name
                );
            }
        }
        ["installed"] => {
            for record in host.installed()? {
                println!(
                    "{:<30} {:<6} {}",
                    record.key, record.language, record.clsid
                );
            }
        }
        ["install", engine, voice_id] => {
            let record = host
                .install(engine, voice_id)
                .with_context(|| format!("could not install {} from {}", voice_id, engine))?;
            println!("Installed {} (language {})", record.key, record.language);
        }
        ["uninstall", key] => {
            host.uninstall(key)
                .with_context(|| format!("could not uninstall {}", key))?;
            println!("Uninstalled {}", key);
        }
        ["rescan"] => {
            let report = host.rescan();
            println!(
                "Scanned {} modules, registered {} engines",
                report.modules_scanned,
                report.registered.len()
            );
            for failure in &report.failures {
                println!("  skipped: {}", failure);
            }
        }
        ["config", "get", engine] => {
            host.registry().get(engine)?;
            let params = host.store().get_engine_config(engine);
            let secrets = host.store().secret_names(engine);
            println!("{}", RedactedParameters::new(&params, &secrets));
        }
        ["config", "set", engine, pairs @ ..] if !pairs.is_empty() => {
            host.registry().get(engine)?;
            let mut params = Parameters::new();
            for pair in pairs {
                let Some((key, value)) = pair.split_once('=') else {
                    bail!("expected key=value, got '{}'", pair);
                };
                params.insert(key.trim().to_string(), value.to_string());
            }
            host.store().update_engine_config(engine, &params)?;
            println!("Updated {} parameters for {}", params.len(), engine);
        }
        ["enable", engine] => {
            host.registry().get(engine)?;
            host.store().set_engine_enabled(engine, true)?;
        }
        ["disable", engine] => {
            host.registry().get(engine)?;
            host.store().set_engine_enabled(engine, false)?;
        }
        ["default", engine] => {
            host.registry().set_default(engine)?;
        }
        _ => {
            eprintln!("{}", USAGE);
            bail!("unknown command: {}", args.join(" "));
        }
    }

    host.shutdown()?;
    Ok(())
}
