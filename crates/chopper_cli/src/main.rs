//! Vocal Chopper - command-line entry point
//!
//! Loads configuration, initializes logging, runs one separate + chop job
//! and renders its events on the terminal.

mod cli;

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use chopper_core::config::{ConfigManager, ConfigSection, Settings};
use chopper_core::logging::{init_tracing_with_file, LogLevel};
use chopper_core::models::{JobState, Phase};
use chopper_core::orchestrator::{ChannelSink, JobEvent, Orchestrator};

use cli::Cli;

/// Default config path: `<config dir>/vocal-chopper/settings.toml`.
fn default_config_path() -> PathBuf {
    match dirs::config_dir() {
        Some(config_dir) => config_dir.join("vocal-chopper").join("settings.toml"),
        None => PathBuf::from(".config").join("settings.toml"),
    }
}

fn log_level(cli: &Cli) -> LogLevel {
    match (cli.quiet, cli.verbose) {
        (true, _) => LogLevel::Warn,
        (false, 0) => LogLevel::Info,
        (false, 1) => LogLevel::Debug,
        (false, _) => LogLevel::Trace,
    }
}

/// Apply command-line overrides that are not persisted.
fn apply_overrides(cli: &Cli, settings: &mut Settings) {
    if let Some(runtime) = &cli.runtime {
        settings.tool.runtime = runtime.clone();
    }
    if let Some(script) = &cli.script {
        settings.tool.script_path = script.to_string_lossy().to_string();
    }
}

/// Output folder: `--dest`, else the last one used, else next to the input.
fn resolve_dest(cli: &Cli, settings: &Settings) -> PathBuf {
    if let Some(dest) = &cli.dest {
        return dest.clone();
    }
    if !settings.paths.last_dest_dir.trim().is_empty() {
        return PathBuf::from(&settings.paths.last_dest_dir);
    }
    cli.input
        .as_deref()
        .and_then(Path::parent)
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn build_job(cli: &Cli, settings: &Settings) -> Result<JobState> {
    let mut job = match (&cli.stdin_name, &cli.input) {
        (Some(name), _) => {
            let mut bytes = Vec::new();
            std::io::stdin()
                .lock()
                .read_to_end(&mut bytes)
                .context("Failed to read audio from stdin")?;
            if bytes.is_empty() {
                bail!("No audio data on stdin");
            }
            JobState::from_bytes(name.clone(), bytes, String::new())
        }
        (None, Some(path)) => {
            if !path.is_file() {
                bail!("Audio file not found: {}", path.display());
            }
            JobState::from_path(path.to_string_lossy(), String::new())
        }
        (None, None) => bail!("No audio input given"),
    };

    let dest = resolve_dest(cli, settings);
    fs::create_dir_all(&dest)
        .with_context(|| format!("Failed to create output folder {}", dest.display()))?;
    job.dest_folder = dest.to_string_lossy().to_string();

    Ok(job
        .with_skip_vocal_extraction(cli.skip_vocal_extraction)
        .with_keep_vocal_file(cli.keep_vocal_file))
}

/// Remember the folders of this run for next time.
fn remember_dirs(config: &mut ConfigManager, cli: &Cli, job: &JobState) {
    let paths = &mut config.settings_mut().paths;
    if let Some(parent) = cli.input.as_deref().and_then(Path::parent) {
        paths.last_audio_dir = parent.to_string_lossy().to_string();
    }
    paths.last_dest_dir = job.dest_folder.clone();

    if let Err(e) = config.update_section(ConfigSection::Paths) {
        tracing::warn!("Failed to save last used folders: {}", e);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = ConfigManager::new(&config_path);
    if let Err(e) = config.load_or_create() {
        eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
    }

    let _log_guard = init_tracing_with_file(log_level(&cli), &config.logs_folder());
    tracing::info!("Vocal Chopper {} starting", chopper_core::version());
    tracing::info!("Config: {}", config_path.display());

    if let Err(e) = config.ensure_dirs_exist() {
        tracing::warn!("Failed to create directories: {}", e);
    }

    apply_overrides(&cli, config.settings_mut());
    if config.settings().tool.installed_script().is_none() {
        bail!(
            "No tool script configured; pass --script or set tool.script_path in {}",
            config_path.display()
        );
    }

    let job = build_job(&cli, config.settings())?;
    remember_dirs(&mut config, &cli, &job);
    tracing::info!("Job: {} -> {}", job.display_name(), job.dest_folder);

    let orchestrator = Orchestrator::new(config.settings().clone());
    let (sink, events) = ChannelSink::new();
    let handle = orchestrator
        .start(job, Arc::new(sink))
        .context("Failed to start job")?;

    // Ends when the worker drops its sink.
    let mut last_error = None;
    for event in events.iter() {
        match event {
            JobEvent::StateChanged(phase) => {
                if !cli.quiet && phase != Phase::Idle {
                    println!("\n{}", phase);
                }
            }
            JobEvent::Progress(value) => {
                if !cli.quiet {
                    print!("\r{:>5.1}%", value);
                    let _ = std::io::stdout().flush();
                }
            }
            JobEvent::OutputReady(dir) => println!("\nChops: {}", dir.display()),
            JobEvent::Error(message) => {
                eprintln!("\nError: {}", message);
                last_error = Some(message);
            }
        }
    }
    handle.join();

    let state = orchestrator.state();
    if let Some(path) = &cli.save_state {
        state
            .get()
            .save(path)
            .with_context(|| format!("Failed to save job state to {}", path.display()))?;
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&state.snapshot())?);
    }

    if state.phase() == Phase::Failed {
        bail!(
            "Job failed: {}",
            last_error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["vocal-chopper"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn dest_prefers_flag_then_last_used_then_input_folder() {
        let mut settings = Settings::default();

        let cli = parse(&["/music/song.wav", "--dest", "/out"]);
        assert_eq!(resolve_dest(&cli, &settings), PathBuf::from("/out"));

        let cli = parse(&["/music/song.wav"]);
        assert_eq!(resolve_dest(&cli, &settings), PathBuf::from("/music"));

        settings.paths.last_dest_dir = "/previous".to_string();
        assert_eq!(resolve_dest(&cli, &settings), PathBuf::from("/previous"));
    }

    #[test]
    fn bare_file_name_uses_current_dir() {
        let cli = parse(&["song.wav"]);
        assert_eq!(resolve_dest(&cli, &Settings::default()), PathBuf::from("."));
    }

    #[test]
    fn overrides_replace_tool_settings() {
        let cli = parse(&["a.wav", "--runtime", "/opt/py/bin/python3", "--script", "/s/chopper.py"]);
        let mut settings = Settings::default();
        apply_overrides(&cli, &mut settings);

        assert_eq!(settings.tool.runtime, "/opt/py/bin/python3");
        assert_eq!(
            settings.tool.installed_script(),
            Some(PathBuf::from("/s/chopper.py"))
        );
    }

    #[test]
    fn build_job_from_path() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.wav");
        fs::write(&input, b"audio").unwrap();
        let dest = dir.path().join("chops");

        let cli = parse(&[
            input.to_str().unwrap(),
            "--dest",
            dest.to_str().unwrap(),
            "--skip-vocal-extraction",
        ]);
        let job = build_job(&cli, &Settings::default()).unwrap();

        assert_eq!(job.audio_input_path, input.to_string_lossy());
        assert_eq!(job.dest_path(), dest);
        assert!(job.skip_vocal_extraction);
        assert!(dest.is_dir());
    }

    #[test]
    fn build_job_rejects_missing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.wav");
        let cli = parse(&[missing.to_str().unwrap()]);
        assert!(build_job(&cli, &Settings::default()).is_err());
    }

    #[test]
    fn remembers_last_folders() {
        let dir = tempdir().unwrap();
        let mut config = ConfigManager::new(dir.path().join("settings.toml"));
        let cli = parse(&["/music/song.wav"]);
        let job = JobState::from_path("/music/song.wav", "/music/out");

        remember_dirs(&mut config, &cli, &job);

        let mut reloaded = ConfigManager::new(dir.path().join("settings.toml"));
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().paths.last_audio_dir, "/music");
        assert_eq!(reloaded.settings().paths.last_dest_dir, "/music/out");
    }

    #[test]
    fn log_level_follows_flags() {
        assert_eq!(log_level(&parse(&["a.wav"])), LogLevel::Info);
        assert_eq!(log_level(&parse(&["a.wav", "-v"])), LogLevel::Debug);
        assert_eq!(log_level(&parse(&["a.wav", "-q", "-vv"])), LogLevel::Warn);
    }
}
