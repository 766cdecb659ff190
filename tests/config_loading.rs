// tests/config_loading.rs

mod common;
use crate::common::builders::ConfigFileBuilder;

use std::error::Error;
use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use simplemr::config::{
    ConfigFile, JobOverrides, default_config_path, load_and_validate, load_from_path,
    load_or_default,
};
use simplemr::errors::SimpleMrError;
use simplemr::exec::{BackendKind, WORKER_SUBCOMMAND, WorkerCommand};
use simplemr::types::{BackendType, ProgressDisplay};

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    write!(file, "{contents}")?;
    Ok(file)
}

#[test]
fn full_config_is_loaded() -> TestResult {
    let file = write_config(
        r#"
[job]
parallelism = 3
backend = "process"
progress = "hidden"

[worker]
program = "/usr/bin/env"
args = ["simplemr", "worker"]
"#,
    )?;

    let cfg = load_and_validate(file.path())?;
    assert_eq!(cfg.job.parallelism, 3);
    assert_eq!(cfg.job.backend, Some(BackendType::Process));
    assert_eq!(cfg.job.progress, ProgressDisplay::Hidden);

    let worker = cfg.worker_command().ok_or("expected a worker command")?;
    assert_eq!(worker.program(), PathBuf::from("/usr/bin/env").as_path());
    assert_eq!(worker.arguments(), ["simplemr", "worker"]);
    Ok(())
}

#[test]
fn empty_config_uses_defaults() -> TestResult {
    let file = write_config("")?;

    let cfg = load_and_validate(file.path())?;
    assert!(cfg.job.parallelism >= 1);
    assert_eq!(cfg.job.backend, None);
    assert_eq!(cfg.job.progress, ProgressDisplay::Stderr);
    assert!(cfg.worker.is_none());
    Ok(())
}

#[test]
fn zero_parallelism_is_a_config_error() -> TestResult {
    let file = write_config("[job]\nparallelism = 0\n")?;

    match load_and_validate(file.path()) {
        Err(SimpleMrError::ConfigError(msg)) => assert!(msg.contains("parallelism")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
    Ok(())
}

#[test]
fn empty_worker_program_is_a_config_error() -> TestResult {
    let file = write_config("[worker]\nprogram = \"\"\n")?;

    match load_and_validate(file.path()) {
        Err(SimpleMrError::ConfigError(msg)) => assert!(msg.contains("[worker].program")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
    Ok(())
}

#[test]
fn unknown_backend_is_a_toml_error() -> TestResult {
    let file = write_config("[job]\nbackend = \"gpu\"\n")?;

    match load_from_path(file.path()) {
        Err(SimpleMrError::TomlError(_)) => {}
        Err(e) => panic!("Expected TomlError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
    Ok(())
}

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    let file = write_config("[job]\nparalelism = 2\n")?;
    assert!(matches!(
        load_from_path(file.path()),
        Err(SimpleMrError::TomlError(_))
    ));
    Ok(())
}

#[test]
fn missing_explicit_file_is_an_io_error() {
    let result = load_or_default(Some(PathBuf::from("/no/such/simplemr.toml").as_path()));
    assert!(matches!(result, Err(SimpleMrError::IoError(_))));
}

#[test]
fn default_path_is_simplemr_toml() {
    assert_eq!(default_config_path(), PathBuf::from("simplemr.toml"));
}

#[test]
fn overrides_replace_config_values() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .with_parallelism(2)
        .with_backend(BackendType::Process)
        .with_worker("/bin/simplemr", &["worker"])
        .build();

    let settings = cfg.job_settings(JobOverrides {
        parallelism: Some(8),
        backend: Some(BackendType::Thread),
        progress: Some(ProgressDisplay::Hidden),
    })?;

    assert_eq!(settings.parallelism, 8);
    assert_eq!(settings.backend, BackendKind::Thread);
    assert_eq!(settings.progress, ProgressDisplay::Hidden);
    Ok(())
}

#[test]
fn configured_worker_is_used_for_process_backend() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .with_backend(BackendType::Process)
        .with_worker("/bin/simplemr", &["worker", "--log-level", "warn"])
        .build();

    let settings = cfg.job_settings(JobOverrides::default())?;
    assert_eq!(
        settings.backend,
        BackendKind::Process(WorkerCommand::new("/bin/simplemr").args([
            "worker",
            "--log-level",
            "warn"
        ]))
    );
    Ok(())
}

#[test]
fn process_backend_defaults_to_current_executable() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .with_backend(BackendType::Process)
        .build();

    let settings = cfg.job_settings(JobOverrides::default())?;
    match settings.backend {
        BackendKind::Process(worker) => {
            assert_eq!(worker.program(), std::env::current_exe()?.as_path());
            assert_eq!(worker.arguments(), [WORKER_SUBCOMMAND]);
        }
        other => panic!("Expected process backend, got: {:?}", other),
    }
    Ok(())
}

#[test]
fn missing_backend_is_a_config_error() {
    let cfg = ConfigFile::default();

    match cfg.job_settings(JobOverrides::default()) {
        Err(SimpleMrError::ConfigError(msg)) => assert!(msg.contains("--backend")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn zero_parallelism_override_is_rejected() {
    let cfg = ConfigFileBuilder::new()
        .with_backend(BackendType::Thread)
        .build();

    let result = cfg.job_settings(JobOverrides {
        parallelism: Some(0),
        ..JobOverrides::default()
    });
    assert!(matches!(result, Err(SimpleMrError::InvalidParallelism(0))));
}

#[test]
fn backend_and_progress_parse_from_strings() {
    assert_eq!("thread".parse::<BackendType>(), Ok(BackendType::Thread));
    assert_eq!("Processes".parse::<BackendType>(), Ok(BackendType::Process));
    assert!("gpu".parse::<BackendType>().is_err());

    assert_eq!("none".parse::<ProgressDisplay>(), Ok(ProgressDisplay::Hidden));
    assert_eq!("stderr".parse::<ProgressDisplay>(), Ok(ProgressDisplay::Stderr));
}

#[test]
fn progress_display_defaults_to_stderr() {
    assert_eq!(ProgressDisplay::default(), ProgressDisplay::Stderr);
}
