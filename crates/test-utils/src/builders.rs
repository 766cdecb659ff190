#![allow(dead_code)]

use std::path::PathBuf;

use simplemr::config::{ConfigFile, JobSection, RawConfigFile, WorkerSection};
use simplemr::types::{BackendType, ProgressDisplay};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                job: JobSection::default(),
                worker: None,
            },
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.config.job.parallelism = parallelism;
        self
    }

    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.config.job.backend = Some(backend);
        self
    }

    pub fn with_progress(mut self, progress: ProgressDisplay) -> Self {
        self.config.job.progress = progress;
        self
    }

    pub fn with_worker(mut self, program: impl Into<PathBuf>, args: &[&str]) -> Self {
        self.config.worker = Some(WorkerSection {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `count` distinct single-word items: `item-0`, `item-1`, ...
pub fn numbered_items(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("item-{i}")).collect()
}

/// Sentences built from a small vocabulary so that word counts overlap.
pub fn sentences(count: usize) -> Vec<String> {
    const WORDS: [&str; 5] = ["alpha", "beta", "gamma", "delta", "beta"];
    (0..count)
        .map(|i| {
            (0..=i % 4)
                .map(|j| WORDS[(i + j) % WORDS.len()])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}
