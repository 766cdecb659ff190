// src/lib.rs

pub mod cli;
pub mod config;
pub mod demo;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod progress;
pub mod types;
pub mod worker;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, InputArgs};
use crate::config::{JobSettings, load_or_default};
use crate::demo::{SentenceLength, WordCounts, WordFrequency, sum_word_counts};
use crate::engine::{Collector, Engine};
use crate::progress::ProgressTracker;

pub use crate::engine::{Mapper, Outcome};
pub use crate::errors::SimpleMrError;
pub use crate::exec::BackendKind;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and command-line overrides
/// - input reading
/// - the demo job the subcommand names
/// - result printing on stdout
pub async fn run(args: CliArgs) -> Result<()> {
    // Workers speak the protocol on stdout and need no config.
    if let Command::Worker = args.command {
        return Ok(demo::registry().serve_stdio().await?);
    }

    let cfg = load_or_default(args.config.as_deref())?;
    let settings = cfg.job_settings(args.overrides())?;
    debug!(?settings, "resolved job settings");

    match &args.command {
        Command::WordFreq(input) => {
            let sentences = read_sentences(input).await?;
            let counts = word_freq(sentences, &settings).await?;
            print_json(&counts)
        }
        Command::SentenceLength(input) => {
            let sentences = read_sentences(input).await?;
            let lengths = sentence_lengths(sentences, &settings).await?;
            print_json(&lengths)
        }
        Command::Worker => Ok(()),
    }
}

/// Count words over `sentences` with the configured backend.
pub async fn word_freq(sentences: Vec<String>, settings: &JobSettings) -> Result<WordCounts> {
    let progress = Arc::new(ProgressTracker::new(settings.progress));

    let summary = Engine::new(
        sentences,
        WordCounts::new(),
        WordFrequency,
        sum_word_counts,
        settings.parallelism,
        settings.backend.clone(),
    )?
    .with_label("word-freq")
    .with_progress(progress)
    .run_with_summary()
    .await?;

    info!(
        words = summary.accumulator.len(),
        failed = summary.failed,
        "word frequency done"
    );
    Ok(summary.accumulator)
}

/// Map every sentence to its length with the configured backend.
pub async fn sentence_lengths(
    sentences: Vec<String>,
    settings: &JobSettings,
) -> Result<BTreeMap<String, usize>> {
    let progress = Arc::new(ProgressTracker::new(settings.progress));

    let lengths = Collector::new(
        sentences,
        SentenceLength,
        settings.parallelism,
        settings.backend.clone(),
    )?
    .with_label("sentence-length")
    .with_progress(progress)
    .collect()
    .await?;

    Ok(lengths.into_iter().collect())
}

/// Sentences from `--sample`, the given files, or stdin; blank lines are
/// skipped.
async fn read_sentences(input: &InputArgs) -> Result<Vec<String>> {
    if let Some(times) = input.sample {
        return Ok(demo::sample(times));
    }

    let mut text = String::new();
    if input.files.is_empty() {
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("reading sentences from stdin")?;
    } else {
        for path in &input.files {
            let contents = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading sentences from {}", path.display()))?;
            text.push_str(&contents);
            text.push('\n');
        }
    }

    let sentences: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    debug!(sentences = sentences.len(), "input read");
    Ok(sentences)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
