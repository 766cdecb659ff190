// src/demo.rs

//! Demo jobs: word frequency and sentence length over lines of text.

use std::collections::BTreeMap;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::engine::{Mapper, Outcome, PortableMapper};
use crate::worker::WorkerRegistry;

/// The nursery rhyme the demo runs on when no input is given.
pub const SAMPLE_SENTENCES: [&str; 4] = [
    "Humpty Dumpty sat on a wall",
    "Humpty Dumpty had a great fall",
    "All the King's horses and all the King's men",
    "Couldn't put Humpty together again",
];

/// The sample rhyme repeated `times` times.
pub fn sample(times: usize) -> Vec<String> {
    SAMPLE_SENTENCES
        .iter()
        .cycle()
        .take(SAMPLE_SENTENCES.len() * times)
        .map(|s| s.to_string())
        .collect()
}

pub type WordCounts = BTreeMap<String, u64>;

/// Counts the words of one sentence. Words are split on whitespace and
/// counted case-sensitively; a blank sentence is an error.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WordFrequency;

impl WordFrequency {
    pub const NAME: &'static str = "word-freq";
}

impl Mapper for WordFrequency {
    type Item = String;
    type Output = WordCounts;

    fn map(&self, sentence: &String) -> anyhow::Result<WordCounts> {
        let mut counts = WordCounts::new();
        for word in sentence.split_whitespace() {
            *counts.entry(word.to_string()).or_default() += 1;
        }
        if counts.is_empty() {
            bail!("sentence has no words");
        }
        Ok(counts)
    }

    fn portable(&self) -> Option<PortableMapper> {
        Some(PortableMapper::stateless(Self::NAME))
    }
}

/// Sum per-sentence counts into the job's totals; failed sentences are skipped.
pub fn sum_word_counts(
    totals: &mut WordCounts,
    _sentence: String,
    outcome: Outcome<WordCounts>,
) -> anyhow::Result<()> {
    if let Outcome::Success(counts) = outcome {
        for (word, n) in counts {
            *totals.entry(word).or_default() += n;
        }
    }
    Ok(())
}

/// Length of a sentence in characters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SentenceLength;

impl SentenceLength {
    pub const NAME: &'static str = "sentence-length";
}

impl Mapper for SentenceLength {
    type Item = String;
    type Output = usize;

    fn map(&self, sentence: &String) -> anyhow::Result<usize> {
        Ok(sentence.chars().count())
    }

    fn portable(&self) -> Option<PortableMapper> {
        Some(PortableMapper::stateless(Self::NAME))
    }
}

/// Registry with every demo mapper, served by `simplemr worker`.
pub fn registry() -> WorkerRegistry {
    let mut registry = WorkerRegistry::new();
    registry
        .register::<WordFrequency>(WordFrequency::NAME)
        .register::<SentenceLength>(SentenceLength::NAME);
    registry
}
