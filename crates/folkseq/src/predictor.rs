//! Next-symbol predictors.
//!
//! The sampler only needs something that turns a one-hot window into a
//! probability distribution over the vocabulary. [`NGramPredictor`] is the
//! trainable implementation that ships with the crate: context counts with
//! backoff and additive smoothing.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::windows::{OneHotWindow, TrainingSet};

pub trait Predictor {
    fn vocab_size(&self) -> usize;

    /// Distribution over the vocabulary for the id after `window`.
    fn predict(&self, window: &OneHotWindow) -> Result<Vec<f64>>;
}

/// Backoff n-gram model over symbol ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NGramPredictor {
    vocab_size: usize,
    order: usize,
    smoothing: f64,
    unigram: Vec<u64>,
    /// Context ids joined by commas ("3,1,4", most recent last) to next-id counts
    contexts: BTreeMap<String, BTreeMap<usize, u64>>,
}

impl NGramPredictor {
    /// Count next ids for every context of length `1..=order` in `set`.
    ///
    /// `order` is capped at the window length.
    pub fn train(set: &TrainingSet, vocab_size: usize, order: usize, smoothing: f64) -> Self {
        let order = order.min(set.window_length).max(1);
        let mut unigram = vec![0u64; vocab_size];
        let mut contexts: BTreeMap<String, BTreeMap<usize, u64>> = BTreeMap::new();

        for (window, target) in set.pairs() {
            if target >= vocab_size {
                continue;
            }
            unigram[target] += 1;
            for k in 1..=order.min(window.len()) {
                let key = context_key(&window[window.len() - k..]);
                *contexts.entry(key).or_default().entry(target).or_default() += 1;
            }
        }

        debug!(
            windows = set.len(),
            contexts = contexts.len(),
            order,
            "trained n-gram predictor"
        );

        NGramPredictor {
            vocab_size,
            order,
            smoothing,
            unigram,
            contexts,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let json = serde_json::to_string(self).map_err(|e| Error::json(path, e))?;
        fs::write(path, json).map_err(|e| Error::io(path, e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingInput(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| Error::json(path, e))
    }

    fn smoothed<'a>(&self, counts: impl Iterator<Item = (usize, &'a u64)>) -> Vec<f64> {
        let mut probs = vec![self.smoothing; self.vocab_size];
        for (id, &count) in counts {
            if let Some(p) = probs.get_mut(id) {
                *p += count as f64;
            }
        }
        let total: f64 = probs.iter().sum();
        if total > 0.0 {
            for p in &mut probs {
                *p /= total;
            }
        }
        probs
    }
}

impl Predictor for NGramPredictor {
    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn predict(&self, window: &OneHotWindow) -> Result<Vec<f64>> {
        if window.vocab_size() != self.vocab_size {
            return Err(Error::WindowShape {
                expected: self.vocab_size,
                actual: window.vocab_size(),
            });
        }

        let ids = window.ids();
        for k in (1..=self.order.min(ids.len())).rev() {
            // A row outside the vocabulary breaks every context reaching over it
            let Some(context) = ids[ids.len() - k..].iter().copied().collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            if let Some(counts) = self.contexts.get(&context_key(&context)) {
                return Ok(self.smoothed(counts.iter().map(|(id, c)| (*id, c))));
            }
        }

        Ok(self.smoothed(self.unigram.iter().enumerate()))
    }
}

fn context_key(ids: &[usize]) -> String {
    ids.iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
