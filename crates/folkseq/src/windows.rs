//! Fixed-length training windows over the id corpus.

use serde::{Deserialize, Serialize};

/// Inputs and next-id targets sliced from one corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSet {
    pub window_length: usize,
    pub inputs: Vec<Vec<usize>>,
    pub targets: Vec<usize>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Iterate `(window, target)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&[usize], usize)> {
        self.inputs
            .iter()
            .map(Vec::as_slice)
            .zip(self.targets.iter().copied())
    }

    /// One-hot expansion of every input window.
    pub fn one_hot_inputs(&self, vocab_size: usize) -> Vec<OneHotWindow> {
        self.inputs
            .iter()
            .map(|window| OneHotWindow::from_ids(window, vocab_size))
            .collect()
    }
}

/// Slice `corpus_ids` into every window of `window_length` ids and the id
/// that follows it.
///
/// A corpus no longer than the window gives an empty set.
pub fn generate_windows(corpus_ids: &[usize], window_length: usize) -> TrainingSet {
    let count = corpus_ids.len().saturating_sub(window_length);
    let mut inputs = Vec::with_capacity(count);
    let mut targets = Vec::with_capacity(count);

    for i in 0..count {
        inputs.push(corpus_ids[i..i + window_length].to_vec());
        targets.push(corpus_ids[i + window_length]);
    }

    TrainingSet {
        window_length,
        inputs,
        targets,
    }
}

/// A `rows × vocab_size` one-hot matrix, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct OneHotWindow {
    vocab_size: usize,
    values: Vec<f32>,
}

impl OneHotWindow {
    /// Ids outside `0..vocab_size` leave their row all zero.
    pub fn from_ids(ids: &[usize], vocab_size: usize) -> Self {
        let mut values = vec![0.0; ids.len() * vocab_size];
        for (row, &id) in ids.iter().enumerate() {
            if id < vocab_size {
                values[row * vocab_size + id] = 1.0;
            }
        }
        OneHotWindow { vocab_size, values }
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn rows(&self) -> usize {
        if self.vocab_size == 0 {
            0
        } else {
            self.values.len() / self.vocab_size
        }
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.values[i * self.vocab_size..(i + 1) * self.vocab_size]
    }

    /// Recover the ids (argmax per row; an all-zero row reads as `None`).
    pub fn ids(&self) -> Vec<Option<usize>> {
        (0..self.rows())
            .map(|i| self.row(i).iter().position(|&v| v == 1.0))
            .collect()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}
