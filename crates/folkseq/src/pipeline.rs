//! Directory-level stages: preprocess a dataset, train a model, generate a melody.
//!
//! Each stage reads everything it needs from a [`WarblerConfig`] and the
//! artifacts the previous stage wrote.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::{debug, info, warn};
use warblerconf::WarblerConfig;

use crate::codec::{decode, encode};
use crate::corpus::assemble;
use crate::error::{Error, Result};
use crate::filter::is_acceptable;
use crate::midi::write_melody;
use crate::notation::piece_from_tune;
use crate::piece::{Event, Piece};
use crate::predictor::{NGramPredictor, Predictor};
use crate::sampler::MelodySampler;
use crate::symbol::{join_tokens, parse_tokens, Symbol};
use crate::transpose::transpose;
use crate::vocab::Vocabulary;
use crate::windows::generate_windows;

/// Notation files in `dir` with `extension`, sorted by file name.
pub fn list_inputs(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::MissingInput(dir.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension.trim_start_matches('.')));
        if matches && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Parse every tune of every input file.
///
/// A file holding one tune gives a piece named after the file stem; tunes
/// in a collection are named `stem-1`, `stem-2`, ... An id already taken by
/// an earlier file gets a `_2`, `_3`, ... suffix. A tune with parse errors is
/// returned as an [`Error::Parse`] entry so the caller decides whether to
/// skip it.
pub fn load_pieces(dir: &Path, extension: &str) -> Result<Vec<Result<Piece>>> {
    let mut pieces = Vec::new();
    let mut taken = HashSet::new();

    for path in list_inputs(dir, extension)? {
        let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
        let text = String::from_utf8_lossy(&bytes);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let tunes = abc::parse_collection(&text);
        let single = tunes.len() == 1;
        for (index, result) in tunes.into_iter().enumerate() {
            let base = if single {
                stem.clone()
            } else {
                format!("{}-{}", stem, index + 1)
            };
            let id = unique_id(&mut taken, base, &path);

            if let Some(error) = result.errors().next() {
                pieces.push(Err(Error::Parse {
                    piece: id,
                    message: format!("line {}: {}", error.line, error.message),
                }));
                continue;
            }
            for warning in result.warnings() {
                debug!(piece = %id, line = warning.line, "{}", warning.message);
            }
            pieces.push(Ok(piece_from_tune(id, &result.value)));
        }
    }

    Ok(pieces)
}

fn unique_id(taken: &mut HashSet<String>, base: String, path: &Path) -> String {
    let mut id = base.clone();
    let mut n = 2;
    while taken.contains(&id) {
        id = format!("{}_{}", base, n);
        n += 1;
    }
    if id != base {
        warn!(file = %path.display(), "piece id {} is already used, renamed to {}", base, id);
    }
    taken.insert(id.clone());
    id
}

/// Counts from one preprocessing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreprocessReport {
    /// Pieces found in the dataset
    pub loaded: usize,
    /// Pieces encoded into the corpus
    pub accepted: usize,
    /// Pieces with a duration outside the accepted set
    pub rejected: usize,
    /// Pieces skipped after a parse or transposition failure
    pub failed: usize,
}

/// Filter, transpose and encode the dataset; write the per-piece
/// encodings, the corpus and the vocabulary mapping.
pub fn preprocess(config: &WarblerConfig) -> Result<PreprocessReport> {
    let paths = &config.paths;
    let encoding = &config.encoding;
    let mut report = PreprocessReport::default();

    let pieces = load_pieces(&paths.dataset_dir, &encoding.file_extension)?;
    report.loaded = pieces.len();
    info!(count = report.loaded, dir = %paths.dataset_dir.display(), "loaded pieces");

    fs::create_dir_all(&paths.encoded_dir).map_err(|e| Error::io(&paths.encoded_dir, e))?;

    let mut encoded = Vec::new();
    for loaded in pieces {
        let outcome = loaded.and_then(|piece| {
            if !is_acceptable(&piece, &encoding.accepted_durations) {
                return Ok(None);
            }
            transpose(&piece).map(Some)
        });

        let piece = match outcome {
            Ok(Some(piece)) => piece,
            Ok(None) => {
                report.rejected += 1;
                continue;
            }
            Err(e) if encoding.skip_failed_pieces => {
                warn!("skipping piece: {}", e);
                report.failed += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let text = join_tokens(&encode(&piece.events, encoding.time_step));
        let path = paths.encoded_dir.join(format!("{}.txt", piece.id));
        fs::write(&path, &text).map_err(|e| Error::io(&path, e))?;
        debug!(piece = %piece.id, symbols = text.split(' ').count(), "encoded");

        encoded.push(text);
        report.accepted += 1;
    }

    let corpus = assemble(&encoded, encoding.sequence_length);
    write_text(&paths.corpus_file, &corpus)?;

    let vocab = Vocabulary::build(&parse_tokens(&corpus)?);
    vocab.save(&paths.mapping_file)?;

    if report.accepted == 0 {
        warn!("no pieces were accepted; the corpus is empty");
    }
    info!(
        accepted = report.accepted,
        rejected = report.rejected,
        failed = report.failed,
        vocab_size = vocab.len(),
        "preprocessing complete"
    );

    Ok(report)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainReport {
    pub windows: usize,
    pub vocab_size: usize,
    pub contexts: usize,
}

/// Fit an [`NGramPredictor`] on the corpus windows and save it.
pub fn train(config: &WarblerConfig) -> Result<TrainReport> {
    let paths = &config.paths;
    let corpus_path = &paths.corpus_file;
    if !corpus_path.exists() {
        return Err(Error::MissingInput(corpus_path.clone()));
    }

    let corpus = fs::read_to_string(corpus_path).map_err(|e| Error::io(corpus_path, e))?;
    let symbols = parse_tokens(&corpus)?;
    if symbols.is_empty() {
        return Err(Error::EmptyCorpus);
    }

    let vocab = Vocabulary::load(&paths.mapping_file)?;
    let ids = vocab.encode_symbols(&symbols)?;

    let window_length = config.encoding.sequence_length;
    let set = generate_windows(&ids, window_length);
    if set.is_empty() {
        warn!(
            corpus = ids.len(),
            window_length, "corpus is not longer than one window; model has no contexts"
        );
    }

    let model = NGramPredictor::train(&set, vocab.len(), config.model.order, config.model.smoothing);
    model.save(&paths.model_file)?;

    info!(
        windows = set.len(),
        contexts = model.context_count(),
        path = %paths.model_file.display(),
        "model saved"
    );

    Ok(TrainReport {
        windows: set.len(),
        vocab_size: vocab.len(),
        contexts: model.context_count(),
    })
}

/// Result of one generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub melody: Vec<Symbol>,
    pub events: Vec<Event>,
    pub output: PathBuf,
}

/// Sample a melody from the saved model, decode it and write the output file.
pub fn generate<R: Rng>(config: &WarblerConfig, rng: &mut R) -> Result<Generated> {
    let paths = &config.paths;
    let sampling = &config.sampling;

    let vocab = Vocabulary::load(&paths.mapping_file)?;
    let model = NGramPredictor::load(&paths.model_file)?;
    if model.vocab_size() != vocab.len() {
        return Err(Error::InvalidMapping(format!(
            "model was trained on {} symbols but the mapping has {}",
            model.vocab_size(),
            vocab.len()
        )));
    }

    let seed = parse_tokens(&sampling.seed)?;
    let melody = MelodySampler::new(&model, &vocab, config.encoding.sequence_length)
        .num_steps(sampling.num_steps)
        .temperature(sampling.temperature)
        .generate(&seed, rng)?;
    info!(
        seed = seed.len(),
        generated = melody.len() - seed.len(),
        "sampled melody"
    );

    let events = decode(&melody, sampling.step_duration)?;
    write_melody(
        &events,
        &paths.output_file,
        sampling.output_format,
        sampling.tempo_bpm,
    )?;

    Ok(Generated {
        melody,
        events,
        output: paths.output_file.clone(),
    })
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, text).map_err(|e| Error::io(path, e))
}
