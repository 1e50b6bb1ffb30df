//! Autoregressive melody generation.

use rand::Rng;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::predictor::Predictor;
use crate::symbol::Symbol;
use crate::vocab::Vocabulary;
use crate::windows::OneHotWindow;

/// Reweight `probs` by `p^(1/temperature)` and renormalize.
///
/// Computed in log space, subtracting the largest log probability before
/// dividing by the temperature. Zero entries stay exactly zero, and a
/// temperature small enough to underflow puts all mass on the most likely
/// entries.
pub fn apply_temperature(probs: &[f64], temperature: f64) -> Result<Vec<f64>> {
    if !(temperature > 0.0) || !temperature.is_finite() {
        return Err(Error::InvalidTemperature(temperature));
    }
    if let Some(bad) = probs.iter().find(|p| !(**p >= 0.0) || !p.is_finite()) {
        return Err(Error::InvalidDistribution(format!("entry {} is not a probability", bad)));
    }

    let logs: Vec<Option<f64>> = probs.iter().map(|&p| (p > 0.0).then(|| p.ln())).collect();
    let max = logs
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return Err(Error::InvalidDistribution("all entries are zero".to_string()));
    }

    let weights: Vec<f64> = logs
        .iter()
        .map(|l| l.map_or(0.0, |v| ((v - max) / temperature).exp()))
        .collect();
    let total: f64 = weights.iter().sum();
    Ok(weights.into_iter().map(|w| w / total).collect())
}

/// Draw an index from a normalized distribution.
pub fn sample_index<R: Rng>(probs: &[f64], rng: &mut R) -> Result<usize> {
    let roll: f64 = rng.random::<f64>();
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, &p) in probs.iter().enumerate() {
        if p > 0.0 {
            cumulative += p;
            last_positive = Some(i);
            if roll < cumulative {
                return Ok(i);
            }
        }
    }
    // Rounding can leave the cumulative sum just short of 1
    last_positive.ok_or_else(|| Error::InvalidDistribution("no positive entries".to_string()))
}

/// Seeded next-symbol generation over a trained predictor.
pub struct MelodySampler<'a, P: Predictor + ?Sized> {
    predictor: &'a P,
    vocab: &'a Vocabulary,
    window_length: usize,
    num_steps: usize,
    temperature: f64,
}

impl<'a, P: Predictor + ?Sized> MelodySampler<'a, P> {
    pub fn new(predictor: &'a P, vocab: &'a Vocabulary, window_length: usize) -> Self {
        MelodySampler {
            predictor,
            vocab,
            window_length,
            num_steps: 500,
            temperature: 1.0,
        }
    }

    pub fn num_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Extend `seed` one symbol at a time until a boundary is drawn or the
    /// step budget runs out.
    ///
    /// The returned melody starts with the seed and never contains a
    /// boundary marker.
    pub fn generate<R: Rng>(&self, seed: &[Symbol], rng: &mut R) -> Result<Vec<Symbol>> {
        if !(self.temperature > 0.0) || !self.temperature.is_finite() {
            return Err(Error::InvalidTemperature(self.temperature));
        }

        let mut melody = seed.to_vec();
        let mut context: Vec<usize> =
            Vec::with_capacity(self.window_length + seed.len() + self.num_steps);
        let boundary = self.vocab.id(Symbol::Boundary)?;
        context.extend(std::iter::repeat(boundary).take(self.window_length));
        context.extend(self.vocab.encode_symbols(seed)?);

        let vocab_size = self.vocab.len();
        for step in 0..self.num_steps {
            let start = context.len().saturating_sub(self.window_length);
            let window = OneHotWindow::from_ids(&context[start..], vocab_size);

            let probs = self.predictor.predict(&window)?;
            if probs.len() != vocab_size {
                return Err(Error::DistributionSize {
                    expected: vocab_size,
                    actual: probs.len(),
                });
            }

            let id = sample_index(&apply_temperature(&probs, self.temperature)?, rng)?;
            context.push(id);

            let symbol = self.vocab.symbol(id)?;
            trace!(step, %symbol, "sampled");
            if symbol == Symbol::Boundary {
                debug!(step, "boundary drawn, stopping");
                break;
            }
            melody.push(symbol);
        }

        Ok(melody)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::parse_tokens;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;

    /// Always returns the same distribution and records the windows it saw.
    struct Fixed {
        probs: Vec<f64>,
        seen: RefCell<Vec<Vec<Option<usize>>>>,
    }

    impl Fixed {
        fn new(probs: Vec<f64>) -> Self {
            Fixed {
                probs,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Predictor for Fixed {
        fn vocab_size(&self) -> usize {
            self.probs.len()
        }

        fn predict(&self, window: &OneHotWindow) -> Result<Vec<f64>> {
            self.seen.borrow_mut().push(window.ids());
            Ok(self.probs.clone())
        }
    }

    fn vocab() -> Vocabulary {
        // "/":0 "60":1 "62":2 "_":3
        Vocabulary::build(&parse_tokens("/ 60 62 _").unwrap())
    }

    #[test]
    fn temperature_one_is_identity() {
        let probs = [0.1, 0.2, 0.3, 0.4];
        let scaled = apply_temperature(&probs, 1.0).unwrap();
        for (a, b) in probs.iter().zip(&scaled) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn low_temperature_sharpens() {
        let scaled = apply_temperature(&[0.2, 0.8], 0.5).unwrap();
        assert!((scaled[1] - 0.64 / 0.68).abs() < 1e-12);
        let flat = apply_temperature(&[0.2, 0.8], 100.0).unwrap();
        assert!((flat[0] - 0.5).abs() < 0.01);
    }

    #[test]
    fn tiny_temperature_keeps_the_most_likely_entries() {
        assert_eq!(apply_temperature(&[0.5, 0.5], 1e-310).unwrap(), vec![0.5, 0.5]);
        assert_eq!(
            apply_temperature(&[0.1, 0.6, 0.3], 1e-300).unwrap(),
            vec![0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn zeros_stay_zero() {
        let scaled = apply_temperature(&[0.0, 0.25, 0.75], 2.0).unwrap();
        assert_eq!(scaled[0], 0.0);
        assert!((scaled.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            apply_temperature(&[1.0], 0.0),
            Err(Error::InvalidTemperature(_))
        ));
        assert!(matches!(
            apply_temperature(&[1.0], -1.0),
            Err(Error::InvalidTemperature(_))
        ));
        assert!(matches!(
            apply_temperature(&[0.0, 0.0], 1.0),
            Err(Error::InvalidDistribution(_))
        ));
        assert!(matches!(
            apply_temperature(&[0.5, f64::NAN], 1.0),
            Err(Error::InvalidDistribution(_))
        ));
    }

    #[test]
    fn sampling_follows_the_distribution() {
        let mut rng = StdRng::seed_from_u64(7);
        let probs = [0.0, 0.7, 0.3];
        let mut counts = [0usize; 3];
        for _ in 0..2000 {
            counts[sample_index(&probs, &mut rng).unwrap()] += 1;
        }
        assert_eq!(counts[0], 0);
        assert!(counts[1] > 1200 && counts[1] < 1600, "{:?}", counts);
    }

    #[test]
    fn stops_at_boundary_without_emitting_it() {
        let vocab = vocab();
        let predictor = Fixed::new(vec![1.0, 0.0, 0.0, 0.0]);
        let seed = parse_tokens("60 _").unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let melody = MelodySampler::new(&predictor, &vocab, 3)
            .num_steps(50)
            .generate(&seed, &mut rng)
            .unwrap();

        assert_eq!(melody, seed);
        assert_eq!(predictor.seen.borrow().len(), 1);
    }

    #[test]
    fn seed_is_left_padded_with_boundaries() {
        let vocab = vocab();
        let predictor = Fixed::new(vec![0.0, 0.0, 1.0, 0.0]);
        let seed = parse_tokens("60").unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let melody = MelodySampler::new(&predictor, &vocab, 3)
            .num_steps(3)
            .generate(&seed, &mut rng)
            .unwrap();

        assert_eq!(melody, parse_tokens("60 62 62 62").unwrap());
        let seen = predictor.seen.borrow();
        assert_eq!(seen[0], vec![Some(0), Some(0), Some(1)]);
        assert_eq!(seen[1], vec![Some(0), Some(1), Some(2)]);
        assert_eq!(seen[2], vec![Some(1), Some(2), Some(2)]);
    }

    #[test]
    fn unknown_seed_symbol_fails_before_predicting() {
        let vocab = vocab();
        let predictor = Fixed::new(vec![0.25; 4]);
        let seed = parse_tokens("60 r").unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let result = MelodySampler::new(&predictor, &vocab, 2).generate(&seed, &mut rng);
        assert!(matches!(result, Err(Error::UnknownSymbol(ref s)) if s == "r"));
        assert!(predictor.seen.borrow().is_empty());
    }

    #[test]
    fn invalid_temperature_fails_before_predicting() {
        let vocab = vocab();
        let predictor = Fixed::new(vec![0.25; 4]);
        let mut rng = StdRng::seed_from_u64(1);

        let result = MelodySampler::new(&predictor, &vocab, 2)
            .temperature(0.0)
            .generate(&[], &mut rng);
        assert!(matches!(result, Err(Error::InvalidTemperature(_))));
        assert!(predictor.seen.borrow().is_empty());
    }

    #[test]
    fn predictor_output_length_is_checked() {
        let vocab = vocab();
        let predictor = Fixed::new(vec![0.5, 0.5]);
        let mut rng = StdRng::seed_from_u64(1);

        let result = MelodySampler::new(&predictor, &vocab, 2).generate(&[], &mut rng);
        assert!(matches!(
            result,
            Err(Error::DistributionSize {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn same_seed_same_melody() {
        let vocab = vocab();
        let predictor = Fixed::new(vec![0.05, 0.35, 0.3, 0.3]);
        let seed = parse_tokens("60").unwrap();
        let sampler = MelodySampler::new(&predictor, &vocab, 4).num_steps(40);

        let a = sampler.generate(&seed, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = sampler.generate(&seed, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
        assert!(!a.contains(&Symbol::Boundary));
        assert!(a.len() <= 41);
    }
}
