use crate::piece::{Event, EventKind, KeyMode, KeySignature};

/// Krumhansl-Kessler major key profile (duration-weighted perception studies).
const MAJOR_PROFILE: [f64; 12] = [6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88];

/// Krumhansl-Kessler minor key profile.
const MINOR_PROFILE: [f64; 12] = [6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17];

/// Result of statistical key analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEstimate {
    pub key: KeySignature,
    /// Pearson correlation of the winning profile, rounded to 4 places
    pub confidence: f64,
}

/// Estimate the key of an event stream with the Krumhansl-Schmuckler algorithm.
///
/// Builds a duration-weighted pitch-class histogram and correlates it
/// against all 24 major/minor key profiles. The best Pearson correlation
/// determines the key. Rests carry no weight; a stream without notes is
/// reported as C major with zero confidence.
pub fn detect_key(events: &[Event]) -> KeyEstimate {
    let unknown = KeyEstimate {
        key: KeySignature::new(0, KeyMode::Major),
        confidence: 0.0,
    };

    let mut histogram = [0.0_f64; 12];
    for event in events {
        if let EventKind::Note(pitch) = event.kind {
            histogram[(pitch % 12) as usize] += event.duration.max(0.0);
        }
    }

    let total: f64 = histogram.iter().sum();
    if total <= 0.0 {
        return unknown;
    }
    for h in &mut histogram {
        *h /= total;
    }

    let mut best_root: u8 = 0;
    let mut best_mode = KeyMode::Major;
    let mut best_corr = -1.0_f64;

    for root in 0..12u8 {
        // Rotate histogram so root = index 0
        let mut rotated = [0.0; 12];
        for (i, slot) in rotated.iter_mut().enumerate() {
            *slot = histogram[(i + root as usize) % 12];
        }

        let major_corr = pearson(&rotated, &MAJOR_PROFILE);
        if major_corr > best_corr {
            best_corr = major_corr;
            best_root = root;
            best_mode = KeyMode::Major;
        }

        let minor_corr = pearson(&rotated, &MINOR_PROFILE);
        if minor_corr > best_corr {
            best_corr = minor_corr;
            best_root = root;
            best_mode = KeyMode::Minor;
        }
    }

    KeyEstimate {
        key: KeySignature::new(best_root, best_mode),
        confidence: (best_corr * 10000.0).round() / 10000.0,
    }
}

/// Pearson correlation coefficient between two 12-element arrays.
fn pearson(x: &[f64; 12], y: &[f64; 12]) -> f64 {
    let x_mean: f64 = x.iter().sum::<f64>() / 12.0;
    let y_mean: f64 = y.iter().sum::<f64>() / 12.0;

    let mut num = 0.0;
    let mut x_sq = 0.0;
    let mut y_sq = 0.0;

    for (xv, yv) in x.iter().zip(y) {
        let xd = xv - x_mean;
        let yd = yv - y_mean;
        num += xd * yd;
        x_sq += xd * xd;
        y_sq += yd * yd;
    }

    let denom = (x_sq * y_sq).sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    num / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn melody(pitches: &[(u8, f64)]) -> Vec<Event> {
        pitches.iter().map(|&(p, d)| Event::note(p, d)).collect()
    }

    #[test]
    fn empty_events_return_c_major() {
        let estimate = detect_key(&[]);
        assert_eq!(estimate.key, KeySignature::new(0, KeyMode::Major));
        assert_eq!(estimate.confidence, 0.0);
    }

    #[test]
    fn rests_only_return_c_major() {
        let estimate = detect_key(&[Event::rest(4.0), Event::rest(2.0)]);
        assert_eq!(estimate.confidence, 0.0);
    }

    #[test]
    fn c_major_scale_detected() {
        // Scale with weight on the tonic triad
        let events = melody(&[
            (60, 2.0),
            (62, 0.5),
            (64, 1.0),
            (65, 0.5),
            (67, 1.5),
            (69, 0.5),
            (71, 0.5),
            (72, 2.0),
        ]);
        let estimate = detect_key(&events);
        assert_eq!(estimate.key, KeySignature::new(0, KeyMode::Major));
        assert!(estimate.confidence > 0.5);
    }

    #[test]
    fn a_minor_melody_detected() {
        let events = melody(&[
            (69, 2.0),
            (71, 0.5),
            (72, 1.0),
            (74, 0.5),
            (76, 1.5),
            (77, 0.5),
            (76, 0.5),
            (72, 0.5),
            (69, 2.0),
        ]);
        let estimate = detect_key(&events);
        assert_eq!(estimate.key, KeySignature::new(9, KeyMode::Minor));
    }

    #[test]
    fn transposed_melody_moves_the_tonic() {
        // The C major melody up a fifth
        let events = melody(&[
            (67, 2.0),
            (69, 0.5),
            (71, 1.0),
            (72, 0.5),
            (74, 1.5),
            (76, 0.5),
            (78, 0.5),
            (79, 2.0),
        ]);
        assert_eq!(detect_key(&events).key, KeySignature::new(7, KeyMode::Major));
    }
}
