use crate::piece::Piece;

/// True when every event duration is exactly one of `accepted_durations`.
///
/// Comparison is by equality: durations produced by tuplets (1/3 and so on)
/// never match a binary set and reject the piece. An empty piece passes.
pub fn is_acceptable(piece: &Piece, accepted_durations: &[f64]) -> bool {
    piece
        .events
        .iter()
        .all(|event| accepted_durations.contains(&event.duration))
}
