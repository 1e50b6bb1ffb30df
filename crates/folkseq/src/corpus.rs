use crate::symbol::BOUNDARY_TOKEN;

/// Join encoded pieces into one corpus string.
///
/// Every piece is followed by `sequence_length` boundary markers, so a
/// training window never spans two pieces without seeing the separator.
/// Pieces are taken in the order given; callers sort them.
pub fn assemble<S: AsRef<str>>(encoded_pieces: &[S], sequence_length: usize) -> String {
    let delimiter = format!("{} ", BOUNDARY_TOKEN).repeat(sequence_length);

    let mut corpus = String::new();
    for piece in encoded_pieces {
        corpus.push_str(piece.as_ref());
        corpus.push(' ');
        corpus.push_str(&delimiter);
    }
    corpus.truncate(corpus.trim_end().len());
    corpus
}
