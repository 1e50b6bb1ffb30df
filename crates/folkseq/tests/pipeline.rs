use std::fs;
use std::path::Path;

use folkseq::pipeline::{generate, load_pieces, preprocess, train};
use folkseq::{
    assemble, decode, encode, generate_windows, join_tokens, parse_tokens, Error, Event,
    OutputFormat, PreprocessReport, Symbol, Vocabulary,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use warblerconf::WarblerConfig;

const UP_IN_G: &str = "X:1\nT:Up\nM:4/4\nL:1/8\nK:G\nG2 A2 B2 d2|g4 d4|\n";
const DOWN_IN_EM: &str = "X:1\nT:Down\nM:3/4\nL:1/4\nK:Em\nE G B|e2 B|E3|\n";
const TRIPLETS: &str = "X:1\nT:Triplets\nL:1/8\nK:C\n(3CDE C2|\n";
const DORIAN: &str = "X:1\nT:Modal\nL:1/8\nK:D dorian\nD E F G|\n";

fn dataset(root: &Path, tunes: &[(&str, &str)]) {
    let dir = root.join("dataset");
    fs::create_dir_all(&dir).unwrap();
    for (name, text) in tunes {
        fs::write(dir.join(name), text).unwrap();
    }
}

fn config(root: &Path) -> WarblerConfig {
    let mut config = WarblerConfig::default();
    config.paths.dataset_dir = root.join("dataset");
    config.paths.encoded_dir = root.join("preprocessed/encoded");
    config.paths.corpus_file = root.join("preprocessed/corpus.txt");
    config.paths.mapping_file = root.join("preprocessed/mapping.json");
    config.paths.model_file = root.join("models/ngram.json");
    config.paths.output_file = root.join("generated/melody.abc");
    config.encoding.sequence_length = 8;
    config.model.order = 4;
    config.sampling.seed = "60 _ _ _".to_string();
    config.sampling.num_steps = 64;
    config.sampling.output_format = OutputFormat::Abc;
    config
}

#[test]
fn preprocess_writes_transposed_encodings() {
    let dir = tempfile::tempdir().unwrap();
    dataset(
        dir.path(),
        &[
            ("a_up.abc", UP_IN_G),
            ("b_down.abc", DOWN_IN_EM),
            ("c_triplets.abc", TRIPLETS),
        ],
    );
    let config = config(dir.path());

    let report = preprocess(&config).unwrap();
    assert_eq!(
        report,
        PreprocessReport {
            loaded: 3,
            accepted: 2,
            rejected: 1,
            failed: 0
        }
    );

    let up = fs::read_to_string(config.paths.encoded_dir.join("a_up.txt")).unwrap();
    assert_eq!(
        up,
        "60 _ _ _ 62 _ _ _ 64 _ _ _ 67 _ _ _ 72 _ _ _ _ _ _ _ 67 _ _ _ _ _ _ _"
    );

    let down = fs::read_to_string(config.paths.encoded_dir.join("b_down.txt")).unwrap();
    assert_eq!(
        down,
        "69 _ _ _ 72 _ _ _ 76 _ _ _ 81 _ _ _ _ _ _ _ 76 _ _ _ 69 _ _ _ _ _ _ _ _ _ _ _"
    );
    assert!(!config.paths.encoded_dir.join("c_triplets.txt").exists());

    let corpus = fs::read_to_string(&config.paths.corpus_file).unwrap();
    assert_eq!(corpus, assemble(&[up, down], 8));

    let vocab = Vocabulary::load(&config.paths.mapping_file).unwrap();
    let symbols = parse_tokens(&corpus).unwrap();
    assert_eq!(Vocabulary::build(&symbols), vocab);
    assert!(vocab.contains(Symbol::Boundary));
}

#[test]
fn collection_ids_do_not_collide_with_file_stems() {
    let dir = tempfile::tempdir().unwrap();
    let collection = format!("{}\n{}", UP_IN_G, UP_IN_G.replace("X:1", "X:2"));
    dataset(
        dir.path(),
        &[("set-1.abc", DOWN_IN_EM), ("set.abc", collection.as_str())],
    );
    let config = config(dir.path());

    let ids: Vec<String> = load_pieces(&config.paths.dataset_dir, "abc")
        .unwrap()
        .into_iter()
        .map(|piece| piece.unwrap().id)
        .collect();
    assert_eq!(ids, vec!["set-1", "set-1_2", "set-2"]);

    let report = preprocess(&config).unwrap();
    assert_eq!(report.accepted, 3);
    let down = fs::read_to_string(config.paths.encoded_dir.join("set-1.txt")).unwrap();
    let up = fs::read_to_string(config.paths.encoded_dir.join("set-1_2.txt")).unwrap();
    assert!(down.starts_with("69 "));
    assert!(up.starts_with("60 "));
    assert!(config.paths.encoded_dir.join("set-2.txt").exists());
}

#[test]
fn modal_piece_is_fatal_unless_skipping() {
    let dir = tempfile::tempdir().unwrap();
    dataset(dir.path(), &[("a_up.abc", UP_IN_G), ("b_modal.abc", DORIAN)]);
    let mut config = config(dir.path());

    assert!(matches!(
        preprocess(&config),
        Err(Error::UnsupportedMode { ref piece, .. }) if piece == "b_modal"
    ));

    config.encoding.skip_failed_pieces = true;
    let report = preprocess(&config).unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(report.failed, 1);
}

#[test]
fn missing_dataset_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    assert!(matches!(preprocess(&config), Err(Error::MissingInput(_))));
    assert!(matches!(train(&config), Err(Error::MissingInput(_))));
}

#[test]
fn all_rejected_gives_empty_corpus() {
    let dir = tempfile::tempdir().unwrap();
    dataset(dir.path(), &[("triplets.abc", TRIPLETS)]);
    let config = config(dir.path());

    let report = preprocess(&config).unwrap();
    assert_eq!(report.accepted, 0);
    assert!(matches!(train(&config), Err(Error::EmptyCorpus)));
}

#[test]
fn preprocess_train_generate() {
    let dir = tempfile::tempdir().unwrap();
    dataset(
        dir.path(),
        &[("a_up.abc", UP_IN_G), ("b_down.abc", DOWN_IN_EM)],
    );
    let config = config(dir.path());

    preprocess(&config).unwrap();
    let trained = train(&config).unwrap();
    let corpus_len = parse_tokens(&fs::read_to_string(&config.paths.corpus_file).unwrap())
        .unwrap()
        .len();
    assert_eq!(trained.windows, corpus_len - 8);

    let first = generate(&config, &mut StdRng::seed_from_u64(2024)).unwrap();
    let seed = parse_tokens(&config.sampling.seed).unwrap();
    assert_eq!(&first.melody[..seed.len()], seed.as_slice());
    assert!(!first.melody.contains(&Symbol::Boundary));
    assert!(first.melody.len() <= seed.len() + 64);
    assert_eq!(first.events, decode(&first.melody, 0.25).unwrap());

    let text = fs::read_to_string(&first.output).unwrap();
    assert!(text.contains("K:C"));

    let second = generate(&config, &mut StdRng::seed_from_u64(2024)).unwrap();
    assert_eq!(first.melody, second.melody);
}

#[test]
fn unknown_seed_symbol_stops_generation() {
    let dir = tempfile::tempdir().unwrap();
    dataset(dir.path(), &[("a_up.abc", UP_IN_G)]);
    let mut config = config(dir.path());
    preprocess(&config).unwrap();
    train(&config).unwrap();

    // 61 never occurs in a piece transposed to C major here
    config.sampling.seed = "60 _ 61".to_string();
    assert!(matches!(
        generate(&config, &mut StdRng::seed_from_u64(1)),
        Err(Error::UnknownSymbol(ref s)) if s == "61"
    ));
    assert!(!config.paths.output_file.exists());
}

#[test]
fn midi_output() {
    let dir = tempfile::tempdir().unwrap();
    dataset(dir.path(), &[("a_up.abc", UP_IN_G)]);
    let mut config = config(dir.path());
    config.paths.output_file = dir.path().join("generated/melody.mid");
    config.sampling.output_format = OutputFormat::Midi;

    preprocess(&config).unwrap();
    train(&config).unwrap();
    generate(&config, &mut StdRng::seed_from_u64(5)).unwrap();

    let bytes = fs::read(&config.paths.output_file).unwrap();
    assert!(bytes.starts_with(b"MThd"));
}

#[test]
fn worked_window_example() {
    // ids {60:0, "_":1, "r":2, 62:3} over "60 _ r _ 62 _ _ _"
    let set = generate_windows(&[0, 1, 2, 1, 3, 1, 1, 1], 2);
    assert_eq!(
        set.inputs,
        vec![
            vec![0, 1],
            vec![1, 2],
            vec![2, 1],
            vec![1, 3],
            vec![3, 1],
            vec![1, 1]
        ]
    );
    assert_eq!(set.targets, vec![2, 1, 3, 1, 1, 1]);
}

#[test]
fn worked_decode_example() {
    let symbols = parse_tokens("60 _ _ r _").unwrap();
    assert_eq!(
        decode(&symbols, 0.25).unwrap(),
        vec![Event::note(60, 0.75), Event::rest(0.5)]
    );
}

#[test]
fn encode_decode_round_trip_on_quantized_piece() {
    let events = vec![
        Event::note(60, 0.5),
        Event::note(64, 0.25),
        Event::rest(0.75),
        Event::note(67, 1.5),
        Event::note(67, 4.0),
        Event::rest(0.25),
    ];
    let symbols = encode(&events, 0.25);
    assert_eq!(join_tokens(&symbols[..6]), "60 _ 64 r _ _");
    assert_eq!(decode(&symbols, 0.25).unwrap(), events);
}
