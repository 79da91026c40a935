use amicus_rag::chunker::{paragraphs, ChunkerConfig, SEPARATOR};
use proptest::prelude::*;

fn tail(s: &str, n: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    chars[chars.len().saturating_sub(n)..].iter().collect()
}

fn strip_ws(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Chunk bodies with the overlap prefix of every chunk after the first removed
fn bodies(chunks: &[String], overlap: usize) -> Vec<String> {
    let mut out = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 || overlap == 0 {
            out.push(chunk.clone());
            continue;
        }
        let prefix = format!("{}{SEPARATOR}", tail(&chunks[i - 1], overlap).trim_start());
        let body = chunk
            .strip_prefix(prefix.as_str())
            .unwrap_or_else(|| panic!("chunk {i} does not open with the previous tail"));
        out.push(body.to_string());
    }
    out
}

fn paragraph_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-zA-Zа-я0-9 .,]{0,120}",
        1 => "[a-zа-я0-9]{200,900}",
        1 => "[a-z ]{150,500}",
    ]
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(paragraph_strategy(), 0..12).prop_map(|paras| paras.join("\n\n"))
}

proptest! {
    #[test]
    fn chunks_never_exceed_max(text in text_strategy(), max in 1usize..300, overlap in 0usize..400) {
        let chunks = ChunkerConfig::new(max, overlap).chunk(&text);
        for chunk in &chunks {
            prop_assert!(chunk.chars().count() <= max);
            prop_assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn chunking_is_deterministic(text in text_strategy(), max in 1usize..300, overlap in 0usize..400) {
        let config = ChunkerConfig::new(max, overlap);
        prop_assert_eq!(config.chunk(&text), config.chunk(&text));
    }

    #[test]
    fn each_chunk_opens_with_the_previous_tail(text in text_strategy(), max in 4usize..300, overlap in 1usize..300) {
        let config = ChunkerConfig::new(max, overlap);
        let overlap = config.effective_overlap();
        prop_assert_eq!(overlap, config.overlap_chars.min(max - 3));

        let chunks = config.chunk(&text);
        for pair in chunks.windows(2) {
            let expected = tail(&pair[0], overlap);
            prop_assert_eq!(expected.chars().count(), overlap.min(pair[0].chars().count()));
            prop_assert!(pair[1].starts_with(expected.trim_start()));
        }
    }

    #[test]
    fn bodies_reconstruct_the_text(text in text_strategy(), max in 1usize..300, overlap in 0usize..400) {
        let config = ChunkerConfig::new(max, overlap);
        let chunks = config.chunk(&text);
        let rebuilt: String = bodies(&chunks, config.effective_overlap()).concat();
        prop_assert_eq!(strip_ws(&rebuilt), strip_ws(&text));
    }

    #[test]
    fn short_paragraphs_reconstruct_exactly(
        paras in prop::collection::vec("[a-z]{1,30}( [a-z]{1,30}){0,3}", 1..10),
        max in 160usize..400,
        overlap in 0usize..30,
    ) {
        let text = paras.join("\n\n");
        let config = ChunkerConfig::new(max, overlap);
        let chunks = config.chunk(&text);
        let rebuilt = bodies(&chunks, config.effective_overlap()).join("\n\n");
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn chunk_count_is_bounded_by_the_step(text in text_strategy(), max in 20usize..300, overlap in 0usize..300) {
        let config = ChunkerConfig::new(max, overlap);
        let step = max - config.effective_overlap() - 2;
        let total: usize = paragraphs(&text).iter().map(|p| p.chars().count()).sum();
        let paras = paragraphs(&text).len();

        let chunks = config.chunk(&text);
        prop_assert!(chunks.len() <= total.div_ceil(step.max(1)) + paras + 1);
    }
}

#[test]
fn whitespace_only_input_yields_nothing() {
    assert!(ChunkerConfig::default().chunk(" \n\t\n\n   ").is_empty());
}

#[test]
fn long_runs_are_not_over_sliced() {
    let text = "x".repeat(100_000);
    let chunks = ChunkerConfig::new(1000, 500).chunk(&text);
    assert!(chunks.len() <= 201, "{}", chunks.len());
    assert_eq!(bodies(&chunks, 500).concat(), text);
}
