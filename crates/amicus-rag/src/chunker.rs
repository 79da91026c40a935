//! Paragraph-aware text chunker
//!
//! Lengths are counted in characters, never bytes, so slicing can not split
//! a UTF-8 sequence.
//!
//! Text is split into paragraphs (runs of non-blank lines) which are packed
//! greedily into chunks of at most `max_chars`. Every chunk after the first
//! opens with the trailing `overlap_chars` of its predecessor followed by a
//! blank line. The body of a chunk only gets the room the prefix leaves, so
//! no body text is ever cut off by the length limit. A paragraph that does
//! not fit is hard-sliced; the overlap prefix of the next chunk carries the
//! context across the cut.

pub const DEFAULT_MAX_CHARS: usize = 2500;
pub const DEFAULT_OVERLAP_CHARS: usize = 250;

pub const SEPARATOR: &str = "\n\n";
const SEPARATOR_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
        }
    }
}

impl ChunkerConfig {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        Self {
            max_chars,
            overlap_chars,
        }
    }

    fn max(&self) -> usize {
        self.max_chars.max(1)
    }

    /// Overlap actually carried between chunks
    ///
    /// Equal to `overlap_chars` unless the prefix, its separator and one
    /// body character would no longer fit in `max_chars`.
    pub fn effective_overlap(&self) -> usize {
        self.overlap_chars
            .min(self.max().saturating_sub(SEPARATOR_CHARS + 1))
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut packer = Packer::new(self.max(), self.effective_overlap());
        for paragraph in paragraphs(text) {
            packer.push(&paragraph);
        }
        packer.finish()
    }
}

/// Chunk `text` with the given limits
pub fn chunk_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    ChunkerConfig::new(max_chars, overlap_chars).chunk(text)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Last `n` characters of `s`
fn tail(s: &str, n: usize) -> &str {
    let len = char_len(s);
    if n >= len {
        return s;
    }
    match s.char_indices().nth(len - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

/// First `n` characters of `s`
fn head(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Split into trimmed, non-empty paragraphs separated by blank lines
pub fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line.trim_end_matches('\r'));
        }
    }
    if !current.is_empty() {
        out.push(current.join("\n").trim().to_string());
    }
    out.retain(|p| !p.is_empty());
    out
}

/// Greedy chunk builder; `body` is the open chunk minus its prefix
struct Packer {
    max: usize,
    overlap: usize,
    chunks: Vec<String>,
    prefix: String,
    body: String,
    body_len: usize,
}

impl Packer {
    fn new(max: usize, overlap: usize) -> Self {
        Self {
            max,
            overlap,
            chunks: Vec::new(),
            prefix: String::new(),
            body: String::new(),
            body_len: 0,
        }
    }

    /// Room left for body text once the prefix is in place
    fn budget(&self) -> usize {
        if self.prefix.is_empty() {
            self.max
        } else {
            self.max - char_len(&self.prefix) - SEPARATOR_CHARS
        }
    }

    fn set_body(&mut self, text: &str) {
        let text = text.trim();
        self.body = text.to_string();
        self.body_len = char_len(text);
    }

    fn flush(&mut self) {
        if self.body.is_empty() {
            return;
        }
        let body = std::mem::take(&mut self.body);
        self.body_len = 0;

        let chunk = if self.prefix.is_empty() {
            body
        } else {
            format!("{}{SEPARATOR}{body}", self.prefix)
        };
        self.prefix = if self.overlap == 0 {
            String::new()
        } else {
            tail(&chunk, self.overlap).trim_start().to_string()
        };
        self.chunks.push(chunk);
    }

    fn push(&mut self, paragraph: &str) {
        let len = char_len(paragraph);

        if !self.body.is_empty() {
            if self.body_len + SEPARATOR_CHARS + len <= self.budget() {
                self.body.push_str(SEPARATOR);
                self.body.push_str(paragraph);
                self.body_len += SEPARATOR_CHARS + len;
                return;
            }
            self.flush();
        }

        let mut rest = paragraph;
        loop {
            let budget = self.budget();
            if char_len(rest) <= budget {
                self.set_body(rest);
                return;
            }
            let piece = head(rest, budget);
            rest = &rest[piece.len()..];
            self.set_body(piece);
            self.flush();
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(chunk_text("", 100, 10).is_empty());
        assert!(chunk_text("  \n\n \t \n", 100, 10).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("Form I-140.\n\nForm I-907.", 2500, 250);
        assert_eq!(chunks, vec!["Form I-140.\n\nForm I-907."]);
    }

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        let paras = paragraphs("a\nb\n\n  \n c \r\n\r\nd");
        assert_eq!(paras, vec!["a\nb", "c", "d"]);
    }

    #[test]
    fn test_packing_flushes_on_overflow() {
        let chunks = chunk_text("aaaa\n\nbbbb\n\ncccc", 10, 0);
        assert_eq!(chunks, vec!["aaaa\n\nbbbb", "cccc"]);
    }

    #[test]
    fn test_long_paragraph_is_hard_sliced() {
        let text: String = ('a'..='z').collect();
        let chunks = chunk_text(&text, 10, 0);
        assert_eq!(chunks, vec!["abcdefghij", "klmnopqrst", "uvwxyz"]);
    }

    #[test]
    fn test_hard_slices_carry_overlap_prefix() {
        let text: String = ('a'..='z').collect();
        let chunks = chunk_text(&text, 10, 3);
        assert_eq!(chunks[0], "abcdefghij");
        assert_eq!(chunks[1], "hij\n\nklmno");
        assert_eq!(chunks[2], "mno\n\npqrst");
        assert!(chunks.last().unwrap().ends_with('z'));
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_overlap_prefix() {
        let text = format!("{}\n\n{}", "x".repeat(60), "y".repeat(60));
        let chunks = chunk_text(&text, 100, 10);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "x".repeat(60));
        assert_eq!(chunks[1], format!("{}\n\n{}", "x".repeat(10), "y".repeat(60)));
    }

    /// Body of `chunk` once the prefix taken from `previous` is removed
    fn strip_prefix<'a>(previous: &str, chunk: &'a str, overlap: usize) -> &'a str {
        let prefix = format!("{}{SEPARATOR}", tail(previous, overlap).trim_start());
        chunk.strip_prefix(prefix.as_str()).unwrap()
    }

    #[test]
    fn test_overlap_larger_than_half_a_chunk() {
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = chunk_text(&text, 40, 30);

        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[0], "a".repeat(30));
        assert_eq!(chunks[1], format!("{}\n\n{}", "a".repeat(30), "b".repeat(8)));
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));

        let bodies: String = chunks
            .windows(2)
            .map(|pair| strip_prefix(&pair[0], &pair[1], 30))
            .collect();
        assert_eq!(bodies, "b".repeat(30));
    }

    #[test]
    fn test_chunk_count_tracks_the_step() {
        let text = "x".repeat(100_000);

        let chunks = chunk_text(&text, 1000, 300);
        assert!((140..=146).contains(&chunks.len()), "{}", chunks.len());

        let chunks = chunk_text(&text, 1000, 500);
        assert!((195..=205).contains(&chunks.len()), "{}", chunks.len());
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
    }

    #[test]
    fn test_overlap_is_capped_by_max() {
        assert_eq!(ChunkerConfig::new(2500, 250).effective_overlap(), 250);
        assert_eq!(ChunkerConfig::new(40, 30).effective_overlap(), 30);
        assert_eq!(ChunkerConfig::new(10, 100).effective_overlap(), 7);
        assert_eq!(ChunkerConfig::new(2, 5).effective_overlap(), 0);

        let chunks = chunk_text(&"z".repeat(50), 10, 100);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.len(), 41);
    }

    #[test]
    fn test_multibyte_text_counts_chars() {
        let text = "Привет мир. ".repeat(50);
        let chunks = chunk_text(&text, 100, 20);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn test_tail_and_head() {
        assert_eq!(tail("héllo", 3), "llo");
        assert_eq!(tail("hi", 5), "hi");
        assert_eq!(head("héllo", 2), "hé");
        assert_eq!(head("hi", 5), "hi");
    }
}
