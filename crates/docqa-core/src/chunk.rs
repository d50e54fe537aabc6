//! Recursive, overlapping text splitter.
//!
//! Splits page text into [`Chunk`]s of at most `chunk_size` characters where
//! every pair of neighbouring chunks shares exactly `chunk_overlap`
//! characters. Chunk ends are placed on the coarsest natural boundary that
//! fits the window, falling back to finer separators only when needed.
//!
//! # Algorithm
//!
//! For a window starting at character `s`:
//!
//! 1. If the rest of the text fits in `chunk_size`, emit it and stop.
//! 2. Otherwise look at `[s, s + chunk_size)` and, level by level
//!    (paragraph, sentence/line, word), take the position just after the
//!    last separator of that level.
//! 3. Accept it only if the chunk would still be longer than the overlap,
//!    so the next window always moves forward.
//! 4. If no level qualifies, cut at exactly `s + chunk_size` characters.
//! 5. The next window starts at `end - chunk_overlap`.
//!
//! Lengths are counted in Unicode scalar values. Chunk text is never
//! trimmed, so the chunks of a page always cover it without gaps.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::RecursiveSplitter;
//!
//! let splitter = RecursiveSplitter::new(1000, 200).unwrap();
//! let spans = splitter.spans(&"x".repeat(2500));
//! assert_eq!(spans, vec![(0, 1000), (800, 1800), (1600, 2500)]);
//! ```

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Separator levels from coarsest to finest. Character splitting is the
/// implicit last level.
const SEPARATOR_LEVELS: &[&[&str]] = &[
    &["\n\n"],
    &[". ", "! ", "? ", "\n"],
    &[" ", "\t"],
];

/// Splitter configured with a maximum chunk length and a fixed overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl RecursiveSplitter {
    /// Create a splitter. `chunk_overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk size must be > 0");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Compute `[start, end)` character spans for `text`.
    ///
    /// Whitespace-only text yields no spans.
    pub fn spans(&self, text: &str) -> Vec<(usize, usize)> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let offsets = char_offsets(text);
        let total = offsets.len() - 1;

        let mut spans = Vec::new();
        let mut start = 0;
        loop {
            let limit = start + self.chunk_size;
            if limit >= total {
                spans.push((start, total));
                break;
            }
            let end = self
                .split_point(text, &offsets, start, limit)
                .unwrap_or(limit);
            spans.push((start, end));
            start = end - self.chunk_overlap;
        }
        spans
    }

    /// Split a single text. Chunks carry no page number.
    pub fn split_text(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        self.push_chunks(&mut chunks, text, None);
        chunks
    }

    /// Split a paged document. Chunks never cross a page boundary; indices
    /// are contiguous across the whole document and pages are numbered
    /// from 1.
    pub fn split_pages<S: AsRef<str>>(&self, pages: &[S]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for (i, page) in pages.iter().enumerate() {
            self.push_chunks(&mut chunks, page.as_ref(), Some(i as u32 + 1));
        }
        chunks
    }

    fn push_chunks(&self, out: &mut Vec<Chunk>, text: &str, page: Option<u32>) {
        let spans = self.spans(text);
        if spans.is_empty() {
            return;
        }
        let offsets = char_offsets(text);
        for (start, end) in spans {
            let index = out.len() as i64;
            let slice = &text[offsets[start]..offsets[end]];
            out.push(make_chunk(index, page, start, end, slice));
        }
    }

    /// Find the end of the chunk starting at `start`, searching coarse to
    /// fine separators inside `[start, limit)`.
    fn split_point(
        &self,
        text: &str,
        offsets: &[usize],
        start: usize,
        limit: usize,
    ) -> Option<usize> {
        let window = &text[offsets[start]..offsets[limit]];
        let min_end = start + self.chunk_overlap;

        for level in SEPARATOR_LEVELS {
            let best = level
                .iter()
                .filter_map(|sep| window.rfind(sep).map(|pos| pos + sep.len()))
                .max();
            if let Some(byte_end) = best {
                let end = start + window[..byte_end].chars().count();
                if end > min_end {
                    return Some(end);
                }
            }
        }
        None
    }
}

/// Byte offset of every char in `text`, followed by `text.len()`.
fn char_offsets(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}

/// Create a single [`Chunk`] with a UUID and SHA-256 content hash.
fn make_chunk(index: i64, page: Option<u32>, start: usize, end: usize, text: &str) -> Chunk {
    Chunk {
        id: Uuid::new_v4().to_string(),
        index,
        page,
        start,
        end,
        text: text.to_string(),
        hash: hash_text(text),
    }
}

/// Hex-encoded SHA-256 of `text`.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covering(text: &str, chunks: &[Chunk], size: usize, overlap: usize) {
        let total = text.chars().count();
        assert_eq!(chunks.first().unwrap().start, 0);
        assert_eq!(chunks.last().unwrap().end, total);
        for c in chunks {
            assert!(c.len() <= size, "chunk {} has length {}", c.index, c.len());
            let expected: String = text.chars().skip(c.start).take(c.len()).collect();
            assert_eq!(c.text, expected);
        }
        for pair in chunks.windows(2) {
            assert_eq!(
                pair[1].start,
                pair[0].end - overlap,
                "chunks {} and {} do not overlap by {}",
                pair[0].index,
                pair[1].index,
                overlap
            );
        }
    }

    #[test]
    fn test_unbroken_text_uses_fixed_windows() {
        let splitter = RecursiveSplitter::new(1000, 200).unwrap();
        let text = "x".repeat(2500);
        let chunks = splitter.split_text(&text);
        let spans: Vec<_> = chunks.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(spans, vec![(0, 1000), (800, 1800), (1600, 2500)]);
        assert_covering(&text, &chunks, 1000, 200);
    }

    #[test]
    fn test_small_text_single_chunk() {
        let splitter = RecursiveSplitter::default();
        let chunks = splitter.split_text("Hello, world!");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_whitespace_only_text_has_no_chunks() {
        let splitter = RecursiveSplitter::default();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("  \n\n \t ").is_empty());
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let splitter = RecursiveSplitter::new(60, 10).unwrap();
        let first = "First paragraph has a few words. And a second sentence.";
        let text = format!("{}\n\nSecond paragraph follows here.", first);
        let chunks = splitter.split_text(&text);
        assert!(chunks[0].text.ends_with("\n\n"));
        assert_eq!(chunks[0].end, first.chars().count() + 2);
        assert_covering(&text, &chunks, 60, 10);
    }

    #[test]
    fn test_falls_back_to_sentence_then_word() {
        let splitter = RecursiveSplitter::new(40, 5).unwrap();
        let text = "One short sentence. Another sentence that keeps going on and on";
        let chunks = splitter.split_text(text);
        assert!(chunks[0].text.ends_with(". "));

        let words = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = splitter.split_text(words);
        assert!(chunks[0].text.ends_with(' '));
        assert_covering(words, &chunks, 40, 5);
    }

    #[test]
    fn test_boundary_inside_overlap_is_skipped() {
        // The only paragraph break sits inside the first `overlap` chars, so
        // using it would stall; the splitter must fall back to finer levels.
        let splitter = RecursiveSplitter::new(30, 10).unwrap();
        let text = format!("abc\n\n{}", "y".repeat(60));
        let chunks = splitter.split_text(&text);
        assert_eq!(chunks[0].end, 30);
        assert_covering(&text, &chunks, 30, 10);
    }

    #[test]
    fn test_mixed_text_covers_without_gaps() {
        let splitter = RecursiveSplitter::new(120, 30).unwrap();
        let text = (0..40)
            .map(|i| {
                if i % 7 == 0 {
                    format!("Paragraph {} ends here.\n\n", i)
                } else {
                    format!("Sentence number {} keeps the text flowing. ", i)
                }
            })
            .collect::<String>();
        let chunks = splitter.split_text(&text);
        assert!(chunks.len() > 5);
        assert_covering(&text, &chunks, 120, 30);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i as i64);
        }
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let splitter = RecursiveSplitter::new(10, 3).unwrap();
        let text = "┌──────────────────┐\n│ 안녕하세요 world │\n└──────────────────┘";
        let chunks = splitter.split_text(text);
        assert!(chunks.len() > 1);
        assert_covering(text, &chunks, 10, 3);
    }

    #[test]
    fn test_split_pages_numbers_pages_and_keeps_indices_contiguous() {
        let splitter = RecursiveSplitter::new(20, 5).unwrap();
        let pages = vec![
            "page one text that is long enough to split".to_string(),
            "   ".to_string(),
            "page three".to_string(),
        ];
        let chunks = splitter.split_pages(&pages);
        assert!(chunks.iter().any(|c| c.page == Some(1)));
        assert!(chunks.iter().all(|c| c.page != Some(2)));
        assert_eq!(chunks.last().unwrap().page, Some(3));
        assert_eq!(chunks.last().unwrap().text, "page three");
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i as i64);
        }
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(RecursiveSplitter::new(100, 100).is_err());
        assert!(RecursiveSplitter::new(0, 0).is_err());
        assert!(RecursiveSplitter::new(100, 99).is_ok());
    }

    #[test]
    fn test_deterministic_hashes() {
        let splitter = RecursiveSplitter::new(12, 4).unwrap();
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        let c1 = splitter.split_text(text);
        let c2 = splitter.split_text(text);
        assert_eq!(c1.len(), c2.len());
        for (a, b) in c1.iter().zip(c2.iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.hash, b.hash);
            assert_ne!(a.id, b.id);
        }
    }
}
