//! Overlapping fixed-size text chunker.
//!
//! Splits normalized document text into [`TextChunk`]s of at most
//! `chunk_size` characters, each sharing `overlap` characters with the
//! previous one so that retrieval keeps context across boundaries.
//!
//! # Algorithm
//!
//! 1. Collapse every whitespace run to a single space and trim.
//! 2. If `overlap >= chunk_size`, use `chunk_size / 5` instead.
//! 3. Slide a window `[start, start + chunk_size)` over the characters,
//!    emitting each trimmed, non-empty window.
//! 4. The next window starts at `end - overlap`, and always at least one
//!    character past the previous start.
//! 5. Stop at the end of the text or after [`MAX_CHUNKS`] chunks.
//!
//! Sizes are counted in characters, never bytes, so multi-byte text is
//! never split inside a code point.
//!
//! # Example
//!
//! ```rust
//! use sadaqa_core::chunk::chunk_text;
//!
//! let chunks = chunk_text("Hello   world.\n\nSecond line.", 1000, 200).unwrap();
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].text, "Hello world. Second line.");
//! ```

use crate::error::{Error, Result};
use crate::models::TextChunk;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Hard cap on chunks produced from one document.
pub const MAX_CHUNKS: usize = 10_000;

/// Split `text` into overlapping chunks.
///
/// Returns an empty list for empty or whitespace-only text, and
/// [`Error::InvalidParameter`] when `chunk_size` is zero.
///
/// # Guarantees
///
/// - Indices are contiguous: `0, 1, …, N-1`.
/// - Every chunk has at most `chunk_size` characters.
/// - Every character of the normalized text appears in some chunk,
///   unless the [`MAX_CHUNKS`] cap was reached.
/// - Same input, same output.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<TextChunk>> {
    if chunk_size == 0 {
        return Err(Error::InvalidParameter(
            "chunk size must be greater than zero".to_string(),
        ));
    }
    let overlap = if overlap >= chunk_size {
        chunk_size / 5
    } else {
        overlap
    };

    let cleaned = normalize_whitespace(text);
    let chars: Vec<char> = cleaned.chars().collect();
    let len = chars.len();

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        if chunks.len() >= MAX_CHUNKS {
            tracing::warn!(
                max_chunks = MAX_CHUNKS,
                "chunk limit reached; remaining text was not chunked"
            );
            break;
        }

        let end = (start + chunk_size).min(len);
        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(TextChunk {
                index: chunks.len(),
                text: piece.to_string(),
            });
        }

        if end == len {
            break;
        }
        start = (end - overlap).max(start + 1);
    }

    Ok(chunks)
}

/// Collapse whitespace runs (including newlines) to a single space.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
