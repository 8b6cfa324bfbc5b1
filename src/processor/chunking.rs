//! # Text Chunking Module
//!
//! Splits plain text into bounded, overlapping windows ready for embedding.
//!
//! ## Chunking Strategy
//!
//! A chunk starting at character `start` may extend at most `chunk_size`
//! characters. Within that window the chunker looks for the last paragraph
//! break, then line break, then sentence end (`". "`), then space, whose end
//! lies beyond `start + chunk_overlap`, and ends the chunk right after it. If
//! no boundary qualifies the chunk is cut hard at `start + chunk_size`. The
//! next chunk starts `chunk_overlap` characters before the previous end.
//!
//! Consequences:
//!
//! - every chunk holds at most `chunk_size` characters
//! - every chunk after the first begins with exactly the last `chunk_overlap`
//!   characters of its predecessor
//! - dropping that prefix from every chunk but the first and concatenating
//!   gives back the original text

use crate::processor::ChunkOptions;
use crate::processor::error::ProcessError;
use serde::Serialize;
use tracing::{debug, instrument};

/// Boundaries tried in order of preference
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// A chunk of text with its location in the source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// The text of the chunk
    pub text: String,

    /// Ordinal of the chunk within its document
    pub position: usize,

    /// Character offset of the chunk in the document
    pub start: usize,
}

/// Chunk text into overlapping windows
///
/// # Arguments
///
/// * `text` - The text to chunk
/// * `options` - Chunking options
///
/// # Returns
///
/// The chunks in document order; empty text yields no chunks
#[instrument(skip(text), fields(chars = tracing::field::Empty))]
pub fn chunk_text(text: &str, options: &ChunkOptions) -> Result<Vec<TextChunk>, ProcessError> {
    options.validate()?;

    let chars: Vec<char> = text.chars().collect();
    tracing::Span::current().record("chars", chars.len());

    let max = options.chunk_size;
    let overlap = options.chunk_overlap;
    let separators: Vec<Vec<char>> = SEPARATORS.iter().map(|s| s.chars().collect()).collect();

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = if chars.len() - start <= max {
            chars.len()
        } else {
            split_point(&chars, start, max, overlap, &separators)
        };

        chunks.push(TextChunk {
            text: chars[start..end].iter().collect(),
            position: chunks.len(),
            start,
        });

        if end == chars.len() {
            break;
        }
        start = end - overlap;
    }

    debug!("Created {} chunks", chunks.len());
    Ok(chunks)
}

/// End of the chunk starting at `start`, which must be followed by more than `max` characters
fn split_point(
    chars: &[char],
    start: usize,
    max: usize,
    overlap: usize,
    separators: &[Vec<char>],
) -> usize {
    let window_end = start + max;
    let min_end = start + overlap;

    for separator in separators {
        let len = separator.len();
        let mut end = window_end;
        while end > min_end && end >= start + len {
            if chars[end - len..end] == separator[..] {
                return end;
            }
            end -= 1;
        }
    }

    window_end
}
