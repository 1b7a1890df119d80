//! Boundary-aware text chunker with overlap.
//!
//! Splits extracted text into [`Chunk`]s of at most `max_len` characters.
//! Each cut is placed at the last boundary inside a tolerance window, in
//! order of preference:
//!
//! 1. paragraph break (`\n\n`), cut after the break
//! 2. sentence end (`.`, `!`, `?` followed by whitespace) or a line break,
//!    cut after the whitespace
//! 3. any whitespace
//! 4. hard cut at `max_len`
//!
//! The tolerance window is `[start + max_len / 2, start + max_len]`, further
//! narrowed so that every chunk is longer than the overlap. Chunk `i + 1`
//! starts `overlap` characters before chunk `i` ends, so dropping the first
//! `overlap` characters of every chunk after the first and concatenating
//! reproduces the input exactly.
//!
//! Lengths are counted in `char`s, never bytes, so multi-byte text is never
//! cut inside a code point.

use crate::error::SummarizeError;
use crate::models::Chunk;

/// Split `text` into overlapping chunks. Deterministic for identical input.
///
/// Returns an empty vector for empty text.
///
/// # Errors
///
/// [`SummarizeError::InvalidRequest`] if `max_len == 0` or `overlap >= max_len`.
pub fn split(text: &str, max_len: usize, overlap: usize) -> Result<Vec<Chunk>, SummarizeError> {
    if max_len == 0 {
        return Err(SummarizeError::InvalidRequest(
            "chunk max_len must be > 0".to_string(),
        ));
    }
    if overlap >= max_len {
        return Err(SummarizeError::InvalidRequest(format!(
            "chunk overlap ({}) must be smaller than max_len ({})",
            overlap, max_len
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::new();
    if total == 0 {
        return Ok(chunks);
    }

    let mut start = 0usize;
    loop {
        let window_end = (start + max_len).min(total);
        let end = if window_end == total {
            total
        } else {
            find_cut(&chars, start, window_end, max_len, overlap)
        };

        chunks.push(Chunk {
            index: chunks.len(),
            start,
            text: chars[start..end].iter().collect(),
        });

        if end == total {
            break;
        }
        // end > start + overlap, so this always moves forward
        start = end - overlap;
    }

    Ok(chunks)
}

fn find_cut(chars: &[char], start: usize, window_end: usize, max_len: usize, overlap: usize) -> usize {
    let min_cut = (start + max_len / 2).max(start + overlap + 1);

    last_cut(chars, min_cut, window_end, is_paragraph_break)
        .or_else(|| last_cut(chars, min_cut, window_end, is_sentence_break))
        .or_else(|| last_cut(chars, min_cut, window_end, is_word_break))
        .unwrap_or(window_end)
}

/// Largest cut position `p` in `[min_cut, max_cut]` accepted by `is_break`.
fn last_cut(
    chars: &[char],
    min_cut: usize,
    max_cut: usize,
    is_break: fn(&[char], usize) -> bool,
) -> Option<usize> {
    (min_cut..=max_cut).rev().find(|&p| is_break(chars, p))
}

fn is_paragraph_break(chars: &[char], p: usize) -> bool {
    p >= 2 && chars[p - 1] == '\n' && chars[p - 2] == '\n'
}

fn is_sentence_break(chars: &[char], p: usize) -> bool {
    if p == 0 {
        return false;
    }
    if chars[p - 1] == '\n' {
        return true;
    }
    p >= 2 && chars[p - 1].is_whitespace() && matches!(chars[p - 2], '.' | '!' | '?')
}

fn is_word_break(chars: &[char], p: usize) -> bool {
    p >= 1 && chars[p - 1].is_whitespace()
}
