//! Sliding-window text chunker.
//!
//! Splits document text into overlapping windows of at most `max_chars`
//! characters. Each window starts `overlap` characters before the previous
//! window ended, so no stretch of text longer than the overlap is lost at a
//! boundary. Offsets are counted in chars, never bytes, so a window never
//! splits a code point.
//!
//! Windows that are blank after trimming are dropped, but the emitted text
//! is the raw slice: offsets always point at exactly the chunk's text.
//!
//! Each [`Chunk`] gets the id `"{doc_id}#{offset}"`, so re-chunking the same
//! document with the same parameters yields the same ids in the same order.

use anyhow::{bail, Result};

use crate::models::{Chunk, Document};

/// A window of text and its start offset (in chars) in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub offset: usize,
    pub text: String,
}

/// Split `text` into overlapping windows.
///
/// Requires `0 < overlap < max_chars`. Window starts advance by
/// `max_chars - overlap` and stop once the next start would fall at or past
/// the end of the text, so the number of windows never exceeds
/// `ceil(len / (max_chars - overlap))`.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Result<Vec<TextSpan>> {
    if max_chars == 0 || overlap == 0 || overlap >= max_chars {
        bail!(
            "invalid chunking parameters: need 0 < overlap < max_chars (got overlap={}, max_chars={})",
            overlap,
            max_chars
        );
    }

    // Byte position of every char, plus the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;

    let step = max_chars - overlap;
    let mut spans = Vec::new();
    let mut start = 0usize;
    while start < len {
        let end = (start + max_chars).min(len);
        let window = &text[bounds[start]..bounds[end]];
        if !window.trim().is_empty() {
            spans.push(TextSpan {
                offset: start,
                text: window.to_string(),
            });
        }
        start += step;
    }

    Ok(spans)
}

/// Chunk one document, tagging every chunk with the document's identity.
pub fn chunk_document(doc: &Document, max_chars: usize, overlap: usize) -> Result<Vec<Chunk>> {
    let spans = chunk_text(&doc.text, max_chars, overlap)?;
    Ok(spans
        .into_iter()
        .enumerate()
        .map(|(index, span)| Chunk {
            chunk_id: format!("{}#{}", doc.id, span.offset),
            doc_id: doc.id.clone(),
            index,
            offset: span.offset,
            title: doc.title.clone(),
            path: doc.path.clone(),
            text: span.text,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str) -> Document {
        Document {
            id: id.to_string(),
            path: format!("/RAG_Sources/{}.txt", id),
            title: format!("{}.txt", id),
            text: text.to_string(),
            size: text.len() as u64,
        }
    }

    fn upper_bound(len: usize, max_chars: usize, overlap: usize) -> usize {
        len.div_ceil(max_chars - overlap)
    }

    #[test]
    fn test_window_offsets_and_lengths() {
        let text: String = (0..100).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let spans = chunk_text(&text, 40, 10).unwrap();

        let offsets: Vec<usize> = spans.iter().map(|s| s.offset).collect();
        let lengths: Vec<usize> = spans.iter().map(|s| s.text.chars().count()).collect();
        assert_eq!(offsets, vec![0, 30, 60, 90]);
        assert_eq!(lengths, vec![40, 40, 40, 10]);
        assert_eq!(spans[1].text, text[30..70]);
    }

    #[test]
    fn test_short_text_single_window() {
        let spans = chunk_text("Hello", 40, 10).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].offset, 0);
        assert_eq!(spans[0].text, "Hello");
    }

    #[test]
    fn test_text_within_one_window_is_not_duplicated() {
        let spans = chunk_text(&"w".repeat(23), 200, 20).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text.len(), 23);

        let spans = chunk_text(&"w".repeat(1000), 1200, 200).unwrap();
        assert_eq!(spans.len(), 1);

        let offsets: Vec<usize> = chunk_text(&"w".repeat(45), 40, 10)
            .unwrap()
            .iter()
            .map(|s| s.offset)
            .collect();
        assert_eq!(offsets, vec![0, 30]);
    }

    #[test]
    fn test_empty_and_blank_text_yield_nothing() {
        assert!(chunk_text("", 40, 10).unwrap().is_empty());
        assert!(chunk_text(" \n\t \n", 40, 10).unwrap().is_empty());
    }

    #[test]
    fn test_blank_windows_are_dropped() {
        let text = format!("{}{}", "x".repeat(10), " ".repeat(50));
        let spans = chunk_text(&text, 20, 5).unwrap();
        assert!(spans.iter().all(|s| !s.text.trim().is_empty()));
        assert_eq!(spans[0].offset, 0);
    }

    #[test]
    fn test_offsets_strictly_increase_and_count_is_bounded() {
        for len in [1usize, 9, 10, 11, 29, 30, 31, 45, 99, 100, 101, 257, 1000] {
            for (max_chars, overlap) in [(40, 10), (10, 9), (7, 1), (1200, 200)] {
                let text = "w".repeat(len);
                let spans = chunk_text(&text, max_chars, overlap).unwrap();
                assert!(!spans.is_empty());
                assert_eq!(spans.len(), upper_bound(len, max_chars, overlap));
                for pair in spans.windows(2) {
                    assert!(pair[0].offset < pair[1].offset);
                }
                for span in &spans {
                    let n = span.text.chars().count();
                    assert!(n >= 1 && n <= max_chars);
                }
            }
        }
    }

    #[test]
    fn test_windows_cover_whole_text() {
        let text: String = (0..237).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let spans = chunk_text(&text, 50, 15).unwrap();
        assert_eq!(spans[0].offset, 0);
        let last = spans.last().unwrap();
        assert_eq!(last.offset + last.text.chars().count(), 237);
        for pair in spans.windows(2) {
            let prev_end = pair[0].offset + pair[0].text.chars().count();
            assert!(pair[1].offset <= prev_end);
        }
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text = "héllo wörld ünïcode 日本語テキスト".repeat(5);
        let spans = chunk_text(&text, 12, 4).unwrap();
        let total = text.chars().count();
        for span in &spans {
            assert!(span.text.chars().count() <= 12);
            let expected: String = text.chars().skip(span.offset).take(span.text.chars().count()).collect();
            assert_eq!(span.text, expected);
        }
        let last = spans.last().unwrap();
        assert_eq!(last.offset + last.text.chars().count(), total);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(chunk_text("abc", 0, 0).is_err());
        assert!(chunk_text("abc", 10, 0).is_err());
        assert!(chunk_text("abc", 10, 10).is_err());
        assert!(chunk_text("abc", 10, 11).is_err());
    }

    #[test]
    fn test_chunk_document_ids_and_indices() {
        let text = "a".repeat(100);
        let chunks = chunk_document(&doc("id:abc", &text), 40, 10).unwrap();
        let ids: Vec<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["id:abc#0", "id:abc#30", "id:abc#60", "id:abc#90"]);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
            assert_eq!(c.doc_id, "id:abc");
            assert_eq!(c.title, "id:abc.txt");
        }
    }

    #[test]
    fn test_deterministic() {
        let d = doc("d1", &"Alpha beta gamma delta. ".repeat(40));
        let c1 = chunk_document(&d, 100, 20).unwrap();
        let c2 = chunk_document(&d, 100, 20).unwrap();
        assert_eq!(c1, c2);
    }
}
