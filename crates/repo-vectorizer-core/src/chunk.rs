//! Recursive, overlapping text chunker.
//!
//! Splits file content into chunks of at most `max_size` characters
//! (Unicode scalar values), with each chunk after the first starting with
//! the last `overlap` characters of its predecessor.
//!
//! # Algorithm
//!
//! 1. If the whole input fits in `max_size`, emit it as a single chunk.
//! 2. Otherwise split on the coarsest separator present in the text
//!    (`"\n\n"`, then `"\n"`, then `" "`, then raw characters). Separators
//!    stay attached to the preceding piece, so no text is lost.
//! 3. Any piece still larger than the content budget
//!    (`max_size - overlap`) is re-split with the next finer separator; the
//!    empty separator yields single characters.
//! 4. Adjacent pieces are merged greedily: the first segment up to
//!    `max_size`, every later one up to the content budget.
//! 5. Each segment after the first is emitted with the tail of the previous
//!    chunk prepended, which keeps every chunk within `max_size`.
//!
//! Whitespace-only segments are skipped. A piece that cannot be split any
//! further (only possible with a custom separator list lacking `""`) is
//! emitted whole, without an overlap prefix.
//!
//! # Example
//!
//! ```rust
//! use repo_vectorizer_core::chunk::TextSplitter;
//!
//! let splitter = TextSplitter::new(10, 3).unwrap();
//! let chunks = splitter.split("abcdefghijklmnopqrstuvwxyz");
//! assert_eq!(chunks[0], "abcdefghij");
//! assert_eq!(chunks[1], "hijklmnopq");
//! ```

use std::ops::Range;

use crate::error::{Result, RetrievalError};
use crate::models::{Chunk, FileRecord};

/// Separators tried in order, coarsest first. `""` splits on characters.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Configured splitter. Cheap to clone and safe to share between threads.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    max_size: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a splitter with the default separator cascade.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Config`] unless `max_size > overlap`.
    pub fn new(max_size: usize, overlap: usize) -> Result<Self> {
        Self::with_separators(
            max_size,
            overlap,
            DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_separators(max_size: usize, overlap: usize, separators: Vec<String>) -> Result<Self> {
        if max_size == 0 {
            return Err(RetrievalError::Config("chunk size must be > 0".to_string()));
        }
        if overlap >= max_size {
            return Err(RetrievalError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, max_size
            )));
        }
        Ok(Self {
            max_size,
            overlap,
            separators,
        })
    }

    /// Lazily iterate over the chunks of `text`.
    ///
    /// Each call returns an independent iterator; the splitter itself holds
    /// no per-call state.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        let segments = if text.trim().is_empty() {
            Vec::new()
        } else if char_len(text) <= self.max_size {
            vec![Segment {
                range: 0..text.len(),
                standalone: true,
            }]
        } else {
            let budget = self.max_size - self.overlap;
            let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
            let mut pieces = Vec::new();
            split_recursive(text, 0, &separators, budget, &mut pieces);
            merge_pieces(text, pieces, self.max_size, budget)
        };

        Chunks {
            text,
            segments: segments.into_iter(),
            overlap: self.overlap,
            previous_tail: None,
        }
    }

    /// Eagerly split `text` into chunk strings.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.chunks(text).collect()
    }

    /// Split one file into [`Chunk`]s with contiguous indices from 0.
    pub fn chunk_file(&self, file: &FileRecord) -> Vec<Chunk> {
        self.chunks(&file.content)
            .enumerate()
            .map(|(chunk_index, text)| Chunk {
                text,
                path: file.path.clone(),
                chunk_index,
            })
            .collect()
    }
}

/// Iterator returned by [`TextSplitter::chunks`].
pub struct Chunks<'a> {
    text: &'a str,
    segments: std::vec::IntoIter<Segment>,
    overlap: usize,
    previous_tail: Option<String>,
}

impl Iterator for Chunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let segment = self.segments.next()?;
            let body = &self.text[segment.range];
            if body.trim().is_empty() {
                continue;
            }

            let chunk = match &self.previous_tail {
                Some(tail) if !segment.standalone && !tail.is_empty() => {
                    let mut joined = String::with_capacity(tail.len() + body.len());
                    joined.push_str(tail);
                    joined.push_str(body);
                    joined
                }
                _ => body.to_string(),
            };

            self.previous_tail = Some(tail_chars(&chunk, self.overlap).to_string());
            return Some(chunk);
        }
    }
}

/// A byte range of the source text produced by recursive splitting.
struct Piece {
    range: Range<usize>,
    oversized: bool,
}

/// A merged run of pieces, emitted as one chunk body.
struct Segment {
    range: Range<usize>,
    /// Emitted without an overlap prefix.
    standalone: bool,
}

fn split_recursive(
    text: &str,
    offset: usize,
    separators: &[&str],
    budget: usize,
    out: &mut Vec<Piece>,
) {
    if text.is_empty() {
        return;
    }
    if char_len(text) <= budget {
        out.push(Piece {
            range: offset..offset + text.len(),
            oversized: false,
        });
        return;
    }

    let Some(pos) = separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(*sep))
    else {
        out.push(Piece {
            range: offset..offset + text.len(),
            oversized: true,
        });
        return;
    };

    let separator = separators[pos];
    let finer = &separators[pos + 1..];

    if separator.is_empty() {
        out.extend(text.char_indices().map(|(i, c)| Piece {
            range: offset + i..offset + i + c.len_utf8(),
            oversized: false,
        }));
        return;
    }

    let mut start = 0;
    for part in text.split_inclusive(separator) {
        split_recursive(part, offset + start, finer, budget, out);
        start += part.len();
    }
}

/// Greedily merge `pieces`. The first segment may use `first_budget`
/// characters since nothing is prepended to it.
fn merge_pieces(text: &str, pieces: Vec<Piece>, first_budget: usize, budget: usize) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Option<(Range<usize>, usize)> = None;

    for piece in pieces {
        if piece.oversized {
            if let Some((range, _)) = current.take() {
                segments.push(Segment {
                    range,
                    standalone: false,
                });
            }
            segments.push(Segment {
                range: piece.range,
                standalone: true,
            });
            continue;
        }

        let len = char_len(&text[piece.range.clone()]);
        let limit = if segments.is_empty() { first_budget } else { budget };
        let fits = current
            .as_ref()
            .is_some_and(|(_, current_len)| current_len + len <= limit);

        if fits {
            if let Some((range, current_len)) = current.as_mut() {
                range.end = piece.range.end;
                *current_len += len;
            }
        } else if let Some((range, _)) = current.replace((piece.range, len)) {
            segments.push(Segment {
                range,
                standalone: false,
            });
        }
    }

    if let Some((range, _)) = current {
        segments.push(Segment {
            range,
            standalone: false,
        });
    }

    segments
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The last `n` characters of `s` (all of `s` if it is shorter).
pub fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let count = char_len(s);
    if count <= n {
        return s;
    }
    let start = s
        .char_indices()
        .nth(count - n)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[start..]
}
