//! Bounded CSV previews.
//!
//! The download is consumed through [`LineBuffer`] so that reading stops as
//! soon as enough lines are in hand; [`CsvPreview::from_lines`] then parses
//! what was read.

use crate::error::{Result, TorontoError};
use crate::model::FieldType;
use serde::Serialize;

/// Lines read when a caller does not say how many.
pub const DEFAULT_PREVIEW_LINES: usize = 50;

/// Accumulates downloaded chunks and hands out complete lines.
///
/// At most `limit` bytes are ever kept; anything past that is dropped and
/// the buffer reports [`LineBuffer::overflowed`].
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    received: usize,
    limit: usize,
    overflowed: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_limit(usize::MAX)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            received: 0,
            limit,
            overflowed: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.received);
        let take = chunk.len().min(room);
        self.pending.extend_from_slice(&chunk[..take]);
        self.received += take;
        if take < chunk.len() {
            self.overflowed = true;
        }
    }

    /// Bytes were discarded because the limit was reached.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Next `\n`-terminated line, without the terminator.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.pending.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
        line.pop();
        Some(line)
    }

    /// Whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Decode one line as UTF-8, falling back to Latin-1, and strip `\r`.
pub fn decode_line(bytes: &[u8]) -> String {
    let mut line = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        // Latin-1 maps every byte straight onto the same code point
        Err(_) => bytes.iter().map(|b| char::from(*b)).collect(),
    };
    while line.ends_with('\r') || line.ends_with('\n') {
        line.pop();
    }
    line
}

/// The first lines of a CSV file, parsed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CsvPreview {
    pub url: String,
    /// Raw lines as read, header included
    pub lines: Vec<String>,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Best-effort type of each header column from the sample rows
    pub column_types: Vec<FieldType>,
    /// The file has more content than was read
    pub truncated: bool,
}

impl CsvPreview {
    /// Parse `lines` (header first) read from `url`.
    pub fn from_lines(url: &str, mut lines: Vec<String>, truncated: bool) -> Result<Self> {
        if let Some(first) = lines.first_mut() {
            if first.starts_with('\u{feff}') {
                first.remove(0);
            }
        }

        if lines.iter().all(|line| line.trim().is_empty()) {
            return Err(TorontoError::EmptyResource {
                url: url.to_string(),
            });
        }

        let joined = lines.join("\n");
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(joined.as_bytes());

        let header: Vec<String> = reader
            .headers()
            .map(|h| h.iter().map(|cell| cell.trim().to_string()).collect())
            .map_err(|e| TorontoError::Decode {
                message: format!("unreadable CSV header: {e}"),
            })?;

        // A quoted cell cut off at the preview boundary can make the last
        // record unreadable; it is dropped rather than failing the preview.
        let rows: Vec<Vec<String>> = reader
            .records()
            .filter_map(|record| record.ok())
            .map(|record| record.iter().map(str::to_string).collect())
            .collect();

        let column_types = (0..header.len())
            .map(|col| {
                FieldType::infer(
                    rows.iter()
                        .map(move |row| row.get(col).map(String::as_str).unwrap_or("")),
                )
            })
            .collect();

        Ok(Self {
            url: url.to_string(),
            lines,
            header,
            rows,
            column_types,
            truncated,
        })
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}
