//! Append-only output accumulator

use serde::{Serialize, Serializer};

/// Output captured from a single-pass stream.
///
/// The stream cannot be re-read, so this buffer is the durable record:
/// chunks are appended as they arrive and readers take snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBuffer {
    text: String,
    chunks: usize,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        self.chunks += 1;
    }

    /// Borrowed view of everything captured so far
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Owned copy of everything captured so far
    pub fn snapshot(&self) -> String {
        self.text.clone()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of chunks appended
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }
}

impl Serialize for OutputBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}
