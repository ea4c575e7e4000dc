//! Fixed-window document fragmenting.
//!
//! Text is cut into contiguous, non-overlapping windows of at most `size`
//! characters. There is no sentence or word awareness: the window boundary
//! falls wherever the character count says it does.

use serde::Serialize;

use crate::error::RetrievalError;

/// Default window size, in characters.
pub const DEFAULT_FRAGMENT_SIZE: usize = 200;

/// An immutable slice of source text; the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    content: String,
}

impl Fragment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}

/// Splits text into fixed-size character windows.
#[derive(Debug, Clone, Copy)]
pub struct Fragmenter {
    size: usize,
}

impl Fragmenter {
    /// Create a fragmenter with the given window size in characters.
    pub fn new(size: usize) -> Result<Self, RetrievalError> {
        if size == 0 {
            return Err(RetrievalError::InvalidFragmentSize);
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Split `text` into ordered fragments.
    ///
    /// Empty input yields an empty vector. Windows are counted in `char`s so
    /// a multi-byte code point is never split.
    pub fn fragment(&self, text: &str) -> Vec<Fragment> {
        let mut fragments = Vec::with_capacity(text.len() / self.size + 1);
        let mut start = 0;

        for (count, (offset, _)) in text.char_indices().enumerate() {
            if count > 0 && count % self.size == 0 {
                fragments.push(Fragment::new(&text[start..offset]));
                start = offset;
            }
        }
        if start < text.len() {
            fragments.push(Fragment::new(&text[start..]));
        }

        fragments
    }
}

impl Default for Fragmenter {
    fn default() -> Self {
        Self {
            size: DEFAULT_FRAGMENT_SIZE,
        }
    }
}
