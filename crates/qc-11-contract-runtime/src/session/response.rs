//! # Response Buffer
//!
//! Bounded text buffer a dispatcher writes its answer into.

use crate::errors::Fault;

/// Bounded response text.
#[derive(Debug, Clone, Default)]
pub struct ResponseBuffer {
    text: String,
    capacity: usize,
    overflowed: bool,
}

impl ResponseBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            text: String::new(),
            capacity,
            overflowed: false,
        }
    }

    /// Append text.
    ///
    /// # Errors
    ///
    /// `ResponseOverflow` if the text does not fit. The buffer is left
    /// unchanged and the invocation will fail when it returns.
    pub fn write(&mut self, text: &str) -> Result<(), Fault> {
        if self.text.len() + text.len() > self.capacity {
            self.overflowed = true;
            return Err(Fault::ResponseOverflow {
                capacity: self.capacity,
            });
        }
        self.text.push_str(text);
        Ok(())
    }

    /// Discard everything written so far.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Current contents.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Bytes written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns true if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true if a write was ever rejected.
    #[must_use]
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Take the text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}
