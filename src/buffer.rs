//! The growable text buffer the serializer writes into

use core::fmt;

/// Initial capacity of a buffer created with [`OutputBuffer::new`].
pub const DEFAULT_CAPACITY: usize = 4096;

/// An append-only text buffer.
///
/// When a write would not fit, the backing storage grows to
/// `max(2 * capacity, required)`, so appends are amortized O(1). Clearing
/// keeps the allocation, which lets one buffer serve many conversions.
pub struct OutputBuffer {
    text: String,
}

impl OutputBuffer {
    /// Create an empty buffer with [`DEFAULT_CAPACITY`] bytes reserved.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty buffer with at least `capacity` bytes reserved.
    pub fn with_capacity(capacity: usize) -> Self {
        OutputBuffer {
            text: String::with_capacity(capacity),
        }
    }

    /// Append one character.
    pub fn push(&mut self, c: char) {
        self.ensure_capacity(self.text.len() + c.len_utf8());
        self.text.push(c);
    }

    /// Append a string slice.
    pub fn push_str(&mut self, s: &str) {
        self.ensure_capacity(self.text.len() + s.len());
        self.text.push_str(s);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Bytes that can be written before the next reallocation.
    pub fn capacity(&self) -> usize {
        self.text.capacity()
    }

    /// Forget the content but keep the allocation.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Release storage beyond `capacity` bytes. The content is kept, so the
    /// buffer never shrinks below its length.
    pub fn shrink_to(&mut self, capacity: usize) {
        self.text.shrink_to(capacity);
    }

    /// View the current content.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consume the buffer and return its content.
    pub fn into_string(self) -> String {
        self.text
    }

    // Rolls back a partially written member. `len` is always a mark taken
    // from `self.len()` at a character boundary.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.text.truncate(len);
    }

    fn ensure_capacity(&mut self, required: usize) {
        let capacity = self.text.capacity();
        if required > capacity {
            let target = core::cmp::max(capacity * 2, required);
            self.text.reserve_exact(target - self.text.len());
        }
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OutputBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for OutputBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputBuffer")
            .field("len", &self.text.len())
            .field("capacity", &self.text.capacity())
            .finish()
    }
}

impl fmt::Write for OutputBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::OutputBuffer;

    #[test]
    fn append_and_snapshot() {
        let mut buf = OutputBuffer::with_capacity(4);
        buf.push('[');
        buf.push_str("1,2");
        buf.push(']');
        let snapshot = buf.to_string();
        buf.push('!');

        assert_eq!(snapshot, "[1,2]");
        assert_eq!(buf.as_str(), "[1,2]!");
    }

    #[test]
    fn grows_by_doubling() {
        let mut buf = OutputBuffer::with_capacity(8);
        let before = buf.capacity();
        buf.push_str("123456789");
        assert!(buf.capacity() >= before * 2);

        let mut buf = OutputBuffer::with_capacity(8);
        let long = "x".repeat(100);
        buf.push_str(&long);
        assert!(buf.capacity() >= 100);
        assert_eq!(buf.len(), 100);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut buf = OutputBuffer::with_capacity(16);
        buf.push_str(&"y".repeat(64));
        let capacity = buf.capacity();
        buf.clear();

        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), capacity);
    }

    #[test]
    fn shrink_to_releases_spare_capacity() {
        let mut buf = OutputBuffer::with_capacity(16);
        buf.push_str(&"z".repeat(1000));
        buf.shrink_to(16);
        assert!(buf.capacity() >= 1000);
        assert_eq!(buf.len(), 1000);

        buf.clear();
        buf.shrink_to(16);
        assert!(buf.capacity() < 1000);
        assert!(buf.is_empty());
    }

    #[test]
    fn truncate_rolls_back() {
        let mut buf = OutputBuffer::new();
        buf.push_str("{\"a\":1");
        let mark = buf.len();
        buf.push_str(",\"b\":");
        buf.truncate(mark);
        buf.push('}');

        assert_eq!(buf.as_str(), "{\"a\":1}");
    }
}
