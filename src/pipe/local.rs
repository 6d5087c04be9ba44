//! Single-threaded grow-on-demand event buffer.
//!
//! Backs the shard inbox and the per-destination outbound staging buffers.
//! Storage is a `Vec<u64>` so every bucket offset is 8-byte aligned, which
//! lets payloads up to that alignment be constructed and read in place.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// Growable byte buffer holding whole event buckets.
///
/// All lengths are multiples of 8. The buffer is append-only between
/// [`clear`](LocalPipe::clear) calls; the dispatcher walks it by offset and
/// re-derives the base pointer per bucket, so appending while walking is
/// legal even across reallocation.
pub struct LocalPipe {
    words: Vec<u64>,
}

impl LocalPipe {
    /// Create an empty pipe.
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Create a pipe with `bytes` of reserved capacity.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            words: Vec::with_capacity(bytes.div_ceil(8)),
        }
    }

    /// Current content length in bytes.
    #[inline]
    pub fn len_bytes(&self) -> usize {
        self.words.len() * 8
    }

    /// True when no buckets are buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Base pointer of the buffer. Invalidated by any append.
    #[inline]
    pub fn base(&self) -> *const u8 {
        self.words.as_ptr() as *const u8
    }

    /// Mutable base pointer of the buffer. Invalidated by any append.
    #[inline]
    pub fn base_mut(&mut self) -> *mut u8 {
        self.words.as_mut_ptr() as *mut u8
    }

    /// Extend the buffer by `bytes` (a multiple of 8) and return the byte
    /// offset of the new region.
    pub fn alloc(&mut self, bytes: usize) -> usize {
        debug_assert!(bytes % 8 == 0, "bucket sizes are 8-byte units");
        let off = self.len_bytes();
        self.words.resize(self.words.len() + bytes / 8, 0);
        off
    }

    /// Append raw bucket bytes (length a multiple of 8).
    pub fn append_bytes(&mut self, bucket: &[u8]) {
        let off = self.alloc(bucket.len());
        unsafe {
            std::ptr::copy_nonoverlapping(bucket.as_ptr(), self.base_mut().add(off), bucket.len());
        }
    }

    /// Drop the first `bytes` of content, shifting the remainder to the
    /// front. Used when an outbound flush only partially completed.
    pub fn consume_front(&mut self, bytes: usize) {
        debug_assert!(bytes % 8 == 0);
        let words = bytes / 8;
        debug_assert!(words <= self.words.len());
        self.words.copy_within(words.., 0);
        self.words.truncate(self.words.len() - words);
    }

    /// Forget all content, keeping the allocation for reuse.
    pub fn clear(&mut self) {
        self.words.clear();
    }

    /// View of the content as raw bytes.
    pub fn bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.base(), self.len_bytes()) }
    }
}

impl Default for LocalPipe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_returns_sequential_offsets() {
        let mut pipe = LocalPipe::new();
        assert_eq!(pipe.alloc(16), 0);
        assert_eq!(pipe.alloc(24), 16);
        assert_eq!(pipe.len_bytes(), 40);
    }

    #[test]
    fn test_append_and_read_back() {
        let mut pipe = LocalPipe::new();
        let data = [7u8; 16];
        pipe.append_bytes(&data);
        assert_eq!(pipe.bytes(), &data);
    }

    #[test]
    fn test_consume_front_shifts_remainder() {
        let mut pipe = LocalPipe::new();
        pipe.append_bytes(&[1u8; 8]);
        pipe.append_bytes(&[2u8; 8]);
        pipe.append_bytes(&[3u8; 8]);
        pipe.consume_front(16);
        assert_eq!(pipe.bytes(), &[3u8; 8]);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut pipe = LocalPipe::with_capacity(64);
        pipe.append_bytes(&[0u8; 64]);
        let cap = pipe.words.capacity();
        pipe.clear();
        assert!(pipe.is_empty());
        assert_eq!(pipe.words.capacity(), cap);
    }

    #[test]
    fn test_base_is_word_aligned() {
        let mut pipe = LocalPipe::new();
        pipe.alloc(8);
        assert_eq!(pipe.base() as usize % 8, 0);
    }
}
