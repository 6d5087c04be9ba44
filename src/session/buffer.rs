//! Contiguous grow-on-demand I/O buffer with front consumption.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// Byte buffer for session input/output: appended at the tail, consumed
/// from the head, always readable as one contiguous slice.
///
/// The head offset is compacted away lazily, once it dominates the
/// buffer, so steady-state streaming neither reallocates nor memmoves per
/// message.
pub struct IoBuf {
    data: Vec<u8>,
    head: usize,
}

/// Compact once at least this many bytes are dead at the front and the
/// dead prefix outweighs the live remainder.
const COMPACT_THRESHOLD: usize = 4096;

impl IoBuf {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            head: 0,
        }
    }

    /// The unconsumed bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[self.head..]
    }

    /// Unconsumed length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() - self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.data.len()
    }

    /// Append bytes at the tail.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Vec to append into directly (serialisers write here).
    pub fn append_vec(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    /// Drop `n` bytes from the front.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len());
        self.head += n;
        if self.head == self.data.len() {
            self.data.clear();
            self.head = 0;
        } else if self.head >= COMPACT_THRESHOLD && self.head * 2 >= self.data.len() {
            self.data.drain(..self.head);
            self.head = 0;
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
    }
}

impl Default for IoBuf {
    fn default() -> Self {
        Self::new()
    }
}
