//! Lock-free SPSC byte ring carrying variable-length event buckets.
//!
//! One ring exists per ordered pair of shards. The producer and consumer
//! each own a cache line for their index and keep a cached copy of the
//! other side's index, refreshing it from the shared atomic only when the
//! cached value says the ring is full (producer) or empty (consumer).
//!
//! Buckets never straddle the wrap point: when the space to the end of the
//! buffer is too short, the producer writes a padding bucket that fills it
//! and places the event at the buffer start. Growth is cooperative: the
//! producer allocates a doubled ring and publishes it to the consumer as a
//! growth bucket carrying the new ring; the consumer finishes the old ring
//! and switches.

// Layer 1: Standard library imports
use std::alloc::{self, Layout};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use crossbeam_utils::CachePadded;

// Layer 3: Internal module imports
use super::error::PipeError;
use crate::event::envelope::{self, BUCKET_UNIT, HEADER_BYTES, PREFIX_BYTES};
use crate::event::registry::{TYPE_GROW, TYPE_PADDING};

/// Bytes of a growth bucket: short prefix plus one pointer slot.
const GROW_BYTES: usize = PREFIX_BYTES + std::mem::size_of::<usize>();

/// Smallest ring the constructor will produce.
pub const MIN_CAPACITY: usize = 64;

struct RingCore {
    /// Producer-owned cache line.
    tail: CachePadded<AtomicUsize>,
    /// Consumer-owned cache line.
    head: CachePadded<AtomicUsize>,
    buf: *mut u8,
    cap: usize,
}

unsafe impl Send for RingCore {}
unsafe impl Sync for RingCore {}

impl RingCore {
    fn new(cap: usize) -> Self {
        debug_assert!(cap.is_power_of_two() && cap >= MIN_CAPACITY);
        // Power-of-two size, 64-byte alignment: always a valid layout.
        let layout = unsafe { Layout::from_size_align_unchecked(cap, 64) };
        let buf = unsafe { alloc::alloc(layout) };
        if buf.is_null() {
            alloc::handle_alloc_error(layout);
        }
        Self {
            tail: CachePadded::new(AtomicUsize::new(0)),
            head: CachePadded::new(AtomicUsize::new(0)),
            buf,
            cap,
        }
    }
}

impl Drop for RingCore {
    fn drop(&mut self) {
        unsafe {
            alloc::dealloc(
                self.buf,
                Layout::from_size_align_unchecked(self.cap, 64),
            );
        }
    }
}

/// Create a pipe with `initial` bytes of capacity, growable to `ceiling`.
///
/// Both values are rounded up to powers of two, with `initial` clamped to
/// at least [`MIN_CAPACITY`] and `ceiling` to at least `initial`.
pub fn channel(initial: usize, ceiling: usize) -> (PipeProducer, PipeConsumer) {
    let initial = initial.next_power_of_two().max(MIN_CAPACITY);
    let ceiling = ceiling.next_power_of_two().max(initial);
    let core = Arc::new(RingCore::new(initial));
    (
        PipeProducer {
            core: Arc::clone(&core),
            local_tail: 0,
            published: 0,
            cached_head: 0,
            ceiling,
        },
        PipeConsumer {
            core,
            local_head: 0,
            cached_tail: 0,
        },
    )
}

/// Producer endpoint, owned by the sending shard.
pub struct PipeProducer {
    core: Arc<RingCore>,
    local_tail: usize,
    published: usize,
    cached_head: usize,
    ceiling: usize,
}

impl PipeProducer {
    /// Bytes available without refreshing the consumer index.
    #[inline]
    fn free(&self) -> usize {
        self.core.cap - self.local_tail.wrapping_sub(self.cached_head)
    }

    /// Copy one complete bucket into the ring.
    ///
    /// Inserts a padding bucket when the event would straddle the wrap
    /// point, and grows the ring when full below the ceiling. The write is
    /// not visible to the consumer until [`publish`](Self::publish).
    pub fn write_bucket(&mut self, bucket: &[u8]) -> Result<(), PipeError> {
        let n = bucket.len();
        debug_assert!(n % BUCKET_UNIT == 0 && n >= HEADER_BYTES);
        if n + GROW_BYTES > self.ceiling {
            return Err(PipeError::Oversized {
                bytes: n,
                ceiling: self.ceiling,
            });
        }
        loop {
            let cap = self.core.cap;
            let offset = self.local_tail & (cap - 1);
            let space_to_end = cap - offset;
            let pad = if n > space_to_end { space_to_end } else { 0 };
            let need = n + pad;

            if self.free() < need {
                self.cached_head = self.core.head.load(Ordering::Acquire);
            }
            if self.free() >= need {
                unsafe {
                    if pad > 0 {
                        self.write_padding(offset, pad);
                        std::ptr::copy_nonoverlapping(bucket.as_ptr(), self.core.buf, n);
                    } else {
                        std::ptr::copy_nonoverlapping(
                            bucket.as_ptr(),
                            self.core.buf.add(offset),
                            n,
                        );
                    }
                }
                self.local_tail = self.local_tail.wrapping_add(need);
                return Ok(());
            }
            if cap < self.ceiling && self.try_grow(n) {
                continue;
            }
            return Err(PipeError::Full);
        }
    }

    /// Make all buckets written so far visible to the consumer.
    #[inline]
    pub fn publish(&mut self) {
        if self.local_tail != self.published {
            self.core.tail.store(self.local_tail, Ordering::Release);
            self.published = self.local_tail;
        }
    }

    /// Current ring capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.core.cap
    }

    /// Configured growth ceiling in bytes.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    unsafe fn write_padding(&mut self, offset: usize, pad: usize) {
        debug_assert!(pad % BUCKET_UNIT == 0 && pad / BUCKET_UNIT <= u16::MAX as usize);
        let p = self.core.buf.add(offset);
        (p as *mut u32).write(TYPE_PADDING);
        (p.add(4) as *mut u16).write((pad / BUCKET_UNIT) as u16);
        (p.add(6) as *mut u16).write(0);
    }

    /// Allocate a doubled ring and hand it to the consumer through a
    /// growth bucket. Returns false when not even the growth bucket fits
    /// right now (the consumer will free space eventually).
    fn try_grow(&mut self, upcoming: usize) -> bool {
        let cap = self.core.cap;
        let offset = self.local_tail & (cap - 1);
        let space_to_end = cap - offset;
        let pad = if GROW_BYTES > space_to_end { space_to_end } else { 0 };
        if self.free() < pad + GROW_BYTES {
            return false;
        }
        let new_cap = (cap * 2)
            .max((upcoming * 2).next_power_of_two())
            .min(self.ceiling);
        if new_cap <= cap {
            return false;
        }
        let new_core = Arc::new(RingCore::new(new_cap));
        unsafe {
            let (base, grow_off) = if pad > 0 {
                self.write_padding(offset, pad);
                (self.core.buf, 0)
            } else {
                (self.core.buf, offset)
            };
            let p = base.add(grow_off);
            (p as *mut u32).write(TYPE_GROW);
            (p.add(4) as *mut u16).write((GROW_BYTES / BUCKET_UNIT) as u16);
            (p.add(6) as *mut u16).write(0);
            let raw = Arc::into_raw(Arc::clone(&new_core)) as usize;
            (p.add(PREFIX_BYTES) as *mut usize).write(raw);
        }
        self.local_tail = self.local_tail.wrapping_add(pad + GROW_BYTES);
        // The growth bucket must be visible before anything lands in the
        // new ring, so publish the old ring's tail now.
        self.core.tail.store(self.local_tail, Ordering::Release);
        self.core = new_core;
        self.local_tail = 0;
        self.published = 0;
        self.cached_head = 0;
        true
    }

    #[cfg(test)]
    fn tail_offset(&self) -> usize {
        self.local_tail & (self.core.cap - 1)
    }
}

/// Consumer endpoint, owned by the receiving shard.
pub struct PipeConsumer {
    core: Arc<RingCore>,
    local_head: usize,
    cached_tail: usize,
}

impl PipeConsumer {
    /// Drain up to `max_events` buckets (or `max_bytes`, whichever caps
    /// first), invoking `f` with each complete bucket. The producer index
    /// is acquired once per pass and the consumer index released once at
    /// the end of the batch.
    ///
    /// Returns the number of event buckets handed to `f`.
    pub fn drain(&mut self, max_events: usize, max_bytes: usize, f: &mut dyn FnMut(&[u8])) -> usize {
        let mut events = 0;
        let mut bytes = 0;
        loop {
            if self.local_head == self.cached_tail {
                self.cached_tail = self.core.tail.load(Ordering::Acquire);
                if self.local_head == self.cached_tail {
                    break;
                }
            }
            let offset = self.local_head & (self.core.cap - 1);
            unsafe {
                let p = self.core.buf.add(offset);
                let (type_id, bucket_size, _) = envelope::read_prefix(p);
                let bsz = bucket_size as usize * BUCKET_UNIT;
                debug_assert!(bsz >= PREFIX_BYTES && offset + bsz <= self.core.cap);
                match type_id {
                    TYPE_PADDING => {
                        self.local_head = self.local_head.wrapping_add(bsz);
                    }
                    TYPE_GROW => {
                        let raw =
                            (p.add(PREFIX_BYTES) as *const usize).read() as *const RingCore;
                        self.local_head = self.local_head.wrapping_add(bsz);
                        self.core.head.store(self.local_head, Ordering::Release);
                        self.core = Arc::from_raw(raw);
                        self.local_head = 0;
                        self.cached_tail = 0;
                    }
                    _ => {
                        if events >= max_events || (events > 0 && bytes + bsz > max_bytes) {
                            break;
                        }
                        f(std::slice::from_raw_parts(p, bsz));
                        self.local_head = self.local_head.wrapping_add(bsz);
                        events += 1;
                        bytes += bsz;
                    }
                }
            }
        }
        self.core.head.store(self.local_head, Ordering::Release);
        events
    }

    /// Current ring capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.core.cap
    }

    /// True when published buckets are waiting. Refreshes the cached
    /// producer index at most once.
    pub fn has_pending(&mut self) -> bool {
        if self.local_head != self.cached_tail {
            return true;
        }
        self.cached_tail = self.core.tail.load(Ordering::Acquire);
        self.local_head != self.cached_tail
    }
}

impl Drop for PipeConsumer {
    /// Release the payload of every published-but-undrained bucket so that
    /// owning payloads are not leaked on shutdown.
    fn drop(&mut self) {
        loop {
            let tail = self.core.tail.load(Ordering::Acquire);
            if self.local_head == tail {
                break;
            }
            let offset = self.local_head & (self.core.cap - 1);
            unsafe {
                let p = self.core.buf.add(offset);
                let (type_id, bucket_size, _) = envelope::read_prefix(p);
                let bsz = bucket_size as usize * BUCKET_UNIT;
                match type_id {
                    TYPE_PADDING => {
                        self.local_head = self.local_head.wrapping_add(bsz);
                    }
                    TYPE_GROW => {
                        let raw =
                            (p.add(PREFIX_BYTES) as *const usize).read() as *const RingCore;
                        self.local_head = self.local_head.wrapping_add(bsz);
                        self.core.head.store(self.local_head, Ordering::Release);
                        self.core = Arc::from_raw(raw);
                        self.local_head = 0;
                    }
                    _ => {
                        let header = envelope::read_header(p);
                        envelope::release_payload(&header, p.add(HEADER_BYTES));
                        self.local_head = self.local_head.wrapping_add(bsz);
                    }
                }
            }
        }
        self.core.head.store(self.local_head, Ordering::Release);
    }
}
