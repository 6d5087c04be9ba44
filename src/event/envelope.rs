//! Bit-exact event envelope layout and in-buffer construction helpers.
//!
//! Every event in the runtime, whether it crosses a shard boundary or not,
//! is stored as a *bucket*: a 16-byte header followed by the payload, with
//! the total size rounded up to 8-byte units. The header is `#[repr(C)]`
//! and naturally aligned so that it can be read straight out of a ring or
//! local pipe without any decoding step.

// Layer 1: Standard library imports
use std::alloc::Layout;
use std::mem;
use std::ptr;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::registry;
use super::traits::Event;
use crate::pipe::LocalPipe;
use crate::util::ActorId;

/// Envelope flag: the bucket carries a live event (clear for padding).
pub const FLAG_ALIVE: u16 = 1 << 0;
/// Envelope flag: deliver to every alive actor on the destination shard.
pub const FLAG_BROADCAST: u16 = 1 << 1;
/// Envelope flag: the payload is a heap pointer, not inline bytes.
pub const FLAG_LIVE_ALLOC: u16 = 1 << 2;

/// Bytes per bucket unit. `bucket_size` counts these.
pub const BUCKET_UNIT: usize = 8;
/// Size of the full envelope header in bytes.
pub const HEADER_BYTES: usize = 16;
/// Size of the short prefix (type id + bucket size + flags) in bytes.
///
/// Padding buckets carry only the prefix; their remaining bytes are dead.
pub const PREFIX_BYTES: usize = 8;

/// Fixed event prefix, identical for local and cross-shard delivery.
///
/// Field order is load-bearing: `type_id`, `bucket_size`, and `flags`
/// occupy the first 8 bytes so that a one-unit padding bucket is still
/// self-describing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct EventHeader {
    /// Process-run-stable type id, assigned at first use.
    pub type_id: u32,
    /// Total bucket size in 8-byte units, header included.
    pub bucket_size: u16,
    /// `FLAG_*` bits.
    pub flags: u16,
    /// Destination actor (or broadcast id).
    pub dest: ActorId,
    /// Originating actor; null for runtime-generated events.
    pub source: ActorId,
}

const _: () = assert!(mem::size_of::<EventHeader>() == HEADER_BYTES);
const _: () = assert!(mem::align_of::<EventHeader>() == 4);

impl EventHeader {
    /// True when the bucket carries a live event.
    pub fn is_alive(&self) -> bool {
        self.flags & FLAG_ALIVE != 0
    }

    /// True for broadcast envelopes.
    pub fn is_broadcast(&self) -> bool {
        self.flags & FLAG_BROADCAST != 0
    }

    /// True when the payload lives on the heap.
    pub fn is_live_alloc(&self) -> bool {
        self.flags & FLAG_LIVE_ALLOC != 0
    }

    /// Bucket length in bytes.
    pub fn bucket_bytes(&self) -> usize {
        self.bucket_size as usize * BUCKET_UNIT
    }

    /// Payload length in bytes (zero for the heap path's pointer slot is
    /// not included; this is the in-buffer byte count after the header).
    pub fn payload_bytes(&self) -> usize {
        self.bucket_bytes() - HEADER_BYTES
    }
}

/// Round a payload size up to the number of bucket units for a full bucket.
pub const fn bucket_units(payload_bytes: usize) -> usize {
    (HEADER_BYTES + payload_bytes + BUCKET_UNIT - 1) / BUCKET_UNIT
}

/// Bucket units used by the heap-pointer (`FLAG_LIVE_ALLOC`) path: header
/// plus one pointer-sized slot.
pub const LIVE_ALLOC_UNITS: usize = bucket_units(mem::size_of::<usize>());

/// Decide whether a payload must take the heap path.
///
/// Inline buckets require the payload to fit the `u16` bucket-size field,
/// stay under the configured inline ceiling (half the cross-shard ring
/// ceiling), and align to at most [`BUCKET_UNIT`] bytes.
pub(crate) fn needs_live_alloc(size: usize, align: usize, max_inline: usize) -> bool {
    align > BUCKET_UNIT || size > max_inline || bucket_units(size) > u16::MAX as usize
}

/// Read the short prefix at `ptr`.
///
/// # Safety
/// `ptr` must point at least [`PREFIX_BYTES`] readable bytes laid out as a
/// bucket prefix, 4-byte aligned.
#[inline]
pub(crate) unsafe fn read_prefix(ptr: *const u8) -> (u32, u16, u16) {
    let type_id = (ptr as *const u32).read();
    let bucket_size = (ptr.add(4) as *const u16).read();
    let flags = (ptr.add(6) as *const u16).read();
    (type_id, bucket_size, flags)
}

/// Read a full header at `ptr`.
///
/// # Safety
/// `ptr` must point at a live bucket with a full 16-byte header.
#[inline]
pub(crate) unsafe fn read_header(ptr: *const u8) -> EventHeader {
    (ptr as *const EventHeader).read()
}

/// Construct an event bucket in place at the tail of `pipe`.
///
/// The event is moved into the buffer (or onto the heap for oversized or
/// over-aligned payloads, with `FLAG_LIVE_ALLOC` set). Returns a pointer to
/// the constructed payload; it stays valid until the next append to the
/// same pipe for inline payloads, and until dispatch for heap payloads.
pub(crate) fn push_event<E: Event>(
    pipe: &mut LocalPipe,
    source: ActorId,
    dest: ActorId,
    mut flags: u16,
    event: E,
    max_inline: usize,
) -> *mut E {
    let type_id = registry::type_id_of::<E>();
    flags |= FLAG_ALIVE;
    if dest.is_broadcast() {
        flags |= FLAG_BROADCAST;
    }

    let size = mem::size_of::<E>();
    let align = mem::align_of::<E>();
    let boxed = needs_live_alloc(size, align, max_inline);
    let units = if boxed { LIVE_ALLOC_UNITS } else { bucket_units(size) };

    let off = pipe.alloc(units * BUCKET_UNIT);
    unsafe {
        let base = pipe.base_mut().add(off);
        let header = EventHeader {
            type_id,
            bucket_size: units as u16,
            flags: if boxed { flags | FLAG_LIVE_ALLOC } else { flags },
            dest,
            source,
        };
        (base as *mut EventHeader).write(header);
        let payload = base.add(HEADER_BYTES);
        if boxed {
            let heap = Box::into_raw(Box::new(event));
            (payload as *mut usize).write(heap as usize);
            heap
        } else {
            (payload as *mut E).write(event);
            payload as *mut E
        }
    }
}

/// Drop the payload of a bucket that will never reach a handler.
///
/// Runs the registered drop thunk exactly once and releases the heap shell
/// for `FLAG_LIVE_ALLOC` payloads. Padding and already-consumed buckets
/// (flags without `FLAG_ALIVE`) are ignored.
///
/// # Safety
/// `payload` must point at the bucket's payload bytes and the bucket must
/// not have been consumed already.
pub(crate) unsafe fn release_payload(header: &EventHeader, payload: *mut u8) {
    if !header.is_alive() {
        return;
    }
    let row = registry::row(header.type_id);
    if header.is_live_alloc() {
        let heap = (payload as *const usize).read() as *mut u8;
        (row.drop_fn)(heap);
        dealloc_shell(heap, row.size, row.align);
    } else {
        (row.drop_fn)(payload);
    }
}

/// Release the heap shell of a `FLAG_LIVE_ALLOC` payload whose value has
/// already been moved out (or dropped) by a handler thunk.
///
/// # Safety
/// `heap` must come from `Box::into_raw` of the payload type described by
/// `size`/`align`, and the value must already be consumed.
pub(crate) unsafe fn dealloc_shell(heap: *mut u8, size: usize, align: usize) {
    if size > 0 {
        std::alloc::dealloc(heap, Layout::from_size_align_unchecked(size, align));
    }
}

/// Walk the buckets of `pipe` from its start and release every live
/// payload. Used on shutdown paths where queued events will never be
/// dispatched.
pub(crate) fn release_all(pipe: &mut LocalPipe) {
    let mut off = 0;
    while off < pipe.len_bytes() {
        unsafe {
            let base = pipe.base_mut();
            let (_, bucket_size, flags) = read_prefix(base.add(off));
            let bytes = bucket_size as usize * BUCKET_UNIT;
            debug_assert!(bytes >= PREFIX_BYTES);
            if flags & FLAG_ALIVE != 0 {
                let header = read_header(base.add(off));
                release_payload(&header, base.add(off + HEADER_BYTES));
            }
            off += bytes;
        }
    }
    pipe.clear();
}

/// Copy-construct a value of the bucket's type at a fresh heap location.
///
/// Used by broadcast dispatch, which hands each receiver but the last its
/// own clone. Returns null when the type never registered a clone thunk.
///
/// # Safety
/// `src` must point at a valid payload value of the header's type.
pub(crate) unsafe fn clone_payload(header: &EventHeader, src: *const u8) -> *mut u8 {
    let row = registry::row(header.type_id);
    let Some(clone_fn) = row.clone_fn else {
        return ptr::null_mut();
    };
    let dst = if row.size == 0 {
        ptr::NonNull::<u8>::dangling().as_ptr()
    } else {
        let layout = Layout::from_size_align_unchecked(row.size, row.align);
        let dst = std::alloc::alloc(layout);
        if dst.is_null() {
            std::alloc::handle_alloc_error(layout);
        }
        dst
    };
    clone_fn(src, dst);
    dst
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Small {
        a: u32,
        b: u32,
    }

    impl Event for Small {
        const NAME: &'static str = "small";
    }

    #[derive(Debug, Clone)]
    struct Owning {
        data: Vec<u8>,
    }

    impl Event for Owning {
        const NAME: &'static str = "owning";
    }

    #[test]
    fn test_header_is_sixteen_bytes() {
        assert_eq!(mem::size_of::<EventHeader>(), 16);
    }

    #[test]
    fn test_bucket_units_rounding() {
        assert_eq!(bucket_units(0), 2);
        assert_eq!(bucket_units(1), 3);
        assert_eq!(bucket_units(8), 3);
        assert_eq!(bucket_units(9), 4);
        assert_eq!(bucket_units(240), 32);
    }

    #[test]
    fn test_push_and_read_back() {
        let mut pipe = LocalPipe::new();
        let dest = ActorId::new(4, 1);
        let src = ActorId::new(2, 0);
        push_event(&mut pipe, src, dest, 0, Small { a: 7, b: 9 }, 1 << 20);

        unsafe {
            let header = read_header(pipe.base_mut());
            assert_eq!(header.dest, dest);
            assert_eq!(header.source, src);
            assert!(header.is_alive());
            assert!(!header.is_live_alloc());
            assert_eq!(header.bucket_bytes(), pipe.len_bytes());
            let value = (pipe.base_mut().add(HEADER_BYTES) as *const Small).read();
            assert_eq!(value, Small { a: 7, b: 9 });
        }
    }

    #[test]
    fn test_broadcast_dest_sets_flag() {
        let mut pipe = LocalPipe::new();
        push_event(
            &mut pipe,
            ActorId::NULL,
            ActorId::broadcast(3),
            0,
            Small { a: 1, b: 2 },
            1 << 20,
        );
        let header = unsafe { read_header(pipe.base_mut()) };
        assert!(header.is_broadcast());
        // Drop the buffered payload so the test does not leak under miri.
        release_all(&mut pipe);
    }

    #[test]
    fn test_oversized_payload_goes_to_heap() {
        let mut pipe = LocalPipe::new();
        let big = Owning {
            data: vec![1u8; 64],
        };
        // Force the heap path with a tiny inline ceiling.
        push_event(&mut pipe, ActorId::NULL, ActorId::new(1, 0), 0, big, 8);
        let header = unsafe { read_header(pipe.base_mut()) };
        assert!(header.is_live_alloc());
        assert_eq!(header.bucket_size as usize, LIVE_ALLOC_UNITS);
        release_all(&mut pipe);
        assert_eq!(pipe.len_bytes(), 0);
    }

    #[test]
    fn test_release_all_drops_owning_payloads() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct CountsDrop(Arc<AtomicUsize>);
        impl Event for CountsDrop {
            const NAME: &'static str = "counts_drop";
        }
        impl Drop for CountsDrop {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let mut pipe = LocalPipe::new();
        push_event(
            &mut pipe,
            ActorId::NULL,
            ActorId::new(1, 0),
            0,
            CountsDrop(Arc::clone(&drops)),
            1 << 20,
        );
        push_event(
            &mut pipe,
            ActorId::NULL,
            ActorId::new(1, 0),
            0,
            CountsDrop(Arc::clone(&drops)),
            1 << 20,
        );
        release_all(&mut pipe);
        assert_eq!(drops.load(Ordering::Relaxed), 2);
    }
}
