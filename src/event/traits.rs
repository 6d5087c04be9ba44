//! The `Event` marker trait implemented by every message type.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// Marker trait for types that can travel through the runtime as events.
///
/// Events are delivered by value: the handler takes ownership, so every
/// `Send + 'static` type qualifies, including types owning heap state.
/// Events that cross a shard boundary are moved by byte copy into the
/// destination shard's ring, which is exactly Rust move semantics; the
/// source copy is forgotten, the destination copy is either handed to a
/// handler or dropped exactly once by the dispatcher.
///
/// Broadcast additionally requires `Clone` (each alive actor on the target
/// shard receives its own copy); the bound is enforced at the broadcast
/// call site, not here.
///
/// # Example
/// ```rust
/// use coreactor::event::Event;
///
/// #[derive(Debug, Clone)]
/// struct PriceUpdate {
///     symbol: [u8; 8],
///     price: f64,
/// }
///
/// impl Event for PriceUpdate {
///     const NAME: &'static str = "price_update";
/// }
/// ```
pub trait Event: Send + 'static {
    /// Human-readable event name, used in logs and diagnostics.
    const NAME: &'static str;
}
