//! Process-global event type registry.
//!
//! Type ids are assigned by an atomic counter the first time a type is
//! pushed or registered, which sidesteps any link-order dependence. Ids are
//! stable for the lifetime of the process but not across runs; wire formats
//! needing stable ids must layer their own schema on top.

// Layer 1: Standard library imports
use std::any::TypeId;
use std::mem;
use std::ptr;
use std::sync::OnceLock;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use parking_lot::RwLock;

// Layer 3: Internal module imports
use super::traits::Event;

/// Reserved type id for ring padding buckets.
pub(crate) const TYPE_PADDING: u32 = 0;
/// Reserved type id for ring growth buckets.
pub(crate) const TYPE_GROW: u32 = 1;

/// Per-type dispatch metadata, copied out of the registry on each lookup.
#[derive(Clone, Copy)]
pub(crate) struct TypeRow {
    /// Payload size in bytes.
    pub size: usize,
    /// Payload alignment in bytes.
    pub align: usize,
    /// Drops a payload value in place.
    pub drop_fn: unsafe fn(*mut u8),
    /// Copy-constructs the payload at `dst`; present only for types that
    /// have been broadcast at least once.
    pub clone_fn: Option<unsafe fn(*const u8, *mut u8)>,
    /// Diagnostic name (`Event::NAME`).
    pub name: &'static str,
}

struct Registry {
    ids: DashMap<TypeId, u32>,
    rows: RwLock<Vec<TypeRow>>,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let reserved = TypeRow {
            size: 0,
            align: 1,
            drop_fn: drop_thunk::<()>,
            clone_fn: None,
            name: "<reserved>",
        };
        Registry {
            ids: DashMap::new(),
            // Rows 0 and 1 back the padding and growth buckets.
            rows: RwLock::new(vec![reserved, reserved]),
        }
    })
}

unsafe fn drop_thunk<E>(p: *mut u8) {
    ptr::drop_in_place(p as *mut E);
}

unsafe fn clone_thunk<E: Clone>(src: *const u8, dst: *mut u8) {
    let value = (*(src as *const E)).clone();
    (dst as *mut E).write(value);
}

/// The process-run-stable type id for `E`, assigning one on first use.
pub fn type_id_of<E: Event>() -> u32 {
    let reg = registry();
    if let Some(id) = reg.ids.get(&TypeId::of::<E>()) {
        return *id;
    }
    // Slow path: allocate the id under the row lock so that an id is always
    // a valid index into `rows`.
    let mut rows = reg.rows.write();
    match reg.ids.entry(TypeId::of::<E>()) {
        dashmap::mapref::entry::Entry::Occupied(e) => *e.get(),
        dashmap::mapref::entry::Entry::Vacant(v) => {
            let id = rows.len() as u32;
            rows.push(TypeRow {
                size: mem::size_of::<E>(),
                align: mem::align_of::<E>(),
                drop_fn: drop_thunk::<E>,
                clone_fn: None,
                name: E::NAME,
            });
            v.insert(id);
            id
        }
    }
}

/// Record the clone thunk for `E`, enabling broadcast fan-out of the type.
pub(crate) fn ensure_clone<E: Event + Clone>() -> u32 {
    let id = type_id_of::<E>();
    let reg = registry();
    let mut rows = reg.rows.write();
    let row = &mut rows[id as usize];
    if row.clone_fn.is_none() {
        row.clone_fn = Some(clone_thunk::<E>);
    }
    id
}

/// Copy out the dispatch metadata for a type id.
///
/// Ids handed out by [`type_id_of`] are always valid; the reserved ids
/// resolve to an inert row.
pub(crate) fn row(type_id: u32) -> TypeRow {
    registry().rows.read()[type_id as usize]
}

/// Diagnostic name for a type id, for log lines on dispatch misses.
pub(crate) fn name_of(type_id: u32) -> &'static str {
    let rows = registry().rows.read();
    rows.get(type_id as usize).map_or("<unknown>", |r| r.name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Alpha;
    impl Event for Alpha {
        const NAME: &'static str = "alpha";
    }

    #[derive(Debug, Clone)]
    struct Beta(#[allow(dead_code)] u64);
    impl Event for Beta {
        const NAME: &'static str = "beta";
    }

    #[test]
    fn test_ids_are_stable_within_a_run() {
        let a1 = type_id_of::<Alpha>();
        let a2 = type_id_of::<Alpha>();
        assert_eq!(a1, a2);
    }

    #[test]
    fn test_distinct_types_get_distinct_ids() {
        assert_ne!(type_id_of::<Alpha>(), type_id_of::<Beta>());
    }

    #[test]
    fn test_ids_skip_reserved_range() {
        assert!(type_id_of::<Alpha>() >= 2);
        assert!(type_id_of::<Beta>() >= 2);
    }

    #[test]
    fn test_row_metadata() {
        let id = type_id_of::<Beta>();
        let row = row(id);
        assert_eq!(row.size, mem::size_of::<Beta>());
        assert_eq!(row.align, mem::align_of::<Beta>());
        assert_eq!(row.name, "beta");
    }

    #[test]
    fn test_clone_thunk_registered_on_demand() {
        let id = type_id_of::<Alpha>();
        // A plain send never records a clone thunk.
        // (Another test may have broadcast Alpha already; use a local type.)
        #[derive(Clone)]
        struct OnlyHere;
        impl Event for OnlyHere {
            const NAME: &'static str = "only_here";
        }
        let fresh = type_id_of::<OnlyHere>();
        assert!(row(fresh).clone_fn.is_none());
        let same = ensure_clone::<OnlyHere>();
        assert_eq!(same, fresh);
        assert!(row(fresh).clone_fn.is_some());
        let _ = id;
    }

    #[test]
    fn test_concurrent_assignment_is_unique() {
        use std::collections::HashSet;
        use std::thread;

        #[derive(Clone)]
        struct Gamma;
        impl Event for Gamma {
            const NAME: &'static str = "gamma";
        }

        let ids: Vec<u32> = thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(type_id_of::<Gamma>)).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        let unique: HashSet<u32> = ids.iter().copied().collect();
        assert_eq!(unique.len(), 1);
    }

    #[test]
    fn test_name_of_unknown_id() {
        assert_eq!(name_of(u32::MAX), "<unknown>");
    }
}
