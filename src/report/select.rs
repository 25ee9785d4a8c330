//! Top-K root selection.
//!
//! Pull the heaviest spans out of the leaf pool one at a time, climb from
//! each to its root, and keep the first K distinct roots. Roots therefore
//! come out ordered by the delta of the span that discovered them, not by
//! their own delta.

use crate::span::{SpanId, SpanState, SpanStore};
use log::{debug, warn};
use std::collections::HashSet;

/// Select up to `k` distinct roots from the store's leaf pool
///
/// Every span popped here is consumed; a later selection on the same store
/// only sees what is left in the pool.
pub fn select_roots(store: &mut SpanStore, k: usize) -> Vec<SpanId> {
    let mut roots = Vec::with_capacity(k.min(store.pool().len()));
    let mut seen = HashSet::new();

    while roots.len() < k {
        let Some(leaf) = store.pop_max() else {
            debug!("Leaf pool exhausted after {} roots", roots.len());
            break;
        };

        let root = climb_to_root(store, leaf);
        if seen.insert(root) {
            roots.push(root);
        }
    }

    roots
}

/// Walk parent links from `id` up to its root, attaching every span on the
/// way to its parent's child list
pub fn climb_to_root(store: &mut SpanStore, id: SpanId) -> SpanId {
    let mut current = id;

    loop {
        if store.attach(current) && store.node(current).state() == SpanState::Open {
            warn!(
                "Span '{}' was still open at report time; its delta is reported as 0",
                store.node(current).name()
            );
        }

        match store.node(current).parent() {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}
