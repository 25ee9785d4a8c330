//! Thread-local "current span" slots.
//!
//! Each thread keeps, per metric, the span that the next scope on that
//! thread should attach to. Opening a scope swaps its span into the slot;
//! closing restores whatever the slot held before. Threads never see each
//! other's slots, so unrelated call stacks never attach spans to each
//! other's trees.

use super::node::SpanId;
use log::error;
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a recorded metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricId(u64);

impl MetricId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

thread_local! {
    static CURRENT: RefCell<HashMap<MetricId, SpanId>> = RefCell::new(HashMap::new());
}

/// Proof that a slot was entered; hand it back to [`exit`].
///
/// Not `Send`: a slot can only be restored on the thread that changed it.
#[must_use = "a slot token must be passed to context::exit"]
#[derive(Debug)]
pub struct SlotToken {
    metric: MetricId,
    node: SpanId,
    previous: Option<SpanId>,
    _thread_bound: PhantomData<*const ()>,
}

impl SlotToken {
    pub fn metric(&self) -> MetricId {
        self.metric
    }

    /// Span now held by the slot
    pub fn node(&self) -> SpanId {
        self.node
    }

    /// Span the slot held before, restored on exit
    pub fn previous(&self) -> Option<SpanId> {
        self.previous
    }
}

/// Span currently open for `metric` on this thread
pub fn current(metric: MetricId) -> Option<SpanId> {
    CURRENT.with(|slots| slots.borrow().get(&metric).copied())
}

/// Make a span current for `metric`.
///
/// `open` receives the span currently in the slot (the new span's parent)
/// and returns the span to install.
pub fn enter(metric: MetricId, open: impl FnOnce(Option<SpanId>) -> SpanId) -> SlotToken {
    let previous = current(metric);
    let node = open(previous);

    CURRENT.with(|slots| {
        slots.borrow_mut().insert(metric, node);
    });

    SlotToken {
        metric,
        node,
        previous,
        _thread_bound: PhantomData,
    }
}

/// Restore the slot to its value before the matching [`enter`].
///
/// # Panics
///
/// If the slot no longer holds the token's span, i.e. scopes were closed
/// out of nesting order. While the thread is already unwinding the
/// violation is logged instead.
pub fn exit(token: SlotToken) {
    CURRENT.with(|slots| {
        let mut slots = slots.borrow_mut();
        let held = slots.get(&token.metric).copied();

        if held != Some(token.node) {
            if std::thread::panicking() {
                error!(
                    "Span {:?} closed out of nesting order (slot holds {:?})",
                    token.node, held
                );
            } else {
                panic!(
                    "span {:?} closed out of nesting order (slot holds {:?})",
                    token.node, held
                );
            }
        }

        match token.previous {
            Some(previous) => {
                slots.insert(token.metric, previous);
            }
            None => {
                slots.remove(&token.metric);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_exit_restores_previous() {
        let metric = MetricId::next();
        assert_eq!(current(metric), None);

        let outer = enter(metric, |parent| {
            assert_eq!(parent, None);
            SpanId::new(1)
        });
        let inner = enter(metric, |parent| {
            assert_eq!(parent, Some(SpanId::new(1)));
            SpanId::new(2)
        });
        assert_eq!(current(metric), Some(SpanId::new(2)));
        assert_eq!(inner.previous(), Some(SpanId::new(1)));

        exit(inner);
        assert_eq!(current(metric), Some(SpanId::new(1)));
        exit(outer);
        assert_eq!(current(metric), None);
    }

    #[test]
    fn test_metrics_have_independent_slots() {
        let a = MetricId::next();
        let b = MetricId::next();
        assert_ne!(a, b);

        let token = enter(a, |_| SpanId::new(7));
        assert_eq!(current(a), Some(SpanId::new(7)));
        assert_eq!(current(b), None);
        exit(token);
    }

    #[test]
    fn test_threads_have_independent_slots() {
        let metric = MetricId::next();
        let token = enter(metric, |_| SpanId::new(3));

        std::thread::spawn(move || {
            assert_eq!(current(metric), None);
        })
        .join()
        .unwrap();

        exit(token);
    }

    #[test]
    #[should_panic(expected = "out of nesting order")]
    fn test_out_of_order_exit_panics() {
        let metric = MetricId::next();
        let outer = enter(metric, |_| SpanId::new(1));
        let _inner = enter(metric, |_| SpanId::new(2));
        exit(outer);
    }
}
