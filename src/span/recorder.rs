//! Per-metric span recording.
//!
//! A recorder ties a metric definition to its span store and to its
//! thread-local context slot. Sampling happens outside the store lock; the
//! lock is only held to allocate a node at open and to pool it at close.
//! Everything between the samples runs inside [`alloc::untracked`], so the
//! recorder's own bookkeeping never shows up in the memory metric.

use super::context::{self, MetricId, SlotToken};
use super::node::{SpanId, SpanStore};
use crate::metric::{alloc, MetricDef};
use log::{trace, warn};
use std::sync::{Arc, Mutex, MutexGuard};

/// Records spans of one metric
#[derive(Debug)]
pub struct MetricRecorder {
    id: MetricId,
    metric: Arc<MetricDef>,
    store: Mutex<SpanStore>,
}

impl MetricRecorder {
    pub fn new(metric: Arc<MetricDef>) -> Self {
        Self {
            id: MetricId::next(),
            metric,
            store: Mutex::new(SpanStore::new()),
        }
    }

    pub fn id(&self) -> MetricId {
        self.id
    }

    pub fn metric(&self) -> &MetricDef {
        &self.metric
    }

    /// Lock the span store, recovering it if another thread panicked while
    /// holding it
    pub fn lock(&self) -> MutexGuard<'_, SpanStore> {
        self.store.lock().unwrap_or_else(|poisoned| {
            warn!(
                "Span store for metric '{}' was poisoned; recovering",
                self.metric.name()
            );
            poisoned.into_inner()
        })
    }

    /// Span currently open for this metric on the calling thread
    pub fn current(&self) -> Option<SpanId> {
        context::current(self.id)
    }

    /// Open a span named `name` under the current span of this thread.
    ///
    /// Returns `None` when the start sample cannot be taken; the scope then
    /// goes unrecorded for this metric only.
    pub fn enter(&self, name: &Arc<str>) -> Option<OpenSpan<'_>> {
        let start = self.metric.sample()?;
        let token = alloc::untracked(|| {
            let token = context::enter(self.id, |parent| {
                self.lock().open(Arc::clone(name), parent, start)
            });
            trace!(
                "Opened span {:?} '{}' for metric '{}'",
                token.node(),
                name,
                self.metric.name()
            );
            token
        });

        Some(OpenSpan {
            recorder: self,
            token: Some(token),
        })
    }

    /// Make `node` the current span on this thread until the token is exited
    pub(crate) fn adopt(&self, node: SpanId) -> SlotToken {
        alloc::untracked(|| context::enter(self.id, |_| node))
    }
}

impl Drop for MetricRecorder {
    fn drop(&mut self) {
        let store = match self.store.get_mut() {
            Ok(store) => std::mem::take(store),
            Err(poisoned) => std::mem::take(poisoned.into_inner()),
        };
        alloc::untracked(|| drop(store));
    }
}

/// A span that closes itself when dropped
#[must_use = "dropping an OpenSpan closes it immediately"]
#[derive(Debug)]
pub struct OpenSpan<'a> {
    recorder: &'a MetricRecorder,
    token: Option<SlotToken>,
}

impl OpenSpan<'_> {
    pub fn id(&self) -> Option<SpanId> {
        self.token.as_ref().map(SlotToken::node)
    }
}

impl Drop for OpenSpan<'_> {
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };

        let end = self.recorder.metric.sample();
        alloc::untracked(|| {
            {
                let mut store = self.recorder.lock();
                match end {
                    Some(end) => store.close(token.node(), end),
                    None => store.fail(token.node()),
                }
            }

            context::exit(token);
        });
    }
}
