//! Span nodes and the per-metric span store.
//!
//! Spans live in an arena indexed by [`SpanId`]. A node refers to its parent
//! by id, so the parent link is a plain back-reference and the store alone
//! decides lifetimes. Child lists are filled as children close, and by
//! root-climbing at report time for ancestors that never closed.

use super::pool::LeafPool;
use std::sync::Arc;

/// Index of a span inside its metric's [`SpanStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId(usize);

impl SpanId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Measurement state of a span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanState {
    /// Start sample taken, scope still running
    Open,
    /// End sample taken, delta final, span is in the leaf pool
    Closed,
    /// End sample could not be taken; delta is zero and the span is not pooled
    Failed,
}

/// One scope instance measured for one metric
#[derive(Debug, Clone)]
pub struct SpanNode {
    name: Arc<str>,
    parent: Option<SpanId>,
    children: Vec<SpanId>,
    start: f64,
    end: f64,
    delta: f64,
    state: SpanState,
    attached: bool,
}

impl SpanNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<SpanId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Children in the order they were attached
    pub fn children(&self) -> &[SpanId] {
        &self.children
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn state(&self) -> SpanState {
        self.state
    }

    /// Whether this span sits in its parent's child list
    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

/// Arena of all spans recorded for one metric, plus its leaf pool
#[derive(Debug, Default)]
pub struct SpanStore {
    nodes: Vec<SpanNode>,
    pool: LeafPool,
}

impl SpanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an open span under `parent`
    pub fn open(&mut self, name: Arc<str>, parent: Option<SpanId>, start: f64) -> SpanId {
        let id = SpanId(self.nodes.len());
        self.nodes.push(SpanNode {
            name,
            parent,
            children: Vec::new(),
            start,
            end: start,
            delta: 0.0,
            state: SpanState::Open,
            attached: false,
        });
        id
    }

    /// Record the end sample, fix the delta and hand the span to the pool
    pub fn close(&mut self, id: SpanId, end: f64) {
        let node = &mut self.nodes[id.0];
        debug_assert_eq!(node.state, SpanState::Open, "span {:?} closed twice", id);

        node.end = end;
        node.delta = end - node.start;
        node.state = SpanState::Closed;
        let delta = node.delta;

        self.pool.insert(id, delta);
        self.attach(id);
    }

    /// Close a span whose end sample failed
    pub fn fail(&mut self, id: SpanId) {
        let node = &mut self.nodes[id.0];
        debug_assert_eq!(node.state, SpanState::Open, "span {:?} closed twice", id);

        node.end = node.start;
        node.delta = 0.0;
        node.state = SpanState::Failed;

        self.attach(id);
    }

    /// Put `id` into its parent's child list.
    ///
    /// Returns `true` only the first time; roots and already attached spans
    /// are left untouched.
    pub fn attach(&mut self, id: SpanId) -> bool {
        let node = &mut self.nodes[id.0];
        let parent = match node.parent {
            Some(parent) if !node.attached => parent,
            _ => return false,
        };
        node.attached = true;

        self.nodes[parent.0].children.push(id);
        true
    }

    /// Panics if `id` was not minted by this store
    pub fn node(&self, id: SpanId) -> &SpanNode {
        &self.nodes[id.0]
    }

    pub fn pop_max(&mut self) -> Option<SpanId> {
        self.pool.pop_max()
    }

    pub fn pool(&self) -> &LeafPool {
        &self.pool
    }

    /// Number of spans ever opened
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
