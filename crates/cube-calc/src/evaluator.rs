use crate::agg::{AggregatorRegistry, Rollup};
use crate::calc::ExpId;
use crate::config::EngineConfig;
use crate::context::{CellReader, SchemaReader};
use crate::expr::AggKind;
use crate::set::{TupleBuf, TupleList};
use crate::value::{CellValue, SortKey};
use ahash::AHashMap;
use cube_model::{HierarchyId, MemberId};
use std::hash::{Hash, Hasher};

/// An undo-log mark returned by [`Evaluator::savepoint`].
///
/// Restoring a savepoint reproduces the coordinate exactly as it was when the
/// savepoint was taken, regardless of how many `set_context` calls happened
/// in between.
#[derive(Clone, Copy, Debug)]
#[must_use]
pub struct Savepoint {
    mark: usize,
}

struct Frame {
    undo_mark: usize,
    non_empty: bool,
    agg_depth: usize,
}

/// Memoized projections of a set expression, keyed by (expression,
/// coordinate) in [`Evaluator::cached_set`]. Built by the Rank layer.
pub(crate) enum CachedSet {
    /// Identity → 0-based position in set order.
    PositionIndex(AHashMap<TupleBuf, usize>),
    /// Keys of every element, sorted descending, non-concrete keys last.
    SortedKeys(Vec<SortKey>),
}

/// Mutable evaluation context for one in-flight query.
///
/// Single-threaded by design: nested evaluation is expressed as push/pop and
/// savepoint/restore within one thread, never as concurrent tasks. The
/// schema collaborator is read-only and shareable; everything else in here is
/// exclusively owned by one evaluation.
pub struct Evaluator<'a> {
    schema: &'a dyn SchemaReader,
    cells: &'a dyn CellReader,
    config: &'a EngineConfig,
    aggregators: Option<&'a AggregatorRegistry>,
    coord: Vec<MemberId>,
    undo: Vec<(usize, MemberId)>,
    frames: Vec<Frame>,
    non_empty: bool,
    misses: u64,
    measures: Vec<MemberId>,
    agg_contexts: Vec<TupleList>,
    exp_cache: AHashMap<(ExpId, u64), CachedSet>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        schema: &'a dyn SchemaReader,
        cells: &'a dyn CellReader,
        config: &'a EngineConfig,
    ) -> Self {
        let coord = (0..schema.hierarchy_count())
            .map(|h| schema.default_member_of(HierarchyId::from_index(h)))
            .collect();
        Self {
            schema,
            cells,
            config,
            aggregators: None,
            coord,
            undo: Vec::new(),
            frames: Vec::new(),
            non_empty: false,
            misses: 0,
            measures: Vec::new(),
            agg_contexts: Vec::new(),
            exp_cache: AHashMap::new(),
        }
    }

    pub fn schema(&self) -> &'a dyn SchemaReader {
        self.schema
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    /// Installs the rollup operators for this evaluation. Without a registry
    /// every generic aggregate yields the no-aggregator cell error.
    pub fn set_aggregators(&mut self, registry: &'a AggregatorRegistry) {
        self.aggregators = Some(registry);
    }

    pub fn aggregator_for(&self, kind: AggKind) -> Option<&'a dyn Rollup> {
        self.aggregators.and_then(|r| r.get(kind))
    }

    /// The current coordinate: one member per hierarchy, indexed by hierarchy.
    pub fn coordinate(&self) -> &[MemberId] {
        &self.coord
    }

    pub fn current_member(&self, hierarchy: HierarchyId) -> MemberId {
        self.coord[hierarchy.index()]
    }

    /// Moves the current layer's coordinate along the member's hierarchy only.
    pub fn set_context_member(&mut self, member: MemberId) {
        let slot = self.schema.hierarchy_of(member).index();
        let previous = self.coord[slot];
        if previous != member {
            self.undo.push((slot, previous));
            self.coord[slot] = member;
        }
    }

    /// Moves the coordinate along each hierarchy the tuple mentions.
    pub fn set_context_tuple(&mut self, tuple: &[MemberId]) {
        for &member in tuple {
            self.set_context_member(member);
        }
    }

    /// Opens a nested context layer. Must be balanced by [`Evaluator::pop`];
    /// violating nesting is a programming error.
    pub fn push(&mut self) {
        self.frames.push(Frame {
            undo_mark: self.undo.len(),
            non_empty: self.non_empty,
            agg_depth: self.agg_contexts.len(),
        });
    }

    pub fn pop(&mut self) {
        let frame = self
            .frames
            .pop()
            .expect("context pop without matching push");
        self.rollback_to(frame.undo_mark);
        self.non_empty = frame.non_empty;
        self.agg_contexts.truncate(frame.agg_depth);
    }

    /// Marks the current coordinate; cheap and non-allocating in steady state.
    pub fn savepoint(&self) -> Savepoint {
        Savepoint {
            mark: self.undo.len(),
        }
    }

    /// Undoes every `set_context` since the savepoint was taken.
    pub fn restore(&mut self, savepoint: Savepoint) {
        debug_assert!(
            savepoint.mark <= self.undo.len(),
            "savepoint restored out of order"
        );
        self.rollback_to(savepoint.mark);
    }

    fn rollback_to(&mut self, mark: usize) {
        while self.undo.len() > mark {
            let (slot, previous) = self.undo.pop().expect("undo log underflow");
            self.coord[slot] = previous;
        }
    }

    pub fn non_empty(&self) -> bool {
        self.non_empty
    }

    pub fn set_non_empty(&mut self, non_empty: bool) {
        self.non_empty = non_empty;
    }

    /// Count of cell reads that came back [`CellValue::Pending`] so far.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// The measures participating in the current query; non-empty pruning
    /// probes each of them, not just the first.
    pub fn set_measures(&mut self, measures: Vec<MemberId>) {
        self.measures = measures;
    }

    pub fn measures(&self) -> &[MemberId] {
        &self.measures
    }

    /// Evaluates the cell at the current coordinate. Not a pure function:
    /// the storage collaborator may answer [`CellValue::Pending`] instead of
    /// blocking, in which case the miss counter advances.
    pub fn evaluate_current_cell(&mut self) -> CellValue {
        let value = self.cells.cell_value(&self.coord);
        if value.is_pending() {
            self.misses += 1;
        }
        value
    }

    /// Hands a reduced predicate list to the storage layer as a deferred
    /// aggregation: distinct-count style aggregates need the whole member
    /// collection at once, not a per-element fold.
    pub fn evaluate_deferred_aggregate(&mut self, predicates: TupleList) -> CellValue {
        self.agg_contexts.push(predicates);
        let value = self
            .cells
            .aggregated_value(&self.coord, self.agg_contexts.last().expect("just pushed"));
        if value.is_pending() {
            self.misses += 1;
        }
        self.agg_contexts.pop();
        value
    }

    /// Hash of the full current coordinate; memoization key component for
    /// per-context caches.
    pub fn coordinate_hash(&self) -> u64 {
        let mut hasher = ahash::AHasher::default();
        self.coord.hash(&mut hasher);
        hasher.finish()
    }

    pub(crate) fn cached_set(&self, id: ExpId, context: u64) -> Option<&CachedSet> {
        self.exp_cache.get(&(id, context))
    }

    pub(crate) fn cache_set(&mut self, id: ExpId, context: u64, set: CachedSet) {
        self.exp_cache.insert((id, context), set);
    }
}
