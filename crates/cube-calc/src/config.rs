/// Tuning knobs for one engine instance.
///
/// Threaded explicitly into [`crate::Compiler`] and [`crate::Evaluator`]
/// construction; there are no process-wide statics.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Hard cap on the flat size of a cross-join product. The product size is
    /// computed in 64-bit before any allocation; exceeding the cap raises
    /// [`crate::CalcError::ResourceLimit`].
    pub crossjoin_result_limit: u64,

    /// Non-empty pruning kicks in only when one side of a cross join is
    /// larger than this, so small products skip the probing pass entirely.
    pub nonempty_optimize_threshold: usize,

    /// When at least this many pruning probes came back [`crate::CellValue::Pending`]
    /// and the pruned product is still above `nonempty_optimize_threshold`,
    /// the evaluation returns an empty result so the caller can retry after
    /// the cache is populated, instead of doing speculative work.
    pub nonempty_miss_abandon: usize,

    /// Maximum number of tuples the distinct-count reduction may hand to the
    /// storage layer as a predicate list.
    pub distinct_count_predicate_limit: usize,

    /// Remove distinct-count predicate tuples that generalize another kept
    /// tuple. Off by default: the check is quadratic and only pays off for
    /// dialects with small predicate-list limits.
    pub remove_overlapping_distinct_tuples: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            crossjoin_result_limit: i32::MAX as u64,
            nonempty_optimize_threshold: 1_000,
            nonempty_miss_abandon: 100,
            distinct_count_predicate_limit: 10_000,
            remove_overlapping_distinct_tuples: false,
        }
    }
}
