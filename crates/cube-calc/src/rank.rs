//! Rank: the 1-based position of a tuple within a sorted projection of a set.
//!
//! Two strategies, chosen at compile time by whether a sort key is supplied.
//! Without one, rank is position in set order, answered from a memoized
//! identity-to-index map. With one, the element's own key is ranked against
//! the memoized descending-sorted keys of the whole set; equal keys share the
//! first (lowest) rank among them. Both structures are memoized per
//! (set-expression, evaluation-context) pair so repeated Rank calls over the
//! same set inside one result grid reuse the work.

use crate::calc::{Compiled, CompiledKind, ExpId, ListCalc, ScalarCalc, TupleCalc};
use crate::compiler::Compiler;
use crate::error::{CalcResult, CompileError, CompileResult};
use crate::evaluator::{CachedSet, Evaluator};
use crate::expr::Expr;
use crate::value::{CellValue, Datum, SortKey};
use ahash::AHashMap;
use std::cmp::Ordering;

pub(crate) fn compile(compiler: &mut Compiler<'_>, args: &[Expr]) -> CompileResult<Compiled> {
    if args.len() < 2 || args.len() > 3 {
        return Err(CompileError::Arity {
            function: "Rank",
            expected: 2,
            actual: args.len(),
        });
    }
    let id = compiler.fresh_id();
    let target = compiler.compile_tuple(&args[0])?;
    let (set_id, set) = compiler.compile_list(&args[1])?;
    let key = match args.get(2) {
        Some(expr) => Some(compiler.compile_scalar(expr)?),
        None => None,
    };
    Ok(Compiled {
        id,
        kind: CompiledKind::Scalar(Box::new(RankCalc {
            target,
            set_id,
            set,
            key,
        })),
    })
}

struct RankCalc {
    target: Box<dyn TupleCalc>,
    /// Memoization keys on the set expression's identity, not the Rank call's.
    set_id: ExpId,
    set: Box<dyn ListCalc>,
    key: Option<Box<dyn ScalarCalc>>,
}

impl ScalarCalc for RankCalc {
    fn evaluate(&self, ev: &mut Evaluator<'_>) -> CalcResult<CellValue> {
        let tuple = self.target.evaluate_tuple(ev)?;
        match &self.key {
            None => {
                let context = ev.coordinate_hash();
                if ev.cached_set(self.set_id, context).is_none() {
                    let set = self.set.evaluate_list(ev)?;
                    let mut index = AHashMap::with_capacity(set.len());
                    for i in 0..set.len() {
                        index.entry(set.tuple(i)).or_insert(i);
                    }
                    ev.cache_set(self.set_id, context, CachedSet::PositionIndex(index));
                }
                let Some(CachedSet::PositionIndex(index)) = ev.cached_set(self.set_id, context)
                else {
                    unreachable!("position index cached above");
                };
                Ok(match index.get(&tuple) {
                    Some(&position) => CellValue::Ready(Datum::Number((position + 1) as f64)),
                    None => CellValue::Ready(Datum::Null),
                })
            }
            Some(key) => {
                let sp = ev.savepoint();
                ev.set_context_tuple(&tuple);
                let own = key.evaluate(ev);
                ev.restore(sp);
                let own = SortKey::of(&own?);
                if own == SortKey::Pending {
                    // Transient zero: the retry protocol re-invokes once the
                    // cache holds the key.
                    return Ok(CellValue::Ready(Datum::Number(0.0)));
                }

                let context = ev.coordinate_hash();
                if ev.cached_set(self.set_id, context).is_none() {
                    let (keys, complete) = self.sorted_keys(ev)?;
                    if !complete {
                        // Some element keys are still pending; rank against
                        // the transient keys but do not memoize them.
                        return Ok(rank_among(&keys, &own));
                    }
                    ev.cache_set(self.set_id, context, CachedSet::SortedKeys(keys));
                }
                let Some(CachedSet::SortedKeys(keys)) = ev.cached_set(self.set_id, context)
                else {
                    unreachable!("sorted keys cached above");
                };
                Ok(rank_among(keys, &own))
            }
        }
    }
}

impl RankCalc {
    /// Keys of every set element, sorted descending (non-concrete keys last),
    /// and whether all of them were resolvable.
    fn sorted_keys(&self, ev: &mut Evaluator<'_>) -> CalcResult<(Vec<SortKey>, bool)> {
        let key = self.key.as_ref().expect("keyed strategy");
        let set = self.set.evaluate_list(ev)?;
        let mut keys = Vec::with_capacity(set.len());
        let mut complete = true;
        for i in 0..set.len() {
            let element = set.tuple(i);
            let sp = ev.savepoint();
            ev.set_context_tuple(&element);
            let value = key.evaluate(ev);
            ev.restore(sp);
            let sort_key = SortKey::of(&value?);
            if sort_key == SortKey::Pending {
                complete = false;
            }
            keys.push(sort_key);
        }
        keys.sort_by(|a, b| a.compare(b, true));
        Ok((keys, complete))
    }
}

/// Rank of `own` within descending-sorted `keys`: one plus the number of
/// strictly greater keys, so duplicates of a value all report the first rank
/// among them.
fn rank_among(keys: &[SortKey], own: &SortKey) -> CellValue {
    let position = keys.partition_point(|k| k.compare(own, true) == Ordering::Less);
    CellValue::Ready(Datum::Number((position + 1) as f64))
}
