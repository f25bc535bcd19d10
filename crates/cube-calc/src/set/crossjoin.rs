//! The cross-product combinator.
//!
//! Representation-preserving: when the caller streams, both inputs stream and
//! neither is materialized — the nested-loop strategy re-acquires a fresh
//! inner stream per outer element. When the caller wants random access, the
//! product is an arithmetically flattened [`crate::set::SetList::Product`]
//! view; a mutable request packs tuples into one flat backing array instead.
//!
//! Before forming a large product in non-empty mode, each oversized side is
//! first reduced to the elements for which some measure of the query's
//! measure set evaluates non-null. Probes that come back pending are kept
//! (they cannot be proven empty) — but when pending probes dominate and the
//! pruned product is still large, the whole evaluation is abandoned with an
//! empty result so the caller retries once the cache has been populated,
//! rather than doing speculative work that will be thrown away.

use crate::calc::{Compiled, CompiledKind, IterCalc, ListCalc, ResultStyle};
use crate::compiler::Compiler;
use crate::error::{CalcError, CalcResult, CompileError, CompileResult};
use crate::evaluator::Evaluator;
use crate::expr::Expr;
use crate::set::{SetList, TupleBuf, TupleList, TupleStream};
use crate::value::CellValue;

pub(crate) fn compile(
    compiler: &mut Compiler<'_>,
    args: &[Expr],
    wanted: &[ResultStyle],
) -> CompileResult<Compiled> {
    if args.len() != 2 {
        return Err(CompileError::Arity {
            function: "CrossJoin",
            expected: 2,
            actual: args.len(),
        });
    }
    let id = compiler.fresh_id();
    match Compiler::preferred_set_style(wanted) {
        ResultStyle::Iterable => {
            let (_, left) = compiler.compile_iter(&args[0])?;
            let (_, right) = compiler.compile_iter(&args[1])?;
            let arity = left.arity() + right.arity();
            Ok(Compiled {
                id,
                kind: CompiledKind::Iterable(Box::new(IterCrossJoinCalc { left, right, arity })),
            })
        }
        mutable_or_list => {
            let mutable = mutable_or_list == ResultStyle::MutableList;
            let (_, left) = compiler.compile_list(&args[0])?;
            let (_, right) = compiler.compile_list(&args[1])?;
            let arity = left.arity() + right.arity();
            let calc = Box::new(ListCrossJoinCalc {
                left,
                right,
                arity,
                mutable,
            });
            Ok(Compiled {
                id,
                kind: if mutable {
                    CompiledKind::MutableList(calc)
                } else {
                    CompiledKind::List(calc)
                },
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Streamed form

struct IterCrossJoinCalc {
    left: Box<dyn IterCalc>,
    right: Box<dyn IterCalc>,
    arity: usize,
}

impl IterCalc for IterCrossJoinCalc {
    fn arity(&self) -> usize {
        self.arity
    }

    fn evaluate_stream<'c>(
        &'c self,
        ev: &mut Evaluator<'_>,
    ) -> CalcResult<Box<dyn TupleStream + 'c>> {
        let outer = self.left.evaluate_stream(ev)?;
        Ok(Box::new(CrossJoinStream {
            outer,
            inner_calc: &*self.right,
            current: None,
            inner: None,
            arity: self.arity,
        }))
    }
}

struct CrossJoinStream<'c> {
    outer: Box<dyn TupleStream + 'c>,
    inner_calc: &'c dyn IterCalc,
    current: Option<TupleBuf>,
    inner: Option<Box<dyn TupleStream + 'c>>,
    arity: usize,
}

impl TupleStream for CrossJoinStream<'_> {
    fn arity(&self) -> usize {
        self.arity
    }

    fn next(&mut self, ev: &mut Evaluator<'_>) -> CalcResult<Option<TupleBuf>> {
        loop {
            if self.current.is_none() {
                match self.outer.next(ev)? {
                    None => return Ok(None),
                    Some(tuple) => {
                        self.current = Some(tuple);
                        // The inner source is single-pass: acquire a fresh
                        // stream for each outer element.
                        self.inner = Some(self.inner_calc.evaluate_stream(ev)?);
                    }
                }
            }
            let inner = self.inner.as_mut().expect("inner stream present");
            match inner.next(ev)? {
                Some(right) => {
                    let mut tuple = self.current.clone().expect("outer element present");
                    tuple.extend_from_slice(&right);
                    return Ok(Some(tuple));
                }
                None => {
                    self.current = None;
                    self.inner = None;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Materialized form

struct ListCrossJoinCalc {
    left: Box<dyn ListCalc>,
    right: Box<dyn ListCalc>,
    arity: usize,
    mutable: bool,
}

impl ListCalc for ListCrossJoinCalc {
    fn arity(&self) -> usize {
        self.arity
    }

    fn evaluate_list(&self, ev: &mut Evaluator<'_>) -> CalcResult<SetList> {
        let mut left = self.left.evaluate_list(ev)?;
        let mut right = self.right.evaluate_list(ev)?;

        if ev.non_empty() {
            match prune_pair(ev, left, right)? {
                Pruned::Keep(l, r) => {
                    left = l;
                    right = r;
                }
                Pruned::RetryLater => return Ok(SetList::empty(self.arity)),
            }
        }

        check_size(left.len(), right.len(), ev.config().crossjoin_result_limit)?;

        if self.mutable {
            let mut packed = TupleList::with_capacity(self.arity, left.len() * right.len());
            let mut buf = TupleBuf::new();
            for i in 0..left.len() {
                for j in 0..right.len() {
                    buf.clear();
                    left.append_into(i, &mut buf);
                    right.append_into(j, &mut buf);
                    packed.push(&buf);
                }
            }
            Ok(SetList::Tuples(packed))
        } else {
            Ok(SetList::product(left, right))
        }
    }
}

/// Computes the product size in 64-bit before narrowing; fails before any
/// allocation proportional to an oversized product.
fn check_size(left: usize, right: usize, limit: u64) -> CalcResult<()> {
    let actual = (left as u64)
        .checked_mul(right as u64)
        .unwrap_or(u64::MAX);
    if actual > limit {
        return Err(CalcError::ResourceLimit { actual, limit });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Non-empty pruning

enum Pruned {
    Keep(SetList, SetList),
    /// Too much of the kept set rests on uncached probes and the product is
    /// still large: stop now, let the batch loader fill the cache, retry.
    RetryLater,
}

fn prune_pair(ev: &mut Evaluator<'_>, left: SetList, right: SetList) -> CalcResult<Pruned> {
    let threshold = ev.config().nonempty_optimize_threshold;
    let mut pending_total = 0usize;

    let left = if left.len() > threshold {
        let (pruned, pending) = prune_side(ev, left);
        pending_total += pending;
        pruned
    } else {
        left
    };
    let right = if right.len() > threshold {
        let (pruned, pending) = prune_side(ev, right);
        pending_total += pending;
        pruned
    } else {
        right
    };

    let product = left.len().saturating_mul(right.len());
    if pending_total >= ev.config().nonempty_miss_abandon && product > threshold {
        log::debug!(
            "abandoning non-empty cross join: {pending_total} pruning probes pending, \
             pruned product still {product}"
        );
        return Ok(Pruned::RetryLater);
    }
    Ok(Pruned::Keep(left, right))
}

/// Keeps the elements for which some query measure evaluates non-null at the
/// element's coordinate, plus the ones whose probes are still pending (they
/// cannot be proven empty). Restores the evaluator context exactly after
/// every probe.
fn prune_side(ev: &mut Evaluator<'_>, list: SetList) -> (SetList, usize) {
    let measures = ev.measures().to_vec();
    if measures.is_empty() {
        return (list, 0);
    }

    let arity = list.arity();
    let before = list.len();
    let mut kept: Vec<TupleBuf> = Vec::new();
    let mut pending = 0usize;

    for i in 0..list.len() {
        let tuple = list.tuple(i);
        let sp = ev.savepoint();
        ev.set_context_tuple(&tuple);
        let mut keep = false;
        let mut saw_pending = false;
        for &measure in &measures {
            ev.set_context_member(measure);
            match ev.evaluate_current_cell() {
                value if value.is_ready_non_null() => {
                    keep = true;
                    break;
                }
                CellValue::Pending => saw_pending = true,
                _ => {}
            }
        }
        ev.restore(sp);
        if keep {
            kept.push(tuple);
        } else if saw_pending {
            pending += 1;
            kept.push(tuple);
        }
    }

    log::debug!(
        "non-empty pruning kept {}/{} elements ({} pending)",
        kept.len(),
        before,
        pending
    );
    (SetList::from_rows(arity, kept), pending)
}
