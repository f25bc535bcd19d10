//! Aggregate rollup.
//!
//! The generic path delegates to a per-aggregation-type [`Rollup`] operator
//! from an external [`AggregatorRegistry`]; the engine supplies fold-based
//! operators for the common kinds but the registry is the caller's to extend.
//! Distinct count cannot fold per element — it needs the whole member
//! collection at once — so it is recognized by kind and routed through the
//! tuple-set reduction in [`distinct`] instead, ending in a deferred
//! aggregation against the storage layer.

pub mod distinct;

use crate::calc::{Compiled, CompiledKind, ListCalc, ScalarCalc};
use crate::compiler::{Compiler, CurrentCellCalc};
use crate::error::{CalcResult, CompileError, CompileResult};
use crate::evaluator::Evaluator;
use crate::expr::{AggKind, Expr};
use crate::set::SetList;
use crate::value::{CellError, CellValue, Datum};
use ahash::AHashMap;

pub(crate) fn compile(
    compiler: &mut Compiler<'_>,
    kind: AggKind,
    args: &[Expr],
) -> CompileResult<Compiled> {
    if args.is_empty() || args.len() > 2 {
        return Err(CompileError::Arity {
            function: "Aggregate",
            expected: 2,
            actual: args.len(),
        });
    }
    let id = compiler.fresh_id();
    let (_, set) = compiler.compile_list(&args[0])?;
    if kind == AggKind::DistinctCount {
        return Ok(Compiled {
            id,
            kind: CompiledKind::Scalar(Box::new(distinct::DistinctCountCalc::new(set))),
        });
    }
    let value: Box<dyn ScalarCalc> = match args.get(1) {
        Some(expr) => compiler.compile_scalar(expr)?,
        None => Box::new(CurrentCellCalc),
    };
    Ok(Compiled {
        id,
        kind: CompiledKind::Scalar(Box::new(AggregateCalc { set, value, kind })),
    })
}

/// One aggregation operator: combines the value expression across every
/// coordinate of the set.
pub trait Rollup {
    fn rollup(
        &self,
        ev: &mut Evaluator<'_>,
        set: &SetList,
        value: &dyn ScalarCalc,
    ) -> CalcResult<CellValue>;
}

/// Rollup operators keyed by aggregation kind. Installed on the evaluator by
/// the caller; an evaluation without one (or with a kind the registry does
/// not cover) yields [`CellError::NoAggregator`] as the cell's value.
pub struct AggregatorRegistry {
    rollups: AHashMap<AggKind, Box<dyn Rollup>>,
}

impl AggregatorRegistry {
    pub fn empty() -> Self {
        Self {
            rollups: AHashMap::new(),
        }
    }

    pub fn register(&mut self, kind: AggKind, rollup: Box<dyn Rollup>) {
        self.rollups.insert(kind, rollup);
    }

    pub fn get(&self, kind: AggKind) -> Option<&dyn Rollup> {
        self.rollups.get(&kind).map(|r| &**r)
    }
}

impl Default for AggregatorRegistry {
    /// Fold-based operators for the kinds that aggregate incrementally.
    /// Distinct count is deliberately absent: it never takes this path.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(AggKind::Sum, Box::new(FoldRollup(Fold::Sum)));
        registry.register(AggKind::Count, Box::new(FoldRollup(Fold::Count)));
        registry.register(AggKind::Min, Box::new(FoldRollup(Fold::Min)));
        registry.register(AggKind::Max, Box::new(FoldRollup(Fold::Max)));
        registry
    }
}

struct AggregateCalc {
    set: Box<dyn ListCalc>,
    value: Box<dyn ScalarCalc>,
    kind: AggKind,
}

impl ScalarCalc for AggregateCalc {
    fn evaluate(&self, ev: &mut Evaluator<'_>) -> CalcResult<CellValue> {
        let set = self.set.evaluate_list(ev)?;
        let rollup = match ev.aggregator_for(self.kind) {
            Some(rollup) => rollup,
            None => return Ok(CellValue::Error(CellError::NoAggregator)),
        };
        rollup.rollup(ev, &set, &*self.value)
    }
}

#[derive(Clone, Copy)]
enum Fold {
    Sum,
    Count,
    Min,
    Max,
}

struct FoldRollup(Fold);

impl Rollup for FoldRollup {
    /// Scans the whole set even after a miss so one pass surfaces every
    /// uncached dependency; a per-cell error wins over pending, pending wins
    /// over any partial result.
    fn rollup(
        &self,
        ev: &mut Evaluator<'_>,
        set: &SetList,
        value: &dyn ScalarCalc,
    ) -> CalcResult<CellValue> {
        let mut acc: Option<f64> = None;
        let mut count = 0usize;
        let mut pending = false;
        let mut first_error: Option<CellError> = None;

        for i in 0..set.len() {
            let tuple = set.tuple(i);
            let sp = ev.savepoint();
            ev.set_context_tuple(&tuple);
            let cell = value.evaluate(ev);
            ev.restore(sp);
            match cell? {
                CellValue::Ready(Datum::Null) => {}
                CellValue::Ready(datum) => {
                    count += 1;
                    if let Some(n) = datum.as_number() {
                        acc = Some(match (self.0, acc) {
                            (_, None) => n,
                            (Fold::Sum, Some(a)) => a + n,
                            (Fold::Min, Some(a)) => a.min(n),
                            (Fold::Max, Some(a)) => a.max(n),
                            (Fold::Count, Some(a)) => a,
                        });
                    }
                }
                CellValue::Pending => pending = true,
                CellValue::Error(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Ok(CellValue::Error(e));
        }
        if pending {
            return Ok(CellValue::Pending);
        }
        Ok(match self.0 {
            Fold::Count => CellValue::Ready(Datum::Number(count as f64)),
            _ => CellValue::Ready(acc.map(Datum::Number).unwrap_or(Datum::Null)),
        })
    }
}
