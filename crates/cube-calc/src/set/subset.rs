//! Head, Tail and Subset: window combinators over materialized sets.
//!
//! All three delegate to [`SetList::sub_list`], so a window over a lazy cross
//! product stays lazy (offset arithmetic, no copy). Counts are runtime
//! scalars; a pending count yields an empty set for this pass and the caller
//! retries once the cache is populated.

use crate::calc::{Compiled, CompiledKind, ListCalc, ScalarCalc};
use crate::compiler::Compiler;
use crate::error::{CalcResult, CompileError, CompileResult};
use crate::evaluator::Evaluator;
use crate::expr::Expr;
use crate::set::SetList;
use crate::value::CellValue;

pub(crate) fn compile_head(compiler: &mut Compiler<'_>, args: &[Expr]) -> CompileResult<Compiled> {
    let (set, count) = set_and_count(compiler, "Head", args)?;
    let arity = set.arity();
    Ok(Compiled {
        id: compiler.fresh_id(),
        kind: CompiledKind::List(Box::new(HeadCalc { set, count, arity })),
    })
}

pub(crate) fn compile_tail(compiler: &mut Compiler<'_>, args: &[Expr]) -> CompileResult<Compiled> {
    let (set, count) = set_and_count(compiler, "Tail", args)?;
    let arity = set.arity();
    Ok(Compiled {
        id: compiler.fresh_id(),
        kind: CompiledKind::List(Box::new(TailCalc { set, count, arity })),
    })
}

pub(crate) fn compile_subset(
    compiler: &mut Compiler<'_>,
    args: &[Expr],
) -> CompileResult<Compiled> {
    if args.len() < 2 || args.len() > 3 {
        return Err(CompileError::Arity {
            function: "Subset",
            expected: 3,
            actual: args.len(),
        });
    }
    let (_, set) = compiler.compile_list(&args[0])?;
    let start = compiler.compile_scalar(&args[1])?;
    let count = match args.get(2) {
        Some(expr) => Some(compiler.compile_scalar(expr)?),
        None => None,
    };
    let arity = set.arity();
    Ok(Compiled {
        id: compiler.fresh_id(),
        kind: CompiledKind::List(Box::new(SubsetCalc {
            set,
            start,
            count,
            arity,
        })),
    })
}

fn set_and_count(
    compiler: &mut Compiler<'_>,
    function: &'static str,
    args: &[Expr],
) -> CompileResult<(Box<dyn ListCalc>, Box<dyn ScalarCalc>)> {
    if args.len() != 2 {
        return Err(CompileError::Arity {
            function,
            expected: 2,
            actual: args.len(),
        });
    }
    let (_, set) = compiler.compile_list(&args[0])?;
    let count = compiler.compile_scalar(&args[1])?;
    Ok((set, count))
}

/// A runtime index argument: negative values clamp to zero, a pending or
/// non-numeric value is `None`.
fn index_arg(ev: &mut Evaluator<'_>, calc: &dyn ScalarCalc) -> CalcResult<Option<usize>> {
    Ok(match calc.evaluate(ev)? {
        CellValue::Ready(datum) => datum.as_number().map(|n| n.max(0.0) as usize),
        _ => None,
    })
}

struct HeadCalc {
    set: Box<dyn ListCalc>,
    count: Box<dyn ScalarCalc>,
    arity: usize,
}

impl ListCalc for HeadCalc {
    fn arity(&self) -> usize {
        self.arity
    }

    fn evaluate_list(&self, ev: &mut Evaluator<'_>) -> CalcResult<SetList> {
        let set = self.set.evaluate_list(ev)?;
        match index_arg(ev, &*self.count)? {
            Some(count) => {
                let count = count.min(set.len());
                Ok(set.sub_list(0, count))
            }
            None => Ok(SetList::empty(self.arity)),
        }
    }
}

struct TailCalc {
    set: Box<dyn ListCalc>,
    count: Box<dyn ScalarCalc>,
    arity: usize,
}

impl ListCalc for TailCalc {
    fn arity(&self) -> usize {
        self.arity
    }

    fn evaluate_list(&self, ev: &mut Evaluator<'_>) -> CalcResult<SetList> {
        let set = self.set.evaluate_list(ev)?;
        match index_arg(ev, &*self.count)? {
            Some(count) => {
                let count = count.min(set.len());
                Ok(set.sub_list(set.len() - count, count))
            }
            None => Ok(SetList::empty(self.arity)),
        }
    }
}

struct SubsetCalc {
    set: Box<dyn ListCalc>,
    start: Box<dyn ScalarCalc>,
    /// Absent count means "to the end".
    count: Option<Box<dyn ScalarCalc>>,
    arity: usize,
}

impl ListCalc for SubsetCalc {
    fn arity(&self) -> usize {
        self.arity
    }

    fn evaluate_list(&self, ev: &mut Evaluator<'_>) -> CalcResult<SetList> {
        let set = self.set.evaluate_list(ev)?;
        let Some(start) = index_arg(ev, &*self.start)? else {
            return Ok(SetList::empty(self.arity));
        };
        let start = start.min(set.len());
        let rest = set.len() - start;
        let count = match &self.count {
            Some(calc) => match index_arg(ev, &**calc)? {
                Some(count) => count.min(rest),
                None => return Ok(SetList::empty(self.arity)),
            },
            None => rest,
        };
        Ok(set.sub_list(start, count))
    }
}
