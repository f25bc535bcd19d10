//! Filter: keep the elements whose predicate evaluates true.
//!
//! Streaming-first so downstream consumers can terminate early without the
//! whole input being materialized. A predicate that comes back pending does
//! not abort the scan — the element is omitted for now and the pass continues
//! so every uncached dependency is surfaced to the batch loader at once.

use crate::calc::{Compiled, CompiledKind, IterCalc, ResultStyle, ScalarCalc};
use crate::compiler::Compiler;
use crate::error::{CalcResult, CompileError, CompileResult};
use crate::evaluator::Evaluator;
use crate::expr::Expr;
use crate::set::{TupleBuf, TupleStream};
use crate::value::CellValue;

pub(crate) fn compile(
    compiler: &mut Compiler<'_>,
    args: &[Expr],
    _wanted: &[ResultStyle],
) -> CompileResult<Compiled> {
    if args.len() != 2 {
        return Err(CompileError::Arity {
            function: "Filter",
            expected: 2,
            actual: args.len(),
        });
    }
    let id = compiler.fresh_id();
    let (_, input) = compiler.compile_iter(&args[0])?;
    let predicate = compiler.compile_scalar(&args[1])?;
    let arity = input.arity();
    Ok(Compiled {
        id,
        kind: CompiledKind::Iterable(Box::new(FilterCalc {
            input,
            predicate,
            arity,
        })),
    })
}

struct FilterCalc {
    input: Box<dyn IterCalc>,
    predicate: Box<dyn ScalarCalc>,
    arity: usize,
}

impl IterCalc for FilterCalc {
    fn arity(&self) -> usize {
        self.arity
    }

    fn evaluate_stream<'c>(
        &'c self,
        ev: &mut Evaluator<'_>,
    ) -> CalcResult<Box<dyn TupleStream + 'c>> {
        let input = self.input.evaluate_stream(ev)?;
        Ok(Box::new(FilterStream {
            input,
            predicate: &*self.predicate,
            arity: self.arity,
        }))
    }
}

struct FilterStream<'c> {
    input: Box<dyn TupleStream + 'c>,
    predicate: &'c dyn ScalarCalc,
    arity: usize,
}

impl TupleStream for FilterStream<'_> {
    fn arity(&self) -> usize {
        self.arity
    }

    fn next(&mut self, ev: &mut Evaluator<'_>) -> CalcResult<Option<TupleBuf>> {
        while let Some(tuple) = self.input.next(ev)? {
            let sp = ev.savepoint();
            ev.set_context_tuple(&tuple);
            let verdict = self.predicate.evaluate(ev);
            ev.restore(sp);
            match verdict? {
                CellValue::Ready(datum) if datum.is_truthy() => return Ok(Some(tuple)),
                // Pending predicates already advanced the miss counter; keep
                // scanning.
                _ => {}
            }
        }
        Ok(None)
    }
}
