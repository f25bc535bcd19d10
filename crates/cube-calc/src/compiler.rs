//! Compilation and result-style negotiation.
//!
//! A caller declares an ordered list of acceptable [`ResultStyle`]s. The
//! compiler first builds the expression in the style it natively produces
//! (combinator constructors consult the caller's preference to choose between
//! their streamed and materialized forms), then — when the native style is
//! not acceptable — inserts an adapter: a streamed set can be materialized
//! into a one-shot copy, a list can be cursored as a stream, a member can be
//! lifted to a tuple or dereferenced to the scalar at its coordinate. If no
//! adapter applies, compilation fails with a style mismatch; that is a
//! compile-time condition, never a runtime one.

use crate::agg;
use crate::calc::{
    Compiled, CompiledKind, ExpId, IterCalc, ListCalc, MemberCalc, ResultStyle, ScalarCalc,
    TupleCalc,
};
use crate::config::EngineConfig;
use crate::error::{CompileError, CompileResult};
use crate::evaluator::Evaluator;
use crate::expr::{Expr, FunDef};
use crate::rank;
use crate::set::{crossjoin, filter, order, subset};
use crate::set::{ListStream, SetList, TupleBuf, TupleStream};
use crate::value::{CellValue, Datum};
use crate::CalcResult;
use cube_model::{HierarchyId, MemberId};
use smallvec::smallvec;

pub struct Compiler<'a> {
    config: &'a EngineConfig,
    next_id: u32,
}

impl<'a> Compiler<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config, next_id: 0 }
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    pub(crate) fn fresh_id(&mut self) -> ExpId {
        let id = ExpId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Compiles `expr` into the first acceptable style, adapting when needed.
    pub fn compile(&mut self, expr: &Expr, wanted: &[ResultStyle]) -> CompileResult<Compiled> {
        let native = self.compile_native(expr, wanted)?;
        if wanted.contains(&native.style()) {
            return Ok(native);
        }
        self.adapt(native, wanted)
    }

    pub(crate) fn compile_scalar(&mut self, expr: &Expr) -> CompileResult<Box<dyn ScalarCalc>> {
        Ok(self.compile(expr, &[ResultStyle::Scalar])?.into_scalar())
    }

    pub(crate) fn compile_member(&mut self, expr: &Expr) -> CompileResult<Box<dyn MemberCalc>> {
        Ok(self.compile(expr, &[ResultStyle::Member])?.into_member())
    }

    pub(crate) fn compile_tuple(&mut self, expr: &Expr) -> CompileResult<Box<dyn TupleCalc>> {
        Ok(self.compile(expr, &[ResultStyle::Tuple])?.into_tuple())
    }

    /// A random-access set, whatever it takes.
    pub(crate) fn compile_list(
        &mut self,
        expr: &Expr,
    ) -> CompileResult<(ExpId, Box<dyn ListCalc>)> {
        let compiled = self.compile(expr, &[ResultStyle::List, ResultStyle::MutableList])?;
        Ok((compiled.id, compiled.into_list()))
    }

    /// A single-pass stream, re-acquirable from its calc.
    pub(crate) fn compile_iter(
        &mut self,
        expr: &Expr,
    ) -> CompileResult<(ExpId, Box<dyn IterCalc>)> {
        let compiled = self.compile(expr, &[ResultStyle::Iterable])?;
        Ok((compiled.id, compiled.into_iterable()))
    }

    /// The first set style the caller accepts; combinators use it to choose
    /// between their streamed and materialized forms.
    pub(crate) fn preferred_set_style(wanted: &[ResultStyle]) -> ResultStyle {
        wanted
            .iter()
            .copied()
            .find(|s| {
                matches!(
                    s,
                    ResultStyle::Iterable | ResultStyle::List | ResultStyle::MutableList
                )
            })
            .unwrap_or(ResultStyle::List)
    }

    fn compile_native(&mut self, expr: &Expr, wanted: &[ResultStyle]) -> CompileResult<Compiled> {
        let id = self.fresh_id();
        match expr {
            Expr::Literal(datum) => Ok(Compiled {
                id,
                kind: CompiledKind::Scalar(Box::new(ConstantScalar(datum.clone()))),
            }),
            Expr::Member(member) => Ok(Compiled {
                id,
                kind: CompiledKind::Member(Box::new(ConstantMember(*member))),
            }),
            Expr::Tuple(members) => Ok(Compiled {
                id,
                kind: CompiledKind::Tuple(Box::new(ConstantTuple(members.clone()))),
            }),
            Expr::Set { arity, rows } => {
                let list = SetList::from_rows(
                    *arity,
                    rows.iter().map(|r| r.iter().copied().collect::<TupleBuf>()),
                );
                Ok(Compiled {
                    id,
                    kind: CompiledKind::List(Box::new(ConstantList(list))),
                })
            }
            Expr::CurrentMember(hierarchy) => Ok(Compiled {
                id,
                kind: CompiledKind::Member(Box::new(CurrentMemberCalc(*hierarchy))),
            }),
            Expr::Call { fun, args } => {
                // `id` stays unused for calls; constructors allocate their own
                // ids for the pieces they compile and for the call itself.
                let _ = id;
                self.compile_call(*fun, args, wanted)
            }
        }
    }

    fn compile_call(
        &mut self,
        fun: FunDef,
        args: &[Expr],
        wanted: &[ResultStyle],
    ) -> CompileResult<Compiled> {
        match fun {
            FunDef::CrossJoin => crossjoin::compile(self, args, wanted),
            FunDef::Filter => filter::compile(self, args, wanted),
            FunDef::Order {
                direction,
                break_hierarchy,
            } => order::compile_order(self, args, direction, break_hierarchy),
            FunDef::Hierarchize { post } => order::compile_hierarchize(self, args, post),
            FunDef::Aggregate { kind } => agg::compile(self, kind, args),
            FunDef::Rank => rank::compile(self, args),
            FunDef::Head => subset::compile_head(self, args),
            FunDef::Tail => subset::compile_tail(self, args),
            FunDef::Subset => subset::compile_subset(self, args),
        }
    }

    fn adapt(&mut self, compiled: Compiled, wanted: &[ResultStyle]) -> CompileResult<Compiled> {
        let produced = compiled.style();
        let id = compiled.id;
        for &target in wanted {
            let kind = match (produced, target) {
                (ResultStyle::Iterable, ResultStyle::List) => {
                    CompiledKind::List(Box::new(IterToList(compiled.into_iterable())))
                }
                (ResultStyle::Iterable, ResultStyle::MutableList) => CompiledKind::MutableList(
                    Box::new(ListToMutable(Box::new(IterToList(compiled.into_iterable())))),
                ),
                (ResultStyle::List, ResultStyle::Iterable)
                | (ResultStyle::MutableList, ResultStyle::Iterable) => {
                    CompiledKind::Iterable(Box::new(ListToIter(compiled.into_list())))
                }
                (ResultStyle::List, ResultStyle::MutableList) => {
                    CompiledKind::MutableList(Box::new(ListToMutable(compiled.into_list())))
                }
                // A mutable list is already randomly indexable and immutable
                // callers cannot tell the difference.
                (ResultStyle::MutableList, ResultStyle::List) => {
                    CompiledKind::List(compiled.into_list())
                }
                (ResultStyle::Member, ResultStyle::Tuple) => {
                    CompiledKind::Tuple(Box::new(MemberToTuple(compiled.into_member())))
                }
                (ResultStyle::Member, ResultStyle::List) => {
                    CompiledKind::List(Box::new(MemberToList(compiled.into_member())))
                }
                (ResultStyle::Member, ResultStyle::Iterable) => CompiledKind::Iterable(Box::new(
                    ListToIter(Box::new(MemberToList(compiled.into_member()))),
                )),
                (ResultStyle::Member, ResultStyle::Scalar) => {
                    CompiledKind::Scalar(Box::new(MemberValue(compiled.into_member())))
                }
                (ResultStyle::Tuple, ResultStyle::List) => {
                    CompiledKind::List(Box::new(TupleToList(compiled.into_tuple())))
                }
                (ResultStyle::Tuple, ResultStyle::Iterable) => CompiledKind::Iterable(Box::new(
                    ListToIter(Box::new(TupleToList(compiled.into_tuple()))),
                )),
                (ResultStyle::Tuple, ResultStyle::Scalar) => {
                    CompiledKind::Scalar(Box::new(TupleValue(compiled.into_tuple())))
                }
                _ => continue,
            };
            return Ok(Compiled { id, kind });
        }
        Err(CompileError::StyleMismatch {
            wanted: wanted.to_vec(),
            produced,
        })
    }
}

// ---------------------------------------------------------------------------
// Leaf calcs

struct ConstantScalar(Datum);

impl ScalarCalc for ConstantScalar {
    fn evaluate(&self, _ev: &mut Evaluator<'_>) -> CalcResult<CellValue> {
        Ok(CellValue::Ready(self.0.clone()))
    }
}

struct ConstantMember(MemberId);

impl MemberCalc for ConstantMember {
    fn evaluate_member(&self, _ev: &mut Evaluator<'_>) -> CalcResult<MemberId> {
        Ok(self.0)
    }
}

struct ConstantTuple(Vec<MemberId>);

impl TupleCalc for ConstantTuple {
    fn arity(&self) -> usize {
        self.0.len()
    }

    fn evaluate_tuple(&self, _ev: &mut Evaluator<'_>) -> CalcResult<TupleBuf> {
        Ok(self.0.iter().copied().collect())
    }
}

struct ConstantList(SetList);

impl ListCalc for ConstantList {
    fn arity(&self) -> usize {
        self.0.arity()
    }

    fn evaluate_list(&self, _ev: &mut Evaluator<'_>) -> CalcResult<SetList> {
        Ok(self.0.clone())
    }
}

struct CurrentMemberCalc(HierarchyId);

impl MemberCalc for CurrentMemberCalc {
    fn evaluate_member(&self, ev: &mut Evaluator<'_>) -> CalcResult<MemberId> {
        Ok(ev.current_member(self.0))
    }
}

/// The cell at the evaluator's current coordinate; the default value
/// expression of an aggregate call.
pub(crate) struct CurrentCellCalc;

impl ScalarCalc for CurrentCellCalc {
    fn evaluate(&self, ev: &mut Evaluator<'_>) -> CalcResult<CellValue> {
        Ok(ev.evaluate_current_cell())
    }
}

// ---------------------------------------------------------------------------
// Style adapters

/// Materializes a stream into a random-access copy.
struct IterToList(Box<dyn IterCalc>);

impl ListCalc for IterToList {
    fn arity(&self) -> usize {
        self.0.arity()
    }

    fn evaluate_list(&self, ev: &mut Evaluator<'_>) -> CalcResult<SetList> {
        let mut stream = self.0.evaluate_stream(ev)?;
        let mut rows = Vec::new();
        while let Some(tuple) = stream.next(ev)? {
            rows.push(tuple);
        }
        Ok(SetList::from_rows(self.0.arity(), rows))
    }
}

/// Cursors a materialized list as a one-pass stream.
struct ListToIter(Box<dyn ListCalc>);

impl IterCalc for ListToIter {
    fn arity(&self) -> usize {
        self.0.arity()
    }

    fn evaluate_stream<'c>(
        &'c self,
        ev: &mut Evaluator<'_>,
    ) -> CalcResult<Box<dyn TupleStream + 'c>> {
        let list = self.0.evaluate_list(ev)?;
        Ok(Box::new(ListStream::new(list)))
    }
}

/// Packs any materialized representation into a flat mutable backing array.
struct ListToMutable(Box<dyn ListCalc>);

impl ListCalc for ListToMutable {
    fn arity(&self) -> usize {
        self.0.arity()
    }

    fn evaluate_list(&self, ev: &mut Evaluator<'_>) -> CalcResult<SetList> {
        Ok(SetList::Tuples(self.0.evaluate_list(ev)?.into_mutable()))
    }
}

struct MemberToTuple(Box<dyn MemberCalc>);

impl TupleCalc for MemberToTuple {
    fn arity(&self) -> usize {
        1
    }

    fn evaluate_tuple(&self, ev: &mut Evaluator<'_>) -> CalcResult<TupleBuf> {
        Ok(smallvec![self.0.evaluate_member(ev)?])
    }
}

struct MemberToList(Box<dyn MemberCalc>);

impl ListCalc for MemberToList {
    fn arity(&self) -> usize {
        1
    }

    fn evaluate_list(&self, ev: &mut Evaluator<'_>) -> CalcResult<SetList> {
        Ok(SetList::Members(vec![self.0.evaluate_member(ev)?]))
    }
}

struct TupleToList(Box<dyn TupleCalc>);

impl ListCalc for TupleToList {
    fn arity(&self) -> usize {
        self.0.arity()
    }

    fn evaluate_list(&self, ev: &mut Evaluator<'_>) -> CalcResult<SetList> {
        let tuple = self.0.evaluate_tuple(ev)?;
        Ok(SetList::from_rows(self.0.arity(), [tuple]))
    }
}

/// Dereferences a member to the cell value at its coordinate.
struct MemberValue(Box<dyn MemberCalc>);

impl ScalarCalc for MemberValue {
    fn evaluate(&self, ev: &mut Evaluator<'_>) -> CalcResult<CellValue> {
        let member = self.0.evaluate_member(ev)?;
        let sp = ev.savepoint();
        ev.set_context_member(member);
        let value = ev.evaluate_current_cell();
        ev.restore(sp);
        Ok(value)
    }
}

struct TupleValue(Box<dyn TupleCalc>);

impl ScalarCalc for TupleValue {
    fn evaluate(&self, ev: &mut Evaluator<'_>) -> CalcResult<CellValue> {
        let tuple = self.0.evaluate_tuple(ev)?;
        let sp = ev.savepoint();
        ev.set_context_tuple(&tuple);
        let value = ev.evaluate_current_cell();
        ev.restore(sp);
        Ok(value)
    }
}
