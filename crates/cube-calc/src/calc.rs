//! Compiled evaluation units.
//!
//! A calc node is immutable and side-effect-free except through the evaluator
//! it is given: built once per compiled query, evaluated arbitrarily many
//! times. The compiler (not the caller) decides which of the trait shapes
//! below a given expression compiles into — see [`crate::Compiler`].

use crate::error::CalcResult;
use crate::evaluator::Evaluator;
use crate::set::{SetList, TupleBuf, TupleStream};
use crate::value::CellValue;
use cube_model::MemberId;

/// Stable identity of one compiled expression, assigned by the compiler.
/// Memoization (Rank's sorted projections) keys on it together with the
/// evaluation context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExpId(pub(crate) u32);

/// The result representation a compiled expression produces.
///
/// Callers declare an ordered list of acceptable styles; the compiler picks
/// the cheapest the expression natively produces and adapts when no exact
/// match exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultStyle {
    Scalar,
    Member,
    Tuple,
    /// Materialized, random-access, immutable.
    List,
    /// Materialized with in-place replacement/removal (flat backing array).
    MutableList,
    /// Streamed, single-pass, produced on demand.
    Iterable,
}

pub trait ScalarCalc {
    fn evaluate(&self, ev: &mut Evaluator<'_>) -> CalcResult<CellValue>;
}

pub trait MemberCalc {
    fn evaluate_member(&self, ev: &mut Evaluator<'_>) -> CalcResult<MemberId>;
}

pub trait TupleCalc {
    fn arity(&self) -> usize;
    fn evaluate_tuple(&self, ev: &mut Evaluator<'_>) -> CalcResult<TupleBuf>;
}

pub trait ListCalc {
    fn arity(&self) -> usize;
    fn evaluate_list(&self, ev: &mut Evaluator<'_>) -> CalcResult<SetList>;
}

pub trait IterCalc {
    fn arity(&self) -> usize;

    /// Produces a fresh stream. Callers that need to re-iterate (the inner
    /// side of a streamed cross join) call this again rather than rewinding.
    fn evaluate_stream<'c>(
        &'c self,
        ev: &mut Evaluator<'_>,
    ) -> CalcResult<Box<dyn TupleStream + 'c>>;
}

pub enum CompiledKind {
    Scalar(Box<dyn ScalarCalc>),
    Member(Box<dyn MemberCalc>),
    Tuple(Box<dyn TupleCalc>),
    List(Box<dyn ListCalc>),
    MutableList(Box<dyn ListCalc>),
    Iterable(Box<dyn IterCalc>),
}

/// A compiled expression: the negotiated calc node plus its identity.
pub struct Compiled {
    pub id: ExpId,
    pub kind: CompiledKind,
}

impl std::fmt::Debug for Compiled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiled")
            .field("id", &self.id)
            .field("style", &self.style())
            .finish()
    }
}

impl Compiled {
    pub fn style(&self) -> ResultStyle {
        match &self.kind {
            CompiledKind::Scalar(_) => ResultStyle::Scalar,
            CompiledKind::Member(_) => ResultStyle::Member,
            CompiledKind::Tuple(_) => ResultStyle::Tuple,
            CompiledKind::List(_) => ResultStyle::List,
            CompiledKind::MutableList(_) => ResultStyle::MutableList,
            CompiledKind::Iterable(_) => ResultStyle::Iterable,
        }
    }

    /// Set arity; 1 for members, 0 for scalars.
    pub fn arity(&self) -> usize {
        match &self.kind {
            CompiledKind::Scalar(_) => 0,
            CompiledKind::Member(_) => 1,
            CompiledKind::Tuple(t) => t.arity(),
            CompiledKind::List(l) | CompiledKind::MutableList(l) => l.arity(),
            CompiledKind::Iterable(i) => i.arity(),
        }
    }

    // The unwrappers below are used by combinator constructors after the
    // compiler has negotiated the style; a mismatch is a compiler bug.

    pub fn into_scalar(self) -> Box<dyn ScalarCalc> {
        match self.kind {
            CompiledKind::Scalar(c) => c,
            _ => panic!("compiled expression is not a scalar"),
        }
    }

    pub fn into_member(self) -> Box<dyn MemberCalc> {
        match self.kind {
            CompiledKind::Member(c) => c,
            _ => panic!("compiled expression is not a member"),
        }
    }

    pub fn into_tuple(self) -> Box<dyn TupleCalc> {
        match self.kind {
            CompiledKind::Tuple(c) => c,
            _ => panic!("compiled expression is not a tuple"),
        }
    }

    pub fn into_list(self) -> Box<dyn ListCalc> {
        match self.kind {
            CompiledKind::List(c) | CompiledKind::MutableList(c) => c,
            _ => panic!("compiled expression is not a list"),
        }
    }

    pub fn into_iterable(self) -> Box<dyn IterCalc> {
        match self.kind {
            CompiledKind::Iterable(c) => c,
            _ => panic!("compiled expression is not iterable"),
        }
    }
}
