#![forbid(unsafe_code)]
#![deny(unreachable_patterns)]

//! `cube-calc` is the expression-evaluation core of a multidimensional query
//! engine: it compiles resolved query expressions into evaluation plans and
//! executes them against a hierarchical coordinate space.
//!
//! The crate has no network or file surface. It consumes three collaborators
//! through narrow traits:
//! - [`SchemaReader`] — member/level/hierarchy metadata (read-only, shareable)
//! - [`CellReader`] — cell values from the storage/cache layer, which may
//!   answer [`CellValue::Pending`] ("not cached yet — retry later")
//! - [`AggregatorRegistry`] — per-aggregation-type rollup operators
//!
//! Compilation negotiates a result representation per sub-expression (eager,
//! randomly-indexable lists vs single-pass streams — see [`ResultStyle`]), and
//! the compiled [`Compiled`] plan is then evaluated any number of times
//! against an [`Evaluator`], whose context stack supports cheap savepoints so
//! combinators can probe many candidate coordinates and undo every mutation.
//!
//! The pending-computation sentinel is an ordinary result variant
//! ([`CellValue::Pending`]), never a panic or error: combinators keep scanning
//! past it so one evaluation pass surfaces every uncached dependency to the
//! caller's batch loader.

pub mod agg;
pub mod calc;
pub mod compiler;
pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod rank;
pub mod set;
pub mod value;

pub use agg::{AggregatorRegistry, Rollup};
pub use calc::{Compiled, ExpId, IterCalc, ListCalc, MemberCalc, ResultStyle, ScalarCalc, TupleCalc};
pub use compiler::Compiler;
pub use config::EngineConfig;
pub use context::{CellReader, SchemaReader};
pub use error::{CalcError, CalcResult, CompileError, CompileResult};
pub use evaluator::{Evaluator, Savepoint};
pub use expr::{AggKind, Expr, FunDef, SortDirection};
pub use set::{SetList, TupleBuf, TupleList, TupleStream};
pub use value::{CellError, CellValue, Datum};
