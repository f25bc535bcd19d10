use crate::calc::ResultStyle;
use crate::value::CellError;

pub type CompileResult<T> = Result<T, CompileError>;
pub type CalcResult<T> = Result<T, CalcError>;

/// Compile-time failures. These never occur during evaluation: a plan that
/// compiled will not raise them.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("no acceptable result style: caller accepts {wanted:?}, expression produces {produced:?}")]
    StyleMismatch {
        wanted: Vec<ResultStyle>,
        produced: ResultStyle,
    },

    #[error("{function} expects {expected} arguments, got {actual}")]
    Arity {
        function: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{function} argument {argument} cannot be a set of arity {arity}")]
    BadArity {
        function: &'static str,
        argument: usize,
        arity: usize,
    },
}

/// Evaluation-time typed failures.
///
/// Resource-limit errors are fatal to the current expression evaluation and
/// carry both the computed size and the configured limit for diagnostics.
/// Structural/programming errors (context push/pop mismatch, cursor
/// invalidation) are panics, not variants here.
#[derive(Debug, thiserror::Error)]
pub enum CalcError {
    #[error("cross join product of {actual} tuples exceeds the configured limit of {limit}")]
    ResourceLimit { actual: u64, limit: u64 },

    #[error("distinct-count predicate list of {actual} tuples exceeds the configured maximum of {limit}")]
    PredicateListLimit { actual: usize, limit: usize },

    #[error(transparent)]
    Cell(#[from] CellError),
}
