use crate::error::CalcResult;
use crate::evaluator::Evaluator;
use crate::set::{SetList, TupleBuf};

/// A streamed set: tuples produced on demand, consumed at most once.
///
/// The evaluator is passed into every pull rather than captured, so a stream
/// never holds a borrow of the evaluation context between steps. Re-iteration
/// is expressed by asking the originating [`crate::IterCalc`] for a fresh
/// stream.
pub trait TupleStream {
    fn arity(&self) -> usize;

    fn next(&mut self, ev: &mut Evaluator<'_>) -> CalcResult<Option<TupleBuf>>;
}

/// Adapter: a materialized list consumed as a one-pass stream.
pub struct ListStream {
    list: SetList,
    pos: usize,
}

impl ListStream {
    pub fn new(list: SetList) -> Self {
        Self { list, pos: 0 }
    }
}

impl TupleStream for ListStream {
    fn arity(&self) -> usize {
        self.list.arity()
    }

    fn next(&mut self, _ev: &mut Evaluator<'_>) -> CalcResult<Option<TupleBuf>> {
        if self.pos >= self.list.len() {
            return Ok(None);
        }
        let tuple = self.list.tuple(self.pos);
        self.pos += 1;
        Ok(Some(tuple))
    }
}
