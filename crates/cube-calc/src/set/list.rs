use cube_model::MemberId;

/// A materialized arity-N tuple set packed into one flat row-major backing
/// array (width = arity), so in-place replacement and removal touch only that
/// array.
///
/// Structural changes (removal) bump a generation counter; a [`TupleCursor`]
/// taken before the change fails fast on its next access instead of silently
/// reading shifted rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TupleList {
    arity: usize,
    backing: Vec<MemberId>,
    generation: u64,
}

impl TupleList {
    pub fn new(arity: usize) -> Self {
        assert!(arity > 0, "tuple arity must be positive");
        Self {
            arity,
            backing: Vec::new(),
            generation: 0,
        }
    }

    pub fn with_capacity(arity: usize, rows: usize) -> Self {
        let mut list = Self::new(arity);
        list.backing.reserve(rows * arity);
        list
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn len(&self) -> usize {
        self.backing.len() / self.arity
    }

    pub fn is_empty(&self) -> bool {
        self.backing.is_empty()
    }

    pub fn push(&mut self, tuple: &[MemberId]) {
        debug_assert_eq!(tuple.len(), self.arity, "tuple width mismatch");
        self.backing.extend_from_slice(tuple);
    }

    pub fn get(&self, i: usize) -> &[MemberId] {
        &self.backing[i * self.arity..(i + 1) * self.arity]
    }

    /// Overwrites row `i` in place. Not a structural change: cursors stay
    /// valid.
    pub fn replace(&mut self, i: usize, tuple: &[MemberId]) {
        debug_assert_eq!(tuple.len(), self.arity, "tuple width mismatch");
        self.backing[i * self.arity..(i + 1) * self.arity].copy_from_slice(tuple);
    }

    /// Removes row `i`, shifting the remainder of the backing array.
    pub fn remove(&mut self, i: usize) {
        let start = i * self.arity;
        self.backing.drain(start..start + self.arity);
        self.generation += 1;
    }

    pub fn sub_list(&self, offset: usize, len: usize) -> TupleList {
        TupleList {
            arity: self.arity,
            backing: self.backing[offset * self.arity..(offset + len) * self.arity].to_vec(),
            generation: 0,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[MemberId]> {
        self.backing.chunks_exact(self.arity)
    }

    /// Index-based cursor that detects structural modification.
    pub fn cursor(&self) -> TupleCursor {
        TupleCursor {
            pos: 0,
            generation: self.generation,
        }
    }
}

/// Position into a [`TupleList`] that does not borrow it, so rows can be
/// replaced between steps. Removal invalidates the cursor: the next access
/// panics (a combinator bug, not a data condition).
#[derive(Clone, Copy, Debug)]
pub struct TupleCursor {
    pos: usize,
    generation: u64,
}

impl TupleCursor {
    pub fn next<'a>(&mut self, list: &'a TupleList) -> Option<&'a [MemberId]> {
        assert_eq!(
            self.generation, list.generation,
            "tuple list structurally modified during iteration"
        );
        if self.pos >= list.len() {
            return None;
        }
        let row = list.get(self.pos);
        self.pos += 1;
        Some(row)
    }
}
