//! Set representations and combinators.
//!
//! Two representations coexist by necessity: *materialized* sets are
//! random-access and possibly mutable in place; *streamed* sets are produced
//! on demand and consumed at most once. The element-shape duality (bare
//! members vs fixed-width tuples) is preserved as a variant distinction so
//! arity-1 sets never pay a wrapping allocation.

pub mod crossjoin;
pub mod filter;
mod list;
pub mod order;
mod stream;
pub mod subset;

pub use list::{TupleCursor, TupleList};
pub use stream::{ListStream, TupleStream};

use cube_model::MemberId;
use smallvec::SmallVec;
use std::rc::Rc;

/// One tuple coordinate: a flat fixed-width array of members, one per
/// hierarchy in the tuple's type. Nested cross-join products concatenate into
/// wider flat tuples, never into trees.
pub type TupleBuf = SmallVec<[MemberId; 4]>;

/// A materialized set of members or tuples.
#[derive(Clone, Debug)]
pub enum SetList {
    /// Arity-1 set, stored as bare members.
    Members(Vec<MemberId>),
    /// Arity-N set with a flat row-major backing array; supports in-place
    /// replacement and removal.
    Tuples(TupleList),
    /// Arithmetically flattened cross product of two sets: element `i` is
    /// `outer[i / |inner|] ++ inner[i % |inner|]`. Never materialized eagerly.
    Product(ProductList),
}

impl SetList {
    pub fn empty(arity: usize) -> Self {
        if arity == 1 {
            SetList::Members(Vec::new())
        } else {
            SetList::Tuples(TupleList::new(arity))
        }
    }

    pub fn from_rows(arity: usize, rows: impl IntoIterator<Item = TupleBuf>) -> Self {
        if arity == 1 {
            SetList::Members(rows.into_iter().map(|r| r[0]).collect())
        } else {
            let mut list = TupleList::new(arity);
            for row in rows {
                list.push(&row);
            }
            SetList::Tuples(list)
        }
    }

    pub fn product(outer: SetList, inner: SetList) -> Self {
        SetList::Product(ProductList::new(outer, inner))
    }

    pub fn arity(&self) -> usize {
        match self {
            SetList::Members(_) => 1,
            SetList::Tuples(t) => t.arity(),
            SetList::Product(p) => p.arity(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SetList::Members(v) => v.len(),
            SetList::Tuples(t) => t.len(),
            SetList::Product(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends element `i` onto `out` without clearing it; used by product
    /// views to build concatenated tuples.
    pub fn append_into(&self, i: usize, out: &mut TupleBuf) {
        match self {
            SetList::Members(v) => out.push(v[i]),
            SetList::Tuples(t) => out.extend_from_slice(t.get(i)),
            SetList::Product(p) => p.append_into(i, out),
        }
    }

    /// Element `i` as a flat tuple.
    pub fn tuple(&self, i: usize) -> TupleBuf {
        let mut out = TupleBuf::new();
        self.append_into(i, &mut out);
        out
    }

    /// A window onto `[offset, offset + len)`.
    ///
    /// On a product view this composes by accumulating the offset and never
    /// copies; plain lists copy the requested range.
    pub fn sub_list(&self, offset: usize, len: usize) -> SetList {
        assert!(offset + len <= self.len(), "sub_list range out of bounds");
        match self {
            SetList::Members(v) => SetList::Members(v[offset..offset + len].to_vec()),
            SetList::Tuples(t) => SetList::Tuples(t.sub_list(offset, len)),
            SetList::Product(p) => SetList::Product(p.sub_list(offset, len)),
        }
    }

    /// All elements as flat tuples. Materializes product views.
    pub fn rows(&self) -> Vec<TupleBuf> {
        (0..self.len()).map(|i| self.tuple(i)).collect()
    }

    /// Packs any representation into a flat mutable [`TupleList`].
    pub fn into_mutable(self) -> TupleList {
        match self {
            SetList::Tuples(t) => t,
            other => {
                let arity = other.arity();
                let mut list = TupleList::with_capacity(arity, other.len());
                let mut buf = TupleBuf::new();
                for i in 0..other.len() {
                    buf.clear();
                    other.append_into(i, &mut buf);
                    list.push(&buf);
                }
                list
            }
        }
    }
}

/// Lazy flat view of `outer × inner`.
///
/// Sub-ranging composes by adding offsets; the child sets are shared, not
/// copied. The view is immutable: a mutable cross join packs into a
/// [`TupleList`] instead.
#[derive(Clone, Debug)]
pub struct ProductList {
    outer: Rc<SetList>,
    inner: Rc<SetList>,
    offset: usize,
    len: usize,
}

impl ProductList {
    pub fn new(outer: SetList, inner: SetList) -> Self {
        let len = outer.len() * inner.len();
        Self {
            outer: Rc::new(outer),
            inner: Rc::new(inner),
            offset: 0,
            len,
        }
    }

    pub fn arity(&self) -> usize {
        self.outer.arity() + self.inner.arity()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn append_into(&self, i: usize, out: &mut TupleBuf) {
        debug_assert!(i < self.len);
        let flat = self.offset + i;
        let inner_len = self.inner.len();
        self.outer.append_into(flat / inner_len, out);
        self.inner.append_into(flat % inner_len, out);
    }

    pub fn sub_list(&self, offset: usize, len: usize) -> ProductList {
        ProductList {
            outer: Rc::clone(&self.outer),
            inner: Rc::clone(&self.inner),
            offset: self.offset + offset,
            len,
        }
    }
}
