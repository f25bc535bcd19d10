//! Hierarchical ordering and value sorts.
//!
//! Two orderings: *Hierarchize* arranges members in depth-first tree order
//! (pre-order puts a parent immediately before its first child, post-order
//! immediately after its last), computed by walking both members up to a
//! common ancestor and comparing the siblings at which they diverge. *Order*
//! sorts by an evaluated scalar: in break mode strictly by value, ignoring
//! the tree; in preserve mode (the default) the value breaks ties only
//! between true siblings, so ancestor/descendant order survives. Tuple
//! comparators extend member comparators lexicographically, fixing the
//! coordinate of earlier positions in the evaluator before evaluating the
//! key at later ones.

use crate::calc::{Compiled, CompiledKind, ListCalc, ScalarCalc};
use crate::compiler::Compiler;
use crate::context::SchemaReader;
use crate::error::{CalcResult, CompileError, CompileResult};
use crate::evaluator::Evaluator;
use crate::expr::{Expr, SortDirection};
use crate::set::{SetList, TupleBuf};
use crate::value::SortKey;
use ahash::{AHashMap, AHashSet};
use cube_model::MemberId;
use std::cmp::Ordering;

pub(crate) fn compile_hierarchize(
    compiler: &mut Compiler<'_>,
    args: &[Expr],
    post: bool,
) -> CompileResult<Compiled> {
    if args.len() != 1 {
        return Err(CompileError::Arity {
            function: "Hierarchize",
            expected: 1,
            actual: args.len(),
        });
    }
    let id = compiler.fresh_id();
    let (_, input) = compiler.compile_list(&args[0])?;
    let arity = input.arity();
    Ok(Compiled {
        id,
        kind: CompiledKind::List(Box::new(HierarchizeCalc { input, post, arity })),
    })
}

pub(crate) fn compile_order(
    compiler: &mut Compiler<'_>,
    args: &[Expr],
    direction: SortDirection,
    break_hierarchy: bool,
) -> CompileResult<Compiled> {
    if args.len() != 2 {
        return Err(CompileError::Arity {
            function: "Order",
            expected: 2,
            actual: args.len(),
        });
    }
    let id = compiler.fresh_id();
    let (_, input) = compiler.compile_list(&args[0])?;
    let key = compiler.compile_scalar(&args[1])?;
    let arity = input.arity();
    Ok(Compiled {
        id,
        kind: CompiledKind::List(Box::new(OrderCalc {
            input,
            key,
            descending: direction == SortDirection::Descending,
            break_hierarchy,
            arity,
        })),
    })
}

// ---------------------------------------------------------------------------
// Hierarchical comparison

fn ascend(schema: &dyn SchemaReader, mut member: MemberId, steps: u32) -> MemberId {
    for _ in 0..steps {
        member = schema
            .parent_of(member)
            .expect("depth invariant violated while ascending");
    }
    member
}

fn sibling_cmp(schema: &dyn SchemaReader, a: MemberId, b: MemberId) -> Ordering {
    schema
        .ordinal_of(a)
        .cmp(&schema.ordinal_of(b))
        // Identity fallback keeps the order deterministic when ordinals tie.
        .then_with(|| a.index().cmp(&b.index()))
}

/// Depth-first tree order of two members of one hierarchy. With `post`,
/// an ancestor sorts after its descendants instead of before.
pub fn hierarchical_cmp(
    schema: &dyn SchemaReader,
    a: MemberId,
    b: MemberId,
    post: bool,
) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let da = schema.depth_of(a);
    let db = schema.depth_of(b);
    let common = da.min(db);
    let mut xa = ascend(schema, a, da - common);
    let mut xb = ascend(schema, b, db - common);
    if xa == xb {
        // One is an ancestor of the other.
        let ancestor_first = if post { Ordering::Greater } else { Ordering::Less };
        return if da < db {
            ancestor_first
        } else {
            ancestor_first.reverse()
        };
    }
    loop {
        match (schema.parent_of(xa), schema.parent_of(xb)) {
            (Some(pa), Some(pb)) if pa != pb => {
                xa = pa;
                xb = pb;
            }
            // Either siblings under one parent, or two distinct roots.
            _ => return sibling_cmp(schema, xa, xb),
        }
    }
}

fn tuple_hierarchical_cmp(
    schema: &dyn SchemaReader,
    a: &[MemberId],
    b: &[MemberId],
    post: bool,
) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = hierarchical_cmp(schema, *x, *y, post);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

struct HierarchizeCalc {
    input: Box<dyn ListCalc>,
    post: bool,
    arity: usize,
}

impl ListCalc for HierarchizeCalc {
    fn arity(&self) -> usize {
        self.arity
    }

    fn evaluate_list(&self, ev: &mut Evaluator<'_>) -> CalcResult<SetList> {
        let list = self.input.evaluate_list(ev)?;
        let mut rows = list.rows();
        let schema = ev.schema();
        let post = self.post;
        rows.sort_by(|a, b| tuple_hierarchical_cmp(schema, a, b, post));
        Ok(SetList::from_rows(self.arity, rows))
    }
}

// ---------------------------------------------------------------------------
// Value sorts

struct OrderCalc {
    input: Box<dyn ListCalc>,
    key: Box<dyn ScalarCalc>,
    descending: bool,
    break_hierarchy: bool,
    arity: usize,
}

impl ListCalc for OrderCalc {
    fn arity(&self) -> usize {
        self.arity
    }

    fn evaluate_list(&self, ev: &mut Evaluator<'_>) -> CalcResult<SetList> {
        let list = self.input.evaluate_list(ev)?;
        let mut rows = list.rows();
        if self.break_hierarchy {
            self.order_break(ev, &mut rows)?;
        } else {
            self.order_preserve(ev, &mut rows, 0)?;
        }
        Ok(SetList::from_rows(self.arity, rows))
    }
}

impl OrderCalc {
    /// Pure value sort: evaluate the key at every element (whole tuple in
    /// context), then sort strictly by key. Stable, so equal keys keep input
    /// order — arbitrary but deterministic.
    fn order_break(&self, ev: &mut Evaluator<'_>, rows: &mut Vec<TupleBuf>) -> CalcResult<()> {
        let mut keys = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let sp = ev.savepoint();
            ev.set_context_tuple(row);
            let value = self.key.evaluate(ev);
            ev.restore(sp);
            keys.push(SortKey::of(&value?));
        }
        let mut index: Vec<usize> = (0..rows.len()).collect();
        let descending = self.descending;
        index.sort_by(|&a, &b| keys[a].compare(&keys[b], descending));
        *rows = index.iter().map(|&i| rows[i].clone()).collect();
        Ok(())
    }

    /// Preserve-hierarchy sort over tuple position `pos`, recursing into
    /// groups that share a member there. The key at position `pos` is
    /// evaluated under the context already fixed by positions `< pos`.
    fn order_preserve(
        &self,
        ev: &mut Evaluator<'_>,
        rows: &mut [TupleBuf],
        pos: usize,
    ) -> CalcResult<()> {
        if rows.len() <= 1 || pos >= self.arity {
            return Ok(());
        }

        let mut distinct: Vec<MemberId> = Vec::new();
        let mut seen: AHashSet<MemberId> = AHashSet::new();
        for row in rows.iter() {
            if seen.insert(row[pos]) {
                distinct.push(row[pos]);
            }
        }

        if distinct.len() > 1 {
            // Keys are needed for the members themselves and for any ancestor
            // at which two of them can diverge as siblings.
            let mut want = distinct.clone();
            for &member in &distinct {
                want.extend(ev.schema().ancestors_of(member));
            }
            let mut keys: AHashMap<MemberId, SortKey> = AHashMap::new();
            for member in want {
                if keys.contains_key(&member) {
                    continue;
                }
                let sp = ev.savepoint();
                ev.set_context_member(member);
                let value = self.key.evaluate(ev);
                ev.restore(sp);
                keys.insert(member, SortKey::of(&value?));
            }

            let schema = ev.schema();
            let descending = self.descending;
            distinct.sort_by(|&a, &b| preserve_cmp(schema, &keys, a, b, descending));
            let rank: AHashMap<MemberId, usize> = distinct
                .iter()
                .enumerate()
                .map(|(i, &m)| (m, i))
                .collect();
            rows.sort_by_key(|row| rank[&row[pos]]);
        }

        // Recurse into runs that share the member at this position.
        let mut start = 0;
        while start < rows.len() {
            let member = rows[start][pos];
            let mut end = start + 1;
            while end < rows.len() && rows[end][pos] == member {
                end += 1;
            }
            if pos + 1 < self.arity && end - start > 1 {
                let sp = ev.savepoint();
                ev.set_context_member(member);
                self.order_preserve(ev, &mut rows[start..end], pos + 1)?;
                ev.restore(sp);
            }
            start = end;
        }
        Ok(())
    }
}

/// Like [`hierarchical_cmp`], but when two members diverge as siblings their
/// evaluated keys decide before the sibling ordinal does. Ancestor/descendant
/// pairs keep tree order regardless of their keys.
fn preserve_cmp(
    schema: &dyn SchemaReader,
    keys: &AHashMap<MemberId, SortKey>,
    a: MemberId,
    b: MemberId,
    descending: bool,
) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let da = schema.depth_of(a);
    let db = schema.depth_of(b);
    let common = da.min(db);
    let mut xa = ascend(schema, a, da - common);
    let mut xb = ascend(schema, b, db - common);
    if xa == xb {
        return if da < db {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    loop {
        match (schema.parent_of(xa), schema.parent_of(xb)) {
            (Some(pa), Some(pb)) if pa != pb => {
                xa = pa;
                xb = pb;
            }
            _ => {
                let by_key = match (keys.get(&xa), keys.get(&xb)) {
                    (Some(ka), Some(kb)) => ka.compare(kb, descending),
                    _ => Ordering::Equal,
                };
                return by_key.then_with(|| sibling_cmp(schema, xa, xb));
            }
        }
    }
}
