//! Distinct-count tuple-set reduction.
//!
//! The predicate list handed to the storage layer is shrunk before dispatch:
//! duplicates are dropped, tuples subsumed by a more specific kept tuple can
//! be dropped (gated off by default — the quadratic scan only pays off under
//! small predicate-list limits), and a complete "all children of P × all
//! children of Q" pattern is factored back down to "P × Q". The reduced list
//! denotes the same set of distinct leaf tuples as the input.

use crate::calc::{ListCalc, ScalarCalc};
use crate::config::EngineConfig;
use crate::context::SchemaReader;
use crate::error::{CalcError, CalcResult};
use crate::evaluator::Evaluator;
use crate::set::{SetList, TupleBuf, TupleList};
use crate::value::CellValue;
use ahash::{AHashMap, AHashSet};
use cube_model::MemberId;

pub(crate) struct DistinctCountCalc {
    set: Box<dyn ListCalc>,
}

impl DistinctCountCalc {
    pub(crate) fn new(set: Box<dyn ListCalc>) -> Self {
        Self { set }
    }
}

impl ScalarCalc for DistinctCountCalc {
    fn evaluate(&self, ev: &mut Evaluator<'_>) -> CalcResult<CellValue> {
        let set = self.set.evaluate_list(ev)?;
        let predicates = reduce(ev.schema(), ev.config(), &set)?;
        // Distinct count cannot fold per element; the storage layer receives
        // the whole predicate list as one deferred aggregation.
        Ok(ev.evaluate_deferred_aggregate(predicates))
    }
}

/// Reduces a tuple set to an equivalent, usually smaller predicate list.
/// Bare-member sets are collapsed into single-element tuples for uniform
/// handling first.
pub(crate) fn reduce(
    schema: &dyn SchemaReader,
    config: &EngineConfig,
    set: &SetList,
) -> CalcResult<TupleList> {
    let arity = set.arity();
    let mut rows = set.rows();

    let mut seen: AHashSet<TupleBuf> = AHashSet::with_capacity(rows.len());
    rows.retain(|row| seen.insert(row.clone()));

    if config.remove_overlapping_distinct_tuples {
        rows = remove_overlapping(schema, rows);
    }
    rows = factor_sibling_groups(schema, arity, rows);

    let limit = config.distinct_count_predicate_limit;
    if rows.len() > limit {
        return Err(CalcError::PredicateListLimit {
            actual: rows.len(),
            limit,
        });
    }

    let mut predicates = TupleList::with_capacity(arity, rows.len());
    for row in &rows {
        predicates.push(row);
    }
    Ok(predicates)
}

fn is_ancestor(schema: &dyn SchemaReader, ancestor: MemberId, member: MemberId) -> bool {
    let mut cursor = schema.parent_of(member);
    while let Some(parent) = cursor {
        if parent == ancestor {
            return true;
        }
        cursor = schema.parent_of(parent);
    }
    false
}

/// Whether `a` denotes a strict superset of `b`: every position an
/// ancestor-or-self of `b`'s, at least one a strict ancestor.
fn strictly_generalizes(schema: &dyn SchemaReader, a: &[MemberId], b: &[MemberId]) -> bool {
    let mut strict = false;
    for (&x, &y) in a.iter().zip(b.iter()) {
        if x == y {
            continue;
        }
        if is_ancestor(schema, x, y) {
            strict = true;
        } else {
            return false;
        }
    }
    strict
}

/// Drops every tuple that is a strict generalization of another tuple still
/// in the list; the more specific tuple already accounts for its members.
fn remove_overlapping(schema: &dyn SchemaReader, rows: Vec<TupleBuf>) -> Vec<TupleBuf> {
    let mut removed = vec![false; rows.len()];
    for i in 0..rows.len() {
        for j in 0..rows.len() {
            if i == j || removed[j] {
                continue;
            }
            if strictly_generalizes(schema, &rows[i], &rows[j]) {
                removed[i] = true;
                break;
            }
        }
    }
    rows.into_iter()
        .zip(removed)
        .filter(|(_, gone)| !gone)
        .map(|(row, _)| row)
        .collect()
}

/// Factors a full cross product of complete sibling groups down to their
/// parents: when the rows are exactly the product of the per-position member
/// sets, each position whose distinct members form a parent's entire child
/// set is replaced by that parent (repeatedly, so states roll up to a country
/// and countries to the All member), and the product is re-formed.
///
/// Applies only when the row count equals the product of per-position
/// distinct counts — a partial product cannot be factored without changing
/// which leaf tuples it denotes.
fn factor_sibling_groups(
    schema: &dyn SchemaReader,
    arity: usize,
    rows: Vec<TupleBuf>,
) -> Vec<TupleBuf> {
    if rows.len() <= 1 {
        return rows;
    }

    let mut positions: Vec<Vec<MemberId>> = vec![Vec::new(); arity];
    for (pos, members) in positions.iter_mut().enumerate() {
        let mut seen: AHashSet<MemberId> = AHashSet::new();
        for row in &rows {
            if seen.insert(row[pos]) {
                members.push(row[pos]);
            }
        }
    }

    let product: usize = positions.iter().map(Vec::len).product();
    if product != rows.len() {
        return rows;
    }

    for members in &mut positions {
        loop {
            let factored = factor_position(schema, members);
            if factored == *members {
                break;
            }
            *members = factored;
        }
    }

    cross_product(&positions)
}

/// One factoring step over the distinct members of a single tuple position.
fn factor_position(schema: &dyn SchemaReader, members: &[MemberId]) -> Vec<MemberId> {
    let mut groups: Vec<(Option<MemberId>, Vec<MemberId>)> = Vec::new();
    let mut index: AHashMap<Option<MemberId>, usize> = AHashMap::new();
    for &member in members {
        let parent = schema.parent_of(member);
        let slot = *index.entry(parent).or_insert_with(|| {
            groups.push((parent, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(member);
    }

    let mut out = Vec::with_capacity(members.len());
    for (parent, group) in groups {
        match parent {
            Some(parent)
                if schema.children_count_from_cache(parent) == Some(group.len()) =>
            {
                if schema.is_all(parent) {
                    // Everything in the hierarchy sits under the All member;
                    // it subsumes this whole position.
                    return vec![parent];
                }
                out.push(parent);
            }
            _ => out.extend(group),
        }
    }
    out
}

/// Row-major cross product of the per-position member sets.
fn cross_product(positions: &[Vec<MemberId>]) -> Vec<TupleBuf> {
    let total: usize = positions.iter().map(Vec::len).product();
    let mut rows = Vec::with_capacity(total);
    let mut row: TupleBuf = positions.iter().map(|p| p[0]).collect();
    let mut counters = vec![0usize; positions.len()];
    for _ in 0..total {
        rows.push(row.clone());
        for pos in (0..positions.len()).rev() {
            counters[pos] += 1;
            if counters[pos] < positions[pos].len() {
                row[pos] = positions[pos][counters[pos]];
                break;
            }
            counters[pos] = 0;
            row[pos] = positions[pos][0];
        }
    }
    rows
}
