use crate::value::Datum;
use cube_model::{HierarchyId, MemberId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Aggregation type carried by a resolved aggregate call. Distinct count is
/// recognized by kind and routed through the tuple-set reduction instead of
/// the generic rollup path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggKind {
    Sum,
    Count,
    Min,
    Max,
    DistinctCount,
}

/// A resolved function definition. Resolution (name lookup, overload choice,
/// flag parsing) happens in the query-language layer outside this core; by
/// the time an expression reaches the compiler its function is already fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunDef {
    CrossJoin,
    Filter,
    /// `Order(set, key[, direction])`. Without an explicit BREAK flag the sort
    /// preserves ancestor/descendant order and uses the key only between true
    /// siblings.
    Order {
        direction: SortDirection,
        break_hierarchy: bool,
    },
    Hierarchize {
        post: bool,
    },
    Aggregate {
        kind: AggKind,
    },
    Rank,
    Head,
    Tail,
    Subset,
}

/// A resolved expression tree, as handed over by the parser/validator.
#[derive(Clone, Debug)]
pub enum Expr {
    Literal(Datum),
    Member(MemberId),
    Tuple(Vec<MemberId>),
    Set {
        arity: usize,
        rows: Vec<Vec<MemberId>>,
    },
    /// The member currently occupying the hierarchy's coordinate slot.
    CurrentMember(HierarchyId),
    Call {
        fun: FunDef,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn call(fun: FunDef, args: Vec<Expr>) -> Self {
        Expr::Call { fun, args }
    }

    /// An arity-1 set literal.
    pub fn members(members: Vec<MemberId>) -> Self {
        Expr::Set {
            arity: 1,
            rows: members.into_iter().map(|m| vec![m]).collect(),
        }
    }

    pub fn tuples(arity: usize, rows: Vec<Vec<MemberId>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == arity));
        Expr::Set { arity, rows }
    }

    pub fn crossjoin(left: Expr, right: Expr) -> Self {
        Expr::call(FunDef::CrossJoin, vec![left, right])
    }

    pub fn filter(set: Expr, predicate: Expr) -> Self {
        Expr::call(FunDef::Filter, vec![set, predicate])
    }
}
