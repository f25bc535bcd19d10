//! Collaborator traits.
//!
//! The engine never owns schema metadata or cell storage; it reads both
//! through the narrow traits below. `cube_model::Schema` implements
//! [`SchemaReader`] so fixtures and in-memory cubes work out of the box.

use crate::set::TupleList;
use crate::value::CellValue;
use cube_model::{HierarchyId, LevelId, MemberId, Schema};

/// Read-only member/level/hierarchy metadata.
///
/// Implementations may cache internally; all answers must be stable for the
/// lifetime of one query. The member graph is shareable across concurrent
/// queries.
pub trait SchemaReader {
    fn hierarchy_count(&self) -> usize;
    fn hierarchy_of(&self, member: MemberId) -> HierarchyId;
    fn parent_of(&self, member: MemberId) -> Option<MemberId>;
    fn depth_of(&self, member: MemberId) -> u32;
    fn ordinal_of(&self, member: MemberId) -> u32;
    fn is_all(&self, member: MemberId) -> bool;
    fn unique_name(&self, member: MemberId) -> &str;

    /// Children in declared order.
    fn children_of(&self, member: MemberId) -> &[MemberId];

    /// Child count if already known without a storage round trip.
    fn children_count_from_cache(&self, member: MemberId) -> Option<usize>;

    /// Ancestors from the parent up to the hierarchy root.
    fn ancestors_of(&self, member: MemberId) -> Vec<MemberId>;

    fn is_drillable(&self, member: MemberId) -> bool;
    fn level_cardinality(&self, level: LevelId) -> Option<usize>;
    fn root_members_of(&self, hierarchy: HierarchyId) -> &[MemberId];

    /// The member occupying a hierarchy's coordinate slot when the query does
    /// not pin one (the All member where present).
    fn default_member_of(&self, hierarchy: HierarchyId) -> MemberId;
}

impl SchemaReader for Schema {
    fn hierarchy_count(&self) -> usize {
        self.hierarchies().len()
    }

    fn hierarchy_of(&self, member: MemberId) -> HierarchyId {
        self.member(member).hierarchy()
    }

    fn parent_of(&self, member: MemberId) -> Option<MemberId> {
        self.member(member).parent()
    }

    fn depth_of(&self, member: MemberId) -> u32 {
        self.member(member).depth()
    }

    fn ordinal_of(&self, member: MemberId) -> u32 {
        self.member(member).ordinal()
    }

    fn is_all(&self, member: MemberId) -> bool {
        self.member(member).is_all()
    }

    fn unique_name(&self, member: MemberId) -> &str {
        self.member(member).unique_name()
    }

    fn children_of(&self, member: MemberId) -> &[MemberId] {
        Schema::children_of(self, member)
    }

    fn children_count_from_cache(&self, member: MemberId) -> Option<usize> {
        Schema::children_count_from_cache(self, member)
    }

    fn ancestors_of(&self, member: MemberId) -> Vec<MemberId> {
        Schema::ancestors_of(self, member)
    }

    fn is_drillable(&self, member: MemberId) -> bool {
        Schema::is_drillable(self, member)
    }

    fn level_cardinality(&self, level: LevelId) -> Option<usize> {
        Schema::level_cardinality(self, level)
    }

    fn root_members_of(&self, hierarchy: HierarchyId) -> &[MemberId] {
        Schema::root_members_of(self, hierarchy)
    }

    fn default_member_of(&self, hierarchy: HierarchyId) -> MemberId {
        self.hierarchy(hierarchy).default_member()
    }
}

/// Cell values from the storage/cache layer.
///
/// `cell_value` must not block: when the value is not cached yet it answers
/// [`CellValue::Pending`], and the caller's batch loader re-drives evaluation
/// once the cache is populated. A [`CellValue::Error`] is a terminal per-cell
/// failure and must not abort the surrounding combinator.
pub trait CellReader {
    /// Value of the cell at the given coordinate (one member per hierarchy,
    /// indexed by hierarchy).
    fn cell_value(&self, coordinate: &[MemberId]) -> CellValue;

    /// Distinct-count style aggregates cannot fold incrementally; the storage
    /// layer receives the reduced predicate list and computes the aggregate
    /// over it in one shot.
    fn aggregated_value(&self, coordinate: &[MemberId], predicates: &TupleList) -> CellValue;
}
