use crate::hierarchy::{Dimension, Hierarchy, Level};
use crate::ids::{DimensionId, HierarchyId, LevelId, MemberId};
use crate::member::Member;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate member unique name: {0}")]
    DuplicateMember(String),

    #[error("member parent {parent} belongs to a different hierarchy than level {level}")]
    ParentHierarchyMismatch { parent: String, level: String },

    #[error("hierarchy {0} has no levels")]
    EmptyHierarchy(String),

    #[error("level {level} is not part of hierarchy {hierarchy}")]
    ForeignLevel { level: String, hierarchy: String },
}

/// Arena-owned cube metadata: dimensions, hierarchies, levels and all members.
///
/// The schema is read-only once built and may be shared across concurrent
/// queries; all mutation happens through [`SchemaBuilder`].
#[derive(Clone, Debug)]
pub struct Schema {
    dimensions: Vec<Dimension>,
    hierarchies: Vec<Hierarchy>,
    levels: Vec<Level>,
    members: Vec<Member>,
    children: Vec<Vec<MemberId>>,
    by_unique_name: HashMap<String, MemberId>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn hierarchies(&self) -> &[Hierarchy] {
        &self.hierarchies
    }

    pub fn hierarchy(&self, id: HierarchyId) -> &Hierarchy {
        &self.hierarchies[id.index()]
    }

    pub fn level(&self, id: LevelId) -> &Level {
        &self.levels[id.index()]
    }

    pub fn member(&self, id: MemberId) -> &Member {
        &self.members[id.index()]
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn member_by_unique_name(&self, unique_name: &str) -> Option<MemberId> {
        self.by_unique_name.get(unique_name).copied()
    }

    /// Children in declared order. Empty for leaves.
    pub fn children_of(&self, member: MemberId) -> &[MemberId] {
        &self.children[member.index()]
    }

    /// Child count when the schema already knows it without a storage round
    /// trip. The in-memory schema always knows; remote schema layers may not.
    pub fn children_count_from_cache(&self, member: MemberId) -> Option<usize> {
        Some(self.children[member.index()].len())
    }

    /// Ancestors from the member's parent up to the hierarchy root.
    pub fn ancestors_of(&self, member: MemberId) -> Vec<MemberId> {
        let mut out = Vec::new();
        let mut cur = self.member(member).parent();
        while let Some(p) = cur {
            out.push(p);
            cur = self.member(p).parent();
        }
        out
    }

    pub fn is_drillable(&self, member: MemberId) -> bool {
        !self.children[member.index()].is_empty()
    }

    pub fn level_cardinality(&self, level: LevelId) -> Option<usize> {
        self.level(level).cardinality()
    }

    pub fn root_members_of(&self, hierarchy: HierarchyId) -> &[MemberId] {
        self.hierarchy(hierarchy).root_members()
    }
}

#[derive(Default)]
pub struct SchemaBuilder {
    dimensions: Vec<Dimension>,
    hierarchies: Vec<Hierarchy>,
    levels: Vec<Level>,
    members: Vec<Member>,
    children: Vec<Vec<MemberId>>,
    by_unique_name: HashMap<String, MemberId>,
}

impl SchemaBuilder {
    pub fn add_dimension(&mut self, name: impl Into<String>) -> DimensionId {
        let id = DimensionId::new(self.dimensions.len());
        self.dimensions.push(Dimension {
            id,
            name: name.into(),
            hierarchies: Vec::new(),
        });
        id
    }

    /// Adds a hierarchy. When `all_member_name` is given, a synthetic `(All)`
    /// level and its All member are created at depth 0.
    pub fn add_hierarchy(
        &mut self,
        dimension: DimensionId,
        name: impl Into<String>,
        all_member_name: Option<&str>,
    ) -> HierarchyId {
        let id = HierarchyId::new(self.hierarchies.len());
        let name = name.into();
        self.hierarchies.push(Hierarchy {
            id,
            name,
            dimension,
            levels: Vec::new(),
            has_all: all_member_name.is_some(),
            all_member: None,
            null_member: None,
            root_members: Vec::new(),
        });
        self.dimensions[dimension.index()].hierarchies.push(id);

        if let Some(all_name) = all_member_name {
            let all_level = self.add_level(id, "(All)", Some(1));
            let all = self.push_member(id, all_level, None, all_name, true, false, false);
            let h = &mut self.hierarchies[id.index()];
            h.all_member = Some(all);
            h.root_members.push(all);
        }
        id
    }

    /// The All member created by [`SchemaBuilder::add_hierarchy`], if any.
    pub fn all_member_of(&self, hierarchy: HierarchyId) -> Option<MemberId> {
        self.hierarchies[hierarchy.index()].all_member
    }

    pub fn add_level(
        &mut self,
        hierarchy: HierarchyId,
        name: impl Into<String>,
        cardinality: Option<usize>,
    ) -> LevelId {
        let id = LevelId::new(self.levels.len());
        let depth = self.hierarchies[hierarchy.index()].levels.len() as u32;
        self.levels.push(Level {
            id,
            name: name.into(),
            hierarchy,
            depth,
            cardinality,
        });
        self.hierarchies[hierarchy.index()].levels.push(id);
        id
    }

    pub fn add_member(
        &mut self,
        level: LevelId,
        parent: Option<MemberId>,
        name: impl Into<String>,
    ) -> Result<MemberId, SchemaError> {
        self.add_member_inner(level, parent, name.into(), false)
    }

    /// A member backed by an expression rather than stored data.
    pub fn add_calculated_member(
        &mut self,
        level: LevelId,
        parent: Option<MemberId>,
        name: impl Into<String>,
    ) -> Result<MemberId, SchemaError> {
        self.add_member_inner(level, parent, name.into(), true)
    }

    fn add_member_inner(
        &mut self,
        level: LevelId,
        parent: Option<MemberId>,
        name: String,
        is_calculated: bool,
    ) -> Result<MemberId, SchemaError> {
        let hierarchy = self.levels[level.index()].hierarchy;
        if let Some(p) = parent {
            if self.members[p.index()].hierarchy != hierarchy {
                return Err(SchemaError::ParentHierarchyMismatch {
                    parent: self.members[p.index()].unique_name.clone(),
                    level: self.levels[level.index()].name.clone(),
                });
            }
        }

        let unique_name = match parent {
            Some(p) => format!("{}.[{}]", self.members[p.index()].unique_name, name),
            None => format!("[{}].[{}]", self.hierarchies[hierarchy.index()].name, name),
        };
        if self.by_unique_name.contains_key(&unique_name) {
            return Err(SchemaError::DuplicateMember(unique_name));
        }

        let id = self.push_member(hierarchy, level, parent, &name, false, is_calculated, false);
        if parent.is_none() && !self.hierarchies[hierarchy.index()].has_all {
            self.hierarchies[hierarchy.index()].root_members.push(id);
        }
        Ok(id)
    }

    fn push_member(
        &mut self,
        hierarchy: HierarchyId,
        level: LevelId,
        parent: Option<MemberId>,
        name: &str,
        is_all: bool,
        is_calculated: bool,
        is_null: bool,
    ) -> MemberId {
        let id = MemberId::new(self.members.len());
        let unique_name = match parent {
            Some(p) => format!("{}.[{}]", self.members[p.index()].unique_name, name),
            None => format!("[{}].[{}]", self.hierarchies[hierarchy.index()].name, name),
        };
        let (depth, ordinal) = match parent {
            Some(p) => (
                self.members[p.index()].depth + 1,
                self.children[p.index()].len() as u32,
            ),
            None => (
                0,
                self.hierarchies[hierarchy.index()].root_members.len() as u32,
            ),
        };
        self.members.push(Member {
            id,
            name: name.to_string(),
            unique_name: unique_name.clone(),
            hierarchy,
            level,
            parent,
            depth,
            ordinal,
            is_all,
            is_calculated,
            is_null,
        });
        self.children.push(Vec::new());
        self.by_unique_name.insert(unique_name, id);
        if let Some(p) = parent {
            self.children[p.index()].push(id);
        }
        id
    }

    pub fn build(mut self) -> Result<Schema, SchemaError> {
        for h in 0..self.hierarchies.len() {
            let hid = HierarchyId::new(h);
            let (name, first_level) = {
                let h = &self.hierarchies[h];
                (h.name.clone(), h.levels.first().copied())
            };
            let Some(level) = first_level else {
                return Err(SchemaError::EmptyHierarchy(name));
            };
            // The sentinel is not a root member; it only marks "no member here".
            let null = self.push_member(hid, level, None, "#null", false, false, true);
            self.hierarchies[h].null_member = Some(null);
        }
        Ok(Schema {
            dimensions: self.dimensions,
            hierarchies: self.hierarchies,
            levels: self.levels,
            members: self.members,
            children: self.children,
            by_unique_name: self.by_unique_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn small_schema() -> Schema {
        let mut b = Schema::builder();
        let dim = b.add_dimension("Gender");
        let h = b.add_hierarchy(dim, "Gender", Some("All Gender"));
        let level = b.add_level(h, "Gender", Some(2));
        let all = b.all_member_of(h).unwrap();
        b.add_member(level, Some(all), "F").unwrap();
        b.add_member(level, Some(all), "M").unwrap();
        b.build().unwrap()
    }

    #[test]
    fn unique_names_identify_members() {
        let s = small_schema();
        let f = s.member_by_unique_name("[Gender].[All Gender].[F]").unwrap();
        assert_eq!(s.member(f).name(), "F");
        assert_eq!(s.member(f).depth(), 1);
        assert_eq!(s.member(f).ordinal(), 0);
    }

    #[test]
    fn all_member_is_root_and_parent() {
        let s = small_schema();
        let h = s.hierarchies()[0].id();
        let all = s.hierarchy(h).all_member().unwrap();
        assert!(s.member(all).is_all());
        assert_eq!(s.root_members_of(h), &[all]);
        assert_eq!(s.children_of(all).len(), 2);
        assert_eq!(s.children_count_from_cache(all), Some(2));
    }

    #[test]
    fn ancestors_walk_to_root() {
        let s = small_schema();
        let f = s.member_by_unique_name("[Gender].[All Gender].[F]").unwrap();
        let all = s.member_by_unique_name("[Gender].[All Gender]").unwrap();
        assert_eq!(s.ancestors_of(f), vec![all]);
        assert!(s.ancestors_of(all).is_empty());
    }

    #[test]
    fn duplicate_member_is_rejected() {
        let mut b = Schema::builder();
        let dim = b.add_dimension("Gender");
        let h = b.add_hierarchy(dim, "Gender", Some("All Gender"));
        let level = b.add_level(h, "Gender", None);
        let all = b.all_member_of(h).unwrap();
        b.add_member(level, Some(all), "F").unwrap();
        let err = b.add_member(level, Some(all), "F").unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateMember(_)));
    }

    #[test]
    fn null_member_is_sentinel_not_root() {
        let s = small_schema();
        let h = s.hierarchies()[0].id();
        let null = s.hierarchy(h).null_member().unwrap();
        assert!(s.member(null).is_null());
        assert!(!s.root_members_of(h).contains(&null));
    }
}
