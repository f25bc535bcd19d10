#![forbid(unsafe_code)]

//! `cube-model` defines the passive coordinate model of a multidimensional cube:
//! dimensions, hierarchies, levels, and the member tree.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the calculation engine (`cube-calc`)
//! - storage and caching layers that key cells by member coordinates
//! - test fixtures that need a small in-memory cube
//!
//! Members are owned top-down by [`Schema`] in a single arena; a member's parent
//! link is an index into that arena ([`MemberId`]), never an owning pointer, so
//! hierarchy traversal carries no lifetime or ownership coupling.

mod hierarchy;
mod ids;
mod member;
mod schema;

pub use hierarchy::{Dimension, Hierarchy, Level};
pub use ids::{DimensionId, HierarchyId, LevelId, MemberId};
pub use member::Member;
pub use schema::{Schema, SchemaBuilder, SchemaError};
