//! Family traversal and aggregation engine.
//!
//! Everything here reads through [`PersonRepository`](crate::people::PersonRepository)
//! and never writes. Traversals are best-effort: a lookup that fails inside a
//! branch drops that branch (with a log line) instead of failing the call.
//! Only failures on the entity a call is rooted at, or on a full-population
//! scan, are returned to the caller.

mod generations;
mod houses;
mod overview;
mod relations;
mod statistics;
mod tree;

pub use generations::{classify, generation_label, lowest_levels, Generation};
pub use houses::{all_houses, by_house, house_summary, HouseMember, HouseSummary, HouseView};
pub use overview::{
    comprehensive, population_edges, relationships_table, ComprehensiveFamilyTree,
    RelationshipRow, RelationshipsTable, TableSummary,
};
pub use relations::{resolve_all, PersonWithRelationships};
pub use statistics::{aggregate, aggregate_as_of, FamilyStatistics};
pub use tree::{build_tree, FamilyTreeNode};

use serde::Serialize;

use crate::people::PersonId;

/// Role in a flattened relationship edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Father,
    Mother,
    Child,
}

/// Directed edge: `person_id` is the `relationship` of `related_to_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyRelationship {
    pub person_id: PersonId,
    pub related_to_id: PersonId,
    pub relationship: RelationshipKind,
}

/// Both directions of one parent link.
pub(crate) fn parent_edges(
    child_id: PersonId,
    parent_id: PersonId,
    parent_kind: RelationshipKind,
) -> [FamilyRelationship; 2] {
    [
        FamilyRelationship {
            person_id: child_id,
            related_to_id: parent_id,
            relationship: RelationshipKind::Child,
        },
        FamilyRelationship {
            person_id: parent_id,
            related_to_id: child_id,
            relationship: parent_kind,
        },
    ]
}
