//! Descendant tree assembly.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::Result;
use crate::people::{Person, PersonId, PersonRepository};

/// A person and the subtrees of their children, in repository order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyTreeNode {
    pub person: Person,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FamilyTreeNode>,
    /// Some or all children were not expanded because the depth bound or
    /// the node budget was hit.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl FamilyTreeNode {
    fn leaf(person: Person) -> Self {
        Self {
            person,
            children: Vec::new(),
            truncated: false,
        }
    }

    /// Number of people in this subtree, root included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(FamilyTreeNode::size).sum::<usize>()
    }
}

/// Build the descendant tree rooted at `person_id`.
///
/// Fails if the root cannot be resolved or its children cannot be listed.
/// Below the root, a child whose subtree hits a lookup error is left out.
///
/// A descendant reachable through several parents (cousin marriages) is
/// expanded under each of them, so the tree can be far larger than the
/// population. Two bounds keep the walk finite:
///
/// * nodes at `max_depth` (root = 0) are not expanded;
/// * at most `max_nodes` people are visited in the whole build, and a node
///   whose remaining children did not fit is flagged `truncated`.
///
/// A child that is already an ancestor on the current path is skipped, so
/// self-parenting and parent loops end the branch.
pub fn build_tree<R: PersonRepository + ?Sized>(
    repo: &R,
    person_id: PersonId,
    max_depth: usize,
    max_nodes: usize,
) -> Result<FamilyTreeNode> {
    let mut builder = TreeBuilder {
        repo,
        max_depth,
        max_nodes,
        visited: 0,
        path: HashSet::new(),
    };
    builder.subtree(person_id, 0)
}

struct TreeBuilder<'r, R: ?Sized> {
    repo: &'r R,
    max_depth: usize,
    max_nodes: usize,
    visited: usize,
    path: HashSet<PersonId>,
}

impl<R: PersonRepository + ?Sized> TreeBuilder<'_, R> {
    fn subtree(&mut self, person_id: PersonId, depth: usize) -> Result<FamilyTreeNode> {
        self.visited += 1;
        let person = self.repo.get(person_id)?;
        let children = self.repo.find_by_parent(person_id)?;

        let mut node = FamilyTreeNode::leaf(person);
        if children.is_empty() {
            return Ok(node);
        }
        if depth >= self.max_depth {
            log::debug!("Tree depth limit {} reached at person {}", self.max_depth, person_id);
            node.truncated = true;
            return Ok(node);
        }

        self.path.insert(person_id);
        for child in children {
            if self.visited >= self.max_nodes {
                log::debug!("Tree node budget {} spent at person {}", self.max_nodes, person_id);
                node.truncated = true;
                break;
            }
            if self.path.contains(&child.id) {
                log::warn!(
                    "Parent cycle: person {} is both ancestor and child of {}, skipping",
                    child.id,
                    person_id
                );
                continue;
            }
            match self.subtree(child.id, depth + 1) {
                Ok(child_node) => node.children.push(child_node),
                Err(e) => log::debug!("Skipping subtree of person {}: {}", child.id, e),
            }
        }
        self.path.remove(&person_id);

        Ok(node)
    }
}
