//! Category Model
//!
//! Categories form a tree via `parent_id`. Each row carries a materialized
//! `path` (ancestor ids ending in the row's own id) and `depth`, both
//! derived and written by the catalog manager at write time. A node whose
//! parent is later re-placed keeps its old `path`/`depth` until it is
//! itself rewritten.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    /// None marks a root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    /// Materialized ancestor chain, terminating in `id`
    pub path: Vec<i64>,
    /// 0 for roots, `parent.depth + 1` otherwise
    pub depth: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

fn default_true() -> bool {
    true
}

/// Input for creating a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

/// Nested tree node for the read side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTreeNode {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub path: Vec<i64>,
    pub depth: u32,
    pub children: Vec<CategoryTreeNode>,
}

impl From<&Category> for CategoryTreeNode {
    fn from(cat: &Category) -> Self {
        Self {
            id: cat.id,
            name: cat.name.clone(),
            parent_id: cat.parent_id,
            path: cat.path.clone(),
            depth: cat.depth,
            children: Vec::new(),
        }
    }
}
