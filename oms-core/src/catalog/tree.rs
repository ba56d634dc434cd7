//! Materialized-path placement
//!
//! `place` derives the stored `path`/`depth` of a single node from its
//! parent's current row. It is only ever applied to the node being
//! written: when a node with existing children is re-placed, the children
//! keep their old paths until they are themselves rewritten. Cycle
//! prevention is the caller's responsibility (a path check before
//! reparenting); nothing here can detect a cycle from one node's
//! perspective.

use shared::catalog::Category;

/// Derive `(path, depth)` for a node under the given parent row.
///
/// Root placement: `([id], 0)`. Child placement: parent path extended by
/// `id`, parent depth + 1. The parent row must be the transaction-visible
/// current row so an in-flight parent update is observed.
pub fn place(id: i64, parent: Option<&Category>) -> (Vec<i64>, u32) {
    match parent {
        None => (vec![id], 0),
        Some(parent) => {
            let mut path = parent.path.clone();
            path.push(id);
            (path, parent.depth + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::util::now_millis;
    use uuid::Uuid;

    fn category(id: i64, parent_id: Option<i64>, path: Vec<i64>, depth: u32) -> Category {
        let now = now_millis();
        Category {
            id,
            uuid: Uuid::new_v4(),
            name: format!("cat-{id}"),
            parent_id,
            path,
            depth,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn root_gets_own_id_path_and_zero_depth() {
        assert_eq!(place(7, None), (vec![7], 0));
    }

    #[test]
    fn child_extends_parent_path() {
        let parent = category(1, None, vec![1], 0);
        assert_eq!(place(2, Some(&parent)), (vec![1, 2], 1));
    }

    #[test]
    fn grandchild_extends_full_chain() {
        let parent = category(2, Some(1), vec![1, 2], 1);
        assert_eq!(place(5, Some(&parent)), (vec![1, 2, 5], 2));
    }

    #[test]
    fn placement_reads_parent_as_is_even_if_stale() {
        // A parent whose own path went stale propagates the stale chain;
        // placement never walks further up than the one row it is given.
        let stale_parent = category(3, Some(2), vec![9, 3], 1);
        assert_eq!(place(4, Some(&stale_parent)), (vec![9, 3, 4], 2));
    }
}
