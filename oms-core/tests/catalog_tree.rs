//! Category tree integration tests
//!
//! Pins the write-time placement invariant and its documented gap: the
//! path of a node reflects its parent chain as of the node's own last
//! write, and reparenting never rewrites descendants.

use anyhow::Result;
use oms_core::{CatalogError, CatalogManager, Category, CategoryCreate, Storage};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn create(catalog: &CatalogManager, name: &str, parent_id: Option<i64>) -> Category {
    catalog
        .create_category(CategoryCreate {
            name: name.to_string(),
            parent_id,
        })
        .unwrap()
}

/// Every freshly placed node satisfies `path == parent.path ++ [id]` and
/// `depth == parent.depth + 1`; roots get `[id]` and depth 0
#[test]
fn placement_invariant_holds_for_fresh_writes() -> Result<()> {
    init_tracing();
    let catalog = CatalogManager::new(Storage::open_in_memory()?);

    let root = create(&catalog, "Warehouse", None);
    assert_eq!(root.path, vec![root.id]);
    assert_eq!(root.depth, 0);

    let mut parent = root;
    for name in ["Aisles", "Shelves", "Bins"] {
        let child = create(&catalog, name, Some(parent.id));
        let mut expected = parent.path.clone();
        expected.push(child.id);
        assert_eq!(child.path, expected);
        assert_eq!(child.depth, parent.depth + 1);
        parent = child;
    }

    Ok(())
}

/// Regression pin for the documented gap: a reparented node's descendants
/// keep their old path and depth until they are themselves rewritten
#[test]
fn reparenting_does_not_cascade_to_descendants() -> Result<()> {
    init_tracing();
    let catalog = CatalogManager::new(Storage::open_in_memory()?);

    let a = create(&catalog, "A", None);
    let b = create(&catalog, "B", None);
    let mid = create(&catalog, "Mid", Some(a.id));
    let deep = create(&catalog, "Deep", Some(mid.id));
    let leaf = create(&catalog, "Leaf", Some(deep.id));

    let moved = catalog.reparent_category(mid.id, Some(b.id))?;
    assert_eq!(moved.path, vec![b.id, mid.id]);

    // the whole subtree below the moved node still records the old chain
    for id in [deep.id, leaf.id] {
        let row = catalog.get_category(id)?;
        assert!(
            row.path.starts_with(&[a.id]),
            "descendant {} must keep its stale path, got {:?}",
            id,
            row.path
        );
    }

    // rewriting a descendant picks up the new chain one node at a time
    let deep_rewritten = catalog.reparent_category(deep.id, Some(mid.id))?;
    assert_eq!(deep_rewritten.path, vec![b.id, mid.id, deep.id]);
    let leaf_row = catalog.get_category(leaf.id)?;
    assert_eq!(leaf_row.path, vec![a.id, mid.id, deep.id, leaf.id]);

    Ok(())
}

/// Reparenting to a missing or inactive parent is a validation failure,
/// not a retryable conflict
#[test]
fn missing_parent_is_not_retryable() -> Result<()> {
    init_tracing();
    let catalog = CatalogManager::new(Storage::open_in_memory()?);
    let node = create(&catalog, "Node", None);

    let err = catalog.reparent_category(node.id, Some(999)).unwrap_err();
    match &err {
        CatalogError::MissingParent(999) => {}
        other => panic!("Expected MissingParent, got {other:?}"),
    }
    assert!(!err.code().is_retryable());

    // the failed move left the node untouched
    let row = catalog.get_category(node.id)?;
    assert_eq!(row.parent_id, None);
    assert_eq!(row.path, vec![node.id]);

    Ok(())
}

/// The nested tree read reflects parent edges and omits deleted subtrees
#[test]
fn tree_read_follows_parent_edges() -> Result<()> {
    init_tracing();
    let catalog = CatalogManager::new(Storage::open_in_memory()?);

    let root = create(&catalog, "Root", None);
    let kept = create(&catalog, "Kept", Some(root.id));
    let doomed = create(&catalog, "Doomed", Some(root.id));
    create(&catalog, "DoomedChild", Some(doomed.id));

    catalog.delete_category(doomed.id)?;

    let tree = catalog.tree()?;
    assert_eq!(tree.len(), 1);
    let children: Vec<i64> = tree[0].children.iter().map(|n| n.id).collect();
    assert_eq!(children, vec![kept.id]);

    Ok(())
}
