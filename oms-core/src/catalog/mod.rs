//! Catalog manager - category tree maintenance
//!
//! Owns the `path`/`depth` fields of category rows. Creating or
//! reparenting a category places that single node from its parent's
//! transaction-visible row; descendants of a reparented node keep their
//! old paths until they are themselves rewritten. Deletion cascades to
//! descendants by walking `parent_id` edges, which stay correct even when
//! materialized paths are stale.

pub mod tree;

use crate::audit::Touch;
use crate::storage::{Storage, StorageError};
use shared::catalog::{Category, CategoryCreate, CategoryTreeNode};
use shared::error::ErrorCode;
use shared::util::now_millis;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Parent category not found: {0}")]
    MissingParent(i64),

    #[error("Category not found: {0}")]
    NotFound(i64),

    #[error("Category '{0}' already exists under the same parent")]
    DuplicateName(String),

    #[error("Category name must not be empty")]
    EmptyName,
}

impl CatalogError {
    /// Stable classification for the embedding service layer
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Storage(_) => ErrorCode::Storage,
            Self::MissingParent(_) => ErrorCode::Validation,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::DuplicateName(_) => ErrorCode::Conflict,
            Self::EmptyName => ErrorCode::Validation,
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Category tree manager
#[derive(Debug, Clone)]
pub struct CatalogManager {
    storage: Storage,
}

impl CatalogManager {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Create a category, placing it under its (possibly absent) parent
    pub fn create_category(&self, data: CategoryCreate) -> CatalogResult<Category> {
        if data.name.trim().is_empty() {
            return Err(CatalogError::EmptyName);
        }

        let txn = self.storage.begin_write()?;
        let category = {
            let parent = self.resolve_parent(&txn, data.parent_id)?;
            self.check_sibling_name(&txn, data.parent_id, &data.name, None)?;

            let id = self.storage.next_id(&txn, "category")?;
            let (path, depth) = tree::place(id, parent.as_ref());
            let now = now_millis();
            let category = Category {
                id,
                uuid: Uuid::new_v4(),
                name: data.name,
                parent_id: data.parent_id,
                path,
                depth,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            self.storage.put_category(&txn, &category)?;
            category
        };
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            category_id = category.id,
            depth = category.depth,
            "Category created"
        );
        Ok(category)
    }

    /// Move a category under a new parent (or to the root)
    ///
    /// Re-places only the moved node. Existing descendants keep their old
    /// `path`/`depth` until rewritten. Callers must rule out cycles with a
    /// path check before invoking this; the placement itself cannot detect
    /// them.
    pub fn reparent_category(
        &self,
        id: i64,
        new_parent_id: Option<i64>,
    ) -> CatalogResult<Category> {
        let txn = self.storage.begin_write()?;
        let category = {
            let mut category = self
                .storage
                .get_category_txn(&txn, id)?
                .ok_or(CatalogError::NotFound(id))?;
            let parent = self.resolve_parent(&txn, new_parent_id)?;
            self.check_sibling_name(&txn, new_parent_id, &category.name, Some(id))?;

            let (path, depth) = tree::place(category.id, parent.as_ref());
            category.parent_id = new_parent_id;
            category.path = path;
            category.depth = depth;
            category.touch();
            self.storage.put_category(&txn, &category)?;
            category
        };
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            category_id = category.id,
            parent_id = ?category.parent_id,
            "Category reparented"
        );
        Ok(category)
    }

    /// Delete a category and all its descendants
    ///
    /// Descendants are discovered by walking `parent_id` edges rather than
    /// matching path prefixes, so the cascade is complete even for
    /// subtrees with stale paths.
    pub fn delete_category(&self, id: i64) -> CatalogResult<usize> {
        let txn = self.storage.begin_write()?;
        let removed = {
            if self.storage.get_category_txn(&txn, id)?.is_none() {
                return Err(CatalogError::NotFound(id));
            }

            let all = self.storage.categories_txn(&txn)?;
            let mut children_of: HashMap<i64, Vec<i64>> = HashMap::new();
            for cat in &all {
                if let Some(parent_id) = cat.parent_id {
                    children_of.entry(parent_id).or_default().push(cat.id);
                }
            }

            let mut to_remove = Vec::new();
            let mut queue = vec![id];
            while let Some(current) = queue.pop() {
                to_remove.push(current);
                if let Some(children) = children_of.get(&current) {
                    queue.extend(children.iter().copied());
                }
            }

            for category_id in &to_remove {
                self.storage.remove_category(&txn, *category_id)?;
            }
            to_remove.len()
        };
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(category_id = id, removed, "Category subtree deleted");
        Ok(removed)
    }

    /// Get a category by id
    pub fn get_category(&self, id: i64) -> CatalogResult<Category> {
        self.storage
            .get_category(id)?
            .ok_or(CatalogError::NotFound(id))
    }

    /// Nested tree of active categories
    ///
    /// Built from `parent_id` edges (children under inactive or missing
    /// parents are omitted); siblings are ordered by id, which equals
    /// materialized-path order for correctly placed siblings.
    pub fn tree(&self) -> CatalogResult<Vec<CategoryTreeNode>> {
        let mut categories: Vec<Category> = self
            .storage
            .categories()?
            .into_iter()
            .filter(|c| c.is_active)
            .collect();
        categories.sort_by_key(|c| c.id);

        let mut children_of: HashMap<i64, Vec<&Category>> = HashMap::new();
        let mut roots = Vec::new();
        for cat in &categories {
            match cat.parent_id {
                Some(parent_id) => children_of.entry(parent_id).or_default().push(cat),
                None => roots.push(cat),
            }
        }

        fn build(cat: &Category, children_of: &HashMap<i64, Vec<&Category>>) -> CategoryTreeNode {
            let mut node = CategoryTreeNode::from(cat);
            if let Some(children) = children_of.get(&cat.id) {
                node.children = children.iter().map(|c| build(c, children_of)).collect();
            }
            node
        }

        Ok(roots.into_iter().map(|c| build(c, &children_of)).collect())
    }

    /// Resolve and validate a parent reference within the transaction
    fn resolve_parent(
        &self,
        txn: &redb::WriteTransaction,
        parent_id: Option<i64>,
    ) -> CatalogResult<Option<Category>> {
        match parent_id {
            None => Ok(None),
            Some(parent_id) => {
                let parent = self
                    .storage
                    .get_category_txn(txn, parent_id)?
                    .filter(|c| c.is_active)
                    .ok_or(CatalogError::MissingParent(parent_id))?;
                Ok(Some(parent))
            }
        }
    }

    /// Reject a duplicate active name among the target parent's children
    fn check_sibling_name(
        &self,
        txn: &redb::WriteTransaction,
        parent_id: Option<i64>,
        name: &str,
        exclude_id: Option<i64>,
    ) -> CatalogResult<()> {
        let all = self.storage.categories_txn(txn)?;
        let taken = all.iter().any(|c| {
            c.is_active
                && c.parent_id == parent_id
                && c.name == name
                && Some(c.id) != exclude_id
        });
        if taken {
            return Err(CatalogError::DuplicateName(name.to_string()));
        }
        Ok(())
    }
}
