//! Category store: two-level category trees partitioned by type.
//!
//! Categories arrive as a forest (roots with embedded subcategories) and
//! are held per type in server order, with a flat id index locating any
//! node. Edits that keep a category where it is are applied in place;
//! anything that moves a node between lists (reparenting, type changes,
//! unknown parents) invalidates the store instead, and the next load
//! refetches the whole forest.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::api::{CategoryApi, OrderUpdate};
use crate::models::{Category, CategoryType, CategoryUpdate, NewCategory};

use super::collection::PendingRemoval;
use super::StoreError;

/// Where a category sits: a root position within its type's list, or a
/// child position under a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Root {
        category_type: CategoryType,
        pos: usize,
    },
    Child {
        category_type: CategoryType,
        root: usize,
        pos: usize,
    },
}

#[derive(Default)]
pub struct CategoryStore {
    partitions: HashMap<CategoryType, Vec<Category>>,
    index: HashMap<i64, Slot>,
    valid: bool,
}

impl CategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root categories of one type, in display order, children embedded.
    pub fn roots(&self, category_type: CategoryType) -> &[Category] {
        self.partitions
            .get(&category_type)
            .map(|roots| roots.as_slice())
            .unwrap_or(&[])
    }

    pub fn get(&self, id: i64) -> Option<&Category> {
        match self.index.get(&id)? {
            Slot::Root { category_type, pos } => self.partitions.get(category_type)?.get(*pos),
            Slot::Child {
                category_type,
                root,
                pos,
            } => self
                .partitions
                .get(category_type)?
                .get(*root)?
                .subcategories
                .get(*pos),
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.index.contains_key(&id)
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn clear(&mut self) {
        self.partitions.clear();
        self.index.clear();
        self.valid = false;
    }

    fn partition(fetched: Vec<Category>) -> HashMap<CategoryType, Vec<Category>> {
        let mut partitions: HashMap<CategoryType, Vec<Category>> = HashMap::new();
        for root in fetched {
            partitions.entry(root.category_type).or_default().push(root);
        }
        partitions
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (ty, roots) in &self.partitions {
            for (pos, root) in roots.iter().enumerate() {
                self.index.insert(
                    root.id,
                    Slot::Root {
                        category_type: *ty,
                        pos,
                    },
                );
                for (cpos, child) in root.subcategories.iter().enumerate() {
                    self.index.insert(
                        child.id,
                        Slot::Child {
                            category_type: *ty,
                            root: pos,
                            pos: cpos,
                        },
                    );
                }
            }
        }
    }

    fn parent_id_of(&self, slot: Slot) -> Option<i64> {
        match slot {
            Slot::Root { .. } => None,
            Slot::Child {
                category_type,
                root,
                ..
            } => self
                .partitions
                .get(&category_type)
                .and_then(|roots| roots.get(root))
                .map(|r| r.id),
        }
    }

    /// Serve the cache when valid, otherwise fetch the whole forest; see
    /// [`StoreError::AlreadyUpToDate`] for the forced-refresh contract.
    pub async fn load<A>(&mut self, api: &A, force: bool) -> Result<(), StoreError>
    where
        A: CategoryApi + ?Sized,
    {
        if !force && self.valid {
            debug!(count = self.index.len(), "Serving categories from cache");
            return Ok(());
        }

        let fetched = api.list_categories().await?;
        let partitioned = Self::partition(fetched);
        if force && partitioned == self.partitions {
            self.valid = true;
            debug!("Category forest unchanged on forced refresh");
            return Err(StoreError::AlreadyUpToDate);
        }

        self.partitions = partitioned;
        self.reindex();
        self.valid = true;
        info!(count = self.index.len(), "Loaded categories");
        Ok(())
    }

    pub async fn create<A>(&mut self, api: &A, new: NewCategory) -> Result<Category, StoreError>
    where
        A: CategoryApi + ?Sized,
    {
        let created = api.create_category(&new).await?;
        debug!(id = created.id, parent = ?created.parent_id, "Created category");
        self.apply_create(created.clone());
        Ok(created)
    }

    fn apply_create(&mut self, created: Category) {
        match created.parent_id {
            None => {
                let ty = created.category_type;
                let roots = self.partitions.entry(ty).or_default();
                let pos = roots.len();
                self.index.insert(
                    created.id,
                    Slot::Root {
                        category_type: ty,
                        pos,
                    },
                );
                roots.push(created);
            }
            Some(parent_id) => match self.index.get(&parent_id) {
                Some(&Slot::Root { category_type, pos }) => {
                    // A subcategory of a cached root appends to its children
                    let parent = &mut self.partitions.entry(category_type).or_default()[pos];
                    let cpos = parent.subcategories.len();
                    self.index.insert(
                        created.id,
                        Slot::Child {
                            category_type,
                            root: pos,
                            pos: cpos,
                        },
                    );
                    parent.subcategories.push(created);
                }
                _ => {
                    warn!(parent = parent_id, "Parent of new category not cached, invalidating");
                    self.valid = false;
                }
            },
        }
    }

    pub async fn update<A>(&mut self, api: &A, update: CategoryUpdate) -> Result<(), StoreError>
    where
        A: CategoryApi + ?Sized,
    {
        let updated = api.update_category(&update).await?;

        let slot = match self.index.get(&updated.id) {
            Some(&slot) => slot,
            None => {
                warn!(id = updated.id, "Updated category was not cached, invalidating");
                self.valid = false;
                return Ok(());
            }
        };

        let old_parent = self.parent_id_of(slot);
        let (old_type, moved) = match slot {
            Slot::Root { category_type, .. } => (category_type, updated.parent_id.is_some()),
            Slot::Child { category_type, .. } => {
                (category_type, updated.parent_id != old_parent)
            }
        };

        if moved || old_type != updated.category_type {
            debug!(
                id = updated.id,
                old_parent = ?old_parent,
                new_parent = ?updated.parent_id,
                "Category moved, invalidating"
            );
            self.valid = false;
            return Ok(());
        }

        match slot {
            Slot::Root { category_type, pos } => {
                // Responses carry no children, keep the cached subtree
                if let Some(root) = self
                    .partitions
                    .get_mut(&category_type)
                    .and_then(|roots| roots.get_mut(pos))
                {
                    let children = std::mem::take(&mut root.subcategories);
                    *root = updated;
                    root.subcategories = children;
                }
            }
            Slot::Child {
                category_type,
                root,
                pos,
            } => {
                if let Some(child) = self
                    .partitions
                    .get_mut(&category_type)
                    .and_then(|roots| roots.get_mut(root))
                    .and_then(|r| r.subcategories.get_mut(pos))
                {
                    *child = updated;
                }
            }
        }
        Ok(())
    }

    pub async fn set_hidden<A>(&mut self, api: &A, id: i64, hidden: bool) -> Result<(), StoreError>
    where
        A: CategoryApi + ?Sized,
    {
        api.set_category_hidden(id, hidden).await?;

        let slot = match self.index.get(&id) {
            Some(&slot) => slot,
            None => {
                warn!(id, "Toggled category was not cached, invalidating");
                self.valid = false;
                return Ok(());
            }
        };

        match slot {
            Slot::Root { category_type, pos } => {
                if let Some(root) = self
                    .partitions
                    .get_mut(&category_type)
                    .and_then(|roots| roots.get_mut(pos))
                {
                    root.hidden = hidden;
                }
            }
            Slot::Child {
                category_type,
                root,
                pos,
            } => {
                if let Some(child) = self
                    .partitions
                    .get_mut(&category_type)
                    .and_then(|roots| roots.get_mut(root))
                    .and_then(|r| r.subcategories.get_mut(pos))
                {
                    child.hidden = hidden;
                }
            }
        }
        Ok(())
    }

    /// Local-only reorder of one type's root list; the store stays invalid
    /// until the matching persist call succeeds.
    pub fn move_root(
        &mut self,
        category_type: CategoryType,
        from: usize,
        to: usize,
    ) -> Result<(), StoreError> {
        let roots = self.partitions.entry(category_type).or_default();
        if from >= roots.len() || to >= roots.len() {
            return Err(StoreError::InvalidMove);
        }
        if from != to {
            let root = roots.remove(from);
            roots.insert(to, root);
            self.reindex();
            self.valid = false;
        }
        Ok(())
    }

    /// Local-only reorder of one parent's subcategory list.
    pub fn move_subcategory(
        &mut self,
        parent_id: i64,
        from: usize,
        to: usize,
    ) -> Result<(), StoreError> {
        let (category_type, root) = match self.index.get(&parent_id) {
            Some(&Slot::Root { category_type, pos }) => (category_type, pos),
            _ => return Err(StoreError::InvalidMove),
        };
        let children = match self
            .partitions
            .get_mut(&category_type)
            .and_then(|roots| roots.get_mut(root))
        {
            Some(parent) => &mut parent.subcategories,
            None => return Err(StoreError::InvalidMove),
        };
        if from >= children.len() || to >= children.len() {
            return Err(StoreError::InvalidMove);
        }
        if from != to {
            let child = children.remove(from);
            children.insert(to, child);
            self.reindex();
            self.valid = false;
        }
        Ok(())
    }

    fn order_payload(list: &[Category]) -> Vec<OrderUpdate> {
        list.iter()
            .enumerate()
            .map(|(pos, category)| OrderUpdate {
                id: category.id,
                display_order: pos as u32,
            })
            .collect()
    }

    pub async fn persist_root_order<A>(
        &mut self,
        api: &A,
        category_type: CategoryType,
    ) -> Result<(), StoreError>
    where
        A: CategoryApi + ?Sized,
    {
        let order = Self::order_payload(self.roots(category_type));
        api.reorder_categories(&order).await?;
        if let Some(roots) = self.partitions.get_mut(&category_type) {
            for (pos, root) in roots.iter_mut().enumerate() {
                root.display_order = pos as u32;
            }
        }
        self.valid = true;
        debug!(%category_type, count = order.len(), "Persisted root category order");
        Ok(())
    }

    pub async fn persist_subcategory_order<A>(
        &mut self,
        api: &A,
        parent_id: i64,
    ) -> Result<(), StoreError>
    where
        A: CategoryApi + ?Sized,
    {
        let order = match self.get(parent_id) {
            Some(parent) => Self::order_payload(&parent.subcategories),
            None => return Err(StoreError::InvalidMove),
        };
        api.reorder_categories(&order).await?;

        if let Some(&Slot::Root { category_type, pos }) = self.index.get(&parent_id) {
            if let Some(parent) = self
                .partitions
                .get_mut(&category_type)
                .and_then(|roots| roots.get_mut(pos))
            {
                for (cpos, child) in parent.subcategories.iter_mut().enumerate() {
                    child.display_order = cpos as u32;
                }
            }
        }
        self.valid = true;
        debug!(parent = parent_id, count = order.len(), "Persisted subcategory order");
        Ok(())
    }

    /// Delete on the server first; the returned receipt applies the local
    /// removal when passed to [`CategoryStore::commit_removal`]. Removing
    /// a root takes its subcategories with it.
    pub async fn delete<A>(&mut self, api: &A, id: i64) -> Result<PendingRemoval, StoreError>
    where
        A: CategoryApi + ?Sized,
    {
        api.delete_category(id).await?;
        debug!(id, "Deleted category on server, local removal pending");
        Ok(PendingRemoval::new(id))
    }

    pub fn commit_removal(&mut self, pending: PendingRemoval) -> Option<Category> {
        let slot = *self.index.get(&pending.id())?;
        let removed = match slot {
            Slot::Root { category_type, pos } => self
                .partitions
                .get_mut(&category_type)
                .map(|roots| roots.remove(pos)),
            Slot::Child {
                category_type,
                root,
                pos,
            } => self
                .partitions
                .get_mut(&category_type)
                .and_then(|roots| roots.get_mut(root))
                .map(|r| r.subcategories.remove(pos)),
        };
        self.reindex();
        removed
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::api::ApiError;

    struct FakeCategoryApi {
        forest: Vec<Category>,
        list_calls: AtomicUsize,
        create_result: Option<Category>,
        update_result: Option<Category>,
    }

    #[async_trait]
    impl CategoryApi for FakeCategoryApi {
        async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.forest.clone())
        }

        async fn create_category(&self, new: &NewCategory) -> Result<Category, ApiError> {
            Ok(self.create_result.clone().unwrap_or_else(|| {
                let mut c = category(99, &new.title, new.category_type);
                c.parent_id = new.parent_id;
                c
            }))
        }

        async fn update_category(&self, update: &CategoryUpdate) -> Result<Category, ApiError> {
            Ok(self.update_result.clone().unwrap_or_else(|| {
                let mut c = category(update.id, &update.title, CategoryType::Expense);
                c.parent_id = update.parent_id;
                c
            }))
        }

        async fn set_category_hidden(&self, _id: i64, _hidden: bool) -> Result<(), ApiError> {
            Ok(())
        }

        async fn reorder_categories(&self, _order: &[OrderUpdate]) -> Result<(), ApiError> {
            Ok(())
        }

        async fn delete_category(&self, _id: i64) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn category(id: i64, title: &str, category_type: CategoryType) -> Category {
        Category {
            id,
            title: title.to_string(),
            category_type,
            parent_id: None,
            hidden: false,
            display_order: 0,
            icon: None,
            subcategories: vec![],
        }
    }

    fn child(id: i64, title: &str, parent_id: i64) -> Category {
        let mut c = category(id, title, CategoryType::Expense);
        c.parent_id = Some(parent_id);
        c
    }

    fn forest() -> Vec<Category> {
        let mut food = category(1, "Food", CategoryType::Expense);
        food.subcategories = vec![child(11, "Groceries", 1), child(12, "Restaurants", 1)];
        let transport = category(2, "Transport", CategoryType::Expense);
        let salary = category(3, "Salary", CategoryType::Income);
        vec![food, transport, salary]
    }

    fn fake() -> FakeCategoryApi {
        FakeCategoryApi {
            forest: forest(),
            list_calls: AtomicUsize::new(0),
            create_result: None,
            update_result: None,
        }
    }

    #[tokio::test]
    async fn test_load_partitions_by_type_and_indexes_children() {
        let api = fake();
        let mut store = CategoryStore::new();
        store.load(&api, false).await.expect("load");

        assert_eq!(store.roots(CategoryType::Expense).len(), 2);
        assert_eq!(store.roots(CategoryType::Income).len(), 1);
        assert!(store.roots(CategoryType::Transfer).is_empty());
        assert_eq!(store.get(12).map(|c| c.title.as_str()), Some("Restaurants"));
        assert_eq!(store.get(3).map(|c| c.title.as_str()), Some("Salary"));

        store.load(&api, false).await.expect("load");
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_forced_refresh_of_identical_forest() {
        let api = fake();
        let mut store = CategoryStore::new();
        store.load(&api, false).await.expect("load");

        let err = store.load(&api, true).await.expect_err("up to date");
        assert!(err.is_up_to_date());
        assert!(store.is_valid());
    }

    #[tokio::test]
    async fn test_create_subcategory_appends_to_cached_parent() {
        let api = fake();
        let mut store = CategoryStore::new();
        store.load(&api, false).await.expect("load");

        store
            .create(
                &api,
                NewCategory {
                    title: "Takeaway".to_string(),
                    category_type: CategoryType::Expense,
                    parent_id: Some(1),
                    icon: None,
                },
            )
            .await
            .expect("create");

        let food = store.get(1).expect("parent");
        assert_eq!(food.subcategories.len(), 3);
        assert_eq!(food.subcategories[2].title, "Takeaway");
        assert_eq!(store.get(99).map(|c| c.title.as_str()), Some("Takeaway"));
        assert!(store.is_valid());
    }

    #[tokio::test]
    async fn test_create_under_unknown_parent_invalidates() {
        let api = fake();
        let mut store = CategoryStore::new();
        store.load(&api, false).await.expect("load");

        store
            .create(
                &api,
                NewCategory {
                    title: "Orphan".to_string(),
                    category_type: CategoryType::Expense,
                    parent_id: Some(777),
                    icon: None,
                },
            )
            .await
            .expect("create");
        assert!(!store.is_valid());
        assert!(store.get(99).is_none());
    }

    #[tokio::test]
    async fn test_update_root_in_place_keeps_children() {
        let api = fake();
        let mut store = CategoryStore::new();
        store.load(&api, false).await.expect("load");

        store
            .update(
                &api,
                CategoryUpdate {
                    id: 1,
                    title: "Food and drink".to_string(),
                    parent_id: None,
                    icon: None,
                },
            )
            .await
            .expect("update");

        let food = store.get(1).expect("root");
        assert_eq!(food.title, "Food and drink");
        assert_eq!(food.subcategories.len(), 2);
        assert!(store.is_valid());
        // Position within the partition unchanged
        assert_eq!(store.roots(CategoryType::Expense)[0].id, 1);
    }

    #[tokio::test]
    async fn test_reparent_invalidates_without_moving() {
        let api = fake();
        let mut store = CategoryStore::new();
        store.load(&api, false).await.expect("load");

        // Server says Groceries now lives under Transport
        store
            .update(
                &api,
                CategoryUpdate {
                    id: 11,
                    title: "Groceries".to_string(),
                    parent_id: Some(2),
                    icon: None,
                },
            )
            .await
            .expect("update");

        assert!(!store.is_valid());
        // Cached shape untouched until the next load
        assert_eq!(store.get(1).map(|c| c.subcategories.len()), Some(2));
        assert_eq!(store.get(2).map(|c| c.subcategories.len()), Some(0));
    }

    #[tokio::test]
    async fn test_move_root_then_persist() {
        let api = fake();
        let mut store = CategoryStore::new();
        store.load(&api, false).await.expect("load");

        store.move_root(CategoryType::Expense, 0, 1).expect("move");
        assert!(!store.is_valid());
        let ids: Vec<i64> = store.roots(CategoryType::Expense).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1]);
        // Children still resolve after the reindex
        assert_eq!(store.get(11).map(|c| c.title.as_str()), Some("Groceries"));

        store
            .persist_root_order(&api, CategoryType::Expense)
            .await
            .expect("persist");
        assert!(store.is_valid());
        assert_eq!(store.roots(CategoryType::Expense)[0].display_order, 0);
        assert_eq!(store.roots(CategoryType::Expense)[1].display_order, 1);
    }

    #[tokio::test]
    async fn test_move_subcategory_rotates_children() {
        let api = fake();
        let mut store = CategoryStore::new();
        store.load(&api, false).await.expect("load");

        store.move_subcategory(1, 1, 0).expect("move");
        let food = store.get(1).expect("parent");
        let ids: Vec<i64> = food.subcategories.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![12, 11]);
        assert!(!store.is_valid());

        store.persist_subcategory_order(&api, 1).await.expect("persist");
        assert!(store.is_valid());
    }

    #[tokio::test]
    async fn test_move_out_of_bounds_is_rejected() {
        let api = fake();
        let mut store = CategoryStore::new();
        store.load(&api, false).await.expect("load");

        assert!(matches!(
            store.move_root(CategoryType::Expense, 0, 5),
            Err(StoreError::InvalidMove)
        ));
        assert!(matches!(
            store.move_subcategory(2, 0, 0),
            Err(StoreError::InvalidMove)
        ));
        assert!(store.is_valid());
    }

    #[tokio::test]
    async fn test_hide_child_in_place() {
        let api = fake();
        let mut store = CategoryStore::new();
        store.load(&api, false).await.expect("load");

        store.set_hidden(&api, 12, true).await.expect("hide");
        assert_eq!(store.get(12).map(|c| c.hidden), Some(true));
        assert_eq!(store.get(1).map(|c| c.subcategories.len()), Some(2));
        assert!(store.is_valid());
    }

    #[tokio::test]
    async fn test_delete_root_drops_subtree() {
        let api = fake();
        let mut store = CategoryStore::new();
        store.load(&api, false).await.expect("load");

        let pending = store.delete(&api, 1).await.expect("delete");
        assert!(store.contains(1));

        let removed = store.commit_removal(pending).expect("removed");
        assert_eq!(removed.id, 1);
        assert!(!store.contains(1));
        assert!(!store.contains(11));
        assert!(!store.contains(12));
        assert_eq!(store.roots(CategoryType::Expense).len(), 1);
    }

    #[tokio::test]
    async fn test_delete_child_keeps_parent() {
        let api = fake();
        let mut store = CategoryStore::new();
        store.load(&api, false).await.expect("load");

        let pending = store.delete(&api, 11).await.expect("delete");
        store.commit_removal(pending).expect("removed");

        assert!(!store.contains(11));
        let food = store.get(1).expect("parent");
        assert_eq!(food.subcategories.len(), 1);
        assert_eq!(food.subcategories[0].id, 12);
    }
}
