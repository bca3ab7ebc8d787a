//! Template store: one independently cached list per template type.
//!
//! Each type (expense, income, transfer) is fetched and cached on its
//! own, so opening the expense sheet never pays for the other two. An
//! update that changes a template's type would have to move it across
//! partitions; instead both affected partitions are invalidated.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::api::TemplateApi;
use crate::models::{NewTemplate, Template, TemplateType, TemplateUpdate};

use super::collection::{CacheItem, CollectionCache, PendingRemoval};
use super::StoreError;

impl CacheItem for Template {
    fn id(&self) -> i64 {
        self.id
    }
    fn hidden(&self) -> bool {
        self.hidden
    }
    fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
    fn display_order(&self) -> u32 {
        self.display_order
    }
    fn set_display_order(&mut self, order: u32) {
        self.display_order = order;
    }
}

#[derive(Default)]
pub struct TemplateStore {
    partitions: HashMap<TemplateType, CollectionCache<Template>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self {
            partitions: HashMap::new(),
        }
    }

    fn partition_mut(&mut self, template_type: TemplateType) -> &mut CollectionCache<Template> {
        self.partitions.entry(template_type).or_default()
    }

    /// Templates of one type, in display order. Empty when never loaded.
    pub fn templates(&self, template_type: TemplateType) -> &[Template] {
        self.partitions
            .get(&template_type)
            .map(|cache| cache.items())
            .unwrap_or(&[])
    }

    pub fn get(&self, id: i64) -> Option<&Template> {
        self.partitions.values().find_map(|cache| cache.get(id))
    }

    pub fn is_valid(&self, template_type: TemplateType) -> bool {
        self.partitions
            .get(&template_type)
            .map(|cache| cache.is_valid())
            .unwrap_or(false)
    }

    pub fn invalidate(&mut self, template_type: TemplateType) {
        if let Some(cache) = self.partitions.get_mut(&template_type) {
            cache.invalidate();
        }
    }

    pub fn invalidate_all(&mut self) {
        for cache in self.partitions.values_mut() {
            cache.invalidate();
        }
    }

    pub fn clear(&mut self) {
        self.partitions.clear();
    }

    /// Which partition currently holds the id, if any.
    fn partition_of(&self, id: i64) -> Option<TemplateType> {
        TemplateType::ALL
            .into_iter()
            .find(|ty| self.partitions.get(ty).is_some_and(|cache| cache.contains(id)))
    }

    /// Per-partition loader; see [`StoreError::AlreadyUpToDate`] for the
    /// forced-refresh contract.
    pub async fn load<A>(
        &mut self,
        api: &A,
        template_type: TemplateType,
        force: bool,
    ) -> Result<&[Template], StoreError>
    where
        A: TemplateApi + ?Sized,
    {
        let cache = self.partitions.entry(template_type).or_default();
        if !force && cache.is_valid() {
            debug!(%template_type, count = cache.len(), "Serving templates from cache");
            return Ok(cache.items());
        }

        let fetched = api.list_templates(template_type).await?;
        if force && cache.same_items(&fetched) {
            cache.mark_valid();
            debug!(%template_type, "Template list unchanged on forced refresh");
            return Err(StoreError::AlreadyUpToDate);
        }

        info!(%template_type, count = fetched.len(), "Loaded templates");
        cache.replace_all(fetched);
        Ok(cache.items())
    }

    pub async fn create<A>(&mut self, api: &A, new: NewTemplate) -> Result<&Template, StoreError>
    where
        A: TemplateApi + ?Sized,
    {
        let created = api.create_template(&new).await?;
        debug!(id = created.id, template_type = %created.template_type, "Created template");
        let cache = self.partition_mut(created.template_type);
        Ok(cache.insert(created))
    }

    pub async fn update<A>(&mut self, api: &A, update: TemplateUpdate) -> Result<(), StoreError>
    where
        A: TemplateApi + ?Sized,
    {
        let updated = api.update_template(&update).await?;
        let new_type = updated.template_type;

        match self.partition_of(updated.id) {
            Some(old_type) if old_type == new_type => {
                // apply_update cannot miss here, partition_of just found it
                self.partition_mut(old_type).apply_update(updated);
            }
            Some(old_type) => {
                debug!(
                    id = update.id,
                    from = %old_type,
                    to = %new_type,
                    "Template changed type, invalidating both partitions"
                );
                self.invalidate(old_type);
                self.invalidate(new_type);
            }
            None => {
                warn!(id = update.id, "Updated template was not cached, invalidating");
                self.invalidate(new_type);
            }
        }
        Ok(())
    }

    pub async fn set_hidden<A>(&mut self, api: &A, id: i64, hidden: bool) -> Result<(), StoreError>
    where
        A: TemplateApi + ?Sized,
    {
        api.set_template_hidden(id, hidden).await?;
        match self.partition_of(id) {
            Some(ty) => {
                self.partition_mut(ty).set_hidden(id, hidden);
            }
            None => {
                warn!(id, "Toggled template was not cached, invalidating all partitions");
                self.invalidate_all();
            }
        }
        Ok(())
    }

    /// Local-only reorder within one partition; it stays invalid until
    /// [`TemplateStore::persist_order`] succeeds.
    pub fn move_template(
        &mut self,
        template_type: TemplateType,
        from: usize,
        to: usize,
    ) -> Result<(), StoreError> {
        self.partition_mut(template_type).move_item(from, to)
    }

    pub async fn persist_order<A>(
        &mut self,
        api: &A,
        template_type: TemplateType,
    ) -> Result<(), StoreError>
    where
        A: TemplateApi + ?Sized,
    {
        let cache = self.partition_mut(template_type);
        let order = cache.order_payload();
        api.reorder_templates(&order).await?;
        let cache = self.partition_mut(template_type);
        cache.renumber();
        cache.mark_valid();
        debug!(%template_type, count = order.len(), "Persisted template order");
        Ok(())
    }

    /// Delete on the server first; the returned receipt applies the local
    /// removal when passed to [`TemplateStore::commit_removal`].
    pub async fn delete<A>(&mut self, api: &A, id: i64) -> Result<PendingRemoval, StoreError>
    where
        A: TemplateApi + ?Sized,
    {
        api.delete_template(id).await?;
        debug!(id, "Deleted template on server, local removal pending");
        Ok(PendingRemoval::new(id))
    }

    pub fn commit_removal(&mut self, pending: PendingRemoval) -> Option<Template> {
        let ty = self.partition_of(pending.id())?;
        self.partition_mut(ty).commit_removal(pending)
    }
}

// ============================================================================
// Tests
// ============================================================================
