use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Item, ShoppingList};
use crate::repo::{ItemRepository, ListRepository, Subscription};
use crate::store::TenantStore;

/// List repository over the shared in-process store. Every mutating call
/// applies to the store synchronously, and the store re-emits the full
/// current collection under the same lock, so the stream is updated before
/// the call returns.
pub struct LocalListRepository {
    store: Arc<TenantStore>,
}

impl LocalListRepository {
    pub fn new(store: Arc<TenantStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ListRepository for LocalListRepository {
    fn observe_lists(&self) -> Subscription<Vec<ShoppingList>> {
        Subscription::local(self.store.watch_lists())
    }

    async fn create(
        &self,
        title: &str,
        image_ref: Option<String>,
    ) -> anyhow::Result<ShoppingList> {
        let list = ShoppingList::new(title, image_ref);
        self.store.add_list(list.clone());
        Ok(list)
    }

    async fn update(&self, list: ShoppingList) -> anyhow::Result<()> {
        self.store.update_list(list);
        Ok(())
    }

    async fn delete(&self, list_id: Uuid) -> anyhow::Result<()> {
        self.store.remove_list(list_id);
        Ok(())
    }

    async fn get_by_id(&self, list_id: Uuid) -> anyhow::Result<Option<ShoppingList>> {
        Ok(self.store.find_list(list_id))
    }
}

/// Item repository over the shared in-process store.
pub struct LocalItemRepository {
    store: Arc<TenantStore>,
}

impl LocalItemRepository {
    pub fn new(store: Arc<TenantStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ItemRepository for LocalItemRepository {
    fn observe_items(&self, list_id: Uuid) -> Subscription<Vec<Item>> {
        Subscription::local(self.store.watch_items(list_id))
    }

    async fn add_item(&self, list_id: Uuid, item: Item) -> anyhow::Result<()> {
        self.store.add_item(list_id, item);
        Ok(())
    }

    async fn update_item(&self, list_id: Uuid, item: Item) -> anyhow::Result<()> {
        self.store.update_item(list_id, item);
        Ok(())
    }

    async fn remove_item(&self, list_id: Uuid, item_id: Uuid) -> anyhow::Result<()> {
        self.store.remove_item(list_id, item_id);
        Ok(())
    }

    async fn set_purchased(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        purchased: bool,
    ) -> anyhow::Result<()> {
        self.store.set_item_purchased(list_id, item_id, purchased);
        Ok(())
    }
}
