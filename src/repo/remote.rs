use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::warn;
use uuid::Uuid;

use crate::auth::SessionProvider;
use crate::backend::{RemoteBackend, SnapshotCallback, SnapshotPush};
use crate::models::{Category, Item, ShoppingList};
use crate::repo::{ItemRepository, ListRepository, Subscription};
use crate::storage::ImageStore;

#[derive(Debug, Deserialize)]
struct WireList {
    title: String,
    // ownerId is present on the wire but the listen scope already filtered
    // by owner, so it is not read back.
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireItem {
    name: String,
    #[serde(default)]
    quantity: f64,
    #[serde(default)]
    unit: String,
    #[serde(default = "default_wire_category")]
    category: String,
    #[serde(default)]
    purchased: bool,
}

fn default_wire_category() -> String {
    "OTHER".to_string()
}

/// A document that fails to decode is dropped from the snapshot, never
/// surfaced as a stream error.
fn decode_list(list_id: Uuid, fields: &Value) -> Option<ShoppingList> {
    let wire: WireList = serde_json::from_value(fields.clone())
        .map_err(|e| warn!(list_id = %list_id, error = %e, "dropping malformed list document"))
        .ok()?;
    Some(ShoppingList {
        id: list_id,
        title: wire.title,
        // The image blob lives on this device only; the backend never sees it.
        image_ref: None,
        items: Vec::new(),
    })
}

fn decode_item(item_id: Uuid, fields: &Value) -> Option<Item> {
    let wire: WireItem = serde_json::from_value(fields.clone())
        .map_err(|e| warn!(item_id = %item_id, error = %e, "dropping malformed item document"))
        .ok()?;
    Some(Item {
        id: item_id,
        name: wire.name,
        quantity: wire.quantity,
        unit: wire.unit,
        category: Category::from_wire(&wire.category),
        purchased: wire.purchased,
    })
}

fn decode_lists(push: &SnapshotPush) -> Vec<ShoppingList> {
    match push {
        SnapshotPush::Snapshot(docs) => docs
            .iter()
            .filter_map(|(id, fields)| decode_list(*id, fields))
            .collect(),
        SnapshotPush::Disconnected => {
            warn!("list stream disconnected, degrading to empty collection");
            Vec::new()
        }
    }
}

fn decode_items(push: &SnapshotPush) -> Vec<Item> {
    match push {
        SnapshotPush::Snapshot(docs) => docs
            .iter()
            .filter_map(|(id, fields)| decode_item(*id, fields))
            .collect(),
        SnapshotPush::Disconnected => {
            warn!("item stream disconnected, degrading to empty collection");
            Vec::new()
        }
    }
}

fn encode_list(owner_id: Uuid, title: &str) -> Value {
    json!({ "title": title, "ownerId": owner_id })
}

fn encode_item(item: &Item) -> Value {
    json!({
        "name": item.name,
        "quantity": item.quantity,
        "unit": item.unit,
        "category": item.category,
        "purchased": item.purchased,
    })
}

/// List repository over the push-based backend. The subscription forwards
/// each backend push as one emission; mutating calls are fire-and-forget with
/// respect to the stream, which alone is authoritative for UI state.
pub struct RemoteListRepository {
    backend: Arc<dyn RemoteBackend>,
    session: Arc<dyn SessionProvider>,
    images: Arc<dyn ImageStore>,
}

impl RemoteListRepository {
    pub fn new(
        backend: Arc<dyn RemoteBackend>,
        session: Arc<dyn SessionProvider>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            backend,
            session,
            images,
        }
    }
}

#[async_trait]
impl ListRepository for RemoteListRepository {
    fn observe_lists(&self) -> Subscription<Vec<ShoppingList>> {
        let Some(owner_id) = self.session.current_uid() else {
            warn!("observe_lists without a session: empty stream");
            return Subscription::ended(Vec::new());
        };
        let (tx, rx) = watch::channel(Vec::new());
        // The watch sender is the single emission point; the backend thread
        // only performs a non-blocking send here.
        let callback: SnapshotCallback = Arc::new(move |push| {
            tx.send_replace(decode_lists(&push));
        });
        let guard = self.backend.listen_lists(owner_id, callback);
        Subscription::remote(rx, guard)
    }

    async fn create(
        &self,
        title: &str,
        image_ref: Option<String>,
    ) -> anyhow::Result<ShoppingList> {
        let list = ShoppingList::new(title, image_ref);
        let Some(owner_id) = self.session.current_uid() else {
            warn!("create ignored: no active session");
            return Ok(list);
        };
        self.backend
            .set_list(owner_id, list.id, encode_list(owner_id, title))
            .await?;
        Ok(list)
    }

    async fn update(&self, list: ShoppingList) -> anyhow::Result<()> {
        let Some(owner_id) = self.session.current_uid() else {
            warn!(list_id = %list.id, "update ignored: no active session");
            return Ok(());
        };
        self.backend
            .set_list(owner_id, list.id, encode_list(owner_id, &list.title))
            .await
    }

    async fn delete(&self, list_id: Uuid) -> anyhow::Result<()> {
        let Some(owner_id) = self.session.current_uid() else {
            warn!(list_id = %list_id, "delete ignored: no active session");
            return Ok(());
        };
        self.backend.delete_list(owner_id, list_id).await?;
        // The stored image is device-local; a failed cleanup must not fail
        // the delete that already happened remotely.
        if let Err(e) = self.images.delete_image(list_id).await {
            warn!(list_id = %list_id, error = %e, "list image cleanup failed");
        }
        Ok(())
    }

    async fn get_by_id(&self, list_id: Uuid) -> anyhow::Result<Option<ShoppingList>> {
        let Some(owner_id) = self.session.current_uid() else {
            return Ok(None);
        };
        match self.backend.get_list(owner_id, list_id).await {
            Ok(Some(fields)) => Ok(decode_list(list_id, &fields)),
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(list_id = %list_id, error = %e, "get_by_id failed, treating as not found");
                Ok(None)
            }
        }
    }
}

/// Item repository over the push-based backend. Item documents are keyed by
/// the caller-supplied item id.
pub struct RemoteItemRepository {
    backend: Arc<dyn RemoteBackend>,
    session: Arc<dyn SessionProvider>,
}

impl RemoteItemRepository {
    pub fn new(backend: Arc<dyn RemoteBackend>, session: Arc<dyn SessionProvider>) -> Self {
        Self { backend, session }
    }
}

#[async_trait]
impl ItemRepository for RemoteItemRepository {
    fn observe_items(&self, list_id: Uuid) -> Subscription<Vec<Item>> {
        if self.session.current_uid().is_none() {
            warn!(list_id = %list_id, "observe_items without a session: empty stream");
            return Subscription::ended(Vec::new());
        }
        let (tx, rx) = watch::channel(Vec::new());
        let callback: SnapshotCallback = Arc::new(move |push| {
            tx.send_replace(decode_items(&push));
        });
        let guard = self.backend.listen_items(list_id, callback);
        Subscription::remote(rx, guard)
    }

    async fn add_item(&self, list_id: Uuid, item: Item) -> anyhow::Result<()> {
        if self.session.current_uid().is_none() {
            warn!(list_id = %list_id, "add_item ignored: no active session");
            return Ok(());
        }
        self.backend
            .set_item(list_id, item.id, encode_item(&item))
            .await
    }

    async fn update_item(&self, list_id: Uuid, item: Item) -> anyhow::Result<()> {
        if self.session.current_uid().is_none() {
            warn!(list_id = %list_id, "update_item ignored: no active session");
            return Ok(());
        }
        self.backend
            .set_item(list_id, item.id, encode_item(&item))
            .await
    }

    async fn remove_item(&self, list_id: Uuid, item_id: Uuid) -> anyhow::Result<()> {
        if self.session.current_uid().is_none() {
            warn!(list_id = %list_id, "remove_item ignored: no active session");
            return Ok(());
        }
        self.backend.delete_item(list_id, item_id).await
    }

    async fn set_purchased(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        purchased: bool,
    ) -> anyhow::Result<()> {
        if self.session.current_uid().is_none() {
            warn!(list_id = %list_id, "set_purchased ignored: no active session");
            return Ok(());
        }
        self.backend
            .merge_item(list_id, item_id, json!({ "purchased": purchased }))
            .await
    }
}
