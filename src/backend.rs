use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// One push from the backend to a registered listener.
#[derive(Debug, Clone)]
pub enum SnapshotPush {
    /// Full point-in-time snapshot of the listened collection:
    /// `(document id, document fields)` in backend delivery order.
    Snapshot(Vec<(Uuid, Value)>),
    /// Connectivity was lost. Consumers degrade to an empty collection.
    Disconnected,
}

pub type SnapshotCallback = Arc<dyn Fn(SnapshotPush) + Send + Sync>;

/// Deregisters the backend listener when dropped. Keeping deregistration on
/// `Drop` ties listener lifetime to subscription lifetime, so a cancelled
/// subscriber cannot leak a listener.
pub struct ListenerGuard {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerGuard {
    pub fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

/// Push-based keyed document store, the contract the real network backend
/// exposes. List documents live in a per-owner collection; item documents in a
/// per-list sub-collection. `listen_*` delivers the current snapshot before
/// returning and every subsequent change in order. Deleting a list also drops
/// its item sub-collection.
///
/// Listener callbacks run on whatever context performed the write; they must
/// not block and must not call back into the backend.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    fn listen_lists(&self, owner_id: Uuid, callback: SnapshotCallback) -> ListenerGuard;
    fn listen_items(&self, list_id: Uuid, callback: SnapshotCallback) -> ListenerGuard;

    async fn get_list(&self, owner_id: Uuid, list_id: Uuid) -> anyhow::Result<Option<Value>>;
    async fn set_list(&self, owner_id: Uuid, list_id: Uuid, fields: Value) -> anyhow::Result<()>;
    async fn delete_list(&self, owner_id: Uuid, list_id: Uuid) -> anyhow::Result<()>;

    async fn set_item(&self, list_id: Uuid, item_id: Uuid, fields: Value) -> anyhow::Result<()>;
    async fn merge_item(&self, list_id: Uuid, item_id: Uuid, patch: Value) -> anyhow::Result<()>;
    async fn delete_item(&self, list_id: Uuid, item_id: Uuid) -> anyhow::Result<()>;
}

enum ListenScope {
    Lists { owner_id: Uuid },
    Items { list_id: Uuid },
}

struct ListenerEntry {
    scope: ListenScope,
    callback: SnapshotCallback,
}

struct StoredList {
    owner_id: Uuid,
    fields: Value,
}

struct BackendInner {
    lists: Vec<(Uuid, StoredList)>,
    items: HashMap<Uuid, Vec<(Uuid, Value)>>,
    listeners: HashMap<u64, ListenerEntry>,
    next_listener_id: u64,
    connected: bool,
}

impl BackendInner {
    fn lists_snapshot(&self, owner_id: Uuid) -> SnapshotPush {
        if !self.connected {
            return SnapshotPush::Disconnected;
        }
        let docs = self
            .lists
            .iter()
            .filter(|(_, stored)| stored.owner_id == owner_id)
            .map(|(id, stored)| (*id, stored.fields.clone()))
            .collect();
        SnapshotPush::Snapshot(docs)
    }

    fn items_snapshot(&self, list_id: Uuid) -> SnapshotPush {
        if !self.connected {
            return SnapshotPush::Disconnected;
        }
        let docs = self.items.get(&list_id).cloned().unwrap_or_default();
        SnapshotPush::Snapshot(docs)
    }

    /// Pushes the current snapshot to every listener whose scope matches.
    /// Invoked under the backend lock, which both serializes deliveries and
    /// keeps them in write order.
    fn notify_lists(&self, owner_id: Uuid) {
        for entry in self.listeners.values() {
            if let ListenScope::Lists { owner_id: listened } = entry.scope {
                if listened == owner_id {
                    (entry.callback)(self.lists_snapshot(owner_id));
                }
            }
        }
    }

    fn notify_items(&self, list_id: Uuid) {
        for entry in self.listeners.values() {
            if let ListenScope::Items { list_id: listened } = entry.scope {
                if listened == list_id {
                    (entry.callback)(self.items_snapshot(list_id));
                }
            }
        }
    }

    fn notify_all(&self) {
        for entry in self.listeners.values() {
            match entry.scope {
                ListenScope::Lists { owner_id } => {
                    (entry.callback)(self.lists_snapshot(owner_id))
                }
                ListenScope::Items { list_id } => (entry.callback)(self.items_snapshot(list_id)),
            }
        }
    }
}

/// In-process implementation of `RemoteBackend`. Stands in for the network
/// backend in tests and the demo binary; `set_connected` simulates losing and
/// regaining connectivity.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Mutex<BackendInner>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BackendInner {
                lists: Vec::new(),
                items: HashMap::new(),
                listeners: HashMap::new(),
                next_listener_id: 0,
                connected: true,
            })),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = connected;
        debug!(connected, "backend connectivity changed");
        inner.notify_all();
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().unwrap().listeners.len()
    }

    fn register(&self, scope: ListenScope, callback: SnapshotCallback) -> ListenerGuard {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;

        let initial = match &scope {
            ListenScope::Lists { owner_id } => inner.lists_snapshot(*owner_id),
            ListenScope::Items { list_id } => inner.items_snapshot(*list_id),
        };
        callback(initial);

        inner.listeners.insert(id, ListenerEntry { scope, callback });
        debug!(listener_id = id, "backend listener registered");

        let slot = Arc::clone(&self.inner);
        ListenerGuard::new(move || {
            slot.lock().unwrap().listeners.remove(&id);
            debug!(listener_id = id, "backend listener removed");
        })
    }
}

#[async_trait]
impl RemoteBackend for MemoryBackend {
    fn listen_lists(&self, owner_id: Uuid, callback: SnapshotCallback) -> ListenerGuard {
        self.register(ListenScope::Lists { owner_id }, callback)
    }

    fn listen_items(&self, list_id: Uuid, callback: SnapshotCallback) -> ListenerGuard {
        self.register(ListenScope::Items { list_id }, callback)
    }

    async fn get_list(&self, owner_id: Uuid, list_id: Uuid) -> anyhow::Result<Option<Value>> {
        let inner = self.inner.lock().unwrap();
        if !inner.connected {
            anyhow::bail!("backend unreachable");
        }
        Ok(inner
            .lists
            .iter()
            .find(|(id, stored)| *id == list_id && stored.owner_id == owner_id)
            .map(|(_, stored)| stored.fields.clone()))
    }

    async fn set_list(&self, owner_id: Uuid, list_id: Uuid, fields: Value) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected {
            anyhow::bail!("backend unreachable");
        }
        match inner.lists.iter_mut().find(|(id, _)| *id == list_id) {
            Some((_, stored)) => {
                stored.owner_id = owner_id;
                stored.fields = fields;
            }
            None => inner.lists.push((list_id, StoredList { owner_id, fields })),
        }
        inner.notify_lists(owner_id);
        Ok(())
    }

    async fn delete_list(&self, owner_id: Uuid, list_id: Uuid) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected {
            anyhow::bail!("backend unreachable");
        }
        inner.lists.retain(|(id, _)| *id != list_id);
        inner.items.remove(&list_id);
        inner.notify_lists(owner_id);
        inner.notify_items(list_id);
        Ok(())
    }

    async fn set_item(&self, list_id: Uuid, item_id: Uuid, fields: Value) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected {
            anyhow::bail!("backend unreachable");
        }
        let docs = inner.items.entry(list_id).or_default();
        match docs.iter_mut().find(|(id, _)| *id == item_id) {
            Some((_, slot)) => *slot = fields,
            None => docs.push((item_id, fields)),
        }
        inner.notify_items(list_id);
        Ok(())
    }

    async fn merge_item(&self, list_id: Uuid, item_id: Uuid, patch: Value) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected {
            anyhow::bail!("backend unreachable");
        }
        let Some(docs) = inner.items.get_mut(&list_id) else {
            return Ok(());
        };
        let Some((_, fields)) = docs.iter_mut().find(|(id, _)| *id == item_id) else {
            return Ok(());
        };
        if let (Value::Object(doc), Value::Object(patch)) = (fields, patch) {
            for (key, value) in patch {
                doc.insert(key, value);
            }
        }
        inner.notify_items(list_id);
        Ok(())
    }

    async fn delete_item(&self, list_id: Uuid, item_id: Uuid) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected {
            anyhow::bail!("backend unreachable");
        }
        if let Some(docs) = inner.items.get_mut(&list_id) {
            docs.retain(|(id, _)| *id != item_id);
        }
        inner.notify_items(list_id);
        Ok(())
    }
}
