use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Item, ShoppingList, User};

#[derive(Default)]
struct Partition {
    lists: Vec<ShoppingList>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    partitions: HashMap<Uuid, Partition>,
    active_user: Option<Uuid>,
}

impl Inner {
    fn active_partition(&self) -> Option<&Partition> {
        self.active_user.and_then(|uid| self.partitions.get(&uid))
    }

    fn active_partition_mut(&mut self) -> Option<&mut Partition> {
        let uid = self.active_user?;
        Some(self.partitions.entry(uid).or_default())
    }

    fn active_lists(&self) -> Vec<ShoppingList> {
        self.active_partition()
            .map(|p| p.lists.clone())
            .unwrap_or_default()
    }

    fn active_items(&self, list_id: Uuid) -> Vec<Item> {
        self.active_partition()
            .and_then(|p| p.lists.iter().find(|l| l.id == list_id))
            .map(|l| l.items.clone())
            .unwrap_or_default()
    }
}

/// In-memory store partitioned by owning user. One instance is created by the
/// composition root and shared by every local repository, so a write issued on
/// one screen is observable on any other without a manual refresh.
///
/// The store owns the watch channels: mutation and publication happen under the
/// same lock, so a stream poll never sees a partially-applied change.
pub struct TenantStore {
    inner: Mutex<Inner>,
    lists_tx: watch::Sender<Vec<ShoppingList>>,
    items_tx: Mutex<HashMap<Uuid, watch::Sender<Vec<Item>>>>,
}

impl Default for TenantStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantStore {
    pub fn new() -> Self {
        let (lists_tx, _) = watch::channel(Vec::new());
        Self {
            inner: Mutex::new(Inner::default()),
            lists_tx,
            items_tx: Mutex::new(HashMap::new()),
        }
    }

    // ----- session -----

    /// Switches the active partition. Subsequent reads and writes act only
    /// within it. The list stream is republished immediately so a
    /// replay-latest subscriber never observes the previous tenant's data.
    pub fn set_active_user(&self, user_id: Option<Uuid>) {
        let mut inner = self.inner.lock().unwrap();
        inner.active_user = user_id;
        debug!(user_id = ?user_id, "active user switched");
        self.lists_tx.send_replace(inner.active_lists());

        // Known item channels are re-seeded from the new partition; a list id
        // that does not belong to it resolves to empty.
        let channels = self.items_tx.lock().unwrap();
        for (list_id, tx) in channels.iter() {
            let fresh = inner.active_items(*list_id);
            tx.send_if_modified(|current| {
                if *current != fresh {
                    *current = fresh;
                    true
                } else {
                    false
                }
            });
        }
    }

    pub fn active_user(&self) -> Option<Uuid> {
        self.inner.lock().unwrap().active_user
    }

    // ----- user registry -----

    pub fn add_user(&self, user: User) {
        let mut inner = self.inner.lock().unwrap();
        inner.partitions.entry(user.id).or_default();
        debug!(user_id = %user.id, email = %user.email, "user registered");
        inner.users.push(user);
    }

    /// Case-insensitive email lookup.
    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        let needle = email.trim().to_lowercase();
        self.inner
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.email.to_lowercase() == needle)
            .cloned()
    }

    pub fn find_user(&self, user_id: Uuid) -> Option<User> {
        self.inner
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
    }

    pub fn user_count(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }

    // ----- lists -----

    pub fn lists(&self) -> Vec<ShoppingList> {
        self.inner.lock().unwrap().active_lists()
    }

    pub fn add_list(&self, list: ShoppingList) {
        let mut inner = self.inner.lock().unwrap();
        match inner.active_partition_mut() {
            Some(partition) => {
                debug!(list_id = %list.id, title = %list.title, "list added");
                partition.lists.push(list);
                self.lists_tx.send_replace(inner.active_lists());
            }
            None => warn!("add_list ignored: no active user"),
        }
    }

    pub fn find_list(&self, list_id: Uuid) -> Option<ShoppingList> {
        self.inner
            .lock()
            .unwrap()
            .active_partition()
            .and_then(|p| p.lists.iter().find(|l| l.id == list_id))
            .cloned()
    }

    /// Replaces the stored list with the same id. No-op if the id is absent
    /// from the active partition.
    pub fn update_list(&self, list: ShoppingList) {
        let mut inner = self.inner.lock().unwrap();
        let Some(partition) = inner.active_partition_mut() else {
            warn!("update_list ignored: no active user");
            return;
        };
        if let Some(slot) = partition.lists.iter_mut().find(|l| l.id == list.id) {
            *slot = list;
            self.lists_tx.send_replace(inner.active_lists());
        }
    }

    /// Deletes the list and all of its items.
    pub fn remove_list(&self, list_id: Uuid) {
        let mut inner = self.inner.lock().unwrap();
        let Some(partition) = inner.active_partition_mut() else {
            warn!("remove_list ignored: no active user");
            return;
        };
        partition.lists.retain(|l| l.id != list_id);
        debug!(list_id = %list_id, "list removed");
        self.lists_tx.send_replace(inner.active_lists());
        if let Some(tx) = self.items_tx.lock().unwrap().get(&list_id) {
            tx.send_replace(Vec::new());
        }
    }

    // ----- items -----

    pub fn add_item(&self, list_id: Uuid, item: Item) {
        self.mutate_items(list_id, |items| {
            items.push(item);
            true
        });
    }

    pub fn update_item(&self, list_id: Uuid, item: Item) {
        self.mutate_items(list_id, |items| {
            match items.iter_mut().find(|i| i.id == item.id) {
                Some(slot) => {
                    *slot = item;
                    true
                }
                None => false,
            }
        });
    }

    pub fn remove_item(&self, list_id: Uuid, item_id: Uuid) {
        self.mutate_items(list_id, |items| {
            let before = items.len();
            items.retain(|i| i.id != item_id);
            items.len() != before
        });
    }

    pub fn set_item_purchased(&self, list_id: Uuid, item_id: Uuid, purchased: bool) {
        self.mutate_items(list_id, |items| {
            match items.iter_mut().find(|i| i.id == item_id) {
                Some(item) => {
                    item.purchased = purchased;
                    true
                }
                None => false,
            }
        });
    }

    /// Applies `f` to the item collection of one list in the active partition
    /// and republishes both the item stream and the list stream when `f`
    /// reports a change. List snapshots embed their items, so an item-level
    /// write is a list-level emission too.
    fn mutate_items<F>(&self, list_id: Uuid, f: F)
    where
        F: FnOnce(&mut Vec<Item>) -> bool,
    {
        let mut inner = self.inner.lock().unwrap();
        let Some(partition) = inner.active_partition_mut() else {
            warn!(list_id = %list_id, "item write ignored: no active user");
            return;
        };
        let Some(list) = partition.lists.iter_mut().find(|l| l.id == list_id) else {
            warn!(list_id = %list_id, "item write ignored: unknown list");
            return;
        };
        if !f(&mut list.items) {
            return;
        }
        let items = list.items.clone();
        self.lists_tx.send_replace(inner.active_lists());
        if let Some(tx) = self.items_tx.lock().unwrap().get(&list_id) {
            tx.send_replace(items);
        }
    }

    // ----- streams -----

    /// Replay-latest stream of the active partition's lists.
    pub fn watch_lists(&self) -> watch::Receiver<Vec<ShoppingList>> {
        self.lists_tx.subscribe()
    }

    /// Replay-latest stream of one list's items. The channel is created on
    /// first use and seeded from current state, so a late subscriber starts
    /// from the real snapshot rather than an empty default.
    pub fn watch_items(&self, list_id: Uuid) -> watch::Receiver<Vec<Item>> {
        let inner = self.inner.lock().unwrap();
        let seed = inner.active_items(list_id);
        let mut channels = self.items_tx.lock().unwrap();
        let tx = channels
            .entry(list_id)
            .or_insert_with(|| watch::channel(seed.clone()).0);
        tx.send_if_modified(|current| {
            if *current != seed {
                *current = seed;
                true
            } else {
                false
            }
        });
        tx.subscribe()
    }
}
