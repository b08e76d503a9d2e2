use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use crate::backend::ListenerGuard;
use crate::models::{Item, ShoppingList};

pub mod local;
pub mod provider;
pub mod remote;

pub use local::{LocalItemRepository, LocalListRepository};
pub use provider::RepoProvider;
pub use remote::{RemoteItemRepository, RemoteListRepository};

/// Replay-latest handle onto a collection stream: `latest()` returns the most
/// recent snapshot immediately, `changed()` waits for the next emission.
/// Emissions are last-value-wins; intermediate snapshots may be coalesced.
///
/// For remote subscriptions the handle owns the backend listener guard, so
/// dropping the subscription deterministically deregisters the listener.
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
    _guard: Option<ListenerGuard>,
}

impl<T: Clone> Subscription<T> {
    pub(crate) fn local(rx: watch::Receiver<T>) -> Self {
        Self { rx, _guard: None }
    }

    pub(crate) fn remote(rx: watch::Receiver<T>, guard: ListenerGuard) -> Self {
        Self {
            rx,
            _guard: Some(guard),
        }
    }

    /// A stream that already completed with a final value. Used where no
    /// emission can ever follow, e.g. observing without an active session.
    pub(crate) fn ended(value: T) -> Self {
        let (tx, rx) = watch::channel(value);
        drop(tx);
        Self { rx, _guard: None }
    }

    /// Current snapshot, marking it seen for the next `changed()` call.
    pub fn latest(&mut self) -> T {
        self.rx.borrow_and_update().clone()
    }

    /// Waits for an emission newer than the last `latest()` call. Returns
    /// false once the stream has ended; no further emissions will arrive.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Contract for shopping-list collections. Implemented by
/// `LocalListRepository` (in-process store) and `RemoteListRepository`
/// (push-based backend). The observed stream, not a mutating call's return
/// value, is authoritative for UI state.
#[async_trait]
pub trait ListRepository: Send + Sync {
    fn observe_lists(&self) -> Subscription<Vec<ShoppingList>>;

    async fn create(&self, title: &str, image_ref: Option<String>)
        -> anyhow::Result<ShoppingList>;

    async fn update(&self, list: ShoppingList) -> anyhow::Result<()>;

    async fn delete(&self, list_id: Uuid) -> anyhow::Result<()>;

    async fn get_by_id(&self, list_id: Uuid) -> anyhow::Result<Option<ShoppingList>>;
}

/// Contract for one list's item collection.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    fn observe_items(&self, list_id: Uuid) -> Subscription<Vec<Item>>;

    async fn add_item(&self, list_id: Uuid, item: Item) -> anyhow::Result<()>;

    async fn update_item(&self, list_id: Uuid, item: Item) -> anyhow::Result<()>;

    async fn remove_item(&self, list_id: Uuid, item_id: Uuid) -> anyhow::Result<()>;

    async fn set_purchased(&self, list_id: Uuid, item_id: Uuid, purchased: bool)
        -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ended_subscription_reports_no_more_changes() {
        let mut sub: Subscription<Vec<ShoppingList>> = Subscription::ended(Vec::new());
        assert!(sub.latest().is_empty());
        assert!(!sub.changed().await);
    }
}
