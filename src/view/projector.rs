use tokio::sync::watch;
use tracing::debug;

use crate::models::{Item, ShoppingList};
use crate::repo::Subscription;
use crate::view::{build_rows, filter_lists, ItemsUiState, ListsUiState};

/// Combines an upstream collection subscription with a live query into a
/// replay-latest stream of immutable view states. Holds the latest value of
/// both inputs and recomputes exactly once whenever either changes; a late
/// subscriber reads the current state immediately instead of replaying
/// history.
///
/// The combining task ends when nothing can drive it anymore (every state
/// subscriber and the projector handle are gone), which also drops the
/// upstream subscription and thereby any backend listener behind it.
pub struct ViewProjector<S> {
    query_tx: watch::Sender<String>,
    state_rx: watch::Receiver<S>,
}

impl<S: Clone + Send + Sync + 'static> ViewProjector<S> {
    pub fn spawn<T, F>(mut upstream: Subscription<Vec<T>>, compute: F) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&[T], &str) -> S + Send + 'static,
    {
        let (query_tx, mut query_rx) = watch::channel(String::new());
        let initial = compute(&upstream.latest(), "");
        let (state_tx, state_rx) = watch::channel(initial);

        tokio::spawn(async move {
            let mut upstream_alive = true;
            let mut query_alive = true;
            loop {
                tokio::select! {
                    alive = upstream.changed(), if upstream_alive => {
                        if !alive {
                            upstream_alive = false;
                            if !query_alive {
                                break;
                            }
                            continue;
                        }
                    }
                    res = query_rx.changed(), if query_alive => {
                        if res.is_err() {
                            query_alive = false;
                            if !upstream_alive {
                                break;
                            }
                            continue;
                        }
                    }
                    _ = state_tx.closed() => break,
                }
                let snapshot = upstream.latest();
                let query = query_rx.borrow_and_update().clone();
                state_tx.send_replace(compute(&snapshot, &query));
            }
            debug!("view projector stopped");
        });

        Self { query_tx, state_rx }
    }

    /// Updates the live query. Setting the same text again does not emit.
    pub fn set_query(&self, query: &str) {
        self.query_tx.send_if_modified(|current| {
            if current != query {
                *current = query.to_string();
                true
            } else {
                false
            }
        });
    }

    /// Replay-latest stream of view states.
    pub fn state(&self) -> watch::Receiver<S> {
        self.state_rx.clone()
    }

    pub fn current(&self) -> S {
        self.state_rx.borrow().clone()
    }
}

impl ViewProjector<ListsUiState> {
    /// Projector for the lists screen: filters list titles by the query.
    pub fn lists(upstream: Subscription<Vec<ShoppingList>>) -> Self {
        Self::spawn(upstream, |lists, query| ListsUiState {
            all: lists.to_vec(),
            filtered: filter_lists(lists, query),
            query: query.to_string(),
        })
    }
}

impl ViewProjector<ItemsUiState> {
    /// Projector for the detail screen: filters and groups items.
    pub fn items(upstream: Subscription<Vec<Item>>) -> Self {
        Self::spawn(upstream, |items, query| ItemsUiState {
            all: items.to_vec(),
            rows: build_rows(items, query),
            query: query.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::models::{Category, User};
    use crate::repo::{
        ItemRepository, ListRepository, LocalItemRepository, LocalListRepository,
        RemoteListRepository,
    };
    use crate::storage::MemoryImageStore;
    use crate::store::TenantStore;
    use crate::view::{Row, Section};
    use std::sync::Arc;
    use std::time::Duration;

    fn signed_in_store() -> Arc<TenantStore> {
        let store = Arc::new(TenantStore::new());
        let user = User::new("Alice", "alice@example.com", "hash");
        let uid = user.id;
        store.add_user(user);
        store.set_active_user(Some(uid));
        store
    }

    fn row_labels(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .map(|row| match row {
                Row::Header(section) => format!("#{}", section.label()),
                Row::Item(item) => item.name.clone(),
            })
            .collect()
    }

    #[tokio::test]
    async fn late_subscriber_reads_current_state_immediately() {
        let store = signed_in_store();
        let lists = LocalListRepository::new(Arc::clone(&store));
        lists.create("Groceries", None).await.unwrap();
        lists.create("Hardware", None).await.unwrap();

        let projector = ViewProjector::lists(lists.observe_lists());
        assert_eq!(projector.current().all.len(), 2);
        assert_eq!(projector.current().filtered.len(), 2);
    }

    #[tokio::test]
    async fn upstream_mutation_triggers_a_recompute() {
        let store = signed_in_store();
        let lists = LocalListRepository::new(Arc::clone(&store));
        let projector = ViewProjector::lists(lists.observe_lists());
        let mut state = projector.state();

        lists.create("Groceries", None).await.unwrap();
        let seen = state
            .wait_for(|s| s.all.len() == 1)
            .await
            .expect("state stream should stay open");
        assert_eq!(seen.all[0].title, "Groceries");
    }

    #[tokio::test]
    async fn query_change_refilters_without_an_upstream_emission() {
        let store = signed_in_store();
        let lists = LocalListRepository::new(Arc::clone(&store));
        lists.create("Groceries", None).await.unwrap();
        lists.create("Hardware", None).await.unwrap();

        let projector = ViewProjector::lists(lists.observe_lists());
        let mut state = projector.state();

        projector.set_query("groc");
        let seen = state.wait_for(|s| s.query == "groc").await.unwrap();
        assert_eq!(seen.all.len(), 2);
        assert_eq!(seen.filtered.len(), 1);
        assert_eq!(seen.filtered[0].title, "Groceries");
        drop(seen);

        projector.set_query("");
        let seen = state.wait_for(|s| s.query.is_empty()).await.unwrap();
        assert_eq!(seen.filtered.len(), 2);
    }

    #[tokio::test]
    async fn repeating_the_same_query_does_not_emit() {
        let store = signed_in_store();
        let lists = LocalListRepository::new(Arc::clone(&store));
        let projector = ViewProjector::lists(lists.observe_lists());
        let mut state = projector.state();

        projector.set_query("x");
        state.wait_for(|s| s.query == "x").await.unwrap();
        state.borrow_and_update();

        projector.set_query("x");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!state.has_changed().unwrap());
    }

    #[tokio::test]
    async fn query_keeps_working_after_the_upstream_ends() {
        let item = Item::new("Rice", 2.0, "kg", Category::Food);
        let upstream = Subscription::ended(vec![item]);
        let projector = ViewProjector::items(upstream);
        let mut state = projector.state();

        projector.set_query("soap");
        let seen = state.wait_for(|s| s.query == "soap").await.unwrap();
        assert!(seen.rows.is_empty());
        assert_eq!(seen.all.len(), 1);
    }

    #[tokio::test]
    async fn dropping_all_consumers_releases_the_backend_listener() {
        let store = signed_in_store();
        let backend = Arc::new(MemoryBackend::new());
        let repo = RemoteListRepository::new(
            backend.clone(),
            store.clone(),
            Arc::new(MemoryImageStore::new()),
        );

        let projector = ViewProjector::lists(repo.observe_lists());
        assert_eq!(backend.listener_count(), 1);

        drop(projector);
        for _ in 0..100 {
            if backend.listener_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(backend.listener_count(), 0);
    }

    #[tokio::test]
    async fn purchase_flow_moves_an_item_to_the_purchased_section() {
        let store = signed_in_store();
        let lists = LocalListRepository::new(Arc::clone(&store));
        let items = LocalItemRepository::new(Arc::clone(&store));

        let lists_projector = ViewProjector::lists(lists.observe_lists());
        let mut lists_state = lists_projector.state();

        let list = lists.create("Groceries", None).await.unwrap();
        let seen = lists_state.wait_for(|s| s.all.len() == 1).await.unwrap();
        assert_eq!(seen.all[0].title, "Groceries");
        assert!(seen.all[0].items.is_empty());
        drop(seen);

        let item = Item::new("Rice", 2.0, "kg", Category::Food);
        let item_id = item.id;
        items.add_item(list.id, item).await.unwrap();

        let items_projector = ViewProjector::items(items.observe_items(list.id));
        let mut items_state = items_projector.state();
        let seen = items_state.wait_for(|s| s.all.len() == 1).await.unwrap();
        assert_eq!(row_labels(&seen.rows), vec!["#Food", "Rice"]);
        drop(seen);

        items.set_purchased(list.id, item_id, true).await.unwrap();
        let seen = items_state
            .wait_for(|s| {
                s.rows
                    .first()
                    .is_some_and(|r| matches!(r, Row::Header(Section::Purchased)))
            })
            .await
            .unwrap();
        assert_eq!(row_labels(&seen.rows), vec!["#Purchased", "Rice"]);
    }
}
