use std::sync::Arc;

use tracing::debug;

use crate::auth::SessionProvider;
use crate::backend::RemoteBackend;
use crate::repo::{
    ItemRepository, ListRepository, LocalItemRepository, LocalListRepository,
    RemoteItemRepository, RemoteListRepository,
};
use crate::storage::ImageStore;
use crate::store::TenantStore;

/// Hands out the repository implementation matching the current session:
/// signed in with a configured backend means remote, anything else means the
/// process-wide local singletons. The local repositories are created once and
/// shared, so every consumer sees the same `TenantStore` and a write on one
/// screen shows up on the others without a refresh.
pub struct RepoProvider {
    session: Arc<dyn SessionProvider>,
    local_lists: Arc<LocalListRepository>,
    local_items: Arc<LocalItemRepository>,
    remote_lists: Option<Arc<RemoteListRepository>>,
    remote_items: Option<Arc<RemoteItemRepository>>,
}

impl RepoProvider {
    /// Wiring without a remote backend: every session uses the local store.
    pub fn local_only(store: Arc<TenantStore>, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            session,
            local_lists: Arc::new(LocalListRepository::new(Arc::clone(&store))),
            local_items: Arc::new(LocalItemRepository::new(store)),
            remote_lists: None,
            remote_items: None,
        }
    }

    /// Wiring with a remote backend for signed-in sessions.
    pub fn with_backend(
        store: Arc<TenantStore>,
        session: Arc<dyn SessionProvider>,
        backend: Arc<dyn RemoteBackend>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        let remote_lists = Arc::new(RemoteListRepository::new(
            Arc::clone(&backend),
            Arc::clone(&session),
            images,
        ));
        let remote_items = Arc::new(RemoteItemRepository::new(backend, Arc::clone(&session)));
        Self {
            session,
            local_lists: Arc::new(LocalListRepository::new(Arc::clone(&store))),
            local_items: Arc::new(LocalItemRepository::new(store)),
            remote_lists: Some(remote_lists),
            remote_items: Some(remote_items),
        }
    }

    pub fn list_repository(&self) -> Arc<dyn ListRepository> {
        match (&self.remote_lists, self.session.current_uid()) {
            (Some(remote), Some(_)) => {
                debug!("using remote list repository");
                remote.clone()
            }
            _ => self.local_lists.clone(),
        }
    }

    pub fn item_repository(&self) -> Arc<dyn ItemRepository> {
        match (&self.remote_items, self.session.current_uid()) {
            (Some(remote), Some(_)) => {
                debug!("using remote item repository");
                remote.clone()
            }
            _ => self.local_items.clone(),
        }
    }
}
