use std::sync::Arc;

use crate::auth::{AuthService, SessionProvider};
use crate::backend::{MemoryBackend, RemoteBackend};
use crate::config::AppConfig;
use crate::repo::RepoProvider;
use crate::storage::{ImageStore, LocalImageStore, MemoryImageStore};
use crate::store::TenantStore;

/// Composition root. Owns the single `TenantStore` instance and wires every
/// repository and service against it; nothing in the crate reaches for global
/// state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<TenantStore>,
    pub auth: Arc<AuthService>,
    pub images: Arc<dyn ImageStore>,
    pub repos: Arc<RepoProvider>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let images: Arc<dyn ImageStore> = Arc::new(LocalImageStore::new(&config.data_dir));
        let backend: Option<Arc<dyn RemoteBackend>> = if config.remote_backend {
            // Stand-in for the network backend; swapped for the real client
            // at the integration boundary.
            Some(Arc::new(MemoryBackend::new()))
        } else {
            None
        };
        Ok(Self::from_parts(config, images, backend))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        images: Arc<dyn ImageStore>,
        backend: Option<Arc<dyn RemoteBackend>>,
    ) -> Self {
        let store = Arc::new(TenantStore::new());
        let auth = Arc::new(AuthService::new(Arc::clone(&store)));
        let session: Arc<dyn SessionProvider> = auth.clone();
        let repos = match backend {
            Some(backend) => Arc::new(RepoProvider::with_backend(
                Arc::clone(&store),
                session,
                backend,
                Arc::clone(&images),
            )),
            None => Arc::new(RepoProvider::local_only(Arc::clone(&store), session)),
        };
        Self {
            config,
            store,
            auth,
            images,
            repos,
        }
    }

    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            data_dir: std::env::temp_dir().join("listmind-fake"),
            remote_backend: false,
        });
        Self::from_parts(config, Arc::new(MemoryImageStore::new()), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_state_supports_the_full_local_flow() {
        let state = AppState::fake();
        let user = state
            .auth
            .sign_up("Alice", "alice@example.com", "password123", "password123")
            .unwrap();
        assert_eq!(state.store.active_user(), Some(user.id));

        let lists = state.repos.list_repository();
        let created = lists.create("Groceries", None).await.unwrap();
        assert_eq!(
            lists.get_by_id(created.id).await.unwrap().unwrap().title,
            "Groceries"
        );
    }
}
