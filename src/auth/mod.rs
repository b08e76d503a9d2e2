use uuid::Uuid;

pub mod password;
pub mod services;

pub use services::{AuthError, AuthService};

/// Exposes the signed-in user's id, or none. Repositories consult this before
/// every read and write; authorization itself is the backend's concern.
pub trait SessionProvider: Send + Sync {
    fn current_uid(&self) -> Option<Uuid>;
}
