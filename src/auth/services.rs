use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::SessionProvider;
use crate::models::User;
use crate::store::TenantStore;

const DEMO_EMAIL: &str = "demo@demo.com";
const DEMO_PASSWORD: &str = "demo1234";
const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("invalid email")]
    InvalidEmail,
    #[error("password too short")]
    PasswordTooShort,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("internal auth failure: {0}")]
    Internal(String),
}

/// Account registry plus session switching. Signing in activates the user's
/// partition in the shared `TenantStore`; signing out only clears the session,
/// the user's lists stay in memory for the next sign-in.
pub struct AuthService {
    store: Arc<TenantStore>,
}

impl AuthService {
    pub fn new(store: Arc<TenantStore>) -> Self {
        Self { store }
    }

    pub fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<User, AuthError> {
        let email = email.trim().to_lowercase();

        if name.trim().is_empty() {
            return Err(AuthError::EmptyName);
        }
        if !is_valid_email(&email) {
            warn!(email = %email, "sign up with invalid email");
            return Err(AuthError::InvalidEmail);
        }
        if password.len() < MIN_PASSWORD_LEN {
            warn!("sign up with too short password");
            return Err(AuthError::PasswordTooShort);
        }
        if password != confirm {
            return Err(AuthError::PasswordMismatch);
        }
        if self.store.find_user_by_email(&email).is_some() {
            warn!(email = %email, "sign up with taken email");
            return Err(AuthError::EmailTaken);
        }

        let hash = hash_password(password).map_err(|e| AuthError::Internal(e.to_string()))?;
        let user = User::new(name.trim(), &email, &hash);
        self.store.add_user(user.clone());
        self.store.set_active_user(Some(user.id));
        info!(user_id = %user.id, email = %user.email, "user signed up");
        Ok(user)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim().to_lowercase();

        if !is_valid_email(&email) {
            warn!(email = %email, "sign in with invalid email");
            return Err(AuthError::InvalidEmail);
        }

        let Some(user) = self.store.find_user_by_email(&email) else {
            warn!(email = %email, "sign in with unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let ok = verify_password(password, &user.password_hash)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !ok {
            warn!(email = %email, user_id = %user.id, "sign in with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.store.set_active_user(Some(user.id));
        info!(user_id = %user.id, email = %user.email, "user signed in");
        Ok(user)
    }

    /// Clears the active session. Per-user data is kept for the lifetime of
    /// the process and becomes visible again on the next sign-in.
    pub fn sign_out(&self) {
        if let Some(uid) = self.store.active_user() {
            info!(user_id = %uid, "user signed out");
        }
        self.store.set_active_user(None);
    }

    pub fn current_user(&self) -> Option<User> {
        self.store.active_user().and_then(|uid| self.store.find_user(uid))
    }

    /// Seeds the demo account used by the demo binary. Idempotent.
    pub fn ensure_demo_user(&self) -> anyhow::Result<User> {
        if let Some(user) = self.store.find_user_by_email(DEMO_EMAIL) {
            return Ok(user);
        }
        let hash = hash_password(DEMO_PASSWORD)?;
        let user = User::new("Demo", DEMO_EMAIL, &hash);
        self.store.add_user(user.clone());
        info!(user_id = %user.id, "demo user seeded");
        Ok(user)
    }
}

impl SessionProvider for AuthService {
    fn current_uid(&self) -> Option<Uuid> {
        self.store.active_user()
    }
}

impl SessionProvider for TenantStore {
    fn current_uid(&self) -> Option<Uuid> {
        self.active_user()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShoppingList;

    fn service() -> (AuthService, Arc<TenantStore>) {
        let store = Arc::new(TenantStore::new());
        (AuthService::new(Arc::clone(&store)), store)
    }

    #[test]
    fn sign_up_then_sign_in_roundtrip() {
        let (auth, store) = service();
        let user = auth
            .sign_up("Alice", "Alice@Example.com", "password123", "password123")
            .expect("sign up should succeed");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(store.active_user(), Some(user.id));

        auth.sign_out();
        assert_eq!(store.active_user(), None);

        let again = auth
            .sign_in("alice@example.com", "password123")
            .expect("sign in should succeed");
        assert_eq!(again.id, user.id);
        assert_eq!(auth.current_uid(), Some(user.id));
    }

    #[test]
    fn sign_up_rejects_bad_input() {
        let (auth, _) = service();
        assert_eq!(
            auth.sign_up("", "a@b.com", "password123", "password123"),
            Err(AuthError::EmptyName)
        );
        assert_eq!(
            auth.sign_up("Alice", "not-an-email", "password123", "password123"),
            Err(AuthError::InvalidEmail)
        );
        assert_eq!(
            auth.sign_up("Alice", "a@b.com", "short", "short"),
            Err(AuthError::PasswordTooShort)
        );
        assert_eq!(
            auth.sign_up("Alice", "a@b.com", "password123", "password124"),
            Err(AuthError::PasswordMismatch)
        );
    }

    #[test]
    fn duplicate_email_is_rejected_case_insensitively() {
        let (auth, _) = service();
        auth.sign_up("Alice", "alice@example.com", "password123", "password123")
            .unwrap();
        assert_eq!(
            auth.sign_up("Alice 2", "ALICE@example.com", "password123", "password123"),
            Err(AuthError::EmailTaken)
        );
    }

    #[test]
    fn wrong_password_is_invalid_credentials() {
        let (auth, _) = service();
        auth.sign_up("Alice", "alice@example.com", "password123", "password123")
            .unwrap();
        assert_eq!(
            auth.sign_in("alice@example.com", "wrong-password"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            auth.sign_in("nobody@example.com", "password123"),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn sign_out_preserves_lists_until_next_sign_in() {
        let (auth, store) = service();
        auth.sign_up("Alice", "alice@example.com", "password123", "password123")
            .unwrap();
        store.add_list(ShoppingList::new("Groceries", None));
        assert_eq!(store.lists().len(), 1);

        auth.sign_out();
        assert!(store.lists().is_empty());

        auth.sign_in("alice@example.com", "password123").unwrap();
        assert_eq!(store.lists().len(), 1);
        assert_eq!(store.lists()[0].title, "Groceries");
    }

    #[test]
    fn demo_seed_is_idempotent() {
        let (auth, store) = service();
        let first = auth.ensure_demo_user().unwrap();
        let second = auth.ensure_demo_user().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.user_count(), 1);
        auth.sign_in(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
    }
}
