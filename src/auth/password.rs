use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Argon2 hash with a fresh random salt.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hashing failed");
            anyhow::anyhow!(e.to_string())
        })?;
    Ok(hash.to_string())
}

/// True when `plain` matches `hash`. Errors only on a malformed hash string.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "stored password hash is malformed");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_accepts_the_password() {
        let hash = hash_password("hunter2hunter2").expect("hashing should succeed");
        assert!(verify_password("hunter2hunter2", &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_a_wrong_password() {
        let hash = hash_password("hunter2hunter2").expect("hashing should succeed");
        assert!(!verify_password("hunter3hunter3", &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_errors_on_garbage_hash() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("hunter2hunter2").unwrap();
        let b = hash_password("hunter2hunter2").unwrap();
        assert_ne!(a, b); // per-hash salt
    }
}
