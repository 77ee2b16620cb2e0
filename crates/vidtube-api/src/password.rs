use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::ApiError;

/// Argon2id with a fresh random salt.
pub fn hash_blocking(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// False on mismatch; an error only when the stored hash is unreadable.
pub fn verify_blocking(password: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| anyhow::anyhow!("stored hash unreadable: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub async fn hash_password(password: String) -> Result<String, ApiError> {
    run_blocking(move || hash_blocking(&password)).await
}

pub async fn verify_password(password: String, stored_hash: String) -> Result<bool, ApiError> {
    run_blocking(move || verify_blocking(&password, &stored_hash)).await
}

async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))?
        .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_never_equals_plaintext() {
        let hash = hash_blocking("p1").unwrap();
        assert_ne!(hash, "p1");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn salted_hashes_differ_and_both_verify() {
        let a = hash_blocking("p1").unwrap();
        let b = hash_blocking("p1").unwrap();
        assert_ne!(a, b);
        assert!(verify_blocking("p1", &a).unwrap());
        assert!(verify_blocking("p1", &b).unwrap());
        assert!(!verify_blocking("p2", &a).unwrap());
    }

    #[test]
    fn unreadable_hash_is_an_error() {
        assert!(verify_blocking("p1", "not-a-hash").is_err());
    }
}
