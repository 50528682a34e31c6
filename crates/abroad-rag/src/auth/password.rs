//! Salted password hashing (bcrypt)
//!
//! bcrypt is deliberately slow, so hashing runs on the blocking pool.

use crate::error::{Error, Result};

/// Hash a password with a fresh salt
pub async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| Error::internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| Error::internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored hash.
///
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> Result<bool> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| Error::internal(format!("Verification task failed: {}", e)))?;

    Ok(verified.unwrap_or_else(|e| {
        tracing::warn!("Stored password hash is unreadable: {}", e);
        false
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("correct horse".to_string(), 4).await.unwrap();
        assert_ne!(hash, "correct horse");

        assert!(verify_password("correct horse".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_salted() {
        let a = hash_password("same".to_string(), 4).await.unwrap();
        let b = hash_password("same".to_string(), 4).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_malformed_hash_is_mismatch() {
        let ok = verify_password("pw".to_string(), "not-a-hash".to_string()).await;
        tokio_test::assert_ok!(&ok);
        assert!(!ok.unwrap());
    }
}
