use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::error::AppError;

/// A bcrypt hash of a user's password.
///
/// Values only come out of [`PasswordHasher::hash`] or back out of storage, so
/// store write paths that take a `&PasswordHash` can never persist plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wraps a hash that was read back from storage.
    pub fn from_stored(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// Salted bcrypt hashing with a configurable cost factor.
///
/// Hashing is deliberately slow, so the async methods move the work onto the
/// blocking thread pool instead of stalling the worker that serves requests.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    decoy: Arc<OnceCell<PasswordHash>>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(12)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            decoy: Arc::new(OnceCell::new()),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hashes on the current thread. A fresh random salt is embedded in every output.
    pub fn hash_blocking(&self, password: &str) -> Result<PasswordHash, AppError> {
        bcrypt::hash(password, self.cost)
            .map(PasswordHash)
            .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
    }

    /// Checks a candidate password against a stored hash in constant time.
    ///
    /// A mismatch is `Ok(false)`; only a corrupt stored hash is an error.
    pub fn verify_blocking(&self, password: &str, hash: &PasswordHash) -> Result<bool, AppError> {
        bcrypt::verify(password, hash.as_str())
            .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
    }

    pub async fn hash(&self, password: &str) -> Result<PasswordHash, AppError> {
        let hasher = self.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&password)).await?
    }

    pub async fn verify(&self, password: &str, hash: &PasswordHash) -> Result<bool, AppError> {
        let hasher = self.clone();
        let password = password.to_owned();
        let hash = hash.clone();
        tokio::task::spawn_blocking(move || hasher.verify_blocking(&password, &hash)).await?
    }

    /// Spends the same bcrypt work as [`verify`](Self::verify) when there is no
    /// stored hash to check, so a missing account is not faster to reject.
    /// The answer is always a mismatch.
    pub async fn verify_decoy(&self, password: &str) -> Result<bool, AppError> {
        let decoy = self
            .decoy
            .get_or_try_init(|| self.hash("decoy password for unknown accounts"))
            .await?;
        self.verify(password, decoy).await?;
        Ok(false)
    }

    #[cfg(test)]
    pub(crate) fn decoy_ready(&self) -> bool {
        self.decoy.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[test]
    fn test_password_hashing_and_verification() {
        let password = "test_password123";
        let hashed = hasher().hash_blocking(password).unwrap();

        assert!(hasher().verify_blocking(password, &hashed).unwrap());
        assert!(!hasher().verify_blocking("wrong_password", &hashed).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let first = hasher().hash_blocking("same-password").unwrap();
        let second = hasher().hash_blocking("same-password").unwrap();

        assert_ne!(first, second);
        assert!(hasher().verify_blocking("same-password", &first).unwrap());
        assert!(hasher().verify_blocking("same-password", &second).unwrap());
    }

    #[test]
    fn test_cost_is_embedded_in_hash() {
        let hashed = PasswordHasher::new(5).hash_blocking("secret1").unwrap();
        assert!(hashed.as_str().starts_with("$2b$05$"));
        assert_eq!(PasswordHasher::default().cost(), 12);
    }

    #[test]
    fn test_verify_with_invalid_hash() {
        let corrupt = PasswordHash::from_stored("invalidhashformat".into());
        match hasher().verify_blocking("test_password123", &corrupt) {
            Err(AppError::InternalServerError(msg)) => {
                assert!(msg.contains("Failed to verify password"));
            }
            Ok(false) => {}
            Ok(true) => panic!("Password verification should fail for invalid hash format"),
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    #[test]
    fn test_debug_does_not_leak_hash() {
        let hashed = hasher().hash_blocking("secret1").unwrap();
        assert_eq!(format!("{:?}", hashed), "PasswordHash(..)");
    }

    #[actix_rt::test]
    async fn test_async_hash_and_verify() {
        let hashed = hasher().hash("async-secret").await.unwrap();
        assert!(hasher().verify("async-secret", &hashed).await.unwrap());
        assert!(!hasher().verify("other-secret", &hashed).await.unwrap());
    }

    #[actix_rt::test]
    async fn test_decoy_verification_never_matches() {
        let hasher = PasswordHasher::new(5);
        assert!(!hasher.verify_decoy("anything").await.unwrap());
        assert!(!hasher
            .verify_decoy("decoy password for unknown accounts")
            .await
            .unwrap());

        // One decoy hash per hasher, at the configured cost.
        let decoy = hasher.decoy.get().unwrap();
        assert!(decoy.as_str().starts_with("$2b$05$"));
        assert_eq!(hasher.clone().decoy.get(), Some(decoy));
    }
}
