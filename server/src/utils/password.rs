use argon2::Config as ArgonConfig;
use rand::Rng;

use crate::utils::error::AppError;

/// Hash a plaintext password into an encoded Argon2 string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt: [u8; 16] = rand::thread_rng().gen();
    let config = ArgonConfig::default();

    argon2::hash_encoded(password.as_bytes(), &salt, &config)
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {}", e)))
}

/// Hashing is CPU bound, keep it off the async workers.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Hashing task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verify_password(encoded: &str, password: &str) -> bool {
        argon2::verify_encoded(encoded, password.as_bytes()).unwrap_or(false)
    }

    #[test]
    fn hash_never_equals_plaintext() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(!hash.contains("hunter2"));
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn hash_verifies_only_the_right_password() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password(&hash, "hunter2"));
        assert!(!verify_password(&hash, "hunter3"));
        assert!(!verify_password("not-a-hash", "hunter2"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }
}
