use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::database::BoxError;

type HmacSha256 = Hmac<Sha256>;

pub fn hash_password(password: &str) -> Result<String, BoxError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| format!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, BoxError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| format!("Failed to parse password hash: {}", e))?;

    let argon2 = Argon2::default();

    Ok(argon2.verify_password(password.as_bytes(), &parsed_hash).is_ok())
}

/// Keyed digest of a password hash, stored in the session at login.
///
/// A session whose digest no longer matches the user's current hash belongs
/// to a password that has since been changed and is treated as logged out.
pub fn session_auth_hash(secret_key: &str, password_hash: &str) -> Result<String, BoxError> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| format!("Invalid secret key: {}", e))?;
    mac.update(b"account-admin.session-auth-hash");
    mac.update(password_hash.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let password = "my_secure_password_123";
        let hash = hash_password(password).unwrap();

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let password = "same_password";
        let hash1 = hash_password(password).unwrap();
        let hash2 = hash_password(password).unwrap();

        // Hashes should be different due to different salts
        assert_ne!(hash1, hash2);

        // But both should verify correctly
        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_session_auth_hash_tracks_password_hash() {
        let first = session_auth_hash("secret", "hash-one").unwrap();
        assert_eq!(first, session_auth_hash("secret", "hash-one").unwrap());
        assert_ne!(first, session_auth_hash("secret", "hash-two").unwrap());
        assert_ne!(first, session_auth_hash("other-secret", "hash-one").unwrap());
    }
}
