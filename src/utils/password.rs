use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AuthError;

/// Bcrypt cost factor for client secrets.
pub const BCRYPT_COST: u32 = 12;

/// Bcrypt only considers the first 72 bytes of its input.
const BCRYPT_MAX_BYTES: usize = 72;

/// Hash a user password with Argon2id.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::InternalError(anyhow::anyhow!("Password hashing failed: {}", e)))
}

/// Verify a user password against a stored PHC-format hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        AuthError::InternalError(anyhow::anyhow!("Invalid password hash format: {}", e))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash a client secret with bcrypt.
///
/// Truncation to 72 bytes is applied here and in [`verify_secret`] so both
/// paths agree on the bytes that participate in the hash.
pub fn hash_secret(secret: &str) -> Result<String, AuthError> {
    bcrypt::hash(truncate_for_bcrypt(secret), BCRYPT_COST)
        .map_err(|e| AuthError::InternalError(anyhow::anyhow!("Secret hashing failed: {}", e)))
}

/// Verify a client secret against a stored bcrypt hash.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(truncate_for_bcrypt(secret), hash)
        .map_err(|e| AuthError::InternalError(anyhow::anyhow!("Secret verification failed: {}", e)))
}

fn truncate_for_bcrypt(secret: &str) -> &[u8] {
    let bytes = secret.as_bytes();
    &bytes[..bytes.len().min(BCRYPT_MAX_BYTES)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hash_password_produces_phc_string() {
        let hash = hash_password("secure_password123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert_ne!(hash, "secure_password123");
    }

    #[test]
    fn verify_password_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();

        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("incorrect horse", &hash).unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let hash1 = hash_password("same_password").unwrap();
        let hash2 = hash_password("same_password").unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password("same_password", &hash1).unwrap());
        assert!(verify_password("same_password", &hash2).unwrap());
    }

    #[test]
    fn verify_password_rejects_malformed_hash() {
        assert!(verify_password("anything", "not_a_valid_hash").is_err());
    }

    #[test]
    fn kilobyte_unicode_password_round_trips() {
        let password = "pässwörd-𝛼β🎯-".repeat(48);
        assert!(password.len() >= 1024);

        let hash = hash_password(&password).unwrap();
        assert!(verify_password(&password, &hash).unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn printable_passwords_round_trip(password in "\\PC{0,64}") {
            let hash = hash_password(&password).unwrap();
            prop_assert!(verify_password(&password, &hash).unwrap());
        }
    }

    #[test]
    fn verify_secret_round_trip() {
        let hash = hash_secret("client-secret-value").unwrap();

        assert!(verify_secret("client-secret-value", &hash).unwrap());
        assert!(!verify_secret("wrong-secret", &hash).unwrap());
    }

    #[test]
    fn bcrypt_hash_has_requested_cost() {
        let hash = hash_secret("secret").unwrap();
        assert!(hash.starts_with("$2"));
        assert!(hash.contains("$12$"));
    }

    #[test]
    fn long_secrets_truncate_identically_on_both_paths() {
        // 100 bytes: only the first 72 participate in the hash.
        let long = "a".repeat(100);
        let truncated = "a".repeat(72);

        let hash = hash_secret(&long).unwrap();
        assert!(verify_secret(&long, &hash).unwrap());
        assert!(verify_secret(&truncated, &hash).unwrap());

        // Divergence after byte 72 is invisible to verification.
        let diverging = format!("{}{}", "a".repeat(72), "b".repeat(28));
        assert!(verify_secret(&diverging, &hash).unwrap());
    }

    #[test]
    fn secrets_differing_within_limit_do_not_verify() {
        let hash = hash_secret(&"a".repeat(72)).unwrap();
        let other = format!("b{}", "a".repeat(71));

        assert!(!verify_secret(&other, &hash).unwrap());
    }
}
