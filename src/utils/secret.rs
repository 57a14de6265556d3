use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};

/// Bytes of entropy behind generated secrets and authorization codes.
const SECRET_ENTROPY_BYTES: usize = 32;

/// Generate a client secret: 32 random bytes, base64url without padding.
/// Shown to the operator exactly once at client creation.
pub fn generate_client_secret() -> String {
    random_urlsafe(SECRET_ENTROPY_BYTES)
}

/// Generate an authorization code: 32 random bytes, base64url without
/// padding, giving 256 bits of entropy.
pub fn generate_authorization_code() -> String {
    random_urlsafe(SECRET_ENTROPY_BYTES)
}

fn random_urlsafe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_are_43_urlsafe_chars() {
        let code = generate_authorization_code();

        // 32 bytes -> 43 base64url characters without padding.
        assert_eq!(code.len(), 43);
        assert!(code
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
    }

    #[test]
    fn secrets_are_43_urlsafe_chars() {
        let secret = generate_client_secret();

        assert_eq!(secret.len(), 43);
        assert!(!secret.contains('='));
    }

    #[test]
    fn generated_values_do_not_repeat() {
        let codes: HashSet<String> = (0..64).map(|_| generate_authorization_code()).collect();
        assert_eq!(codes.len(), 64);
    }
}
