//! PKCE (RFC 7636) challenge verification for the authorization code flow.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

/// Minimum length for a code_verifier per RFC 7636.
pub const CODE_VERIFIER_MIN_LENGTH: usize = 43;

/// Maximum length for a code_verifier per RFC 7636.
pub const CODE_VERIFIER_MAX_LENGTH: usize = 128;

/// Supported code challenge transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeChallengeMethod {
    S256,
    Plain,
}

impl CodeChallengeMethod {
    /// Parse the `code_challenge_method` request parameter. A missing
    /// method with a present challenge means `plain` per RFC 7636 §4.3.
    pub fn from_param(method: Option<&str>) -> Option<Self> {
        match method {
            None => Some(CodeChallengeMethod::Plain),
            Some("S256") => Some(CodeChallengeMethod::S256),
            Some("plain") => Some(CodeChallengeMethod::Plain),
            Some(_) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CodeChallengeMethod::S256 => "S256",
            CodeChallengeMethod::Plain => "plain",
        }
    }
}

/// Verify a code_verifier against the stored challenge.
///
/// S256: challenge == base64url_nopad(sha256(verifier)). Plain: byte
/// equality. Both comparisons are constant-time.
pub fn verify_challenge(verifier: &str, challenge: &str, method: CodeChallengeMethod) -> bool {
    match method {
        CodeChallengeMethod::S256 => {
            constant_time_eq(&compute_s256_challenge(verifier), challenge)
        }
        CodeChallengeMethod::Plain => constant_time_eq(verifier, challenge),
    }
}

/// base64url_nopad(sha256(verifier))
pub fn compute_s256_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// RFC 7636 §4.1: 43-128 characters from the unreserved URI set.
pub fn is_valid_code_verifier(verifier: &str) -> bool {
    let len = verifier.len();
    if !(CODE_VERIFIER_MIN_LENGTH..=CODE_VERIFIER_MAX_LENGTH).contains(&len) {
        return false;
    }

    verifier
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test vector from RFC 7636 Appendix B.
    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn s256_rfc_vector_verifies() {
        assert_eq!(compute_s256_challenge(RFC_VERIFIER), RFC_CHALLENGE);
        assert!(verify_challenge(
            RFC_VERIFIER,
            RFC_CHALLENGE,
            CodeChallengeMethod::S256
        ));
    }

    #[test]
    fn s256_wrong_verifier_fails() {
        assert!(!verify_challenge(
            "wrong_verifier_that_is_long_enough_to_look_real",
            RFC_CHALLENGE,
            CodeChallengeMethod::S256
        ));
    }

    #[test]
    fn plain_requires_byte_equality() {
        let value = "plain_code_verifier_with_sufficient_length_43ch";

        assert!(verify_challenge(value, value, CodeChallengeMethod::Plain));
        assert!(!verify_challenge(
            value,
            "a_different_challenge_value_of_matching_length_",
            CodeChallengeMethod::Plain
        ));
    }

    #[test]
    fn method_parsing() {
        assert_eq!(
            CodeChallengeMethod::from_param(Some("S256")),
            Some(CodeChallengeMethod::S256)
        );
        assert_eq!(
            CodeChallengeMethod::from_param(Some("plain")),
            Some(CodeChallengeMethod::Plain)
        );
        // Absent method defaults to plain per RFC 7636.
        assert_eq!(
            CodeChallengeMethod::from_param(None),
            Some(CodeChallengeMethod::Plain)
        );
        assert_eq!(CodeChallengeMethod::from_param(Some("s256")), None);
        assert_eq!(CodeChallengeMethod::from_param(Some("SHA256")), None);
    }

    #[test]
    fn verifier_length_bounds() {
        assert!(is_valid_code_verifier(&"a".repeat(43)));
        assert!(is_valid_code_verifier(&"a".repeat(128)));
        assert!(!is_valid_code_verifier(&"a".repeat(42)));
        assert!(!is_valid_code_verifier(&"a".repeat(129)));
    }

    #[test]
    fn verifier_character_set() {
        assert!(is_valid_code_verifier(
            "abcABC123-._~abcABC123-._~abcABC123-._~abcde"
        ));
        assert!(!is_valid_code_verifier(
            "abcdefghijklmnopqrstuvwxyz0123456789 abcdef"
        ));
        assert!(!is_valid_code_verifier(
            "abcdefghijklmnopqrstuvwxyz0123456789+abcdef"
        ));
        assert!(!is_valid_code_verifier(
            "abcdefghijklmnopqrstuvwxyz0123456789=abcdef"
        ));
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq("hello", "hello"));
        assert!(constant_time_eq("", ""));
        assert!(!constant_time_eq("hello", "world"));
        assert!(!constant_time_eq("hello", "hell"));
    }
}
