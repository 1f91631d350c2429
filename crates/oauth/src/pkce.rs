//! PKCE (RFC 7636) verifier/challenge generation and CSRF state

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Generates a cryptographically secure state parameter
pub fn generate_state() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generates a code verifier: 32 random bytes, base64url without padding (43 chars)
pub fn generate_code_verifier() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Derives the S256 challenge for a verifier
pub fn code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generates a fresh PKCE pair
///
/// Returns (verifier, challenge) tuple
pub fn generate_pkce() -> (String, String) {
    let verifier = generate_code_verifier();
    let challenge = code_challenge(&verifier);
    (verifier, challenge)
}
