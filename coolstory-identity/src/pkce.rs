//! PKCE (RFC 7636) helpers for the authorization code flow.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::Engine as _;
use rand::{distributions::Alphanumeric, Rng as _};
use sha2::{Digest as _, Sha256};

const VERIFIER_LEN: usize = 64;
const STATE_LEN: usize = 32;

/// 43-128 characters of `[A-Za-z0-9-._~]`.
pub fn is_valid_code_verifier(verifier: &str) -> bool {
    (43..=128).contains(&verifier.len())
        && verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
}

pub fn generate_code_verifier() -> String {
    random_token(VERIFIER_LEN)
}

pub fn generate_state() -> String {
    random_token(STATE_LEN)
}

/// `BASE64URL(SHA256(verifier))`, the `S256` method.
pub fn code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());

    URL_SAFE_NO_PAD.encode(hash)
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
