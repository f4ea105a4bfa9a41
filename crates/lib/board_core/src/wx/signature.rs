//! Webhook request signatures.
//!
//! The platform signs each request with the hex SHA-1 of the sorted
//! concatenation of the shared token, the timestamp and the nonce.

use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

/// Compute the expected signature.
pub fn sign(token: &str, timestamp: &str, nonce: &str) -> String {
    let mut parts = [token, timestamp, nonce];
    parts.sort_unstable();
    let digest = Sha1::digest(parts.concat().as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Check `signature` in constant time.
pub fn verify(token: &str, timestamp: &str, nonce: &str, signature: &str) -> bool {
    let expected = sign(token, timestamp, nonce);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}
