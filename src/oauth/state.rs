use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Number of random bytes in a CSRF state nonce.
pub const STATE_BYTES: usize = 32;

/// Generate a single-use CSRF state nonce, base64url without padding.
pub fn generate_state() -> String {
    let mut buf = [0u8; STATE_BYTES];
    rand::Rng::fill_bytes(&mut rand::rng(), &mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// Byte-for-byte comparison that does not short-circuit on the first
/// differing byte.
pub fn states_match(expected: &str, received: &str) -> bool {
    let a = expected.as_bytes();
    let b = received.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
