//! Room identifiers: minting fresh ones and checking the ones clients send.

use crate::types::MAX_ROOM_ID_CHARS;
use rand::Rng;

/// Lowercase base-36, safe to drop into a URL query parameter
const CODE_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
pub const CODE_LENGTH: usize = 8;

/// Generate a random room code (8 characters, ~2.8e12 combinations)
pub fn generate() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Whether a client-supplied room id can be used as-is.
///
/// Ids are opaque, but they end up in shareable links, so only URL-safe
/// characters are accepted.
pub fn is_acceptable(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_ROOM_ID_CHARS
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}
