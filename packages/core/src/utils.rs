// ABOUTME: Shared utility functions for prdsmith
// ABOUTME: ID generation, char-safe truncation and fault-tolerant JSON decoding

use serde::de::DeserializeOwned;

/// Generate a unique 8-character alphanumeric ID
pub fn generate_id() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Truncate a string to at most `max_chars` characters without splitting a code point
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Decode stored JSON text, falling back to `default` when the text is
/// missing, blank, or not decodable as `T`.
pub fn safe_json_parse<T: DeserializeOwned>(raw: Option<&str>, default: T) -> T {
    match raw {
        Some(text) if !text.trim().is_empty() => serde_json::from_str(text).unwrap_or(default),
        _ => default,
    }
}
