use sha2::{Digest, Sha256};

/// Namespace tag every issued key starts with
pub const API_KEY_PREFIX: &str = "edunotify_";

/// Characters of the plaintext kept for display
const DISPLAY_PREFIX_LEN: usize = 16;

/// Generate a new plaintext key: the namespace tag followed by 32 random bytes in hex.
pub fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    format!("{}{}", API_KEY_PREFIX, hex::encode(bytes))
}

/// Lowercase hex SHA-256 digest of the plaintext key.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// First characters of the key, safe to show and log.
pub fn display_prefix(secret: &str) -> String {
    secret.chars().take(DISPLAY_PREFIX_LEN).collect()
}

/// Cheap shape check used to tell API keys apart from session tokens.
pub fn looks_like_api_key(token: &str) -> bool {
    token.starts_with(API_KEY_PREFIX)
}
