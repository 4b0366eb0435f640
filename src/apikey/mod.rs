//! API key issuance, validation and revocation.
//!
//! Keys are bearer tokens of the form `edunotify_<64 hex chars>`. Only the
//! SHA-256 digest and a short display prefix are stored; the plaintext is
//! handed to the caller once, in the creation response.

mod codec;
mod postgres_store;
mod service;
mod store;
mod types;

pub use codec::{display_prefix, generate_secret, hash_secret, looks_like_api_key, API_KEY_PREFIX};
pub use postgres_store::PostgresApiKeyRepository;
pub use service::ApiKeyService;
pub use store::{ApiKeyRepository, MemoryApiKeyRepository};
pub use types::{
    ApiKey, ApiKeyIdentity, CreateApiKeyRequest, IssuedApiKey, Permission, DEFAULT_PERMISSIONS,
    DEFAULT_RATE_LIMIT, MAX_RATE_LIMIT,
};
