// # Meta Store Trait
//
// Per-order key/value metadata, the host facility the tracking record is
// persisted in. Values are plain strings; structured values are stored as
// their JSON text.

use async_trait::async_trait;

use crate::order::OrderId;

/// Trait for per-order metadata storage
#[async_trait]
pub trait MetaStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key was never written
    async fn get_meta(&self, id: &OrderId, key: &str) -> Result<Option<String>, crate::Error>;

    /// Create or overwrite a value
    async fn set_meta(&self, id: &OrderId, key: &str, value: &str) -> Result<(), crate::Error>;
}
