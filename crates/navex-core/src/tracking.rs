//! Tracking record store
//!
//! The per-order carrier fields live in the host's metadata facility under
//! fixed keys. [`TrackingStore`] is the only code that knows those keys.
//!
//! Writes are partial and per field: there is no transaction spanning
//! several keys, and the last writer wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::order::OrderId;
use crate::sanitize;
use crate::traits::MetaStore;
use crate::Result;

pub const META_TRACKING_CODE: &str = "_navexwp_tracking_code";
pub const META_TRACKING_LINK: &str = "_navexwp_tracking_link";
pub const META_TRACKING_STATUS: &str = "_navexwp_tracking_status";
pub const META_TRACKING_DETAILS: &str = "_navexwp_tracking_details";
pub const META_TRACKING_UPDATED: &str = "_navexwp_tracking_updated";
pub const META_ADMIN_VALIDATION: &str = "_navexwp_admin_validation";

/// Carrier shipment fields persisted on one order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub tracking_code: String,
    pub tracking_link: String,
    pub status: String,
    pub status_details: Option<Value>,
    /// Unix seconds of the last successful status fetch
    pub updated_at: Option<i64>,
}

impl TrackingRecord {
    pub fn has_code(&self) -> bool {
        !self.tracking_code.is_empty()
    }

    /// The stored link when it is an absolute http(s) URL
    ///
    /// The link comes from the carrier and is never rendered as-is.
    pub fn safe_link(&self) -> Option<String> {
        let url = Url::parse(self.tracking_link.trim()).ok()?;
        match url.scheme() {
            "http" | "https" => Some(url.into()),
            _ => None,
        }
    }

    /// Read model for the order screen and customer emails
    pub fn view(&self) -> TrackingView {
        TrackingView {
            tracking_code: self.has_code().then(|| self.tracking_code.clone()),
            tracking_link: self.safe_link(),
            status: if self.status.is_empty() {
                "Unknown".to_string()
            } else {
                self.status.clone()
            },
            updated: self
                .updated_at
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

/// What a tracking panel displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingView {
    pub tracking_code: Option<String>,
    pub tracking_link: Option<String>,
    pub status: String,
    pub updated: Option<String>,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingUpdate {
    pub tracking_code: Option<String>,
    pub tracking_link: Option<String>,
    pub status: Option<String>,
    pub status_details: Option<Value>,
    pub updated_at: Option<i64>,
}

impl TrackingUpdate {
    /// Code and link returned by a shipment request
    pub fn shipment(code: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            tracking_code: Some(code.into()),
            tracking_link: Some(link.into()),
            ..Self::default()
        }
    }

    /// Status fetched from the carrier at `at`
    pub fn status(label: impl Into<String>, details: Option<Value>, at: i64) -> Self {
        Self {
            status: Some(label.into()),
            status_details: details,
            updated_at: Some(at),
            ..Self::default()
        }
    }
}

/// Get/set of [`TrackingRecord`]s over a [`MetaStore`]
#[derive(Clone)]
pub struct TrackingStore {
    meta: Arc<dyn MetaStore>,
}

impl TrackingStore {
    pub fn new(meta: Arc<dyn MetaStore>) -> Self {
        Self { meta }
    }

    /// Load the record; absent fields read as empty
    pub async fn get(&self, id: &OrderId) -> Result<TrackingRecord> {
        let text = |v: Option<String>| v.unwrap_or_default();

        let details = self
            .meta
            .get_meta(id, META_TRACKING_DETAILS)
            .await?
            .filter(|raw| !raw.is_empty())
            // Values that are not JSON were written as raw text
            .map(|raw| serde_json::from_str(&raw).unwrap_or(Value::String(raw)));

        let updated_at = self
            .meta
            .get_meta(id, META_TRACKING_UPDATED)
            .await?
            .and_then(|raw| raw.trim().parse::<i64>().ok());

        Ok(TrackingRecord {
            tracking_code: text(self.meta.get_meta(id, META_TRACKING_CODE).await?),
            tracking_link: text(self.meta.get_meta(id, META_TRACKING_LINK).await?),
            status: text(self.meta.get_meta(id, META_TRACKING_STATUS).await?),
            status_details: details,
            updated_at,
        })
    }

    /// Write the fields present in `update`, sanitising text first
    pub async fn set(&self, id: &OrderId, update: TrackingUpdate) -> Result<()> {
        if let Some(code) = update.tracking_code {
            self.meta
                .set_meta(id, META_TRACKING_CODE, &sanitize::text_field(&code))
                .await?;
        }
        if let Some(link) = update.tracking_link {
            self.meta
                .set_meta(id, META_TRACKING_LINK, &sanitize::text_field(&link))
                .await?;
        }
        if let Some(status) = update.status {
            self.meta
                .set_meta(id, META_TRACKING_STATUS, &sanitize::text_field(&status))
                .await?;
        }
        if let Some(details) = update.status_details {
            let raw = serde_json::to_string(&details)?;
            self.meta.set_meta(id, META_TRACKING_DETAILS, &raw).await?;
        }
        if let Some(at) = update.updated_at {
            self.meta
                .set_meta(id, META_TRACKING_UPDATED, &at.to_string())
                .await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for TrackingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHostStore;
    use serde_json::json;

    fn store() -> TrackingStore {
        TrackingStore::new(Arc::new(MemoryHostStore::new()))
    }

    #[tokio::test]
    async fn absent_record_reads_empty() {
        let record = store().get(&OrderId::from(1)).await.unwrap();
        assert_eq!(record, TrackingRecord::default());
        assert!(!record.has_code());
    }

    #[tokio::test]
    async fn partial_updates_keep_other_fields() {
        let store = store();
        let id = OrderId::from(501);
        store
            .set(&id, TrackingUpdate::shipment("TRK1", "http://t/TRK1"))
            .await
            .unwrap();
        store
            .set(
                &id,
                TrackingUpdate::status("En cours", Some(json!({ "hub": "Tunis" })), 1_700_000_000),
            )
            .await
            .unwrap();

        let record = store.get(&id).await.unwrap();
        assert_eq!(record.tracking_code, "TRK1");
        assert_eq!(record.tracking_link, "http://t/TRK1");
        assert_eq!(record.status, "En cours");
        assert_eq!(record.status_details, Some(json!({ "hub": "Tunis" })));
        assert_eq!(record.updated_at, Some(1_700_000_000));
    }

    #[tokio::test]
    async fn string_details_keep_their_type() {
        let store = store();
        let id = OrderId::from(7);
        for details in [json!("42"), json!("true"), json!("pending pickup"), json!(42)] {
            store
                .set(&id, TrackingUpdate::status("En cours", Some(details.clone()), 1))
                .await
                .unwrap();
            let record = store.get(&id).await.unwrap();
            assert_eq!(record.status_details, Some(details));
        }
    }

    #[tokio::test]
    async fn raw_text_details_read_as_string() {
        let meta = Arc::new(MemoryHostStore::new());
        let id = OrderId::from(8);
        meta.set_meta(&id, META_TRACKING_DETAILS, "pending pickup")
            .await
            .unwrap();

        let record = TrackingStore::new(meta).get(&id).await.unwrap();
        assert_eq!(record.status_details, Some(json!("pending pickup")));
    }

    #[tokio::test]
    async fn text_fields_are_sanitised() {
        let store = store();
        let id = OrderId::from(2);
        store
            .set(&id, TrackingUpdate::shipment(" <b>TRK2</b>\u{0000}", "http://t/2"))
            .await
            .unwrap();
        assert_eq!(store.get(&id).await.unwrap().tracking_code, "TRK2");
    }

    #[test]
    fn safe_link_only_allows_http() {
        let mut record = TrackingRecord {
            tracking_link: "javascript:alert(1)".into(),
            ..TrackingRecord::default()
        };
        assert_eq!(record.safe_link(), None);

        record.tracking_link = "not a url".into();
        assert_eq!(record.safe_link(), None);

        record.tracking_link = "https://navex.tn/track/TRK1".into();
        assert_eq!(record.safe_link().as_deref(), Some("https://navex.tn/track/TRK1"));
    }

    #[test]
    fn view_defaults_unknown_status() {
        let view = TrackingRecord::default().view();
        assert_eq!(view.status, "Unknown");
        assert_eq!(view.tracking_code, None);
        assert_eq!(view.updated, None);

        let view = TrackingRecord {
            tracking_code: "TRK1".into(),
            status: "Livrer".into(),
            updated_at: Some(0),
            ..TrackingRecord::default()
        }
        .view();
        assert_eq!(view.tracking_code.as_deref(), Some("TRK1"));
        assert_eq!(view.updated.as_deref(), Some("1970-01-01 00:00:00"));
    }
}
