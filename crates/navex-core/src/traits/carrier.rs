// # Carrier Trait
//
// Defines the interface to the Navex parcel API.
//
// ## Implementations
//
// - HTTP: `navex-carrier-http` crate
// - Tests: scripted stubs in `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use navex_core::Carrier;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let carrier = /* Carrier implementation */;
//
//     let response = carrier.request_tracking_code(&shipment).await?;
//     let status = carrier.get_tracking_status(response.field("tracking_code").as_str()).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::CarrierCredentials;
use crate::payload::ShipmentRequest;

/// Response key holding the new tracking code
///
/// The carrier returns the code under a different key depending on which
/// call site submitted the shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKey {
    /// Single-order "get code"
    TrackingCode,
    /// Bulk ship and automatic requests
    StatusMessage,
}

impl ResponseKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrackingCode => "tracking_code",
            Self::StatusMessage => "status_message",
        }
    }
}

/// Decoded carrier JSON body
///
/// Never validated at the transport layer: missing fields read as empty and
/// it is up to the caller to decide what is required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarrierResponse {
    body: Map<String, Value>,
}

impl CarrierResponse {
    pub fn new(body: Map<String, Value>) -> Self {
        Self { body }
    }

    /// Decode a raw body; anything that is not a JSON object is empty
    pub fn from_slice(raw: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(body)) => Self { body },
            _ => Self::default(),
        }
    }

    /// Scalar field as a string, empty when absent or not a scalar
    pub fn field(&self, key: &str) -> String {
        match self.body.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    /// Tracking code under `key`
    pub fn code(&self, key: ResponseKey) -> String {
        self.field(key.as_str())
    }

    /// Customer-facing tracking link
    pub fn link(&self) -> String {
        self.field("lien")
    }

    /// Carrier status label
    pub fn etat(&self) -> String {
        self.field("etat")
    }

    /// Optional status details, stored verbatim
    pub fn details(&self) -> Option<&Value> {
        self.body.get("details").filter(|v| !v.is_null())
    }

    /// Carrier error message, if any
    pub fn message(&self) -> String {
        self.field("message")
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl From<Value> for CarrierResponse {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(body) => Self { body },
            _ => Self::default(),
        }
    }
}

/// Trait for carrier clients
///
/// Implementations are stateless between calls and perform no retries.
///
/// # Errors
///
/// - [`crate::Error::NotConfigured`]: endpoint missing, no network call made
/// - [`crate::Error::Transport`]: network failure or timeout
/// - [`crate::Error::Api`]: the carrier rejected the status query
#[async_trait]
pub trait Carrier: Send + Sync {
    /// Submit a shipment and return the decoded response
    ///
    /// A response without a tracking code is NOT an error at this level.
    async fn request_tracking_code(
        &self,
        request: &ShipmentRequest,
    ) -> Result<CarrierResponse, crate::Error>;

    /// Fetch the current status for `tracking_code`
    async fn get_tracking_status(&self, tracking_code: &str)
    -> Result<CarrierResponse, crate::Error>;

    /// Name used in logs
    fn carrier_name(&self) -> &'static str;
}

/// Builds a carrier client for a set of credentials
///
/// Credentials are passed per call, so the engine asks the factory for a
/// client each time it needs one.
pub trait CarrierFactory: Send + Sync {
    fn create(&self, credentials: &CarrierCredentials) -> Result<Box<dyn Carrier>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_reads_missing_fields_as_empty() {
        let response = CarrierResponse::from(json!({ "lien": "http://t/TRK1" }));
        assert_eq!(response.code(ResponseKey::TrackingCode), "");
        assert_eq!(response.link(), "http://t/TRK1");
        assert!(response.details().is_none());
        assert!(!response.is_empty());
    }

    #[test]
    fn numeric_codes_read_as_strings() {
        let response = CarrierResponse::from(json!({ "status_message": 98765 }));
        assert_eq!(response.code(ResponseKey::StatusMessage), "98765");
    }

    #[test]
    fn undecodable_body_is_empty() {
        assert!(CarrierResponse::from_slice(b"<html>oops</html>").is_empty());
        assert!(CarrierResponse::from_slice(b"[1,2]").is_empty());
        assert_eq!(CarrierResponse::from_slice(br#"{"etat":"En cours"}"#).etat(), "En cours");
    }
}
