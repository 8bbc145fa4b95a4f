// # Navex Carrier Client
//
// HTTP implementation of `navex_core::Carrier` for the Navex parcel API.
//
// ## Behaviour
//
// - One form-encoded POST per call, 45 second timeout
// - No retries and no state between calls
// - Fails with `NotConfigured` before any network I/O when the endpoint is empty
//
// ## Security Requirements
//
// - The api key is part of the request path, so URLs are never logged
// - `Debug` output redacts the api key
//
// ## API Reference
//
// - Submit shipment: POST `{endpoint}/{username}-{api_key}/v1/post.php`
// - Fetch status:    POST `{endpoint}/{username}-etat-{api_key}/v1/post.php` with `code=<tracking code>`

use std::time::Duration;

use async_trait::async_trait;
use navex_core::traits::{Carrier, CarrierFactory, CarrierResponse};
use navex_core::{CarrierCredentials, Error, Result, ShipmentRequest};

/// HTTP timeout for every carrier call
const HTTP_TIMEOUT: Duration = Duration::from_secs(45);

/// Path segment between username and api key for shipment submission
const SUBMIT_SEGMENT: &str = "-";
/// Path segment between username and api key for status queries
const STATUS_SEGMENT: &str = "-etat-";

/// Build the URL of one carrier operation
///
/// Exactly one `/` separates the endpoint from the credential path,
/// whether or not the endpoint ends with a slash.
pub fn operation_url(endpoint: &str, username: &str, api_key: &str, segment: &str) -> String {
    format!(
        "{}/{}{}{}/v1/post.php",
        endpoint.trim().trim_end_matches('/'),
        username,
        segment,
        api_key
    )
}

/// Navex HTTP client
pub struct NavexClient {
    endpoint: String,
    /// ⚠️ NEVER log this value
    api_key: String,
    username: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for NavexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavexClient")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl NavexClient {
    /// Create a client
    ///
    /// An empty endpoint is accepted here; calls then fail with
    /// [`Error::NotConfigured`].
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            username: username.into(),
            client,
        })
    }

    pub fn from_credentials(creds: &CarrierCredentials) -> Result<Self> {
        Self::new(&creds.endpoint, &creds.api_key, &creds.username)
    }

    fn url(&self, segment: &str) -> Result<String> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::not_configured("API URL is not configured."));
        }
        Ok(operation_url(&self.endpoint, &self.username, &self.api_key, segment))
    }

    /// POST `form` and return the status code with the raw body
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<(u16, Vec<u8>)> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::transport(format!("HTTP request failed: {}", e.without_url())))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response: {}", e.without_url())))?;

        Ok((status, body.to_vec()))
    }
}

#[async_trait]
impl Carrier for NavexClient {
    async fn request_tracking_code(&self, request: &ShipmentRequest) -> Result<CarrierResponse> {
        let url = self.url(SUBMIT_SEGMENT)?;
        tracing::debug!(order = %request.order_id, "Submitting shipment to Navex");

        let (status, body) = self.post_form(&url, &request.form_fields()).await?;
        if !(200..300).contains(&status) {
            tracing::warn!(order = %request.order_id, status, "Navex shipment call returned non-success status");
        }

        Ok(CarrierResponse::from_slice(&body))
    }

    async fn get_tracking_status(&self, tracking_code: &str) -> Result<CarrierResponse> {
        let url = self.url(STATUS_SEGMENT)?;
        tracing::debug!(code = %tracking_code, "Fetching Navex status");

        let form = [("code".to_string(), tracking_code.to_string())];
        let (status, body) = self.post_form(&url, &form).await?;
        let response = CarrierResponse::from_slice(&body);

        if !(200..300).contains(&status) {
            let message = response.message();
            return Err(Error::api(if message.is_empty() {
                "Unknown API error.".to_string()
            } else {
                message
            }));
        }

        Ok(response)
    }

    fn carrier_name(&self) -> &'static str {
        "navex"
    }
}

/// Factory handing out one [`NavexClient`] per credential set
#[derive(Debug, Default, Clone, Copy)]
pub struct NavexClientFactory;

impl CarrierFactory for NavexClientFactory {
    fn create(&self, credentials: &CarrierCredentials) -> Result<Box<dyn Carrier>> {
        Ok(Box::new(NavexClient::from_credentials(credentials)?))
    }
}
