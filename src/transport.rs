// HTTP POST of SOAP envelopes to the carrier endpoints
use crate::config::{ServiceConfig, ServiceKey};
use crate::error::TrackingError;
use crate::masking::log_preview;
use crate::parser::SoapFault;
use crate::xml::XmlNode;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use tracing::{debug, error, warn};

const SOAP_ACTION: &str = "SOAPAction";

// Sends one envelope to one of the carrier services and returns the raw body.
#[async_trait]
pub trait SoapTransport: Send + Sync + 'static {
    async fn send(&self, key: ServiceKey, envelope: String) -> Result<String, TrackingError>;
}

#[async_trait]
impl<T: SoapTransport> SoapTransport for Arc<T> {
    async fn send(&self, key: ServiceKey, envelope: String) -> Result<String, TrackingError> {
        self.as_ref().send(key, envelope).await
    }
}

pub struct HttpSoapTransport {
    client: reqwest::Client,
    config: Arc<ServiceConfig>,
}

impl HttpSoapTransport {
    pub fn new(config: Arc<ServiceConfig>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn post(&self, key: ServiceKey, envelope: String) -> Result<(u16, String), TrackingError> {
        let endpoint = self.config.endpoint(key);
        let mut request = self
            .client
            .post(&endpoint.url)
            .header(CONTENT_TYPE, endpoint.content_type.as_str());
        if let Some(action) = &endpoint.soap_action {
            request = request.header(SOAP_ACTION, action.as_str());
        }

        let response = request.body(envelope).send().await.map_err(|e| self.map_reqwest(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_reqwest(e))?;
        Ok((status, body))
    }

    fn map_reqwest(&self, e: reqwest::Error) -> TrackingError {
        if e.is_timeout() {
            TrackingError::Timeout(self.config.timeout_ms())
        } else {
            TrackingError::Transport(e.to_string())
        }
    }
}

// Message for a non-2xx answer, preferring the carrier's own fault.
fn status_error_message(status: u16, body: &str) -> String {
    if let Some(fault) = SoapFault::from_document(body) {
        return format!(
            "API Error ({}): {}",
            fault.code_or_default(),
            fault.reason_or_default()
        );
    }
    let hint = if XmlNode::parse(body).is_ok() {
        "Could not parse fault structure."
    } else {
        "Response body might not be valid XML."
    };
    format!("API request failed with status {status}. {hint}")
}

#[async_trait]
impl SoapTransport for HttpSoapTransport {
    async fn send(&self, key: ServiceKey, envelope: String) -> Result<String, TrackingError> {
        let endpoint = self.config.endpoint(key);
        debug!(
            service = %key,
            url = %endpoint.url,
            body = %log_preview(&envelope),
            "soap_request"
        );

        let outcome = tokio::time::timeout(self.config.request_timeout, self.post(key, envelope)).await;
        let (status, body) = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(service = %key, error = %e, "soap_request_failed");
                return Err(e);
            }
            Err(_) => {
                warn!(service = %key, timeout_ms = self.config.timeout_ms(), "soap_request_timed_out");
                return Err(TrackingError::Timeout(self.config.timeout_ms()));
            }
        };

        debug!(
            service = %key,
            status,
            body = %log_preview(&body),
            "soap_response"
        );

        if !(200..300).contains(&status) {
            let message = status_error_message(status, &body);
            error!(service = %key, status, message = %message, "soap_request_rejected");
            return Err(TrackingError::api(status, message));
        }

        Ok(body)
    }
}
