use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;

use crate::attachment::AttachmentPayload;
use crate::config::RelayConfig;
use crate::error::DispatchError;

/// The multipart field name the image endpoint expects the binary under.
pub const IMAGE_FIELD: &str = "image";
/// The query parameter the text endpoint reads the message from.
pub const TEXT_FIELD: &str = "chatinput";

/// A raw backend response: body plus its declared content type, untouched.
/// Normalization happens downstream.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub body: String,
    pub content_type: Option<String>,
}

// Trait defining the interface to the analysis backend. Exactly one of the
// two methods is invoked per send cycle; the controller picks based on
// whether an attachment is staged at submit time.
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    /// Sends free-form text to the text endpoint as its sole parameter.
    async fn send_text(
        &self,
        message: &str,
        timeout: Duration,
    ) -> Result<RawResponse, DispatchError>;

    /// Uploads one image file to the image endpoint as multipart binary.
    async fn send_image(
        &self,
        payload: &AttachmentPayload,
        timeout: Duration,
    ) -> Result<RawResponse, DispatchError>;
}

// --- HTTP implementation ---

pub struct HttpDispatcher {
    client: Client,
    config: RelayConfig,
}

impl HttpDispatcher {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    // reqwest reports a fired per-request timeout as an error on the same
    // future, with the connection torn down, so a late response can never
    // surface once this returns Timeout.
    fn transport_error(e: reqwest::Error, timeout: Duration) -> DispatchError {
        if e.is_timeout() {
            DispatchError::Timeout {
                elapsed_secs: timeout.as_secs(),
            }
        } else {
            DispatchError::Network(e)
        }
    }

    async fn read_response(
        response: reqwest::Response,
        timeout: Duration,
    ) -> Result<RawResponse, DispatchError> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Backend request failed with status {}: {}", status, body);
            return Err(DispatchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::transport_error(e, timeout))?;
        Ok(RawResponse { body, content_type })
    }
}

#[async_trait]
impl RequestDispatcher for HttpDispatcher {
    async fn send_text(
        &self,
        message: &str,
        timeout: Duration,
    ) -> Result<RawResponse, DispatchError> {
        log::info!(
            "Sending text query to {} ({} chars)",
            self.config.text_endpoint,
            message.len()
        );

        let response = self
            .client
            .get(&self.config.text_endpoint)
            .query(&[(TEXT_FIELD, message)])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::transport_error(e, timeout))?;

        Self::read_response(response, timeout).await
    }

    async fn send_image(
        &self,
        payload: &AttachmentPayload,
        timeout: Duration,
    ) -> Result<RawResponse, DispatchError> {
        log::info!(
            "Uploading image '{}' ({} bytes) to {}",
            payload.file_name,
            payload.bytes.len(),
            self.config.image_endpoint
        );

        let part = Part::bytes(payload.bytes.as_ref().clone())
            .file_name(payload.file_name.clone())
            .mime_str(&payload.mime)
            .map_err(|e| Self::transport_error(e, timeout))?;
        let form = Form::new().part(IMAGE_FIELD, part);

        let response = self
            .client
            .post(&self.config.image_endpoint)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::transport_error(e, timeout))?;

        Self::read_response(response, timeout).await
    }
}
