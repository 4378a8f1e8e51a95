use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{GatewayError, StorageGateway};
use crate::config::GatewayConfig;
use crate::models::SourceDescriptor;

/// Header carrying the gateway auth token.
const AUTH_HEADER: &str = "x-auth-token";

/// Gateway HTTP client. Blocking: call from a worker thread, never from
/// inside the async runtime.
pub struct HttpGateway {
    base_url: String,
    client_id: u32,
    auth_token: String,
    client: reqwest::blocking::Client,
}

/// Query parameters for the credentials endpoints.
#[derive(Serialize)]
struct CredentialsQuery<'a> {
    protocol: &'a str,
    relative_path: &'a str,
}

/// Response body from `/client/{id}/{upload,download}-credentials`
#[derive(Deserialize)]
struct CredentialsResponse {
    signed_url: Option<String>,
}

#[derive(Clone, Copy)]
enum Direction {
    Upload,
    Download,
}

impl Direction {
    fn endpoint(self) -> &'static str {
        match self {
            Self::Upload => "upload-credentials",
            Self::Download => "download-credentials",
        }
    }
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig, timeout_secs: u64) -> Result<Self, GatewayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GatewayError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url().trim_end_matches('/').to_string(),
            client_id: config.client_id,
            auth_token: config.auth_token.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_connect() {
            GatewayError::Unreachable(self.base_url.clone())
        } else {
            GatewayError::HttpClient(e.to_string())
        }
    }

    fn generate_signed_url(
        &self,
        descriptor: &SourceDescriptor,
        direction: Direction,
    ) -> Result<String, GatewayError> {
        if !self.ping()? {
            tracing::error!(url = %self.base_url, "Storage gateway did not answer ping");
            return Err(GatewayError::Unreachable(self.base_url.clone()));
        }

        tracing::debug!(
            relative_path = %descriptor.relative_path,
            endpoint = direction.endpoint(),
            "Requesting signed URL"
        );

        let url = format!(
            "{}/client/{}/{}",
            self.base_url,
            self.client_id,
            direction.endpoint()
        );
        let query = CredentialsQuery {
            protocol: descriptor.protocol.as_str(),
            relative_path: &descriptor.relative_path,
        };

        let response = self
            .client
            .get(&url)
            .query(&query)
            .header(AUTH_HEADER, &self.auth_token)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CredentialsResponse = response
            .json()
            .map_err(|e| GatewayError::ResponseParsing(e.to_string()))?;

        match parsed.signed_url {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(GatewayError::MissingSignedUrl),
        }
    }
}

impl StorageGateway for HttpGateway {
    fn ping(&self) -> Result<bool, GatewayError> {
        let url = format!("{}/ping", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;
        let ok = response.status().is_success();
        tracing::debug!(url = %self.base_url, status = response.status().as_u16(), "Gateway ping");
        Ok(ok)
    }

    fn generate_signed_url_for_download(
        &self,
        descriptor: &SourceDescriptor,
    ) -> Result<String, GatewayError> {
        self.generate_signed_url(descriptor, Direction::Download)
    }

    fn generate_signed_url_for_upload(
        &self,
        descriptor: &SourceDescriptor,
    ) -> Result<String, GatewayError> {
        self.generate_signed_url(descriptor, Direction::Upload)
    }

    fn register_new_source_data(&self, descriptor: &SourceDescriptor) -> Result<(), GatewayError> {
        let url = format!("{}/client/{}/source", self.base_url, self.client_id);
        let response = self
            .client
            .post(&url)
            .header(AUTH_HEADER, &self.auth_token)
            .json(descriptor)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(name = %descriptor.name, "Source data registered");
        Ok(())
    }
}
