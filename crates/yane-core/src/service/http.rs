//! Blocking HTTP client for the Nessus REST API.

use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::model::{ExportFormat, ExportStatus, FileId, ScanId, ScanListing};
use crate::service::ScanService;
use crate::session::Session;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Serialize)]
struct ExportRequest {
    format: ExportFormat,
}

#[derive(Deserialize)]
struct ExportResponse {
    file: Option<FileId>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub struct NessusClient {
    base_url: String,
    client: Client,
}

impl NessusClient {
    pub fn new(url: &str, config: &ExportConfig) -> Result<Self> {
        let base_url = validate_url(url)?;

        if config.accept_invalid_certs {
            warn!("TLS certificate validation is disabled for {}", base_url);
        }

        let client = Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { base_url, client })
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}{}", self.base_url, resource)
    }

    fn authorized(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        builder
            .header("X-Cookie", format!("token={}", session.token()))
            .header("content-type", "application/json")
    }

    fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send()?;
        if response.status() == StatusCode::OK {
            return Ok(response);
        }
        let status = response.status();
        Err(Error::Transport {
            status: status.as_u16(),
            message: service_message(status, response),
        })
    }
}

/// The service reports failures as `{"error": "..."}`; fall back to the
/// HTTP reason phrase when the body is anything else.
fn service_message(status: StatusCode, response: Response) -> String {
    match response.json::<ErrorResponse>() {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string(),
    }
}

impl ScanService for NessusClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn login(&self, username: &str, password: &SecretString) -> Result<String> {
        let body = LoginRequest {
            username,
            password: password.expose_secret(),
        };
        let request = self.client.post(self.endpoint("/session")).json(&body);
        match self.send(request) {
            Ok(response) => Ok(response.json::<LoginResponse>()?.token),
            Err(Error::Transport { message, .. }) => Err(Error::Authentication(message)),
            Err(e) => Err(e),
        }
    }

    fn logout(&self, session: &Session) -> Result<()> {
        let request = self.authorized(self.client.delete(self.endpoint("/session")), session);
        self.send(request)?;
        Ok(())
    }

    fn list_scans(&self, session: &Session) -> Result<ScanListing> {
        let request = self.authorized(self.client.get(self.endpoint("/scans")), session);
        let listing = self.send(request)?.json::<ScanListing>()?;
        debug!(
            "{} folders, {} scans on {}",
            listing.folders.len(),
            listing.scans.len(),
            self.base_url
        );
        Ok(listing)
    }

    fn request_export(
        &self,
        session: &Session,
        scan_id: ScanId,
        format: ExportFormat,
    ) -> Result<Option<FileId>> {
        let resource = format!("/scans/{}/export", scan_id);
        let request = self
            .authorized(self.client.post(self.endpoint(&resource)), session)
            .json(&ExportRequest { format });
        Ok(self.send(request)?.json::<ExportResponse>()?.file)
    }

    fn export_status(
        &self,
        session: &Session,
        scan_id: ScanId,
        file_id: FileId,
    ) -> Result<ExportStatus> {
        let resource = format!("/scans/{}/export/{}/status", scan_id, file_id);
        let request = self.authorized(self.client.get(self.endpoint(&resource)), session);
        let body = self.send(request)?.json::<StatusResponse>()?;
        Ok(ExportStatus::from_wire(&body.status))
    }

    fn download(&self, session: &Session, scan_id: ScanId, file_id: FileId) -> Result<Vec<u8>> {
        let resource = format!("/scans/{}/export/{}/download", scan_id, file_id);
        let request = self.authorized(self.client.get(self.endpoint(&resource)), session);
        Ok(self.send(request)?.bytes()?.to_vec())
    }
}

/// Checks that `url` has the form `http[s]://server:port` and returns it
/// without a trailing `/`.
pub fn validate_url(url: &str) -> Result<String> {
    let mut trimmed = url.trim();
    if let Some(stripped) = trimmed.strip_suffix('/') {
        info!("removed trailing '/' from url");
        trimmed = stripped;
    }

    let invalid = || Error::InvalidUrl(url.to_string());
    let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }

    // Url drops default ports, so check the authority as written.
    let authority = trimmed
        .split_once("://")
        .map(|(_, rest)| rest.split('/').next().unwrap_or(rest))
        .ok_or_else(invalid)?;
    let has_port = authority
        .rsplit_once(':')
        .map(|(host, port)| !host.is_empty() && !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false);
    if !has_port {
        return Err(invalid());
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_strips_trailing_slash() {
        assert_eq!(
            validate_url("https://127.0.0.1:8834/").unwrap(),
            "https://127.0.0.1:8834"
        );
    }

    #[test]
    fn test_validate_url_requires_port() {
        assert!(matches!(
            validate_url("https://nessus.example.com"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(validate_url("https://nessus.example.com:443").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_other_schemes() {
        assert!(validate_url("ftp://host:21").is_err());
        assert!(validate_url("not a url").is_err());
    }
}
