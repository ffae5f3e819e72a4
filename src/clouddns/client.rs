// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP client for the IONOS Cloud DNS API.

use super::types::{RecordCreate, RecordRead, RecordReadList, ZoneCreate, ZoneRead, ZoneReadList};
use super::DnsApi;
use crate::constants::{CHALLENGE_RECORD_TTL_SECS, RECORD_TYPE_TXT};
use crate::dns_errors::DnsApiError;
use crate::metrics::record_provider_request;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};
use url::Url;

/// IONOS Cloud DNS API client authenticated with a bearer token.
#[derive(Clone)]
pub struct CloudDnsClient {
    /// HTTP client for API requests
    http: Arc<HttpClient>,
    /// API endpoint, e.g. `https://dns.de-fra.ionos.com`
    base_url: String,
    /// Bearer token
    token: Arc<String>,
}

impl std::fmt::Debug for CloudDnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudDnsClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CloudDnsClient {
    /// Create a client with its own HTTP connection pool.
    #[must_use]
    pub fn new(base_url: &str, token: &str) -> Self {
        Self::with_http_client(Arc::new(HttpClient::new()), base_url, token)
    }

    /// Create a client sharing an existing HTTP connection pool.
    #[must_use]
    pub fn with_http_client(http: Arc<HttpClient>, base_url: &str, token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Arc::new(token.to_string()),
        }
    }

    /// Build an API URL from path segments and query pairs.
    ///
    /// Segments are percent-encoded, so ids containing `/` cannot escape their position.
    pub(crate) fn endpoint(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Url, DnsApiError> {
        let mut url = Url::parse(&self.base_url).map_err(|source| DnsApiError::InvalidUrl {
            url: self.base_url.clone(),
            source,
        })?;

        url.path_segments_mut()
            .map_err(|()| DnsApiError::InvalidUrl {
                url: self.base_url.clone(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            })?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    /// Send one request and return the response body.
    ///
    /// Non-2xx responses become [`DnsApiError::UnexpectedStatus`].
    async fn send<B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<String, DnsApiError> {
        debug!(
            operation = operation,
            method = %method,
            url = %url,
            "IONOS Cloud DNS API request"
        );

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(self.token.as_str())
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => {
                let err = DnsApiError::Transport {
                    url: url.to_string(),
                    source,
                };
                error!(operation = operation, error = %err, "IONOS Cloud DNS API request failed");
                record_provider_request(operation, err.kind());
                return Err(err);
            }
        };

        let status = response.status();

        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                operation = operation,
                method = %method,
                url = %url,
                status = %status,
                error = %text,
                "IONOS Cloud DNS API returned an error"
            );
            let err = DnsApiError::UnexpectedStatus { status, body: text };
            record_provider_request(operation, err.kind());
            return Err(err);
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(source) => {
                let err = DnsApiError::Transport {
                    url: url.to_string(),
                    source,
                };
                record_provider_request(operation, err.kind());
                return Err(err);
            }
        };

        debug!(
            operation = operation,
            status = %status,
            response_len = text.len(),
            "IONOS Cloud DNS API request successful"
        );
        Ok(text)
    }

    /// Send one request and decode the JSON response.
    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, DnsApiError> {
        let url_text = url.to_string();
        let text = self.send(operation, method, url, body).await?;
        match serde_json::from_str(&text) {
            Ok(value) => {
                record_provider_request(operation, "success");
                Ok(value)
            }
            Err(source) => {
                let err = DnsApiError::Decode {
                    url: url_text,
                    source,
                };
                error!(operation = operation, error = %err, "Unexpected IONOS Cloud DNS API response");
                record_provider_request(operation, err.kind());
                Err(err)
            }
        }
    }
}

#[async_trait]
impl DnsApi for CloudDnsClient {
    async fn get_zones(&self, name: &str) -> Result<Vec<ZoneRead>, DnsApiError> {
        let url = self.endpoint(&["zones"], &[("filter.zoneName", name)])?;
        let list: ZoneReadList = self
            .send_json("get_zones", Method::GET, url, None::<&()>)
            .await?;
        Ok(list.items)
    }

    async fn create_zone(&self, name: &str) -> Result<ZoneRead, DnsApiError> {
        let url = self.endpoint(&["zones"], &[])?;
        self.send_json("create_zone", Method::POST, url, Some(&ZoneCreate::new(name)))
            .await
    }

    async fn get_records(&self, zone_id: &str, name: &str) -> Result<Vec<RecordRead>, DnsApiError> {
        let url = self.endpoint(
            &["records"],
            &[("filter.zoneId", zone_id), ("filter.name", name)],
        )?;
        let list: RecordReadList = self
            .send_json("get_records", Method::GET, url, None::<&()>)
            .await?;
        Ok(list.items)
    }

    async fn create_txt_record(
        &self,
        zone_id: &str,
        record_name: &str,
        content: &str,
    ) -> Result<RecordRead, DnsApiError> {
        let url = self.endpoint(&["zones", zone_id, "records"], &[])?;
        let body = RecordCreate::new(
            record_name,
            RECORD_TYPE_TXT,
            content,
            CHALLENGE_RECORD_TTL_SECS,
        );
        self.send_json("create_record", Method::POST, url, Some(&body))
            .await
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), DnsApiError> {
        let url = self.endpoint(&["zones", zone_id, "records", record_id], &[])?;
        self.send("delete_record", Method::DELETE, url, None::<&()>)
            .await?;
        record_provider_request("delete_record", "success");
        Ok(())
    }
}
