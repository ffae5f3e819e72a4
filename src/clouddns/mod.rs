// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! IONOS Cloud DNS access.
//!
//! The solver talks to the provider only through the [`DnsApi`] trait, which
//! covers the five calls a DNS-01 challenge needs:
//!
//! - list zones by name, and create a zone
//! - list records in a zone by name
//! - create a TXT record, and delete a record by id
//!
//! [`CloudDnsClient`] is the HTTP implementation. Each call is a single request:
//! there is no retry here, cert-manager re-invokes the solver on its own schedule.
//!
//! # Example
//!
//! ```rust,no_run
//! use ionos_cloud_webhook::clouddns::{CloudDnsClient, DnsApi};
//!
//! # async fn example() -> Result<(), ionos_cloud_webhook::dns_errors::DnsApiError> {
//! let client = CloudDnsClient::new("https://dns.de-fra.ionos.com", "token");
//! let zones = client.get_zones("example.com").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod types;


pub use client::CloudDnsClient;
pub use types::{
    Record, RecordCreate, RecordRead, RecordReadList, Zone, ZoneCreate, ZoneRead, ZoneReadList,
};

use crate::dns_errors::DnsApiError;
use async_trait::async_trait;
use std::sync::Arc;

/// Zone and record operations against IONOS Cloud DNS.
#[async_trait]
pub trait DnsApi: Send + Sync {
    /// List zones whose name matches `name`.
    ///
    /// The provider filter is a partial match; callers must compare names themselves.
    async fn get_zones(&self, name: &str) -> Result<Vec<ZoneRead>, DnsApiError>;

    /// Create a zone named `name`.
    async fn create_zone(&self, name: &str) -> Result<ZoneRead, DnsApiError>;

    /// List records in `zone_id` whose name matches `name`.
    async fn get_records(&self, zone_id: &str, name: &str) -> Result<Vec<RecordRead>, DnsApiError>;

    /// Create a TXT record `record_name` with `content` in `zone_id`.
    async fn create_txt_record(
        &self,
        zone_id: &str,
        record_name: &str,
        content: &str,
    ) -> Result<RecordRead, DnsApiError>;

    /// Delete record `record_id` from `zone_id`.
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), DnsApiError>;
}

/// Builds a provider client from an API token.
pub type DnsApiFactory = Arc<dyn Fn(&str) -> Arc<dyn DnsApi> + Send + Sync>;

/// Factory producing [`CloudDnsClient`]s against `base_url`.
///
/// Every client it builds shares one HTTP connection pool; only the token differs.
#[must_use]
pub fn default_dns_api_factory(base_url: &str) -> DnsApiFactory {
    let base_url = base_url.to_string();
    let http = Arc::new(reqwest::Client::new());
    Arc::new(move |token: &str| -> Arc<dyn DnsApi> {
        Arc::new(CloudDnsClient::with_http_client(
            Arc::clone(&http),
            &base_url,
            token,
        ))
    })
}
