// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! IONOS Cloud DNS API models.
//!
//! Only the fields this webhook reads or writes are modelled; unknown fields in
//! API responses are ignored. Read models default every optional field so that a
//! sparse response still decodes.

use serde::{Deserialize, Serialize};

/// Zone properties as stored by IONOS Cloud DNS.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Zone name without trailing dot, e.g. `example.com`
    #[serde(default)]
    pub zone_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// A zone as returned by the API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneRead {
    /// Opaque zone id
    pub id: String,

    #[serde(default)]
    pub properties: Zone,
}

impl ZoneRead {
    /// Zone name without trailing dot.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.properties.zone_name
    }
}

/// Paginated zone collection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneReadList {
    #[serde(default)]
    pub items: Vec<ZoneRead>,
}

/// Body of `POST /zones`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneCreate {
    pub properties: Zone,
}

impl ZoneCreate {
    /// Create request for an enabled zone with the given name.
    #[must_use]
    pub fn new(zone_name: &str) -> Self {
        Self {
            properties: Zone {
                zone_name: zone_name.to_string(),
                description: Some("Created by cert-manager-webhook-ionos-cloud".to_string()),
                enabled: true,
            },
        }
    }
}

/// Record properties as stored by IONOS Cloud DNS.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Name relative to the zone, e.g. `_acme-challenge`
    #[serde(default)]
    pub name: String,

    /// Record type, e.g. `TXT`
    #[serde(default, rename = "type")]
    pub record_type: String,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i32>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// A record as returned by the API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordRead {
    /// Opaque record id
    pub id: String,

    #[serde(default)]
    pub properties: Record,
}

/// Paginated record collection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordReadList {
    #[serde(default)]
    pub items: Vec<RecordRead>,
}

/// Body of `POST /zones/{zoneId}/records`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordCreate {
    pub properties: Record,
}

impl RecordCreate {
    /// Create request for an enabled record.
    #[must_use]
    pub fn new(name: &str, record_type: &str, content: &str, ttl: i32) -> Self {
        Self {
            properties: Record {
                name: name.to_string(),
                record_type: record_type.to_string(),
                content: content.to_string(),
                ttl: Some(ttl),
                enabled: true,
            },
        }
    }
}

fn default_enabled() -> bool {
    true
}
