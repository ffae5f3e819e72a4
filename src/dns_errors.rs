// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the IONOS Cloud DNS client and the challenge solver.
//!
//! This module provides specialized error types for:
//! - IONOS Cloud DNS HTTP API operations (zone and record management)
//! - Challenge configuration and credential resolution
//! - Zone and record matching during `Present` / `CleanUp`
//!
//! Provider errors pass through the solver unchanged, so the message cert-manager
//! reports on the `Challenge` resource is the one the provider produced.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by the IONOS Cloud DNS HTTP API client.
#[derive(Error, Debug)]
pub enum DnsApiError {
    /// The request never produced a response (DNS, TLS, connection reset, timeout)
    #[error("failed to send request to {url}: {source}")]
    Transport {
        /// Full request URL
        url: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-2xx status
    #[error("unexpected status code: {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the API
        status: StatusCode,
        /// Response body, usually a JSON error document
        body: String,
    },

    /// The API answered 2xx but the body was not the expected JSON document
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// Full request URL
        url: String,
        /// Deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// The request URL could not be built from the configured endpoint
    #[error("invalid API URL '{url}': {source}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Parse error
        #[source]
        source: url::ParseError,
    },
}

impl DnsApiError {
    /// Short label used for metrics and structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::UnexpectedStatus { .. } => "status",
            Self::Decode { .. } => "decode",
            Self::InvalidUrl { .. } => "invalid_url",
        }
    }
}

/// Errors that abort a `Present` or `CleanUp` call.
///
/// Every variant is returned to cert-manager, which owns retry and backoff.
#[derive(Error, Debug)]
pub enum SolverError {
    /// The issuer's solver config is not valid JSON for the expected shape
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The API token secret could not be read
    #[error("failed to get secret {secret} from namespace {namespace}: {reason}")]
    CredentialFetch {
        /// Secret name
        secret: String,
        /// Namespace the secret was looked up in
        namespace: String,
        /// Why the lookup failed
        reason: String,
    },

    /// Credential resolution failed before any provider call was made
    #[error("failed to create IONOS Cloud API client: {0}")]
    Client(#[source] Box<SolverError>),

    /// No zone with the challenge's zone name exists and zone creation is disabled
    #[error("zone '{0}' not found")]
    ZoneNotFound(String),

    /// More than one zone carries the challenge's zone name
    #[error("error fetching zone")]
    AmbiguousZone {
        /// Zone name that matched several zones
        zone: String,
        /// How many zones matched
        count: usize,
    },

    /// More than one TXT record carries the challenge key under the record name
    #[error("found {count} TXT records '{record}' with the challenge key in zone {zone_id}")]
    AmbiguousRecord {
        /// Record name relative to the zone
        record: String,
        /// Zone id
        zone_id: String,
        /// How many records matched
        count: usize,
    },

    /// The FQDN to publish does not lie inside the resolved zone
    #[error("record '{fqdn}' is not inside zone '{zone}'")]
    RecordOutsideZone {
        /// Fully-qualified record name from the challenge
        fqdn: String,
        /// Resolved zone from the challenge
        zone: String,
    },

    /// Any failure from the IONOS Cloud DNS API, passed through unchanged
    #[error(transparent)]
    Provider(#[from] DnsApiError),
}

impl SolverError {
    /// Short label used for metrics and structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "config_parse",
            Self::CredentialFetch { .. } => "credential_fetch",
            Self::Client(inner) => inner.kind(),
            Self::ZoneNotFound(_) => "zone_not_found",
            Self::AmbiguousZone { .. } => "ambiguous_zone",
            Self::AmbiguousRecord { .. } => "ambiguous_record",
            Self::RecordOutsideZone { .. } => "record_outside_zone",
            Self::Provider(_) => "provider_api",
        }
    }
}
