// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! ACME DNS-01 challenge wire types and name derivation.
//!
//! cert-manager posts a `ChallengePayload` to the webhook for every `Present`
//! and `CleanUp`. The embedded [`ChallengeRequest`] carries everything the solver
//! needs: the resolved zone, the FQDN to publish, and the TXT content (`key`).
//!
//! Name rules:
//! - the zone name looked up at the provider is `resolvedZone` without its trailing dot
//! - the record name is `resolvedFQDN` with `"." + resolvedZone` stripped, so
//!   `_acme-challenge.example.com.` in zone `example.com.` becomes `_acme-challenge`

use crate::constants::{DEFAULT_AUTH_TOKEN_SECRET_KEY, DEFAULT_SECRET_NAME};
use crate::dns_errors::SolverError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use serde::{Deserialize, Serialize};

/// What cert-manager is asking the solver to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeAction {
    /// Publish the TXT record
    Present,
    /// Remove the TXT record
    CleanUp,
}

impl std::fmt::Display for ChallengeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => f.write_str("Present"),
            Self::CleanUp => f.write_str("CleanUp"),
        }
    }
}

/// One DNS-01 challenge, as sent by cert-manager.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    /// Opaque identifier, echoed back in the response
    #[serde(default)]
    pub uid: String,

    /// Requested action; absent on hand-built requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ChallengeAction>,

    /// Challenge type, always `dns-01` for this solver
    #[serde(default, rename = "type")]
    pub challenge_type: String,

    /// Domain being validated (may be a wildcard)
    #[serde(default)]
    pub dns_name: String,

    /// Expected TXT record content
    #[serde(default)]
    pub key: String,

    /// Namespace of the issuer, or the cert-manager namespace for cluster issuers
    #[serde(default)]
    pub resource_namespace: String,

    /// Fully-qualified, dot-terminated record name to publish
    #[serde(default, rename = "resolvedFQDN")]
    pub resolved_fqdn: String,

    /// Zone the record belongs to, usually dot-terminated
    #[serde(default)]
    pub resolved_zone: String,

    /// Whether ambient credentials may be used; not consulted by this solver
    #[serde(default)]
    pub allow_ambient_credentials: bool,

    /// Raw solver config from the issuer's `webhook.config` stanza
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

/// Result of a challenge, returned to cert-manager.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    /// UID of the request this answers
    #[serde(default)]
    pub uid: String,

    /// Whether the action succeeded
    #[serde(default)]
    pub success: bool,

    /// Failure details; `message` is surfaced on the `Challenge` resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

/// Envelope exchanged with cert-manager, carrying either a request or a response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengePayload {
    /// `<group>/v1alpha1`
    #[serde(default)]
    pub api_version: String,

    /// Always `ChallengePayload`
    #[serde(default)]
    pub kind: String,

    /// Incoming challenge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ChallengeRequest>,

    /// Outcome of the challenge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ChallengeResponse>,
}

/// Per-issuer solver configuration.
///
/// Parsed from `ChallengeRequest::config`:
///
/// ```json
/// {"secretRef": "my-secret", "authTokenSecretKey": "token"}
/// ```
///
/// Both fields are optional; empty values fall back to the defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverConfig {
    /// Name of the secret holding the API token
    #[serde(default)]
    pub secret_ref: String,

    /// Key inside the secret holding the API token
    #[serde(default)]
    pub auth_token_secret_key: String,
}

impl SolverConfig {
    /// Parse the solver config carried by a challenge, applying defaults.
    ///
    /// A missing or `null` config yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::ConfigParse`] if the config is not a JSON object
    /// of the expected shape.
    pub fn from_challenge(ch: &ChallengeRequest) -> Result<Self, SolverError> {
        let mut config = match &ch.config {
            None | Some(serde_json::Value::Null) => Self::default(),
            Some(raw) => Self::deserialize(raw)?,
        };

        if config.secret_ref.is_empty() {
            config.secret_ref = DEFAULT_SECRET_NAME.to_string();
        }
        if config.auth_token_secret_key.is_empty() {
            config.auth_token_secret_key = DEFAULT_AUTH_TOKEN_SECRET_KEY.to_string();
        }

        Ok(config)
    }
}

/// Zone name used for provider lookups: `resolvedZone` without its trailing dot.
#[must_use]
pub fn zone_name(ch: &ChallengeRequest) -> String {
    ch.resolved_zone
        .strip_suffix('.')
        .unwrap_or(&ch.resolved_zone)
        .to_string()
}

/// Record name relative to the zone: `resolvedFQDN` minus `"." + resolvedZone`.
///
/// Both names are compared in dot-terminated form, so a zone given with or
/// without its trailing dot derives the same record name. The zone apex maps
/// to the empty name.
///
/// # Errors
///
/// Returns [`SolverError::RecordOutsideZone`] if the FQDN is not inside the zone.
pub fn record_name(ch: &ChallengeRequest) -> Result<String, SolverError> {
    let fqdn = dot_terminated(&ch.resolved_fqdn);
    let zone = dot_terminated(&ch.resolved_zone);

    if fqdn.eq_ignore_ascii_case(&zone) {
        return Ok(String::new());
    }

    let suffix = format!(".{zone}");
    let split_at = fqdn.len().checked_sub(suffix.len());
    match split_at {
        Some(at)
            if at > 0
                && fqdn.is_char_boundary(at)
                && fqdn[at..].eq_ignore_ascii_case(&suffix) =>
        {
            Ok(fqdn[..at].to_string())
        }
        _ => Err(SolverError::RecordOutsideZone {
            fqdn: ch.resolved_fqdn.clone(),
            zone: ch.resolved_zone.clone(),
        }),
    }
}

fn dot_terminated(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}
