// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the IONOS Cloud DNS-01 webhook.
//!
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Solver Constants
// ============================================================================

/// Name the solver is registered under; referenced as `solverName` on the ACME issuer
pub const SOLVER_NAME: &str = "ionos-cloud";

/// Secret holding the IONOS Cloud API token when the issuer config names none
pub const DEFAULT_SECRET_NAME: &str = "cert-manager-webhook-ionos-cloud";

/// Key inside the secret holding the API token when the issuer config names none
pub const DEFAULT_AUTH_TOKEN_SECRET_KEY: &str = "auth-token";

// ============================================================================
// Webhook API Constants
// ============================================================================

/// Version of the challenge API served under the configured group
pub const WEBHOOK_API_VERSION: &str = "v1alpha1";

/// Kind of the payload exchanged with cert-manager
pub const KIND_CHALLENGE_PAYLOAD: &str = "ChallengePayload";

/// Only verb cert-manager uses against a solver resource
pub const VERB_CREATE: &str = "create";

/// Default bind address of the webhook server
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Default port of the webhook server (cert-manager webhook chart convention)
pub const DEFAULT_SECURE_PORT: u16 = 8443;

// ============================================================================
// IONOS Cloud DNS Constants
// ============================================================================

/// Default IONOS Cloud DNS API endpoint
pub const DEFAULT_IONOS_API_URL: &str = "https://dns.de-fra.ionos.com";

/// DNS record type used for ACME challenges
pub const RECORD_TYPE_TXT: &str = "TXT";

/// TTL for challenge records (1 minute); short so stale tokens expire quickly
pub const CHALLENGE_RECORD_TTL_SECS: i32 = 60;

// ============================================================================
// Metrics Constants
// ============================================================================

/// Namespace prefix for all webhook metrics (prometheus-safe)
pub const METRICS_NAMESPACE: &str = "ionos_cloud_webhook";
