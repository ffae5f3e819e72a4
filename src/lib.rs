// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # IONOS Cloud DNS-01 webhook for cert-manager
//!
//! An ACME DNS-01 solver that cert-manager calls through the Kubernetes API
//! aggregation layer. For each challenge it publishes (or removes) one TXT
//! record in IONOS Cloud DNS.
//!
//! ## Modules
//!
//! - [`challenge`] - Challenge payload types and zone/record name derivation
//! - [`clouddns`] - IONOS Cloud DNS API client
//! - [`resolver`] - The solver: converges provider state for one challenge
//! - [`secrets`] - Reads API tokens from Kubernetes secrets
//! - [`webhook`] - Solver registry and HTTP(S) server
//! - [`config`] - Command-line and environment configuration
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use ionos_cloud_webhook::clouddns::CloudDnsClient;
//! use ionos_cloud_webhook::resolver::{CredentialSource, IonosCloudResolver, MissingZonePolicy};
//! use std::sync::Arc;
//!
//! let api = CloudDnsClient::new("https://dns.de-fra.ionos.com", "my-token");
//! let resolver = IonosCloudResolver::new(
//!     CredentialSource::Static(Arc::new(api)),
//!     MissingZonePolicy::Fail,
//! );
//! ```
//!
//! ## Issuer configuration
//!
//! ```yaml
//! solvers:
//!   - dns01:
//!       webhook:
//!         groupName: acme.example.com
//!         solverName: ionos-cloud
//!         config:
//!           secretRef: cert-manager-webhook-ionos-cloud
//!           authTokenSecretKey: auth-token
//! ```

pub mod challenge;
pub mod clouddns;
pub mod config;
pub mod constants;
pub mod dns_errors;
pub mod metrics;
pub mod resolver;
pub mod secrets;
pub mod solver;
pub mod webhook;
