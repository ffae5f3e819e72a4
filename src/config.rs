// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process configuration.
//!
//! Parsed once at startup from command-line flags and environment variables,
//! then passed down explicitly. Flag names follow the cert-manager webhook
//! convention (`--secure-port`, `--tls-cert-file`, `--tls-private-key-file`) so
//! the standard webhook Helm chart can start the binary unchanged.

use crate::constants::{DEFAULT_BIND_ADDRESS, DEFAULT_IONOS_API_URL, DEFAULT_SECURE_PORT};
use crate::resolver::MissingZonePolicy;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Invalid combination of settings.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `GROUP_NAME` is empty
    #[error("GROUP_NAME must be specified")]
    MissingGroupName,

    /// Only one of the TLS files was given
    #[error("--tls-cert-file and --tls-private-key-file must be given together")]
    IncompleteTls,
}

/// Webhook configuration.
#[derive(Clone, Debug, Parser)]
#[command(
    name = "webhook",
    version,
    about = "cert-manager ACME DNS-01 webhook solver for IONOS Cloud DNS"
)]
pub struct WebhookConfig {
    /// API group the webhook is registered under (must match the issuer's `groupName`)
    #[arg(long, env = "GROUP_NAME")]
    pub group_name: String,

    /// Static IONOS Cloud API token; when unset the token is read from a Kubernetes secret per challenge
    #[arg(long, env = "IONOS_TOKEN", hide_env_values = true)]
    pub ionos_token: Option<String>,

    /// IONOS Cloud DNS API endpoint
    #[arg(long, env = "IONOS_API_URL", default_value = DEFAULT_IONOS_API_URL)]
    pub ionos_api_url: String,

    /// Namespace holding the token secret; defaults to the challenge's resource namespace
    #[arg(long, env = "POD_NAMESPACE")]
    pub secret_namespace: Option<String>,

    /// What to do when the challenge zone does not exist
    #[arg(long, env = "MISSING_ZONE_POLICY", value_enum, default_value_t = MissingZonePolicy::Fail)]
    pub missing_zone_policy: MissingZonePolicy,

    /// Address to listen on
    #[arg(long, env = "BIND_ADDRESS", default_value = DEFAULT_BIND_ADDRESS)]
    pub bind_address: IpAddr,

    /// Port to listen on
    #[arg(long, env = "SECURE_PORT", default_value_t = DEFAULT_SECURE_PORT)]
    pub secure_port: u16,

    /// PEM certificate chain for HTTPS; plain HTTP when unset
    #[arg(long, env = "TLS_CERT_FILE")]
    pub tls_cert_file: Option<PathBuf>,

    /// PEM private key for HTTPS
    #[arg(long, env = "TLS_PRIVATE_KEY_FILE")]
    pub tls_private_key_file: Option<PathBuf>,
}

impl WebhookConfig {
    /// Check settings clap cannot express.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.group_name.trim().is_empty() {
            return Err(ConfigError::MissingGroupName);
        }
        if self.tls_cert_file.is_some() != self.tls_private_key_file.is_some() {
            return Err(ConfigError::IncompleteTls);
        }
        Ok(())
    }

    /// Static API token, if one was configured and is non-empty.
    #[must_use]
    pub fn static_token(&self) -> Option<&str> {
        self.ionos_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Namespace for token secrets, if one was configured and is non-empty.
    #[must_use]
    pub fn secret_namespace(&self) -> Option<&str> {
        self.secret_namespace
            .as_deref()
            .filter(|namespace| !namespace.is_empty())
    }

    /// Certificate and key paths when HTTPS is enabled.
    #[must_use]
    pub fn tls_files(&self) -> Option<(&Path, &Path)> {
        match (&self.tls_cert_file, &self.tls_private_key_file) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }

    /// Socket address the server binds.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.secure_port)
    }
}
