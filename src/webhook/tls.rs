// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Server-side TLS for the webhook listener.
//!
//! The kube-apiserver only talks HTTPS to aggregated APIs, so in-cluster the
//! webhook is always started with a PEM certificate chain and private key
//! (usually issued by cert-manager itself and mounted from a secret).

use super::WebhookError;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Build a rustls server configuration from PEM files.
///
/// Accepts PKCS#1, PKCS#8 and SEC1 keys. Advertises `h2` and `http/1.1`.
///
/// # Errors
///
/// Returns [`WebhookError::TlsMaterial`] when a file cannot be read or holds no
/// certificate/key, and [`WebhookError::Tls`] when rustls rejects the pair.
pub fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>, WebhookError> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;
    debug!(
        cert_file = %cert_path.display(),
        key_file = %key_path.display(),
        certificates = certs.len(),
        "Loaded TLS material"
    );

    let mut config =
        ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

fn open(path: &Path) -> Result<BufReader<File>, WebhookError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| WebhookError::TlsMaterial {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, WebhookError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| WebhookError::TlsMaterial {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if certs.is_empty() {
        return Err(WebhookError::TlsMaterial {
            path: path.to_path_buf(),
            reason: "no certificates found".to_string(),
        });
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, WebhookError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| WebhookError::TlsMaterial {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
        .ok_or_else(|| WebhookError::TlsMaterial {
            path: path.to_path_buf(),
            reason: "no private key found".to_string(),
        })
}
