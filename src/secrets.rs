// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Access to the Kubernetes secret holding the IONOS Cloud API token.

use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::debug;

/// Reads secret data by namespace and name.
#[async_trait]
pub trait SecretAccessor: Send + Sync {
    /// Return the decoded `data` of secret `name` in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret cannot be read.
    async fn get_secret_data(&self, namespace: &str, name: &str)
        -> Result<BTreeMap<String, Vec<u8>>>;
}

/// [`SecretAccessor`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeSecretAccessor {
    client: Client,
}

impl KubeSecretAccessor {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretAccessor for KubeSecretAccessor {
    async fn get_secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        debug!(namespace = %namespace, secret = %name, "Fetching secret");

        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api.get(name).await?;

        Ok(secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, value.0))
            .collect())
    }
}
