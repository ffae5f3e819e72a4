// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The cert-manager webhook surface.
//!
//! cert-manager reaches solvers through the Kubernetes aggregation layer: the
//! kube-apiserver forwards `POST /apis/<group>/v1alpha1/<solver>` requests to this
//! server. This module provides:
//!
//! - [`SolverRegistry`] - solvers keyed by [`Solver::name`]
//! - [`server::router`] - discovery, challenge, health and metrics endpoints
//! - [`server::serve`] - HTTP or HTTPS listener with graceful shutdown
//!
//! # Example
//!
//! ```rust,no_run
//! use ionos_cloud_webhook::webhook::{server, SolverRegistry};
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! # async fn example() -> Result<(), ionos_cloud_webhook::webhook::WebhookError> {
//! let registry = SolverRegistry::new();
//! let (_stop_tx, stop_rx) = watch::channel(false);
//! let state = Arc::new(server::AppState::new("acme.example.com", registry));
//! let app = server::router(state);
//! let addr: SocketAddr = "0.0.0.0:8443".parse().unwrap();
//! server::serve(addr, None, app, stop_rx).await?;
//! # Ok(())
//! # }
//! ```

pub mod server;
pub mod tls;

#[cfg(test)]
mod server_tests;

use crate::dns_errors::SolverError;
use crate::solver::Solver;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

/// Errors starting or running the webhook server.
#[derive(Error, Debug)]
pub enum WebhookError {
    /// Two solvers share a name
    #[error("a solver named '{0}' is already registered")]
    DuplicateSolver(String),

    /// A solver refused to start
    #[error("failed to initialize solver '{name}': {source}")]
    SolverInit {
        /// Solver name
        name: String,
        /// Why it failed
        #[source]
        source: SolverError,
    },

    /// Certificate or key file could not be read or parsed
    #[error("invalid TLS material in {path}: {reason}")]
    TlsMaterial {
        /// File that failed
        path: PathBuf,
        /// Why it failed
        reason: String,
    },

    /// rustls rejected the certificate/key pair
    #[error("failed to build TLS configuration: {0}")]
    Tls(#[from] rustls::Error),

    /// Socket errors
    #[error("webhook server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Solvers served by this webhook, keyed by name.
#[derive(Clone, Default)]
pub struct SolverRegistry {
    solvers: BTreeMap<String, Arc<dyn Solver>>,
}

impl SolverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a solver.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::DuplicateSolver`] if the name is taken.
    pub fn register(&mut self, solver: Arc<dyn Solver>) -> Result<(), WebhookError> {
        let name = solver.name().to_string();
        if self.solvers.contains_key(&name) {
            return Err(WebhookError::DuplicateSolver(name));
        }
        info!(solver = %name, "Registered DNS-01 solver");
        self.solvers.insert(name, solver);
        Ok(())
    }

    /// Look up a solver by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Solver>> {
        self.solvers.get(name).cloned()
    }

    /// Registered solver names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.solvers.keys().map(String::as_str).collect()
    }

    /// Run every solver's `initialize` hook, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::SolverInit`] naming the solver that failed.
    pub async fn initialize_all(
        &self,
        kube_config: Option<&kube::Config>,
        stop: &watch::Receiver<bool>,
    ) -> Result<(), WebhookError> {
        for (name, solver) in &self.solvers {
            solver
                .initialize(kube_config, stop.clone())
                .await
                .map_err(|source| WebhookError::SolverInit {
                    name: name.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}
