// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The DNS-01 solver contract cert-manager drives through the webhook.
//!
//! A webhook deployment can host several solvers; cert-manager selects one by
//! the `solverName` on the issuer, which must equal [`Solver::name`].

use crate::challenge::ChallengeRequest;
use crate::dns_errors::SolverError;
use async_trait::async_trait;
use tokio::sync::watch;

/// A DNS-01 challenge solver.
#[async_trait]
pub trait Solver: Send + Sync {
    /// Name used to select this solver, unique within one webhook deployment.
    fn name(&self) -> &str;

    /// Publish the challenge record.
    ///
    /// Must tolerate being called repeatedly with the same challenge.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be published.
    async fn present(&self, ch: &ChallengeRequest) -> Result<(), SolverError>;

    /// Remove the challenge record.
    ///
    /// Only the record carrying the challenge's key may be removed; other
    /// records with the same name belong to concurrent validations.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be removed.
    async fn clean_up(&self, ch: &ChallengeRequest) -> Result<(), SolverError>;

    /// Called once when the webhook starts, before any challenge is served.
    ///
    /// `kube_config` is the in-cluster configuration if one was loaded; `stop`
    /// flips to `true` when the process is shutting down.
    ///
    /// # Errors
    ///
    /// Returns an error if the solver cannot start; the webhook then exits.
    async fn initialize(
        &self,
        kube_config: Option<&kube::Config>,
        stop: watch::Receiver<bool>,
    ) -> Result<(), SolverError>;
}
