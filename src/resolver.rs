// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! IONOS Cloud DNS-01 solver.
//!
//! Converges IONOS Cloud DNS towards one of two states for a challenge:
//!
//! - **Present** - a TXT record named after the challenge FQDN carries the challenge key
//! - **CleanUp** - no TXT record with the challenge key exists under that name
//!
//! Both operations re-read provider state on every call, so cert-manager can
//! retry them freely. Records under the same name with other content belong to
//! concurrent validations and are never modified.
//!
//! # Reconciliation Flow
//!
//! 1. Resolve a provider client (static token, or token from a Kubernetes secret)
//! 2. Look up the zone by `resolvedZone` without its trailing dot
//! 3. Look up TXT records in the zone by the FQDN's zone-local name
//! 4. Create or delete the record carrying the challenge key, if needed

use crate::challenge::{record_name, zone_name, ChallengeRequest, SolverConfig};
use crate::clouddns::{DnsApi, DnsApiFactory, RecordRead, ZoneRead};
use crate::constants::{RECORD_TYPE_TXT, SOLVER_NAME};
use crate::dns_errors::SolverError;
use crate::metrics::{record_challenge_error, record_challenge_success};
use crate::secrets::SecretAccessor;
use crate::solver::Solver;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// What `Present` does when the challenge zone does not exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MissingZonePolicy {
    /// Fail with `zone '<name>' not found`
    #[default]
    Fail,
    /// Create the zone, then the record
    Create,
}

/// Where the provider client for a challenge comes from.
#[derive(Clone)]
pub enum CredentialSource {
    /// One client built at startup from a process-wide token
    Static(Arc<dyn DnsApi>),
    /// A client built per challenge from a token stored in a Kubernetes secret
    Secret {
        /// Secret reader
        secrets: Arc<dyn SecretAccessor>,
        /// Namespace holding the secret; the challenge's resource namespace when `None`
        namespace: Option<String>,
        /// Builds a client from the token
        factory: DnsApiFactory,
    },
}

/// DNS-01 solver for IONOS Cloud DNS.
#[derive(Clone)]
pub struct IonosCloudResolver {
    credentials: CredentialSource,
    missing_zone_policy: MissingZonePolicy,
}

impl IonosCloudResolver {
    #[must_use]
    pub fn new(credentials: CredentialSource, missing_zone_policy: MissingZonePolicy) -> Self {
        Self {
            credentials,
            missing_zone_policy,
        }
    }

    /// Resolve the provider client for a challenge.
    async fn dns_api(&self, ch: &ChallengeRequest) -> Result<Arc<dyn DnsApi>, SolverError> {
        match &self.credentials {
            CredentialSource::Static(api) => Ok(Arc::clone(api)),
            CredentialSource::Secret {
                secrets,
                namespace,
                factory,
            } => dns_api_from_secret(ch, secrets.as_ref(), namespace.as_deref(), factory)
                .await
                .map_err(|e| {
                    error!(uid = %ch.uid, error = %e, "Failed to resolve IONOS Cloud API credentials");
                    SolverError::Client(Box::new(e))
                }),
        }
    }

    /// Find the challenge zone and return its id.
    ///
    /// With `must_exist` unset a missing zone yields `None`; otherwise the
    /// missing-zone policy decides between failing and creating the zone.
    async fn find_zone(
        &self,
        ch: &ChallengeRequest,
        must_exist: bool,
        api: &dyn DnsApi,
    ) -> Result<Option<String>, SolverError> {
        let zone_name = zone_name(ch);
        debug!(zone_name = %zone_name, "Looking up zone");

        let zones = api.get_zones(&zone_name).await.map_err(|e| {
            error!(zone_name = %zone_name, error = %e, "Error fetching zone");
            e
        })?;

        let matching: Vec<&ZoneRead> = zones
            .iter()
            .filter(|zone| same_name(zone.name(), &zone_name))
            .collect();

        match matching.as_slice() {
            [zone] => {
                info!(zone_name = %zone_name, zone_id = %zone.id, "Zone found");
                Ok(Some(zone.id.clone()))
            }
            [] if !must_exist => {
                info!(zone_name = %zone_name, "Zone not found");
                Ok(None)
            }
            [] => match self.missing_zone_policy {
                MissingZonePolicy::Fail => {
                    warn!(zone_name = %zone_name, "Zone not found");
                    Err(SolverError::ZoneNotFound(zone_name))
                }
                MissingZonePolicy::Create => {
                    info!(zone_name = %zone_name, "Zone not found, creating it");
                    let zone = api.create_zone(&zone_name).await.map_err(|e| {
                        error!(zone_name = %zone_name, error = %e, "Error creating zone");
                        e
                    })?;
                    info!(zone_name = %zone_name, zone_id = %zone.id, "Zone created");
                    Ok(Some(zone.id))
                }
            },
            many => {
                error!(
                    zone_name = %zone_name,
                    count = many.len(),
                    "Several zones share the challenge zone name"
                );
                Err(SolverError::AmbiguousZone {
                    zone: zone_name,
                    count: many.len(),
                })
            }
        }
    }

    /// List the TXT records in `zone_id` named like the challenge record.
    async fn find_challenge_records(
        &self,
        ch: &ChallengeRequest,
        zone_id: &str,
        record_name: &str,
        api: &dyn DnsApi,
    ) -> Result<Vec<RecordRead>, SolverError> {
        debug!(
            record_name = %record_name,
            fqdn = %ch.resolved_fqdn,
            zone_id = %zone_id,
            "Looking up TXT records"
        );

        let records = api.get_records(zone_id, record_name).await.map_err(|e| {
            error!(record_name = %record_name, zone_id = %zone_id, error = %e, "Error fetching records");
            e
        })?;

        Ok(records
            .into_iter()
            .filter(|record| {
                record
                    .properties
                    .record_type
                    .eq_ignore_ascii_case(RECORD_TYPE_TXT)
                    && same_name(&record.properties.name, record_name)
            })
            .collect())
    }

    async fn find_or_create_record(
        &self,
        ch: &ChallengeRequest,
        zone_id: &str,
        record_name: &str,
        api: &dyn DnsApi,
    ) -> Result<(), SolverError> {
        let records = self
            .find_challenge_records(ch, zone_id, record_name, api)
            .await?;

        if let Some(existing) = records.iter().find(|r| carries_key(r, &ch.key)) {
            info!(
                record_id = %existing.id,
                record_name = %record_name,
                zone_id = %zone_id,
                "Record for DNS challenge already exists"
            );
            return Ok(());
        }

        debug!(
            record_name = %record_name,
            key = %ch.key,
            zone_id = %zone_id,
            other_records = records.len(),
            "Record not found, creating it"
        );
        let record = api
            .create_txt_record(zone_id, record_name, &ch.key)
            .await
            .map_err(|e| {
                error!(record_name = %record_name, zone_id = %zone_id, error = %e, "Error creating record");
                e
            })?;

        info!(
            record_id = %record.id,
            record_name = %record_name,
            zone_id = %zone_id,
            "Record for DNS challenge created"
        );
        Ok(())
    }

    async fn delete_record(
        &self,
        ch: &ChallengeRequest,
        zone_id: &str,
        record_name: &str,
        api: &dyn DnsApi,
    ) -> Result<(), SolverError> {
        let records = self
            .find_challenge_records(ch, zone_id, record_name, api)
            .await?;

        if records.is_empty() {
            info!(
                record_name = %record_name,
                zone_id = %zone_id,
                "No record with that name found, nothing to clean up"
            );
            return Ok(());
        }

        let matching: Vec<&RecordRead> =
            records.iter().filter(|r| carries_key(r, &ch.key)).collect();

        let record = match matching.as_slice() {
            [] => {
                info!(
                    record_name = %record_name,
                    zone_id = %zone_id,
                    "Records with that name found, but the key differs, nothing to clean up"
                );
                return Ok(());
            }
            [record] => *record,
            many => {
                error!(
                    record_name = %record_name,
                    zone_id = %zone_id,
                    count = many.len(),
                    "Several records carry the challenge key, refusing to pick one"
                );
                return Err(SolverError::AmbiguousRecord {
                    record: record_name.to_string(),
                    zone_id: zone_id.to_string(),
                    count: many.len(),
                });
            }
        };

        info!(record_name = %record_name, record_id = %record.id, "Record found, deleting it");
        api.delete_record(zone_id, &record.id).await.map_err(|e| {
            error!(record_id = %record.id, zone_id = %zone_id, error = %e, "Error deleting record");
            e
        })?;

        info!(
            record_id = %record.id,
            record_name = %record_name,
            zone_id = %zone_id,
            "Record deleted"
        );
        Ok(())
    }

    async fn present_challenge(&self, ch: &ChallengeRequest) -> Result<(), SolverError> {
        // Reject a record outside its zone before touching the provider
        let name = record_name(ch)?;
        let api = self.dns_api(ch).await?;
        let zone_id = self
            .find_zone(ch, true, api.as_ref())
            .await?
            .ok_or_else(|| SolverError::ZoneNotFound(zone_name(ch)))?;
        self.find_or_create_record(ch, &zone_id, &name, api.as_ref())
            .await
    }

    async fn clean_up_challenge(&self, ch: &ChallengeRequest) -> Result<(), SolverError> {
        let name = record_name(ch)?;
        let api = self.dns_api(ch).await?;
        let Some(zone_id) = self.find_zone(ch, false, api.as_ref()).await? else {
            info!(zone_name = %ch.resolved_zone, "Zone not found, nothing to clean up");
            return Ok(());
        };
        self.delete_record(ch, &zone_id, &name, api.as_ref()).await
    }
}

#[async_trait]
impl Solver for IonosCloudResolver {
    fn name(&self) -> &str {
        SOLVER_NAME
    }

    async fn present(&self, ch: &ChallengeRequest) -> Result<(), SolverError> {
        debug!(
            uid = %ch.uid,
            key = %ch.key,
            dns_name = %ch.dns_name,
            resolved_zone = %ch.resolved_zone,
            resolved_fqdn = %ch.resolved_fqdn,
            "Received DNS challenge request"
        );

        let start = Instant::now();
        let result = self.present_challenge(ch).await;
        record_outcome("Present", &result, start.elapsed());
        result
    }

    async fn clean_up(&self, ch: &ChallengeRequest) -> Result<(), SolverError> {
        debug!(
            uid = %ch.uid,
            dns_name = %ch.dns_name,
            resolved_zone = %ch.resolved_zone,
            resolved_fqdn = %ch.resolved_fqdn,
            "Received DNS challenge clean up request"
        );

        let start = Instant::now();
        let result = self.clean_up_challenge(ch).await;
        record_outcome("CleanUp", &result, start.elapsed());
        result
    }

    async fn initialize(
        &self,
        _kube_config: Option<&kube::Config>,
        _stop: watch::Receiver<bool>,
    ) -> Result<(), SolverError> {
        info!(solver = SOLVER_NAME, "IONOS Cloud resolver initialized");
        Ok(())
    }
}

/// Build a provider client from the token stored in the challenge's secret.
async fn dns_api_from_secret(
    ch: &ChallengeRequest,
    secrets: &dyn SecretAccessor,
    namespace: Option<&str>,
    factory: &DnsApiFactory,
) -> Result<Arc<dyn DnsApi>, SolverError> {
    let config = SolverConfig::from_challenge(ch)?;
    let namespace = namespace.unwrap_or(&ch.resource_namespace);

    let fetch_error = |reason: String| SolverError::CredentialFetch {
        secret: config.secret_ref.clone(),
        namespace: namespace.to_string(),
        reason,
    };

    if namespace.is_empty() {
        return Err(fetch_error(
            "no namespace configured and the challenge has no resource namespace".to_string(),
        ));
    }

    let data = secrets
        .get_secret_data(namespace, &config.secret_ref)
        .await
        .map_err(|e| fetch_error(format!("{e:#}")))?;

    let token = data.get(&config.auth_token_secret_key).ok_or_else(|| {
        fetch_error(format!(
            "key '{}' not found in secret",
            config.auth_token_secret_key
        ))
    })?;
    let token = std::str::from_utf8(token).map_err(|_| {
        fetch_error(format!(
            "value of key '{}' is not valid UTF-8",
            config.auth_token_secret_key
        ))
    })?;

    debug!(
        namespace = %namespace,
        secret = %config.secret_ref,
        key = %config.auth_token_secret_key,
        "Loaded IONOS Cloud API token from secret"
    );
    Ok((**factory)(token.trim()))
}

/// DNS names compare case-insensitively and regardless of a trailing dot.
fn same_name(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/// TXT content may come back quoted; the key itself never contains quotes.
fn carries_key(record: &RecordRead, key: &str) -> bool {
    record.properties.content.trim_matches('"') == key
}

fn record_outcome(action: &str, result: &Result<(), SolverError>, elapsed: Duration) {
    match result {
        Ok(()) => record_challenge_success(action, elapsed),
        Err(e) => record_challenge_error(action, e.kind(), elapsed),
    }
}
