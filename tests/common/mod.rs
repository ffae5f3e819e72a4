// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use ionos_cloud_webhook::resolver::{CredentialSource, IonosCloudResolver, MissingZonePolicy};
use ionos_cloud_webhook::webhook::server::{router, serve_listener, AppState};
use ionos_cloud_webhook::webhook::SolverRegistry;
use rustls::ServerConfig;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GROUP: &str = "acme.example.com";

/// A webhook running on an ephemeral local port.
pub struct RunningWebhook {
    pub addr: SocketAddr,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RunningWebhook {
    /// Signal shutdown and wait for the server task to finish.
    pub async fn shutdown(self) {
        self.stop.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), self.handle)
            .await
            .expect("webhook should stop after the shutdown signal")
            .unwrap();
    }
}

/// Start the webhook with one IONOS Cloud resolver.
pub async fn start_webhook(
    credentials: CredentialSource,
    policy: MissingZonePolicy,
    tls: Option<Arc<ServerConfig>>,
) -> RunningWebhook {
    let mut registry = SolverRegistry::new();
    registry
        .register(Arc::new(IonosCloudResolver::new(credentials, policy)))
        .unwrap();
    let state = Arc::new(AppState::new(GROUP, registry));
    state.ready.store(true, Ordering::Relaxed);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        serve_listener(listener, tls, router(state), stop_rx)
            .await
            .unwrap();
    });

    RunningWebhook { addr, stop, handle }
}

/// Path of a file under `tests/testdata`.
pub fn testdata(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("testdata")
        .join(name)
}

/// A `ChallengePayload` as cert-manager sends it.
pub fn challenge_payload(action: &str, config: Value) -> Value {
    json!({
        "apiVersion": format!("{GROUP}/v1alpha1"),
        "kind": "ChallengePayload",
        "request": {
            "uid": "3f1c9a2e-0d3b-4b8e-9b8f-1f2e3d4c5b6a",
            "action": action,
            "type": "dns-01",
            "dnsName": "example.com",
            "key": "challenge-key",
            "resourceNamespace": "issuer-ns",
            "resolvedFQDN": "_acme-challenge.example.com.",
            "resolvedZone": "example.com.",
            "allowAmbientCredentials": false,
            "config": config
        }
    })
}

/// Mount a zone lookup answering with the given zones (`(id, name)` pairs).
pub async fn mock_zones(server: &MockServer, zones: &[(&str, &str)]) {
    let items: Vec<Value> = zones
        .iter()
        .map(|(id, name)| {
            json!({
                "id": id,
                "type": "zone",
                "properties": {"zoneName": name, "enabled": true}
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("filter.zoneName", "example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": items})))
        .mount(server)
        .await;
}

/// Mount a record lookup answering with the given TXT records (`(id, content)` pairs).
pub async fn mock_txt_records(server: &MockServer, zone_id: &str, records: &[(&str, &str)]) {
    let items: Vec<Value> = records
        .iter()
        .map(|(id, content)| {
            json!({
                "id": id,
                "type": "record",
                "properties": {
                    "name": "_acme-challenge",
                    "type": "TXT",
                    "content": content,
                    "ttl": 60,
                    "enabled": true
                }
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/records"))
        .and(query_param("filter.zoneId", zone_id))
        .and(query_param("filter.name", "_acme-challenge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": items})))
        .mount(server)
        .await;
}
