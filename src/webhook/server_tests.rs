// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `server.rs`

#[cfg(test)]
mod tests {
    use crate::challenge::ChallengeRequest;
    use crate::dns_errors::SolverError;
    use crate::solver::Solver;
    use crate::webhook::server::{router, serve_listener, AppState};
    use crate::webhook::SolverRegistry;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::watch;
    use tower::ServiceExt;

    const GROUP: &str = "acme.example.com";

    /// Solver that records the actions it was asked to perform.
    #[derive(Default)]
    struct RecordingSolver {
        calls: Mutex<Vec<(String, String)>>,
        fail_with: Option<&'static str>,
    }

    impl RecordingSolver {
        fn record(&self, action: &str, ch: &ChallengeRequest) -> Result<(), SolverError> {
            self.calls
                .lock()
                .unwrap()
                .push((action.to_string(), ch.resolved_fqdn.clone()));
            match self.fail_with {
                Some(zone) => Err(SolverError::ZoneNotFound(zone.to_string())),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Solver for RecordingSolver {
        fn name(&self) -> &str {
            "ionos-cloud"
        }

        async fn present(&self, ch: &ChallengeRequest) -> Result<(), SolverError> {
            self.record("present", ch)
        }

        async fn clean_up(&self, ch: &ChallengeRequest) -> Result<(), SolverError> {
            self.record("cleanup", ch)
        }

        async fn initialize(
            &self,
            _kube_config: Option<&kube::Config>,
            _stop: watch::Receiver<bool>,
        ) -> Result<(), SolverError> {
            Ok(())
        }
    }

    fn app_with(solver: Arc<RecordingSolver>) -> (Router, Arc<AppState>) {
        let mut registry = SolverRegistry::new();
        registry.register(solver).unwrap();
        let state = Arc::new(AppState::new(GROUP, registry));
        (router(Arc::clone(&state)), state)
    }

    fn payload(action: &str) -> Value {
        json!({
            "apiVersion": "acme.example.com/v1alpha1",
            "kind": "ChallengePayload",
            "request": {
                "uid": "6a3c1b6e-uid",
                "action": action,
                "type": "dns-01",
                "dnsName": "test.com",
                "key": "test-key",
                "resourceNamespace": "issuer-ns",
                "resolvedFQDN": "_acme-challenge.test.com.",
                "resolvedZone": "test.com.",
                "allowAmbientCredentials": false,
                "config": {"secretRef": "ionos"}
            }
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_present_dispatches_to_solver() {
        let solver = Arc::new(RecordingSolver::default());
        let (app, _) = app_with(Arc::clone(&solver));

        let (status, body) = send(
            app,
            post(
                "/apis/acme.example.com/v1alpha1/ionos-cloud",
                &payload("Present"),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["apiVersion"], "acme.example.com/v1alpha1");
        assert_eq!(body["kind"], "ChallengePayload");
        assert_eq!(body["response"]["uid"], "6a3c1b6e-uid");
        assert_eq!(body["response"]["success"], true);
        assert!(body["response"].get("status").is_none());
        assert_eq!(
            solver.calls(),
            vec![(
                "present".to_string(),
                "_acme-challenge.test.com.".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_cleanup_on_namespaced_path() {
        let solver = Arc::new(RecordingSolver::default());
        let (app, _) = app_with(Arc::clone(&solver));

        let (status, body) = send(
            app,
            post(
                "/apis/acme.example.com/v1alpha1/namespaces/cert-manager/ionos-cloud",
                &payload("CleanUp"),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"]["success"], true);
        assert_eq!(solver.calls()[0].0, "cleanup");
    }

    #[tokio::test]
    async fn test_solver_failure_is_reported_in_payload() {
        let solver = Arc::new(RecordingSolver {
            fail_with: Some("test.com"),
            ..Default::default()
        });
        let (app, _) = app_with(solver);

        let (status, body) = send(
            app,
            post(
                "/apis/acme.example.com/v1alpha1/ionos-cloud",
                &payload("Present"),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"]["success"], false);
        assert_eq!(body["response"]["status"]["status"], "Failure");
        assert_eq!(
            body["response"]["status"]["message"],
            "zone 'test.com' not found"
        );
    }

    #[tokio::test]
    async fn test_unknown_solver_is_not_found() {
        let solver = Arc::new(RecordingSolver::default());
        let (app, _) = app_with(Arc::clone(&solver));

        let (status, body) = send(
            app,
            post("/apis/acme.example.com/v1alpha1/route53", &payload("Present")),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["reason"], "NotFound");
        assert_eq!(body["code"], 404);
        assert!(solver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_group_is_not_found() {
        let solver = Arc::new(RecordingSolver::default());
        let (app, _) = app_with(Arc::clone(&solver));

        let (status, _) = send(
            app,
            post(
                "/apis/other.example.com/v1alpha1/ionos-cloud",
                &payload("Present"),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(solver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_version_is_not_found() {
        let (app, _) = app_with(Arc::new(RecordingSolver::default()));

        let (status, _) = send(
            app,
            post("/apis/acme.example.com/v1beta1/ionos-cloud", &payload("Present")),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_payload_without_request_is_rejected() {
        let (app, _) = app_with(Arc::new(RecordingSolver::default()));

        let (status, body) = send(
            app,
            post(
                "/apis/acme.example.com/v1alpha1/ionos-cloud",
                &json!({"apiVersion": "acme.example.com/v1alpha1", "kind": "ChallengePayload"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "ChallengePayload has no request");
    }

    #[tokio::test]
    async fn test_request_without_action_is_rejected() {
        let solver = Arc::new(RecordingSolver::default());
        let (app, _) = app_with(Arc::clone(&solver));
        let mut body = payload("Present");
        body["request"]
            .as_object_mut()
            .unwrap()
            .remove("action");

        let (status, _) = send(
            app,
            post("/apis/acme.example.com/v1alpha1/ionos-cloud", &body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(solver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let (app, _) = app_with(Arc::new(RecordingSolver::default()));
        let request = Request::builder()
            .method("POST")
            .uri("/apis/acme.example.com/v1alpha1/ionos-cloud")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("failed to decode ChallengePayload"));
    }

    #[tokio::test]
    async fn test_discovery_group_list() {
        let (app, _) = app_with(Arc::new(RecordingSolver::default()));

        let (status, body) = send(app, get("/apis")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["groups"][0]["name"], GROUP);
        assert_eq!(
            body["groups"][0]["preferredVersion"]["groupVersion"],
            "acme.example.com/v1alpha1"
        );
        assert_eq!(body["groups"][0]["versions"][0]["version"], "v1alpha1");
    }

    #[tokio::test]
    async fn test_discovery_group() {
        let (app, _) = app_with(Arc::new(RecordingSolver::default()));

        let (status, body) = send(app.clone(), get("/apis/acme.example.com")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], GROUP);

        let (status, _) = send(app, get("/apis/other.example.com")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_discovery_resource_list() {
        let (app, _) = app_with(Arc::new(RecordingSolver::default()));

        let (status, body) = send(app, get("/apis/acme.example.com/v1alpha1")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["groupVersion"], "acme.example.com/v1alpha1");
        let resources = body["resources"].as_array().unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0]["name"], "ionos-cloud");
        assert_eq!(resources[0]["kind"], "ChallengePayload");
        assert_eq!(resources[0]["namespaced"], false);
        assert_eq!(resources[0]["verbs"], json!(["create"]));
    }

    #[tokio::test]
    async fn test_readiness_follows_flag() {
        let (app, state) = app_with(Arc::new(RecordingSolver::default()));

        let (status, _) = send(app.clone(), get("/readyz")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        state.ready.store(true, Ordering::Relaxed);
        let (status, _) = send(app.clone(), get("/readyz")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(app, get("/healthz")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        crate::metrics::record_provider_request("get_zones", "success");
        let (app, _) = app_with(Arc::new(RecordingSolver::default()));

        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("ionos_cloud_webhook_provider_requests_total"));
    }

    #[tokio::test]
    async fn test_plain_http_server_stops_on_signal() {
        let solver = Arc::new(RecordingSolver::default());
        let (app, _) = app_with(Arc::clone(&solver));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = watch::channel(false);
        let server = tokio::spawn(serve_listener(listener, None, app, stop_rx));

        let response = reqwest::Client::new()
            .post(format!(
                "http://{addr}/apis/acme.example.com/v1alpha1/ionos-cloud"
            ))
            .json(&payload("Present"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["response"]["success"], true);

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server should stop")
            .unwrap()
            .unwrap();
    }
}
