// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::Parser;
use ionos_cloud_webhook::{
    clouddns::{default_dns_api_factory, CloudDnsClient},
    config::WebhookConfig,
    resolver::{CredentialSource, IonosCloudResolver},
    secrets::KubeSecretAccessor,
    webhook::{
        server::{self, AppState},
        tls::load_tls_config,
        SolverRegistry,
    },
};
use kube::Client;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};


fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("ionos-webhook")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Format: timestamp file:line LEVEL message
    //
    // Respects RUST_LOG (default INFO) and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    // reqwest and the kube client pick the process-wide provider
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let config = WebhookConfig::parse();
    config.validate()?;

    info!(
        group_name = %config.group_name,
        api_url = %config.ionos_api_url,
        missing_zone_policy = ?config.missing_zone_policy,
        "Starting IONOS Cloud DNS-01 webhook"
    );

    let (credentials, kube_config) = credential_source(&config).await?;
    let resolver = IonosCloudResolver::new(credentials, config.missing_zone_policy);

    let mut registry = SolverRegistry::new();
    registry.register(Arc::new(resolver))?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(forward_shutdown(wait_for_shutdown_signal(), stop_tx));

    registry
        .initialize_all(kube_config.as_ref(), &stop_rx)
        .await?;

    let tls = match config.tls_files() {
        Some((cert, key)) => Some(load_tls_config(cert, key)?),
        None => None,
    };

    let state = Arc::new(AppState::new(&config.group_name, registry));
    state.ready.store(true, Ordering::Relaxed);

    server::serve(config.listen_addr(), tls, server::router(state), stop_rx).await?;

    info!("Graceful shutdown completed successfully");
    Ok(())
}

/// Pick where provider tokens come from.
///
/// A static token needs no Kubernetes access; otherwise tokens are read from
/// secrets through an in-cluster (or kubeconfig) client.
async fn credential_source(
    config: &WebhookConfig,
) -> Result<(CredentialSource, Option<kube::Config>)> {
    if let Some(token) = config.static_token() {
        info!("Using static IONOS Cloud API token");
        let api = CloudDnsClient::new(&config.ionos_api_url, token);
        return Ok((CredentialSource::Static(Arc::new(api)), None));
    }

    debug!("Initializing Kubernetes client");
    let kube_config = kube::Config::infer()
        .await
        .context("failed to load Kubernetes configuration")?;
    let client = Client::try_from(kube_config.clone())
        .context("failed to create Kubernetes client")?;
    debug!("Kubernetes client initialized successfully");

    info!(
        namespace = config.secret_namespace().unwrap_or("<challenge namespace>"),
        "Reading IONOS Cloud API tokens from Kubernetes secrets"
    );
    let credentials = CredentialSource::Secret {
        secrets: Arc::new(KubeSecretAccessor::new(client)),
        namespace: config.secret_namespace().map(str::to_string),
        factory: default_dns_api_factory(&config.ionos_api_url),
    };
    Ok((credentials, Some(kube_config)))
}

/// Resolve once SIGTERM (pod termination) or SIGINT (Ctrl+C) arrives.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                Ok("SIGINT")
            }
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("SIGINT")
    }
}

/// Flip `stop` once `signal` resolves. Signal handler errors also stop the server.
async fn forward_shutdown<F>(signal: F, stop: watch::Sender<bool>)
where
    F: Future<Output = Result<&'static str>>,
{
    match signal.await {
        Ok(name) => info!("Received {name}, initiating graceful shutdown..."),
        Err(e) => error!("Failed to listen for shutdown signals: {e:#}"),
    }
    let _ = stop.send(true);
}
