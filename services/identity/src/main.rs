use anyhow::Context;
use identity_service::crypto::{Argon2Hasher, ConfigEncryptor};
use identity_service::storage::{
    InMemoryProvider, LogMailSender, OAuthProviders, OAuthRegistry, PersistenceProvider,
};
use identity_service::store::ConfigSnapshot;
use identity_service::{Collaborators, Config, IdentityService};
use rust_common::{BackgroundWorker, BackgroundWorkerConfig, TracingConfig, init_tracing};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;

    let mut tracing_config = TracingConfig::default()
        .with_service_name("identity-service")
        .with_log_level(config.log_level.as_str());
    if config.log_json {
        tracing_config = tracing_config.with_json_output();
    }
    init_tracing(&tracing_config)?;

    info!("Starting Identity Service");

    let hasher = Arc::new(Argon2Hasher);
    let encryptor = config.encryptor()?;
    let persistence = Arc::new(InMemoryProvider::new());

    let snapshot = load_snapshot(&config, persistence.as_ref(), &encryptor, &hasher).await?;

    let oauth = Arc::new(OAuthProviders::new());
    oauth.reinitialize(&snapshot).await?;

    let worker = BackgroundWorker::spawn(
        BackgroundWorkerConfig::default()
            .with_name("identity")
            .with_queue_capacity(config.worker_queue_capacity)
            .with_workers(config.worker_count),
    );

    let service = IdentityService::new(
        snapshot,
        Collaborators {
            persistence,
            mailer: Arc::new(LogMailSender),
            oauth,
            hasher,
        },
        encryptor,
        worker,
    );

    let sweeper = service.sessions().spawn_sweeper(config.session_sweep_interval);
    let jwks = service.public_key_set()?;

    info!(
        host = %config.host,
        port = config.port,
        version = service.store().version(),
        keys = jwks.keys.len(),
        "Identity Service ready"
    );
    println!("{}", jwks.to_json());

    tokio::signal::ctrl_c().await?;

    sweeper.abort();
    service.worker().wait_idle().await;
    info!("Identity Service stopped");
    Ok(())
}

/// Persisted configuration when present, otherwise the bootstrap snapshot (persisted on first start).
async fn load_snapshot(
    config: &Config,
    persistence: &dyn PersistenceProvider,
    encryptor: &ConfigEncryptor,
    hasher: &Argon2Hasher,
) -> anyhow::Result<ConfigSnapshot> {
    if let Some(blob) = persistence.get_env().await? {
        info!("Using persisted configuration");
        return Ok(encryptor.open(&blob)?);
    }

    let snapshot = config.bootstrap_snapshot(hasher)?;
    persistence.update_env(encryptor.seal(&snapshot)?).await?;
    info!("Bootstrap configuration persisted");
    Ok(snapshot)
}
