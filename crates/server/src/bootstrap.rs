use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tavern_chat::commands::CommandRouter;
use tavern_chat::events::command_dispatcher;
use tavern_chat::handlers::StoreCommandService;
use tavern_chat::scheduler::{QuoteBroadcaster, ScheduledTask};
use tavern_chat::socket::{ChatRunner, ChatTransport, NoopTransport, ReconnectPolicy};
use tavern_core::config::{AppConfig, ConfigError, LoadOptions, TransportMode};
use tavern_core::CollectionKey;
use tavern_store::{seed_missing, validate_all, CollectionStore, EnvFileStore, StoreError};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::console::ConsoleTransport;

pub struct Application {
    pub config: AppConfig,
    pub runner: ChatRunner,
    pub broadcaster: Option<QuoteBroadcaster>,
    ready: watch::Receiver<bool>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("store holds invalid collections: {0}")]
    InvalidCollections(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let transport: Arc<dyn ChatTransport> = match config.transport.mode {
        TransportMode::Console => Arc::new(ConsoleTransport::stdio()),
        TransportMode::Noop => Arc::new(NoopTransport::default()),
    };
    bootstrap_with_transport(config, transport).await
}

pub async fn bootstrap_with_transport(
    config: AppConfig,
    transport: Arc<dyn ChatTransport>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        transport_mode = ?config.transport.mode,
        token_configured = config.discord.token.is_some(),
        "starting application bootstrap"
    );

    let backend = Arc::new(EnvFileStore::new(config.store.path.clone()));
    let store = Arc::new(CollectionStore::new(backend));
    info!(
        event_name = "system.bootstrap.store_opened",
        correlation_id = "bootstrap",
        path = %config.store.path.display(),
        "collection store opened"
    );

    if !config.seed.is_empty() {
        let outcome = seed_missing(&store, &config.seed).await?;
        info!(
            event_name = "system.bootstrap.store_seeded",
            correlation_id = "bootstrap",
            seeded = outcome.seeded.len(),
            skipped = outcome.skipped.len(),
            "seed values applied to absent collections"
        );
    }

    let report = validate_all(&store).await?;
    if !report.is_valid() {
        let details = report
            .failures()
            .map(|(key, reason)| format!("{key}: {reason}"))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(BootstrapError::InvalidCollections(details));
    }
    info!(
        event_name = "system.bootstrap.store_validated",
        correlation_id = "bootstrap",
        collections = report.collections.len(),
        "all collections decode to their shapes"
    );

    let (ready_tx, ready) = watch::channel(false);
    let router = CommandRouter::new(
        StoreCommandService::new(store.clone()),
        config.discord.command_prefix.clone(),
    );
    let runner = ChatRunner::new(
        transport.clone(),
        command_dispatcher(router, ready_tx),
        ReconnectPolicy::default(),
    );

    let broadcaster = config
        .schedule
        .daily_quote_enabled
        .then(|| config.discord.broadcast_channel_id.clone())
        .flatten()
        .map(|channel_id| {
            QuoteBroadcaster::new(
                ScheduledTask {
                    interval: config.schedule_interval(),
                    key: CollectionKey::Quotes,
                    channel_id,
                },
                store,
                transport,
            )
        });

    Ok(Application { config, runner, broadcaster, ready })
}

impl Application {
    /// Runs the chat loop and the broadcaster until the transport stream
    /// closes or `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let broadcast =
            self.broadcaster.map(|broadcaster| broadcaster.spawn(self.ready.clone(), stop_rx));
        if broadcast.is_none() {
            warn!(
                event_name = "system.server.broadcast_disabled",
                correlation_id = "bootstrap",
                "daily quote broadcast is disabled"
            );
        }

        tokio::select! {
            result = self.runner.start() => {
                result?;
                info!(
                    event_name = "system.server.transport_closed",
                    correlation_id = "shutdown",
                    "chat transport finished"
                );
            }
            () = shutdown => {
                info!(
                    event_name = "system.server.stopping",
                    correlation_id = "shutdown",
                    "shutdown requested"
                );
            }
        }

        stop_tx.send_replace(true);
        if let Some(handle) = broadcast {
            handle.join().await;
        }
        Ok(())
    }
}
