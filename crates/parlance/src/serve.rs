// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parlance serve` command implementation.
//!
//! Opens the SQLite store, builds every configured bot's middleware
//! pipeline, wires the turn processor to the custom endpoint provider,
//! and serves the HTTP gateway until a shutdown signal arrives.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use parlance_config::model::ParlanceConfig;
use parlance_core::{ChatProvider, ConvTurn, ParlanceError, MODEL_PROVIDER_CUSTOM};
use parlance_endpoint::CustomEndpointProvider;
use parlance_engine::{BotRuntime, TurnProcessor};
use parlance_gateway::{start_server, GatewayState};
use parlance_hub::NotificationHub;
use parlance_middleware::{
    FailurePolicy, GeneralOptions, MiddlewareDescriptor, MiddlewarePipeline, MiddlewareRegistry,
};
use parlance_models::ModelRegistry;
use parlance_storage::SqliteStore;

/// Builds the runtime for every configured bot.
///
/// Pipeline construction validates all middleware options, so a bad bot
/// configuration fails startup instead of failing turns later.
fn build_bots(
    config: &ParlanceConfig,
    registry: &MiddlewareRegistry,
) -> Result<Vec<BotRuntime>, ParlanceError> {
    let mut bots = Vec::with_capacity(config.bots.len());
    for bot in &config.bots {
        let descriptors: Vec<MiddlewareDescriptor> = bot
            .middlewares
            .iter()
            .map(|m| MiddlewareDescriptor {
                name: m.name.clone(),
                options: m.options.clone(),
            })
            .collect();

        let policy = FailurePolicy::from_str(&bot.middleware_failure_policy).map_err(|_| {
            ParlanceError::Config(format!(
                "bot {}: unknown middleware failure policy: {}",
                bot.id, bot.middleware_failure_policy
            ))
        })?;

        let general = GeneralOptions {
            bot_id: bot.id,
            app_id: 0,
        };
        let pipeline = MiddlewarePipeline::build(registry, &general, &descriptors, policy)
            .map_err(|e| {
                ParlanceError::Config(format!("bot {}: invalid middleware config: {e}", bot.id))
            })?;

        debug!(
            bot_id = bot.id,
            name = bot.name.as_str(),
            model = bot.model.as_str(),
            middlewares = pipeline.len(),
            "bot pipeline built"
        );
        bots.push(BotRuntime {
            id: bot.id,
            name: bot.name.clone(),
            model: bot.model.clone(),
            pipeline,
        });
    }
    Ok(bots)
}

/// Runs the `parlance serve` command.
///
/// Fails fast on storage or bot configuration problems; after startup the
/// gateway runs until SIGINT or SIGTERM.
pub async fn run_serve(config: ParlanceConfig) -> Result<(), ParlanceError> {
    init_tracing(&config.agent.log_level);

    info!(name = config.agent.name.as_str(), "starting parlance serve");

    let store = SqliteStore::open(&config.storage.database_path).await?;
    info!(
        path = config.storage.database_path.as_str(),
        "sqlite store opened"
    );

    let middleware_registry = MiddlewareRegistry::builtin(&config.search.endpoint);
    let bots = build_bots(&config, &middleware_registry)?;
    info!(bots = bots.len(), "bot pipelines built");

    let models = ModelRegistry::new(Arc::new(store.clone()));

    let mut providers: HashMap<String, Arc<dyn ChatProvider>> = HashMap::new();
    providers.insert(
        MODEL_PROVIDER_CUSTOM.to_string(),
        Arc::new(CustomEndpointProvider::new()),
    );

    let hub = Arc::new(NotificationHub::<ConvTurn>::new());
    let shutdown = install_signal_handler();

    let processor = TurnProcessor::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        models.clone(),
        providers,
        hub,
        bots,
        shutdown.clone(),
    );

    let state = GatewayState {
        processor,
        conversations: Arc::new(store.clone()),
        turns: Arc::new(store.clone()),
        models,
        wait_timeout: Duration::from_secs(config.gateway.wait_timeout_secs),
    };

    tokio::select! {
        result = start_server(&config.gateway.host, config.gateway.port, state) => {
            result?;
        }
        _ = shutdown.cancelled() => {
            info!("shutdown signal received, stopping gateway");
        }
    }

    store.close().await?;
    info!("parlance serve shutdown complete");
    Ok(())
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received. In-flight turn processing observes the token through the
/// processor's shutdown handle.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parlance={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
