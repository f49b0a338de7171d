use std::sync::Arc;

use coach_assist::bot::{self, Dispatcher};
use coach_assist::channels::{Channel, ChannelManager, CliChannel, TelegramChannel};
use coach_assist::coaching::Coach;
use coach_assist::config::{CoachConfig, StoreConfig};
use coach_assist::llm::create_provider;
use coach_assist::memory::UserMemory;
use coach_assist::store::{LibSqlStore, MemoryStore, StateStore};
use coach_assist::wizard::WizardEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = CoachConfig::from_env()?;

    eprintln!("🤖 Coach Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);

    let llm = create_provider(&config.llm)?;

    // ── Store ───────────────────────────────────────────────────────────
    let store: Arc<dyn StateStore> = match &config.store {
        StoreConfig::LibSql { path } => {
            eprintln!("   Store: {}", path.display());
            Arc::new(LibSqlStore::new_local(path).await?)
        }
        StoreConfig::Memory => {
            eprintln!("   Store: in-memory (nothing survives a restart)");
            Arc::new(MemoryStore::new())
        }
    };

    // ── Core ────────────────────────────────────────────────────────────
    let coach = Coach::new(
        UserMemory::new(Arc::clone(&store)),
        llm,
        config.defaults.clone(),
    );
    let dispatcher = Arc::new(Dispatcher::new(
        coach,
        WizardEngine::new(store),
        config.admin_policy(),
    ));

    // ── HTTP ────────────────────────────────────────────────────────────
    if let Some(http) = &config.http {
        let port = http.port;
        let app = coach_assist::api::routes(Arc::clone(&dispatcher), http.token.clone());
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        eprintln!("   HTTP: http://0.0.0.0:{port}/api/events");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "HTTP server stopped");
            }
        });
    }

    // ── Channels ────────────────────────────────────────────────────────
    let mut channels = ChannelManager::new();
    if config.cli {
        channels.add(Box::new(CliChannel::default()));
    }

    if let Some(telegram) = &config.telegram {
        eprintln!(
            "   Telegram: enabled (allowed: {})",
            if telegram.allowed_users.iter().any(|u| u == "*") {
                "everyone".to_string()
            } else {
                telegram.allowed_users.join(", ")
            }
        );
        let channel = TelegramChannel::new(
            telegram.bot_token.clone(),
            telegram.allowed_users.clone(),
        );
        if let Err(e) = channel.health_check().await {
            tracing::warn!(error = %e, "Telegram health check failed; polling anyway");
        }
        channels.add(Box::new(channel));
    }

    if channels.names().is_empty() {
        anyhow::ensure!(
            config.http.is_some(),
            "no inbound surface: enable the CLI, Telegram or COACH_HTTP_PORT"
        );
        eprintln!("   Channels: none (HTTP only)\n");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Ctrl+C received, shutting down...");
        return Ok(());
    }

    eprintln!("   Channels: {}\n", channels.names().join(", "));

    bot::run(dispatcher, Arc::new(channels)).await?;
    Ok(())
}
