//! chat-at-home server entry point.
//!
//! Loads configuration, wires the adapters into the application layer,
//! starts the background worker and serves the HTTP API until shutdown.

use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tokio::{net::TcpListener, signal, sync::watch};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

use chat_at_home::adapters::ai::{OpenAIConfig, OpenAIProvider};
use chat_at_home::adapters::auth::{JwtConfig, JwtSessionValidator};
use chat_at_home::adapters::clerk::{WebhookError, WebhookVerifier};
use chat_at_home::adapters::http::{build_router, AppState, RouterOptions};
use chat_at_home::adapters::memory::{
    InMemoryChatStore, InMemoryMemoryStore, InMemoryUserRepository,
};
use chat_at_home::adapters::postgres::{
    PostgresChatStore, PostgresMemoryStore, PostgresUserRepository,
};
use chat_at_home::adapters::scheduler::{TaskWorker, TokioTaskScheduler};
use chat_at_home::adapters::tools::{SandboxClient, SandboxConfig, TavilyClient, TavilyConfig};
use chat_at_home::adapters::websocket::{NotifyingChatStore, RoomManager, WebSocketState};
use chat_at_home::application::chat::ChatOrchestrator;
use chat_at_home::application::handlers::{BackgroundTaskHandler, UserAccessHandler};
use chat_at_home::application::memory::{IndexMemoriesHandler, MemorySearch};
use chat_at_home::application::tools::build_registry;
use chat_at_home::config::{AppConfig, ConfigError, DatabaseConfig, ValidationError};
use chat_at_home::domain::user::AccessPolicy;
use chat_at_home::ports::{
    AIError, BackendError, ChatStore, MemoryStore, SandboxBackend, UserRepository, WebSearch,
};

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("AI provider: {0}")]
    Ai(#[from] AIError),

    #[error("tool back-end: {0}")]
    Tools(#[from] BackendError),

    #[error("webhook secret: {0}")]
    Webhook(#[from] WebhookError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

struct Stores {
    chats: Arc<dyn ChatStore>,
    memories: Arc<dyn MemoryStore>,
    users: Arc<dyn UserRepository>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!(error = %e, "Startup failed");
        eprintln!("chat-at-home: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting chat-at-home"
    );

    let stores = connect_stores(&config.database).await?;
    let rooms = Arc::new(RoomManager::with_default_capacity());
    let chats: Arc<dyn ChatStore> = Arc::new(NotifyingChatStore::new(
        stores.chats,
        rooms.clone(),
    ));

    // Model access
    let openai = Arc::new(OpenAIProvider::new(
        OpenAIConfig::new(config.ai.openai_api_key.expose_secret())
            .with_chat_model(&config.ai.chat_model)
            .with_embedding_model(&config.ai.embedding_model, config.ai.embedding_dimensions)
            .with_base_url(&config.ai.openai_base_url)
            .with_timeout(config.ai.request_timeout())
            .with_max_retries(config.ai.max_retries),
    )?);

    // Tools
    let web_search: Option<Arc<dyn WebSearch>> = match config.tools.tavily_api_key() {
        Some(key) => Some(Arc::new(TavilyClient::new(
            TavilyConfig::new(key).with_base_url(&config.tools.tavily_base_url),
        )?)),
        None => {
            info!("Tavily not configured; web search tools disabled");
            None
        }
    };
    let sandbox: Option<Arc<dyn SandboxBackend>> = match config.tools.sandbox() {
        Some((url, secret)) => Some(Arc::new(SandboxClient::new(
            SandboxConfig::new(url, secret).with_timeout(config.tools.sandbox_timeout()),
        )?)),
        None => {
            info!("Sandbox not configured; sandbox tools disabled");
            None
        }
    };

    let memory_search = Arc::new(MemorySearch::new(
        openai.clone(),
        stores.memories.clone(),
        chats.clone(),
        stores.users.clone(),
    ));
    let registry = Arc::new(build_registry(memory_search, web_search, sandbox));
    info!(tools = ?registry.names(), "Tool registry ready");

    // Background work
    let (scheduler, queue) = TokioTaskScheduler::channel();
    let scheduler = Arc::new(scheduler);
    let orchestrator = Arc::new(
        ChatOrchestrator::new(openai.clone(), chats.clone(), registry)
            .with_memory_queue(stores.memories.clone(), scheduler.clone()),
    );
    let indexer = Arc::new(IndexMemoriesHandler::new(
        openai,
        stores.memories.clone(),
        chats.clone(),
    ));
    let background = Arc::new(BackgroundTaskHandler::new(orchestrator, indexer));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(TaskWorker::new(queue, background).run(shutdown_rx));

    // HTTP
    let mut jwt = JwtConfig::new(config.auth.jwt_secret.expose_secret());
    if let Some(issuer) = &config.auth.jwt_issuer {
        jwt = jwt.with_issuer(issuer);
    }
    if let Some(audience) = &config.auth.jwt_audience {
        jwt = jwt.with_audience(audience);
    }
    let sessions = Arc::new(JwtSessionValidator::new(jwt));
    let access = Arc::new(UserAccessHandler::new(
        stores.users.clone(),
        AccessPolicy::new(config.auth.allowed_domain.clone()),
    ));
    let webhook = Arc::new(WebhookVerifier::new(
        config.auth.webhook_secret.expose_secret(),
        config.auth.webhook_tolerance(),
    )?);

    let state = AppState {
        store: chats.clone(),
        memories: stores.memories,
        users: stores.users,
        scheduler,
        sessions: sessions.clone(),
        access: access.clone(),
        webhook,
    };
    let live = WebSocketState {
        rooms,
        store: chats,
        sessions,
        access,
    };
    let router = build_router(
        state,
        live,
        RouterOptions {
            cors_origins: config.server.cors_origins_list(),
            request_timeout: config.server.request_timeout(),
        },
    );

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let in-flight chat runs finish before exiting.
    let _ = shutdown_tx.send(true);
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "Task worker panicked");
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact())
            .init();
    }
}

async fn connect_stores(database: &DatabaseConfig) -> Result<Stores, StartupError> {
    let Some(url) = database.url() else {
        tracing::warn!("No database URL configured; using in-memory stores");
        return Ok(Stores {
            chats: Arc::new(InMemoryChatStore::new()),
            memories: Arc::new(InMemoryMemoryStore::new()),
            users: Arc::new(InMemoryUserRepository::new()),
        });
    };

    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.connect_timeout())
        .connect(url)
        .await?;

    if database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    Ok(Stores {
        chats: Arc::new(PostgresChatStore::new(pool.clone())),
        memories: Arc::new(PostgresMemoryStore::new(pool.clone())),
        users: Arc::new(PostgresUserRepository::new(pool)),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
