//! `captcha-dispatch` server entry point.
//!
//! Startup order:
//! 1. Read configuration from `DISPATCH_*` variables.
//! 2. Initialise structured tracing.
//! 3. Open the `PostgreSQL` pool and optionally apply the schema.
//! 4. Connect the Redis Streams publisher and consumer.
//! 5. Spawn the queue reconciler.
//! 6. Serve HTTP and WebSocket traffic until SIGINT or SIGTERM.

use captcha_dispatch::account::{
    adapters::postgres::PostgresAccountDirectory, ports::AccountDirectory,
};
use captcha_dispatch::config::Config;
use captcha_dispatch::server::{AppState, router};
use captcha_dispatch::session::SessionRunner;
use captcha_dispatch::task::{
    adapters::{
        postgres::{PostgresTaskStore, TaskPgPool, apply_schema},
        redis::{RedisTaskConsumer, RedisTaskPublisher},
    },
    ports::{TaskConsumer, TaskPublisher, TaskQueueError, TaskStore, TaskStoreError},
    services::{QueueReconciler, TaskCoordinator},
};
use captcha_dispatch::telemetry;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use mockable::DefaultClock;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use tracing_subscriber::util::TryInitError;

/// Failures that prevent the server from starting or stopping cleanly.
#[derive(Debug, Error)]
enum StartupError {
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TryInitError),

    #[error("invalid bind address {address}: {source}")]
    BindAddress {
        address: String,
        source: AddrParseError,
    },

    #[error("failed to open database pool: {0}")]
    Pool(#[from] PoolError),

    #[error("database pool setup was interrupted: {0}")]
    PoolSetup(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Store(#[from] TaskStoreError),

    #[error(transparent)]
    Queue(#[from] TaskQueueError),

    #[error("server i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = Config::from_env();

    let (filter, filter_problem) = telemetry::resolve_filter(&config.log_level);
    telemetry::init(filter, config.log_json)?;
    if let Some(problem) = filter_problem {
        warn!(filter = %config.log_level, error = %problem, "invalid log filter, using info");
    }
    info!(version = env!("CARGO_PKG_VERSION"), "captcha-dispatch starting");

    let pool = open_pool(&config).await?;
    if config.apply_schema {
        apply_schema(&pool).await?;
        info!("database schema applied");
    }

    let store: Arc<dyn TaskStore> = Arc::new(PostgresTaskStore::new(pool.clone()));
    let directory: Arc<dyn AccountDirectory> = Arc::new(PostgresAccountDirectory::new(pool));
    let publisher: Arc<dyn TaskPublisher> =
        Arc::new(RedisTaskPublisher::connect(&config.queue).await?);
    let consumer: Arc<dyn TaskConsumer> =
        Arc::new(RedisTaskConsumer::connect(config.queue.clone()).await?);
    info!(stream = %config.queue.stream_key, group = %config.queue.consumer_group, "queue ready");

    let clock = Arc::new(DefaultClock);
    let coordinator = TaskCoordinator::new(Arc::clone(&store), publisher, Arc::clone(&clock))
        .with_publish_timeout(config.publish_timeout);
    let sessions = SessionRunner::new(Arc::clone(&directory), coordinator.clone())
        .with_auth_timeout(config.auth_timeout);
    let state = Arc::new(AppState::new(coordinator, directory).with_sessions(sessions));

    let (stop_reconciler, stopped) = oneshot::channel::<()>();
    let reconciler = QueueReconciler::new(store, consumer, clock);
    let reconciler_task = tokio::spawn(async move {
        reconciler
            .run(async move {
                if stopped.await.is_err() {
                    debug!("reconciler stop handle dropped");
                }
            })
            .await;
    });

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|source| StartupError::BindAddress {
            address: config.bind_address.clone(),
            source,
        })?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if stop_reconciler.send(()).is_err() {
        debug!("reconciler already stopped");
    }
    if let Err(err) = reconciler_task.await {
        warn!(error = %err, "reconciler task did not finish cleanly");
    }

    info!("captcha-dispatch stopped");
    Ok(())
}

/// Builds the connection pool off the async runtime; r2d2 connects eagerly.
async fn open_pool(config: &Config) -> Result<TaskPgPool, StartupError> {
    let manager = ConnectionManager::<PgConnection>::new(config.database_url.as_str());
    let max_size = config.db_pool_size;
    let pool =
        tokio::task::spawn_blocking(move || Pool::builder().max_size(max_size).build(manager))
            .await??;
    info!(max_size, "database pool ready");
    Ok(pool)
}

/// Resolves when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install CTRL+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => warn!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("shutdown signal received");
}
