//! Todocore daemon - Main Entry Point
//! Runs the deadline reminder worker and the dependency health prober.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use todocore_core::application::{
    shutdown_channel, BrokerProbe, ChatAlerter, DeadlineReminderHandler, EmailNotifier,
    HandlerRegistry, HealthProber, JobStoreProbe, Probe, RecoveryService, Worker,
};
use todocore_core::port::id_provider::UuidProvider;
use todocore_core::port::time_provider::SystemTimeProvider;
use todocore_core::port::{BrokerClient, JobStore, QueueBackend, WorkQueue};
use todocore_daemon::settings::AppConfig;
use todocore_daemon::{logging, wiring};
use todocore_infra_notify::{HttpTaskDirectory, SmtpMailTransport, SmtpSettings, TelegramBot};
use todocore_infra_redis::{LazyConnection, RedisJobStore, RedisStreamBroker};
use todocore_infra_sqlite::{create_pool, run_migrations, SqliteWorkQueue};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = AppConfig::load().context("configuration")?;

    // 2. Initialize logging; the guard flushes the log file on exit
    let _log_guard = logging::init_logging(&config.log, &config.log_dir())?;
    info!("Todocore daemon v{} starting...", todocore_core::VERSION);

    // 3. Work queue
    let database_path = config.database_path();
    if let Some(dir) = database_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create data directory {}", dir.display()))?;
    }
    let database_url = config.database_url();
    info!(database_url = %database_url, "Initializing work queue...");
    let pool = create_pool(&database_url)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    let time_provider = Arc::new(SystemTimeProvider);
    let queue = Arc::new(SqliteWorkQueue::new(
        pool,
        time_provider.clone(),
        Arc::new(UuidProvider),
    ));

    // 4. Redis: job store and event broker (connect lazily)
    let store_conn = LazyConnection::open(&config.redis.url, config.redis_timeout())
        .context("invalid redis.url")?;
    let job_store: Arc<dyn JobStore> = Arc::new(RedisJobStore::new(Arc::new(store_conn)));

    let broker_conn = LazyConnection::open(&config.broker.url, config.redis_timeout())
        .context("invalid broker.url")?;
    let mut broker = RedisStreamBroker::new(Arc::new(broker_conn));
    if let Some(max_len) = config.broker.max_len {
        broker = broker.with_max_len(max_len);
    }
    let broker: Arc<dyn BrokerClient> = Arc::new(broker);

    // Task lifecycle hooks share the configured lead time and broker settings
    let work_queue: Arc<dyn WorkQueue> = queue.clone();
    let _lifecycle = wiring::task_lifecycle(&config, work_queue, job_store.clone(), broker.clone());
    info!(
        lead_time_secs = config.lead_time().num_seconds(),
        partition_key = %config.broker.partition_key,
        "Task lifecycle hooks configured"
    );

    // 5. Notification channels
    let smtp = SmtpMailTransport::new(&SmtpSettings {
        host: config.mail.smtp_host.clone(),
        port: config.mail.smtp_port,
        username: config.mail.username.clone(),
        password: config.mail.password.clone(),
        starttls: config.mail.starttls,
    })
    .map_err(|e| anyhow::anyhow!("SMTP transport: {}", e))?;
    let notifier = Arc::new(EmailNotifier::new(Arc::new(smtp), config.mail.from.clone()));

    let directory = HttpTaskDirectory::new(&config.tasks_api.base_url, config.tasks_api.token.clone())
        .map_err(|e| anyhow::anyhow!("tasks API client: {}", e))?;

    // 6. Crash recovery
    info!("Running crash recovery...");
    let backend: Arc<dyn QueueBackend> = queue.clone();
    let recovery = RecoveryService::new(
        backend.clone(),
        time_provider.clone(),
        Some(config.queue.recovery_window_ms),
    );
    match recovery.recover_orphaned_jobs().await {
        Ok(count) => info!(recovered_jobs = count, "Crash recovery completed"),
        Err(e) => error!(error = %e, class = e.class(), "Crash recovery failed"),
    }

    // 7. Worker
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let handlers = HandlerRegistry::new().register(Arc::new(DeadlineReminderHandler::new(
        Arc::new(directory),
        notifier,
    )));
    let worker = Worker::new(backend, handlers, time_provider)
        .with_idle_sleep(config.poll_interval());

    info!("Starting worker...");
    let worker_token = shutdown_rx.clone();
    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker.run(worker_token).await {
            error!(error = %e, "Worker failed");
        }
    });

    // 8. Health prober (needs a chat to report to)
    let prober_handle = match (&config.telegram.token, &config.telegram.chat_id) {
        (Some(token), Some(chat_id)) => {
            let bot = TelegramBot::new(&config.telegram.api_base, token, chat_id.clone())
                .map_err(|e| anyhow::anyhow!("Telegram client: {}", e))?;
            let probes: Vec<Arc<dyn Probe>> = vec![
                Arc::new(JobStoreProbe::new(job_store)),
                Arc::new(BrokerProbe::new(broker)),
            ];
            let prober = HealthProber::new(probes, ChatAlerter::new(Arc::new(bot)))
                .with_interval(config.health_interval())
                .with_probe_timeout(config.probe_timeout())
                .with_policy(config.health.alert_policy);

            info!("Starting health prober...");
            Some(tokio::spawn(prober.run(shutdown_rx)))
        }
        _ => {
            warn!("Telegram not configured; health prober disabled");
            None
        }
    };

    info!("System ready. Press Ctrl+C to shutdown");

    // 9. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 10. Graceful shutdown
    shutdown_tx.shutdown();
    if tokio::time::timeout(SHUTDOWN_GRACE, worker_handle).await.is_err() {
        warn!("Worker did not stop within the grace period");
    }
    if let Some(handle) = prober_handle {
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, handle).await;
    }

    info!("Shutdown complete.");
    Ok(())
}
