use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::analytics::{ClickPipeline, StatsService};
use crate::auth::{AuthService, create_notifier};
use crate::config::StaticConfig;
use crate::services::{GeoResolver, LinkService};
use crate::storage::StorageFactory;
use crate::utils::{Clock, SystemClock};

/// 启动后交给 HTTP 服务器的全部组件
pub struct StartupContext {
    pub auth: Arc<AuthService>,
    pub links: Arc<LinkService>,
    pub stats: Arc<StatsService>,
    pub pipeline: ClickPipeline,
    pub background: BackgroundTasks,
}

/// 后台任务句柄：点击消费者与会话清扫
pub struct BackgroundTasks {
    pub(crate) shutdown_tx: watch::Sender<bool>,
    pub(crate) consumer: JoinHandle<()>,
    pub(crate) sweeper: JoinHandle<()>,
}

/// 准备服务器启动的上下文
///
/// 创建存储、各业务服务与点击管道，并启动后台任务。
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let storage = StorageFactory::create(&config.database)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name);

    let notifier = create_notifier(&config.notification);
    let auth = Arc::new(
        AuthService::new(&config.auth, &storage, notifier, clock.clone())
            .context("Failed to initialize auth service")?,
    );
    let links = Arc::new(LinkService::new(
        &config.links,
        storage.links.clone(),
        clock.clone(),
    ));
    let stats = Arc::new(StatsService::new(
        &config.analytics,
        storage.links.clone(),
        storage.clicks.clone(),
    ));

    let resolver = GeoResolver::from_config(&config.analytics);
    let (pipeline, consumer) = ClickPipeline::new(
        &config.analytics,
        storage.clicks.clone(),
        resolver,
        clock,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = tokio::spawn(consumer.run(shutdown_rx.clone()));
    let sweeper = spawn_session_sweep(
        auth.clone(),
        Duration::from_secs(config.auth.session_sweep_interval_secs),
        shutdown_rx,
    );

    info!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        auth,
        links,
        stats,
        pipeline,
        background: BackgroundTasks {
            shutdown_tx,
            consumer,
            sweeper,
        },
    })
}

/// 定期删除已过期的会话
pub fn spawn_session_sweep(
    auth: Arc<AuthService>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let every = every.max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // 第一次 tick 立即返回，启动时先清扫一次
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            match auth.sweep_expired_sessions().await {
                Ok(0) => debug!("Session sweep: nothing expired"),
                Ok(removed) => info!("Session sweep removed {} expired sessions", removed),
                Err(e) => warn!("Session sweep failed: {}", e),
            }
        }
        debug!("Session sweep stopped");
    })
}
