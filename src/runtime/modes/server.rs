//! Server mode
//!
//! 组装 HTTP 服务器并在退出后停止后台任务。

use std::time::Duration;

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::{self, TrustedProxies};
use crate::config::StaticConfig;
use crate::runtime::lifetime;

/// 运行 HTTP 服务器，直到收到停止信号
///
/// 日志系统必须在调用前初始化。
pub async fn run_server(config: StaticConfig) -> Result<()> {
    let startup = lifetime::prepare_server_startup(&config)
        .await
        .inspect_err(|e| tracing::error!("Server startup failed: {:#}", e))?;

    let trusted_proxies = config.server.trusted_proxies.clone();
    if trusted_proxies.is_empty() {
        warn!(
            "Client IP: auto-detect mode enabled. \
             Connections from private IPs will use X-Forwarded-For. \
             To disable, configure server.trusted_proxies explicitly."
        );
    } else {
        info!("Client IP: trusted proxies configured: {:?}", trusted_proxies);
    }
    let rate_limit = api::auth_rate_limit(&trusted_proxies)?;

    let auth = web::Data::from(startup.auth.clone());
    let links = web::Data::from(startup.links.clone());
    let stats = web::Data::from(startup.stats.clone());
    let pipeline = web::Data::new(startup.pipeline.clone());
    let proxies = web::Data::new(TrustedProxies(trusted_proxies));

    let workers = if config.server.workers == 0 {
        num_cpus::get()
    } else {
        config.server.workers
    };

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .wrap(DefaultHeaders::new().add(("Cache-Control", "no-cache, no-store, must-revalidate")))
            .app_data(auth.clone())
            .app_data(links.clone())
            .app_data(stats.clone())
            .app_data(pipeline.clone())
            .app_data(proxies.clone())
            .app_data(web::JsonConfig::default().limit(64 * 1024))
            .configure(|cfg| api::configure(cfg, &rate_limit))
    })
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_millis(5000))
    .shutdown_timeout(config.server.shutdown_timeout_secs)
    .workers(workers);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{} ({} workers)", bind_address, workers);

    server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run()
        .await
        .context("HTTP server error")?;

    info!("HTTP server stopped, shutting down background tasks...");
    lifetime::shutdown_background_tasks(
        startup.background,
        Duration::from_secs(config.server.shutdown_timeout_secs.max(1)),
    )
    .await;

    Ok(())
}
