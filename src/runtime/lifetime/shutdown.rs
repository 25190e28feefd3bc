use std::time::Duration;

use tokio::time::timeout;
use tracing::{error, info, warn};

use super::startup::BackgroundTasks;

/// 停止后台任务
///
/// 消费者会先处理完手上的事件；超过 `limit` 仍未退出则放弃等待。
pub async fn shutdown_background_tasks(tasks: BackgroundTasks, limit: Duration) {
    let BackgroundTasks {
        shutdown_tx,
        consumer,
        sweeper,
    } = tasks;

    if shutdown_tx.send(true).is_err() {
        warn!("Background tasks already stopped");
    }

    match timeout(limit, consumer).await {
        Ok(Ok(())) => info!("Click consumer stopped"),
        Ok(Err(e)) => error!("Click consumer task failed: {}", e),
        Err(_) => error!(
            "Click consumer did not stop within {} seconds",
            limit.as_secs()
        ),
    }

    sweeper.abort();
    info!("All shutdown tasks completed");
}
