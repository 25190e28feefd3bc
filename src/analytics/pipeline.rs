//! 点击采集管道
//!
//! 生产端（每个重定向请求）通过有界 mpsc 通道的 `try_send` 投递事件，
//! 缓冲区满时直接丢弃；消费端是单个后台任务，逐条处理，保持出队顺序。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, trace, warn};

use crate::config::AnalyticsConfig;
use crate::services::geoip::GeoResolver;
use crate::storage::{ClickEvent, ClickStore};
use crate::utils::Clock;

/// 管道计数器（生产端与消费端共享）
#[derive(Debug, Default)]
pub struct PipelineCounters {
    accepted: AtomicU64,
    dropped: AtomicU64,
    persisted: AtomicU64,
    failed: AtomicU64,
}

/// 计数器快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineSnapshot {
    pub accepted: u64,
    pub dropped: u64,
    pub persisted: u64,
    pub failed: u64,
}

impl PipelineCounters {
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// 采集入口，可廉价克隆后分发给各个请求处理器
#[derive(Clone)]
pub struct ClickPipeline {
    sender: mpsc::Sender<ClickEvent>,
    clock: Arc<dyn Clock>,
    unknown_country: Arc<str>,
    counters: Arc<PipelineCounters>,
}

/// 后台消费者，由启动流程 spawn 一次
pub struct ClickConsumer {
    receiver: mpsc::Receiver<ClickEvent>,
    store: Arc<dyn ClickStore>,
    resolver: GeoResolver,
    counters: Arc<PipelineCounters>,
}

impl ClickPipeline {
    pub fn new(
        config: &AnalyticsConfig,
        store: Arc<dyn ClickStore>,
        resolver: GeoResolver,
        clock: Arc<dyn Clock>,
    ) -> (Self, ClickConsumer) {
        // mpsc::channel 不接受 0 容量
        let capacity = config.buffer_capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let counters = Arc::new(PipelineCounters::default());

        let pipeline = Self {
            sender,
            clock,
            unknown_country: Arc::from(config.unknown_country.as_str()),
            counters: counters.clone(),
        };
        let consumer = ClickConsumer {
            receiver,
            store,
            resolver,
            counters,
        };

        debug!(
            "ClickPipeline: created with capacity {}, geo provider {}",
            capacity,
            consumer.resolver.provider_name()
        );
        (pipeline, consumer)
    }

    /// 记录一次点击，永不等待
    pub fn track_click(&self, code: &str, ip: &str, user_agent: &str, referrer: &str) {
        let event = ClickEvent {
            link_code: code.to_string(),
            ip_address: ip.to_string(),
            user_agent: user_agent.to_string(),
            referrer: referrer.to_string(),
            country_code: self.unknown_country.to_string(),
            clicked_at: self.clock.now(),
        };

        match self.sender.try_send(event) {
            Ok(()) => {
                self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                trace!("ClickPipeline: queued click for {}", code);
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "ClickPipeline: buffer full, dropping click for {}",
                    event.link_code
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "ClickPipeline: consumer stopped, dropping click for {}",
                    event.link_code
                );
            }
        }
    }

    /// 当前排队（尚未出队）的事件数
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    pub fn counters(&self) -> PipelineSnapshot {
        self.counters.snapshot()
    }
}

impl ClickConsumer {
    /// 消费循环
    ///
    /// 收到停止信号或所有生产端都已释放时退出；
    /// 已出队的事件总会处理完，未出队的事件随进程丢弃。
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("ClickConsumer: started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let event = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                event = self.receiver.recv() => match event {
                    Some(event) => event,
                    None => {
                        debug!("ClickConsumer: all producers gone");
                        break;
                    }
                },
            };

            self.process(event).await;
        }

        let snapshot = self.counters.snapshot();
        info!(
            "ClickConsumer: stopped (persisted: {}, failed: {}, dropped: {}, left in buffer: {})",
            snapshot.persisted,
            snapshot.failed,
            snapshot.dropped,
            self.receiver.len()
        );
    }

    /// 处理单个事件：补全国家代码后持久化，失败只记录日志
    pub async fn process(&self, mut event: ClickEvent) {
        if event.country_code == self.resolver.unknown_country() {
            event.country_code = self.resolver.resolve(&event.ip_address).await;
        }

        match self.store.save(&event).await {
            Ok(()) => {
                self.counters.persisted.fetch_add(1, Ordering::Relaxed);
                trace!(
                    "ClickConsumer: persisted click for {} ({})",
                    event.link_code, event.country_code
                );
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    "ClickConsumer: failed to persist click for {}: {}",
                    event.link_code, e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geoip::GeoIpLookup;
    use crate::storage::MemoryStorage;
    use crate::utils::SystemClock;
    use async_trait::async_trait;

    struct NoLookup;

    #[async_trait]
    impl GeoIpLookup for NoLookup {
        async fn lookup_country(&self, _ip: &str) -> Option<String> {
            Some("FR".to_string())
        }

        fn name(&self) -> &'static str {
            "NoLookup"
        }
    }

    fn build(capacity: usize) -> (ClickPipeline, ClickConsumer, Arc<MemoryStorage>) {
        let config = AnalyticsConfig {
            buffer_capacity: capacity,
            ..Default::default()
        };
        let storage = Arc::new(MemoryStorage::new());
        let resolver = GeoResolver::with_provider(Arc::new(NoLookup), &config);
        let (pipeline, consumer) =
            ClickPipeline::new(&config, storage.clone(), resolver, Arc::new(SystemClock));
        (pipeline, consumer, storage)
    }

    #[tokio::test]
    async fn test_track_click_carries_sentinel_until_consumed() {
        let (pipeline, mut consumer, _) = build(4);
        pipeline.track_click("abc123", "8.8.8.8", "curl/8", "");
        assert_eq!(pipeline.queued(), 1);

        let event = consumer.receiver.recv().await.unwrap();
        assert_eq!(event.country_code, "XX");
        assert_eq!(event.link_code, "abc123");
    }

    #[tokio::test]
    async fn test_full_buffer_drops() {
        let (pipeline, _consumer, _) = build(2);
        for _ in 0..5 {
            pipeline.track_click("abc123", "8.8.8.8", "", "");
        }
        let counters = pipeline.counters();
        assert_eq!(counters.accepted, 2);
        assert_eq!(counters.dropped, 3);
        assert_eq!(pipeline.queued(), 2);
    }

    #[tokio::test]
    async fn test_process_enriches_and_persists() {
        let (pipeline, consumer, storage) = build(4);
        pipeline.track_click("abc123", "8.8.8.8", "", "news.example");
        pipeline.track_click("abc123", "127.0.0.1", "", "");
        drop(pipeline);

        let (_tx, rx) = watch::channel(false);
        consumer.run(rx).await;

        let clicks = storage.clicks();
        assert_eq!(clicks.len(), 2);
        assert_eq!(clicks[0].country_code, "FR");
        assert_eq!(clicks[1].country_code, "EC");
    }

    #[tokio::test]
    async fn test_closed_consumer_drops() {
        let (pipeline, consumer, _) = build(4);
        drop(consumer);
        pipeline.track_click("abc123", "8.8.8.8", "", "");
        assert_eq!(pipeline.counters().dropped, 1);
    }
}
