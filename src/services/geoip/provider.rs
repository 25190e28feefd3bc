//! GeoIP Provider 抽象层
//!
//! 根据配置选择实现：
//! 1. 配置了 maxminddb_path 且文件可读 → MaxMindProvider
//! 2. 否则 → ExternalApiProvider

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::external_api::ExternalApiProvider;
use super::maxmind::MaxMindProvider;
use crate::config::AnalyticsConfig;

/// GeoIP 查询 trait
#[async_trait]
pub trait GeoIpLookup: Send + Sync {
    /// 查询 IP 对应的 ISO 3166-1 alpha-2 国家代码，失败返回 `None`
    async fn lookup_country(&self, ip: &str) -> Option<String>;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 根据 AnalyticsConfig 创建 provider
pub fn create_provider(config: &AnalyticsConfig) -> Arc<dyn GeoIpLookup> {
    let external = || -> Arc<dyn GeoIpLookup> {
        Arc::new(ExternalApiProvider::new(
            &config.geoip_api_url,
            Duration::from_millis(config.geoip_timeout_ms),
        ))
    };

    let provider = match config.maxminddb_path.as_deref().filter(|p| !p.is_empty()) {
        Some(path) => match MaxMindProvider::new(path) {
            Ok(provider) => {
                info!("GeoIP: Using MaxMind database at {}", path);
                Arc::new(provider) as Arc<dyn GeoIpLookup>
            }
            Err(e) => {
                warn!(
                    "GeoIP: Failed to load MaxMind database at {}: {}, falling back to external API",
                    path, e
                );
                external()
            }
        },
        None => {
            debug!("GeoIP: No MaxMind database configured, using external API");
            external()
        }
    };

    info!("GeoIP: Initialized with {} provider", provider.name());
    provider
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_maxmind_file_falls_back_to_external() {
        let config = AnalyticsConfig {
            maxminddb_path: Some("/nonexistent/GeoLite2-Country.mmdb".to_string()),
            ..Default::default()
        };
        assert_eq!(create_provider(&config).name(), "ExternalAPI");
    }

    #[test]
    fn test_default_is_external() {
        assert_eq!(
            create_provider(&AnalyticsConfig::default()).name(),
            "ExternalAPI"
        );
    }
}
