//! 点击事件的国家代码解析
//!
//! 回环地址直接返回本地代码，私有或无法解析的地址直接返回哨兵，
//! 只有公网地址才会调用 provider，并受硬超时约束。

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::provider::{GeoIpLookup, create_provider};
use crate::config::AnalyticsConfig;
use crate::utils::ip::{AddressScope, classify_ip};

#[derive(Clone)]
pub struct GeoResolver {
    provider: Arc<dyn GeoIpLookup>,
    timeout: Duration,
    unknown_country: String,
    local_country: String,
}

impl GeoResolver {
    pub fn from_config(config: &AnalyticsConfig) -> Self {
        Self::with_provider(create_provider(config), config)
    }

    pub fn with_provider(provider: Arc<dyn GeoIpLookup>, config: &AnalyticsConfig) -> Self {
        Self {
            provider,
            timeout: Duration::from_millis(config.geoip_timeout_ms),
            unknown_country: config.unknown_country.clone(),
            local_country: config.local_country.clone(),
        }
    }

    pub fn unknown_country(&self) -> &str {
        &self.unknown_country
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// 解析国家代码，永不失败
    pub async fn resolve(&self, ip: &str) -> String {
        match classify_ip(ip) {
            Some(AddressScope::Local) => return self.local_country.clone(),
            Some(AddressScope::NonRoutable) | None => {
                debug!("GeoIP: skipping lookup for non-routable address {:?}", ip);
                return self.unknown_country.clone();
            }
            Some(AddressScope::Public) => {}
        }

        match tokio::time::timeout(self.timeout, self.provider.lookup_country(ip)).await {
            Ok(Some(code)) if !code.trim().is_empty() => code.trim().to_ascii_uppercase(),
            Ok(_) => {
                debug!("GeoIP: {} returned no country for {}", self.provider.name(), ip);
                self.unknown_country.clone()
            }
            Err(_) => {
                debug!(
                    "GeoIP: {} lookup for {} timed out after {:?}",
                    self.provider.name(),
                    ip,
                    self.timeout
                );
                self.unknown_country.clone()
            }
        }
    }
}
