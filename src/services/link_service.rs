//! 短链接创建与解析

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::LinksConfig;
use crate::errors::{LinkpulseError, Result};
use crate::storage::{AccountId, LinkStore, ShortLink};
use crate::utils::{Clock, generate_random_code, is_valid_short_code};

/// 生成短码时的最大尝试次数
const MAX_CODE_ATTEMPTS: usize = 8;

#[derive(Clone)]
pub struct LinkService {
    store: Arc<dyn LinkStore>,
    clock: Arc<dyn Clock>,
    code_length: usize,
    management_token_length: usize,
    ttl: Duration,
    base_url: String,
}

impl LinkService {
    pub fn new(config: &LinksConfig, store: Arc<dyn LinkStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            code_length: config.code_length,
            management_token_length: config.management_token_length,
            ttl: Duration::days(config.default_ttl_days),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 创建短链接
    ///
    /// 返回的链接包含管理令牌，之后不会再次返回。
    pub async fn create_link(
        &self,
        destination: &str,
        owner: Option<AccountId>,
    ) -> Result<ShortLink> {
        let destination = validate_destination(destination)?;
        let now = self.clock.now();

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_random_code(self.code_length);
            if self.store.find_by_code(&code).await?.is_some() {
                debug!("Short code collision on attempt {}", attempt);
                continue;
            }

            let link = ShortLink {
                code,
                destination_url: destination.clone(),
                management_token: generate_random_code(self.management_token_length),
                owner_id: owner.clone(),
                expires_at: Some(now + self.ttl),
                created_at: now,
                updated_at: now,
            };

            match self.store.create(&link).await {
                Ok(()) => {
                    info!(
                        "Link created: {} (owner: {})",
                        link.code,
                        link.owner_id.as_deref().unwrap_or("anonymous")
                    );
                    return Ok(link);
                }
                // 并发插入了同一个短码
                Err(LinkpulseError::Validation(msg)) => {
                    debug!("Short code insert rejected on attempt {}: {}", attempt, msg);
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            "Failed to allocate a short code after {} attempts",
            MAX_CODE_ATTEMPTS
        );
        Err(LinkpulseError::validation(
            "could not allocate a unique short code",
        ))
    }

    /// 查找可跳转的链接；不存在或已过期均视为不存在
    pub async fn resolve(&self, code: &str) -> Result<ShortLink> {
        if !is_valid_short_code(code) {
            return Err(LinkpulseError::LinkNotFound);
        }

        let link = self
            .store
            .find_by_code(code)
            .await?
            .ok_or(LinkpulseError::LinkNotFound)?;

        if link.is_expired(self.clock.now()) {
            debug!("Link {} has expired", code);
            return Err(LinkpulseError::LinkNotFound);
        }

        Ok(link)
    }

    pub fn short_url(&self, link: &ShortLink) -> String {
        format!("{}/{}", self.base_url, link.code)
    }

    /// 统计页地址，凭管理令牌以 `?token=` 访问
    pub fn stats_url(&self, link: &ShortLink) -> String {
        format!("{}/api/links/{}/stats", self.base_url, link.code)
    }
}

/// 只接受带主机名的 http / https 地址
fn validate_destination(destination: &str) -> Result<String> {
    let destination = destination.trim();
    if destination.is_empty() {
        return Err(LinkpulseError::InvalidUrl);
    }

    let url = Url::parse(destination).map_err(|_| LinkpulseError::InvalidUrl)?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none_or(str::is_empty) {
        return Err(LinkpulseError::InvalidUrl);
    }

    Ok(destination.to_string())
}
