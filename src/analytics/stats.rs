//! 短链接统计查询

use std::sync::Arc;

use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::config::AnalyticsConfig;
use crate::errors::{LinkpulseError, Result};
use crate::storage::{ClickStore, DailyCount, KeyCount, LinkStore, ShortLink};

/// 单个短链接的统计结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub code: String,
    pub total_clicks: u64,
    /// 最近 N 个有点击的日期，升序
    pub clicks_by_date: Vec<DailyCount>,
    pub top_countries: Vec<KeyCount>,
    pub top_referrers: Vec<KeyCount>,
}

#[derive(Clone)]
pub struct StatsService {
    links: Arc<dyn LinkStore>,
    clicks: Arc<dyn ClickStore>,
    date_buckets: u64,
    top_n: u64,
}

impl StatsService {
    pub fn new(
        config: &AnalyticsConfig,
        links: Arc<dyn LinkStore>,
        clicks: Arc<dyn ClickStore>,
    ) -> Self {
        Self {
            links,
            clicks,
            date_buckets: config.stats_date_buckets,
            top_n: config.stats_top_n,
        }
    }

    /// 查询统计
    ///
    /// 调用方需要是链接所有者，或持有正确的管理令牌。
    pub async fn get_stats(
        &self,
        code: &str,
        management_token: Option<&str>,
        account_id: Option<&str>,
    ) -> Result<LinkStats> {
        let link = self
            .links
            .find_by_code(code)
            .await?
            .ok_or(LinkpulseError::LinkNotFound)?;

        if !is_authorized(&link, management_token, account_id) {
            debug!("Stats access denied for {}", code);
            return Err(LinkpulseError::Unauthorized);
        }

        let total_clicks = self.clicks.count_by_link(code).await?;
        let clicks_by_date = self.clicks.group_by_date(code, self.date_buckets).await?;
        let top_countries = self.clicks.group_by_country(code, self.top_n).await?;
        let top_referrers = self.clicks.group_by_referrer(code, self.top_n).await?;

        Ok(LinkStats {
            code: link.code,
            total_clicks,
            clicks_by_date,
            top_countries,
            top_referrers,
        })
    }
}

fn is_authorized(link: &ShortLink, management_token: Option<&str>, account_id: Option<&str>) -> bool {
    let owner_matches = matches!(
        (link.owner_id.as_deref(), account_id),
        (Some(owner), Some(caller)) if owner == caller
    );
    if owner_matches {
        return true;
    }

    // 空令牌永远不匹配
    match management_token {
        Some(token) if !token.is_empty() && !link.management_token.is_empty() => {
            bool::from(token.as_bytes().ct_eq(link.management_token.as_bytes()))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn link(owner: Option<&str>) -> ShortLink {
        let now = Utc::now();
        ShortLink {
            code: "abc123".to_string(),
            destination_url: "https://example.com".to_string(),
            management_token: "tok-0123456789ab".to_string(),
            owner_id: owner.map(String::from),
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_owner_is_authorized() {
        assert!(is_authorized(&link(Some("acc-1")), None, Some("acc-1")));
        assert!(!is_authorized(&link(Some("acc-1")), None, Some("acc-2")));
        assert!(!is_authorized(&link(None), None, Some("acc-1")));
    }

    #[test]
    fn test_management_token_is_authorized() {
        assert!(is_authorized(&link(None), Some("tok-0123456789ab"), None));
        assert!(is_authorized(&link(Some("acc-1")), Some("tok-0123456789ab"), Some("acc-2")));
        assert!(!is_authorized(&link(None), Some("tok-0123456789aB"), None));
        assert!(!is_authorized(&link(None), Some("tok"), None));
        assert!(!is_authorized(&link(None), Some(""), None));
        assert!(!is_authorized(&link(None), None, None));
    }

    #[test]
    fn test_empty_stored_token_never_matches() {
        let mut l = link(None);
        l.management_token.clear();
        assert!(!is_authorized(&l, Some(""), None));
    }
}
