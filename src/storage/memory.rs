//! 进程内存储
//!
//! 以 `parking_lot::RwLock` 保护的集合实现全部存储接口，
//! 用于测试以及 `database_url = ":memory:"`。

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{
    Account, ClickEvent, ClickStore, DailyCount, KeyCount, LinkStore, Session, SessionStore,
    ShortLink, UserStore,
};
use crate::errors::{LinkpulseError, Result};

#[derive(Default)]
pub struct MemoryStorage {
    accounts: RwLock<HashMap<String, Account>>,
    /// 按插入顺序保存
    sessions: RwLock<Vec<Session>>,
    links: RwLock<HashMap<String, ShortLink>>,
    clicks: RwLock<Vec<ClickEvent>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已保存的点击事件（按保存顺序）
    pub fn clicks(&self) -> Vec<ClickEvent> {
        self.clicks.read().clone()
    }

    fn top_by_key<F>(&self, code: &str, limit: u64, key: F) -> Vec<KeyCount>
    where
        F: Fn(&ClickEvent) -> &str,
    {
        let clicks = self.clicks.read();
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for event in clicks.iter().filter(|e| e.link_code == code) {
            *counts.entry(key(event)).or_default() += 1;
        }

        let mut rows: Vec<KeyCount> = counts
            .into_iter()
            .map(|(key, count)| KeyCount {
                key: key.to_string(),
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
        rows.truncate(limit as usize);
        rows
    }
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn create(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.write();
        if accounts.values().any(|a| a.email == account.email) {
            return Err(LinkpulseError::EmailExists);
        }
        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.accounts.read().get(id).cloned())
    }

    async fn update(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.write();
        match accounts.get_mut(&account.id) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(LinkpulseError::database_operation(format!(
                "account {} does not exist",
                account.id
            ))),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStorage {
    async fn create(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write();
        if sessions
            .iter()
            .any(|s| s.refresh_token == session.refresh_token)
        {
            return Err(LinkpulseError::database_operation(
                "duplicate refresh token",
            ));
        }
        sessions.push(session.clone());
        Ok(())
    }

    async fn find_by_refresh_token(&self, token: &str) -> Result<Option<Session>> {
        Ok(self
            .sessions
            .read()
            .iter()
            .find(|s| s.refresh_token == token)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().iter().find(|s| s.id == id).cloned())
    }

    async fn find_active_by_account(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>> {
        let mut active: Vec<Session> = self
            .sessions
            .read()
            .iter()
            .filter(|s| s.account_id == account_id && s.is_active(now))
            .cloned()
            .collect();
        // 稳定排序，创建时间相同时保持插入顺序
        active.sort_by_key(|s| s.created_at);
        Ok(active)
    }

    async fn count_by_account(&self, account_id: &str, now: DateTime<Utc>) -> Result<u64> {
        Ok(self
            .sessions
            .read()
            .iter()
            .filter(|s| s.account_id == account_id && s.is_active(now))
            .count() as u64)
    }

    async fn delete_by_account(&self, account_id: &str) -> Result<u64> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|s| s.account_id != account_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_oldest_by_account(&self, account_id: &str) -> Result<bool> {
        let mut sessions = self.sessions.write();
        let oldest = sessions
            .iter()
            .enumerate()
            .filter(|(_, s)| s.account_id == account_id)
            .min_by_key(|(idx, s)| (s.created_at, *idx))
            .map(|(idx, _)| idx);

        Ok(match oldest {
            Some(idx) => {
                sessions.remove(idx);
                true
            }
            None => false,
        })
    }

    async fn delete_expired_by_account(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|s| s.account_id != account_id || s.is_active(now));
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|s| s.is_active(now));
        Ok((before - sessions.len()) as u64)
    }

    async fn has_active_session(&self, account_id: &str, now: DateTime<Utc>) -> Result<bool> {
        Ok(self
            .sessions
            .read()
            .iter()
            .any(|s| s.account_id == account_id && s.is_active(now)))
    }
}

#[async_trait]
impl LinkStore for MemoryStorage {
    async fn create(&self, link: &ShortLink) -> Result<()> {
        let mut links = self.links.write();
        if links.contains_key(&link.code) {
            return Err(LinkpulseError::validation(format!(
                "short code '{}' already exists",
                link.code
            )));
        }
        links.insert(link.code.clone(), link.clone());
        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>> {
        Ok(self.links.read().get(code).cloned())
    }
}

#[async_trait]
impl ClickStore for MemoryStorage {
    async fn save(&self, event: &ClickEvent) -> Result<()> {
        self.clicks.write().push(event.clone());
        Ok(())
    }

    async fn count_by_link(&self, code: &str) -> Result<u64> {
        Ok(self
            .clicks
            .read()
            .iter()
            .filter(|e| e.link_code == code)
            .count() as u64)
    }

    async fn group_by_date(&self, code: &str, limit: u64) -> Result<Vec<DailyCount>> {
        let mut by_date: BTreeMap<String, u64> = BTreeMap::new();
        for event in self.clicks.read().iter().filter(|e| e.link_code == code) {
            *by_date
                .entry(event.clicked_at.format("%Y-%m-%d").to_string())
                .or_default() += 1;
        }

        let skip = by_date.len().saturating_sub(limit as usize);
        Ok(by_date
            .into_iter()
            .skip(skip)
            .map(|(date, count)| DailyCount { date, count })
            .collect())
    }

    async fn group_by_country(&self, code: &str, limit: u64) -> Result<Vec<KeyCount>> {
        Ok(self.top_by_key(code, limit, |e| e.country_code.as_str()))
    }

    async fn group_by_referrer(&self, code: &str, limit: u64) -> Result<Vec<KeyCount>> {
        Ok(self.top_by_key(code, limit, |e| e.referrer.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn click(code: &str, country: &str, referrer: &str, at: DateTime<Utc>) -> ClickEvent {
        ClickEvent {
            link_code: code.to_string(),
            ip_address: "203.0.113.1".to_string(),
            user_agent: "test".to_string(),
            referrer: referrer.to_string(),
            country_code: country.to_string(),
            clicked_at: at,
        }
    }

    #[tokio::test]
    async fn test_delete_oldest_prefers_insertion_order_on_ties() {
        let store = MemoryStorage::new();
        let now = Utc::now();
        let first = Session::new("acc".into(), "rt-1".into(), now, now + Duration::days(7));
        let second = Session::new("acc".into(), "rt-2".into(), now, now + Duration::days(7));
        SessionStore::create(&store, &first).await.unwrap();
        SessionStore::create(&store, &second).await.unwrap();

        assert!(store.delete_oldest_by_account("acc").await.unwrap());
        assert!(store.find_by_refresh_token("rt-1").await.unwrap().is_none());
        assert!(store.find_by_refresh_token("rt-2").await.unwrap().is_some());
        assert!(!store.delete_oldest_by_account("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_not_counted() {
        let store = MemoryStorage::new();
        let now = Utc::now();
        let expired = Session::new("acc".into(), "old".into(), now - Duration::days(8), now);
        let live = Session::new("acc".into(), "new".into(), now, now + Duration::days(7));
        SessionStore::create(&store, &expired).await.unwrap();
        SessionStore::create(&store, &live).await.unwrap();

        assert_eq!(store.count_by_account("acc", now).await.unwrap(), 1);
        assert_eq!(store.delete_expired_by_account("acc", now).await.unwrap(), 1);
        assert_eq!(store.delete_expired(now).await.unwrap(), 0);
        assert!(store.has_active_session("acc", now).await.unwrap());
    }

    #[tokio::test]
    async fn test_email_is_unique_and_case_sensitive() {
        let store = MemoryStorage::new();
        let now = Utc::now();
        let a = Account::new("User@Example.com".into(), "h".into(), "A".into(), now);
        UserStore::create(&store, &a).await.unwrap();

        let dup = Account::new("User@Example.com".into(), "h".into(), "B".into(), now);
        assert_eq!(
            UserStore::create(&store, &dup).await,
            Err(LinkpulseError::EmailExists)
        );
        assert!(store.find_by_email("user@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_click_aggregates() {
        let store = MemoryStorage::new();
        let day = |d: u32| Utc.with_ymd_and_hms(2026, 3, d, 12, 0, 0).unwrap();

        for (country, referrer, d) in [
            ("US", "https://a.com", 1),
            ("US", "https://a.com", 2),
            ("DE", "https://b.com", 2),
            ("BR", "https://b.com", 3),
            ("XX", "", 3),
        ] {
            store.save(&click("abc", country, referrer, day(d))).await.unwrap();
        }
        store.save(&click("other", "US", "", day(3))).await.unwrap();

        assert_eq!(store.count_by_link("abc").await.unwrap(), 5);

        let dates = store.group_by_date("abc", 2).await.unwrap();
        assert_eq!(
            dates,
            vec![
                DailyCount { date: "2026-03-02".into(), count: 2 },
                DailyCount { date: "2026-03-03".into(), count: 2 },
            ]
        );

        let countries = store.group_by_country("abc", 3).await.unwrap();
        let keys: Vec<&str> = countries.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["US", "BR", "DE"]);

        let referrers = store.group_by_referrer("abc", 5).await.unwrap();
        assert_eq!(referrers[0].count, 2);
        assert_eq!(referrers.len(), 3);
    }
}
