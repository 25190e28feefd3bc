//! 持久化层
//!
//! 四个存储接口（账户、会话、短链接、点击），以及两种实现：
//! 进程内的 [`MemoryStorage`] 和基于 SeaORM 的 [`SeaOrmStorage`]。
//! 与时间相关的查询都显式接收 `now`，存储层本身不读取时钟。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::DatabaseConfig;
use crate::errors::Result;

pub mod backend;
pub mod memory;
pub mod models;

pub use backend::SeaOrmStorage;
pub use memory::MemoryStorage;
pub use models::{
    Account, AccountId, AccountView, ClickEvent, DailyCount, KeyCount, PasswordReset, Session,
    ShortLink,
};

/// 账户存储
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 创建账户；邮箱已存在时返回 `EmailExists`
    async fn create(&self, account: &Account) -> Result<()>;
    /// 按邮箱精确查找（区分大小写）
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Account>>;
    async fn update(&self, account: &Account) -> Result<()>;
}

/// 会话存储
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: &Session) -> Result<()>;
    async fn find_by_refresh_token(&self, token: &str) -> Result<Option<Session>>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Session>>;
    /// 未过期的会话，按创建时间升序
    async fn find_active_by_account(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>>;
    /// 未过期的会话数量
    async fn count_by_account(&self, account_id: &str, now: DateTime<Utc>) -> Result<u64>;
    /// 删除账户的全部会话，返回删除数量
    async fn delete_by_account(&self, account_id: &str) -> Result<u64>;
    /// 删除账户最早创建的一个会话，返回是否删除
    async fn delete_oldest_by_account(&self, account_id: &str) -> Result<bool>;
    async fn delete_expired_by_account(&self, account_id: &str, now: DateTime<Utc>)
    -> Result<u64>;
    /// 全局清扫过期会话
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
    async fn has_active_session(&self, account_id: &str, now: DateTime<Utc>) -> Result<bool>;
}

/// 短链接存储
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// 创建短链接；短码冲突时返回 `Validation`
    async fn create(&self, link: &ShortLink) -> Result<()>;
    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>>;
}

/// 点击事件存储与聚合查询
#[async_trait]
pub trait ClickStore: Send + Sync {
    async fn save(&self, event: &ClickEvent) -> Result<()>;
    async fn count_by_link(&self, code: &str) -> Result<u64>;
    /// 最近 `limit` 个有点击的日期，按日期升序
    async fn group_by_date(&self, code: &str, limit: u64) -> Result<Vec<DailyCount>>;
    /// 点击数最多的国家，次数降序，相同次数按键升序
    async fn group_by_country(&self, code: &str, limit: u64) -> Result<Vec<KeyCount>>;
    /// 点击数最多的来源，排序规则同上
    async fn group_by_referrer(&self, code: &str, limit: u64) -> Result<Vec<KeyCount>>;
}

/// 同一个存储实现的四个接口句柄
#[derive(Clone)]
pub struct StorageHandles {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub links: Arc<dyn LinkStore>,
    pub clicks: Arc<dyn ClickStore>,
    pub backend_name: String,
}

impl StorageHandles {
    pub fn from_backend<S>(storage: Arc<S>, backend_name: &str) -> Self
    where
        S: UserStore + SessionStore + LinkStore + ClickStore + 'static,
    {
        Self {
            users: storage.clone(),
            sessions: storage.clone(),
            links: storage.clone(),
            clicks: storage,
            backend_name: backend_name.to_string(),
        }
    }

    /// 进程内存储，用于测试和 `:memory:` 配置
    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(MemoryStorage::new()), "memory")
    }
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &DatabaseConfig) -> Result<StorageHandles> {
        let database_url = config.database_url.trim();

        if database_url == ":memory:" {
            warn!("Using in-memory storage, data will be lost on restart");
            return Ok(StorageHandles::in_memory());
        }

        // 从 URL 自动推断数据库类型
        let backend_type = backend::infer_backend_from_url(database_url)?;
        let storage = SeaOrmStorage::new(config, &backend_type).await?;
        Ok(StorageHandles::from_backend(Arc::new(storage), &backend_type))
    }
}
