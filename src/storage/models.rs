//! 存储层数据模型
//!
//! 账户、会话、短链接和点击事件，以及统计查询的结果行。

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub type AccountId = String;

/// 待使用的密码重置码（只保存哈希）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordReset {
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl PasswordReset {
    /// 超过 `expires_at` 后失效
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// 账户
///
/// 包含密码哈希，不实现 `Serialize`；对外返回时使用 [`AccountView`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub is_active: bool,
    pub pending_reset: Option<PasswordReset>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(email: String, password_hash: String, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash,
            name,
            is_active: true,
            pending_reset: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// 去除凭据字段后的账户视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    pub id: AccountId,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 登录会话
///
/// 当前时间早于 `expires_at` 时有效；过期是派生状态，不单独存储。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: String,
    pub account_id: AccountId,
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// 会话 ID 使用 UUIDv7，同一毫秒内创建的会话也能按创建顺序排序
    pub fn new(
        account_id: AccountId,
        refresh_token: String,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            account_id,
            refresh_token,
            expires_at,
            created_at: now,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// 短链接
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortLink {
    pub code: String,
    pub destination_url: String,
    pub management_token: String,
    pub owner_id: Option<AccountId>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShortLink {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// 一次重定向产生的点击事件，持久化后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub link_code: String,
    pub ip_address: String,
    pub user_agent: String,
    pub referrer: String,
    pub country_code: String,
    pub clicked_at: DateTime<Utc>,
}

/// 按日期聚合的点击数（`date` 为 `YYYY-MM-DD`，UTC）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub count: u64,
}

/// 按键（国家 / 来源）聚合的点击数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCount {
    pub key: String,
    pub count: u64,
}
