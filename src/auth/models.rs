use serde::Serialize;

use crate::storage::{AccountId, AccountView};

/// 登录结果
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub account: AccountView,
    pub access_token: String,
    pub refresh_token: String,
    /// 达到会话上限时是否移除了最早的会话
    pub session_evicted: bool,
}

/// 通过访问令牌认证的调用方
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub account_id: AccountId,
    pub email: String,
}

/// 登录失败的内部原因
///
/// 只用于日志，对外统一为 `InvalidCredentials`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    UnknownAccount,
    Inactive,
    PasswordMismatch,
}

impl LoginFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginFailure::UnknownAccount => "unknown account",
            LoginFailure::Inactive => "account inactive",
            LoginFailure::PasswordMismatch => "password mismatch",
        }
    }
}
