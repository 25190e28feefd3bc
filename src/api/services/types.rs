//! API 类型定义

use serde::{Deserialize, Serialize};

use crate::errors::LinkpulseError;

/// 统一响应信封
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// API 错误码
///
/// 按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 3000-3099: 链接错误
/// - 5000-5099: 外部依赖错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    InternalServerError = 1005,
    Conflict = 1009,

    AuthFailed = 2000,
    TokenExpired = 2001,
    TokenInvalid = 2002,
    RateLimitExceeded = 2004,
    ResetCodeInvalid = 2010,
    ResetCodeExpired = 2011,

    LinkNotFound = 3000,
    LinkInvalidUrl = 3002,

    NotificationFailed = 5000,
}

impl From<&LinkpulseError> for ErrorCode {
    fn from(err: &LinkpulseError) -> Self {
        match err {
            LinkpulseError::InvalidEmail
            | LinkpulseError::InvalidPassword
            | LinkpulseError::Validation(_) => ErrorCode::BadRequest,
            LinkpulseError::EmailExists => ErrorCode::Conflict,
            LinkpulseError::InvalidCredentials => ErrorCode::AuthFailed,
            LinkpulseError::RefreshTokenExpired => ErrorCode::TokenExpired,
            LinkpulseError::InvalidRefreshToken | LinkpulseError::InvalidAccessToken => {
                ErrorCode::TokenInvalid
            }
            LinkpulseError::ResetCodeNotFound => ErrorCode::ResetCodeInvalid,
            LinkpulseError::ResetCodeExpired => ErrorCode::ResetCodeExpired,
            LinkpulseError::Unauthorized => ErrorCode::Forbidden,
            LinkpulseError::LinkNotFound => ErrorCode::LinkNotFound,
            LinkpulseError::InvalidUrl => ErrorCode::LinkInvalidUrl,
            LinkpulseError::Notification(_) => ErrorCode::NotificationFailed,
            LinkpulseError::DatabaseConfig(_)
            | LinkpulseError::DatabaseConnection(_)
            | LinkpulseError::DatabaseOperation(_)
            | LinkpulseError::Hashing(_)
            | LinkpulseError::TokenIssue(_)
            | LinkpulseError::Serialization(_) => ErrorCode::InternalServerError,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct RefreshResponse {
    pub access_token: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct LogoutResponse {
    pub sessions_removed: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CreateLinkRequest {
    pub url: String,
}

/// 统计查询参数，请求头缺失时使用
#[derive(Deserialize, Clone, Debug, Default)]
pub struct StatsQuery {
    pub token: Option<String>,
}

/// 创建成功后唯一一次返回管理令牌
#[derive(Serialize, Clone, Debug)]
pub struct CreateLinkResponse {
    pub code: String,
    pub short_url: String,
    pub stats_url: String,
    pub destination_url: String,
    pub management_token: String,
    pub expires_at: Option<String>,
}
