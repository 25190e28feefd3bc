use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkpulseError {
    InvalidEmail,
    EmailExists,
    InvalidPassword,
    InvalidCredentials,
    InvalidRefreshToken,
    RefreshTokenExpired,
    InvalidAccessToken,
    ResetCodeNotFound,
    ResetCodeExpired,
    LinkNotFound,
    Unauthorized,
    InvalidUrl,
    Validation(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Hashing(String),
    TokenIssue(String),
    Notification(String),
    Serialization(String),
}

impl LinkpulseError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            LinkpulseError::InvalidEmail => "E001",
            LinkpulseError::EmailExists => "E002",
            LinkpulseError::InvalidPassword => "E003",
            LinkpulseError::InvalidCredentials => "E004",
            LinkpulseError::InvalidRefreshToken => "E005",
            LinkpulseError::RefreshTokenExpired => "E006",
            LinkpulseError::InvalidAccessToken => "E007",
            LinkpulseError::ResetCodeNotFound => "E008",
            LinkpulseError::ResetCodeExpired => "E009",
            LinkpulseError::LinkNotFound => "E010",
            LinkpulseError::Unauthorized => "E011",
            LinkpulseError::InvalidUrl => "E012",
            LinkpulseError::Validation(_) => "E013",
            LinkpulseError::DatabaseConfig(_) => "E014",
            LinkpulseError::DatabaseConnection(_) => "E015",
            LinkpulseError::DatabaseOperation(_) => "E016",
            LinkpulseError::Hashing(_) => "E017",
            LinkpulseError::TokenIssue(_) => "E018",
            LinkpulseError::Notification(_) => "E019",
            LinkpulseError::Serialization(_) => "E020",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            LinkpulseError::InvalidEmail
            | LinkpulseError::EmailExists
            | LinkpulseError::InvalidPassword
            | LinkpulseError::InvalidUrl
            | LinkpulseError::Validation(_) => "Validation Error",
            LinkpulseError::InvalidCredentials
            | LinkpulseError::InvalidRefreshToken
            | LinkpulseError::RefreshTokenExpired
            | LinkpulseError::InvalidAccessToken
            | LinkpulseError::ResetCodeNotFound
            | LinkpulseError::ResetCodeExpired
            | LinkpulseError::Unauthorized => "Authorization Error",
            LinkpulseError::LinkNotFound => "Resource Not Found",
            LinkpulseError::DatabaseConfig(_) => "Database Configuration Error",
            LinkpulseError::DatabaseConnection(_) => "Database Connection Error",
            LinkpulseError::DatabaseOperation(_) => "Database Operation Error",
            LinkpulseError::Hashing(_) => "Credential Hashing Error",
            LinkpulseError::TokenIssue(_) => "Token Error",
            LinkpulseError::Notification(_) => "Notification Error",
            LinkpulseError::Serialization(_) => "Serialization Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            LinkpulseError::InvalidEmail => "invalid email address",
            LinkpulseError::EmailExists => "email is already registered",
            LinkpulseError::InvalidPassword => "password must be at least 8 characters",
            LinkpulseError::InvalidCredentials => "invalid credentials",
            LinkpulseError::InvalidRefreshToken => "invalid refresh token",
            LinkpulseError::RefreshTokenExpired => "refresh token expired",
            LinkpulseError::InvalidAccessToken => "invalid or expired access token",
            LinkpulseError::ResetCodeNotFound => "invalid reset code or email",
            LinkpulseError::ResetCodeExpired => "reset code expired",
            LinkpulseError::LinkNotFound => "link not found",
            LinkpulseError::Unauthorized => "not authorized to view these analytics",
            LinkpulseError::InvalidUrl => "invalid destination URL",
            LinkpulseError::Validation(msg)
            | LinkpulseError::DatabaseConfig(msg)
            | LinkpulseError::DatabaseConnection(msg)
            | LinkpulseError::DatabaseOperation(msg)
            | LinkpulseError::Hashing(msg)
            | LinkpulseError::TokenIssue(msg)
            | LinkpulseError::Notification(msg)
            | LinkpulseError::Serialization(msg) => msg,
        }
    }

    /// 映射到 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            LinkpulseError::InvalidEmail
            | LinkpulseError::InvalidPassword
            | LinkpulseError::InvalidUrl
            | LinkpulseError::Validation(_) => StatusCode::BAD_REQUEST,
            LinkpulseError::EmailExists => StatusCode::CONFLICT,
            LinkpulseError::InvalidCredentials
            | LinkpulseError::InvalidRefreshToken
            | LinkpulseError::RefreshTokenExpired
            | LinkpulseError::InvalidAccessToken
            | LinkpulseError::ResetCodeNotFound
            | LinkpulseError::ResetCodeExpired => StatusCode::UNAUTHORIZED,
            LinkpulseError::Unauthorized => StatusCode::FORBIDDEN,
            LinkpulseError::LinkNotFound => StatusCode::NOT_FOUND,
            LinkpulseError::Notification(_) => StatusCode::BAD_GATEWAY,
            LinkpulseError::DatabaseConfig(_)
            | LinkpulseError::DatabaseConnection(_)
            | LinkpulseError::DatabaseOperation(_)
            | LinkpulseError::Hashing(_)
            | LinkpulseError::TokenIssue(_)
            | LinkpulseError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 是否为可直接展示给调用方的错误（内部错误只返回通用消息）
    pub fn is_client_facing(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// 格式化为彩色输出（用于启动失败）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for LinkpulseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for LinkpulseError {}

// 便捷的构造函数
impl LinkpulseError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        LinkpulseError::Validation(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        LinkpulseError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        LinkpulseError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        LinkpulseError::DatabaseOperation(msg.into())
    }

    pub fn hashing<T: Into<String>>(msg: T) -> Self {
        LinkpulseError::Hashing(msg.into())
    }

    pub fn token_issue<T: Into<String>>(msg: T) -> Self {
        LinkpulseError::TokenIssue(msg.into())
    }

    pub fn notification<T: Into<String>>(msg: T) -> Self {
        LinkpulseError::Notification(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for LinkpulseError {
    fn from(err: sea_orm::DbErr) -> Self {
        LinkpulseError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for LinkpulseError {
    fn from(err: serde_json::Error) -> Self {
        LinkpulseError::Serialization(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for LinkpulseError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        LinkpulseError::TokenIssue(err.to_string())
    }
}

impl From<crate::utils::password::PasswordError> for LinkpulseError {
    fn from(err: crate::utils::password::PasswordError) -> Self {
        LinkpulseError::Hashing(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LinkpulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failures_share_one_surface() {
        let err = LinkpulseError::InvalidCredentials;
        assert_eq!(err.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "invalid credentials");
    }

    #[test]
    fn test_internal_errors_are_not_client_facing() {
        assert!(!LinkpulseError::database_operation("boom").is_client_facing());
        assert!(!LinkpulseError::hashing("boom").is_client_facing());
        assert!(LinkpulseError::Unauthorized.is_client_facing());
        assert!(LinkpulseError::EmailExists.is_client_facing());
    }

    #[test]
    fn test_formatting_includes_code_and_message() {
        let err = LinkpulseError::database_config("database_url 未设置");
        assert_eq!(
            err.format_simple(),
            "Database Configuration Error: database_url 未设置"
        );
        let colored = err.format_colored();
        assert!(colored.contains("E014"));
        assert!(colored.contains("database_url 未设置"));
    }

    #[test]
    fn test_codes_are_unique() {
        let all = [
            LinkpulseError::InvalidEmail,
            LinkpulseError::EmailExists,
            LinkpulseError::InvalidPassword,
            LinkpulseError::InvalidCredentials,
            LinkpulseError::InvalidRefreshToken,
            LinkpulseError::RefreshTokenExpired,
            LinkpulseError::InvalidAccessToken,
            LinkpulseError::ResetCodeNotFound,
            LinkpulseError::ResetCodeExpired,
            LinkpulseError::LinkNotFound,
            LinkpulseError::Unauthorized,
            LinkpulseError::InvalidUrl,
            LinkpulseError::validation("x"),
            LinkpulseError::database_config("x"),
            LinkpulseError::database_connection("x"),
            LinkpulseError::database_operation("x"),
            LinkpulseError::hashing("x"),
            LinkpulseError::token_issue("x"),
            LinkpulseError::notification("x"),
            LinkpulseError::Serialization("x".to_string()),
        ];
        let mut codes: Vec<&str> = all.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
