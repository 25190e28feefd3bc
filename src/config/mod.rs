//! 配置管理
//!
//! 启动时加载一次 [`StaticConfig`]，之后按子结构显式传入各组件，
//! 不提供全局配置访问点。

mod structs;

pub use structs::*;

use tracing::warn;

/// 检查并补全签名密钥
///
/// 未配置密钥时生成一个随机值。重启后旧的访问令牌将全部失效，
/// 刷新令牌不受影响（与签名密钥无关）。
pub fn ensure_jwt_secret(auth: &mut AuthConfig) {
    if auth.jwt_secret.trim().is_empty() {
        warn!("JWT secret not configured or empty, generating secure random secret");
        auth.jwt_secret = crate::utils::generate_secure_token(32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_jwt_secret_fills_empty() {
        let mut auth = AuthConfig::default();
        ensure_jwt_secret(&mut auth);
        assert!(auth.jwt_secret.len() >= 32);
    }

    #[test]
    fn test_ensure_jwt_secret_keeps_configured() {
        let mut auth = AuthConfig {
            jwt_secret: "configured".to_string(),
            ..Default::default()
        };
        ensure_jwt_secret(&mut auth);
        assert_eq!(auth.jwt_secret, "configured");
    }
}
