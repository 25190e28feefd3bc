//! 认证服务
//!
//! 负责注册、登录、登出、刷新访问令牌、会话上限与密码重置流程。
//! 会话的创建与删除只发生在这里。

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};

use super::models::{AuthenticatedUser, LoginFailure, LoginOutcome};
use super::notifier::Notifier;
use super::token::{TokenIssuer, configured_ttl};
use crate::config::AuthConfig;
use crate::errors::{LinkpulseError, Result};
use crate::storage::{
    Account, AccountView, PasswordReset, Session, SessionStore, StorageHandles, UserStore,
};
use crate::utils::password::CredentialHasher;
use crate::utils::{Clock, is_valid_email};

/// 密码最小长度（字符数）
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// 账户不存在时参与比对的固定明文，使各失败分支耗时一致
const TIMING_DUMMY_SECRET: &str = "linkpulse-timing-dummy";

pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    tokens: TokenIssuer,
    hasher: CredentialHasher,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    dummy_hash: String,
    max_sessions: u64,
    refresh_ttl: Duration,
    reset_code_ttl: Duration,
}

impl AuthService {
    pub fn new(
        config: &AuthConfig,
        storage: &StorageHandles,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let hasher = CredentialHasher::new(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
        )?;
        let refresh_ttl = configured_ttl(
            "refresh_token_days",
            config.refresh_token_days,
            Duration::try_days,
            clock.as_ref(),
        )?;
        let reset_code_ttl = configured_ttl(
            "reset_code_minutes",
            config.reset_code_minutes,
            Duration::try_minutes,
            clock.as_ref(),
        )?;
        let dummy_hash = hasher.hash(TIMING_DUMMY_SECRET)?;

        Ok(Self {
            users: storage.users.clone(),
            sessions: storage.sessions.clone(),
            tokens: TokenIssuer::new(config, clock.clone())?,
            hasher,
            notifier,
            clock,
            dummy_hash,
            max_sessions: config.max_sessions.max(1),
            refresh_ttl,
            reset_code_ttl,
        })
    }

    /// 注册账户，返回不含凭据的视图
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<AccountView> {
        if !is_valid_email(email) {
            return Err(LinkpulseError::InvalidEmail);
        }
        if self.users.find_by_email(email).await?.is_some() {
            return Err(LinkpulseError::EmailExists);
        }
        validate_password(password)?;

        let password_hash = self.hash_secret(password).await?;
        let account = Account::new(
            email.to_string(),
            password_hash,
            name.trim().to_string(),
            self.clock.now(),
        );
        self.users.create(&account).await?;

        info!("Account registered: {}", account.id);
        Ok(account.view())
    }

    /// 登录
    ///
    /// 顺序：清理该账户已过期会话 → 统计剩余会话 → 达到上限时移除最早的一个
    /// → 签发令牌 → 创建新会话。
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let account = match self.check_credentials(email, password).await? {
            Ok(account) => account,
            Err(failure) => {
                debug!("Login rejected for {}: {}", email, failure.as_str());
                return Err(LinkpulseError::InvalidCredentials);
            }
        };

        let now = self.clock.now();
        let purged = self
            .sessions
            .delete_expired_by_account(&account.id, now)
            .await?;
        if purged > 0 {
            debug!(
                "Purged {} expired sessions for account {}",
                purged, account.id
            );
        }

        let active = self.sessions.count_by_account(&account.id, now).await?;
        let mut session_evicted = false;
        if active >= self.max_sessions {
            session_evicted = self.sessions.delete_oldest_by_account(&account.id).await?;
            info!(
                "Session cap ({}) reached for account {}, oldest session evicted",
                self.max_sessions, account.id
            );
        }

        let access_token = self.tokens.issue_access_token(&account)?;
        let refresh_token = self.tokens.generate_refresh_token();
        let session = Session::new(
            account.id.clone(),
            refresh_token.clone(),
            now,
            now + self.refresh_ttl,
        );
        self.sessions.create(&session).await?;

        info!("Account {} logged in", account.id);
        Ok(LoginOutcome {
            account: account.view(),
            access_token,
            refresh_token,
            session_evicted,
        })
    }

    /// 删除账户的全部会话（所有设备登出）
    pub async fn logout(&self, account_id: &str) -> Result<u64> {
        let removed = self.sessions.delete_by_account(account_id).await?;
        info!(
            "Account {} logged out, {} sessions removed",
            account_id, removed
        );
        Ok(removed)
    }

    /// 用刷新令牌换取新的访问令牌
    ///
    /// 刷新令牌本身不轮换。会话已过期时删除该账户的全部会话。
    pub async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let Some(session) = self.sessions.find_by_refresh_token(refresh_token).await? else {
            return Err(LinkpulseError::InvalidRefreshToken);
        };

        if !session.is_active(self.clock.now()) {
            let removed = self.sessions.delete_by_account(&session.account_id).await?;
            info!(
                "Refresh token expired for account {}, {} sessions revoked",
                session.account_id, removed
            );
            return Err(LinkpulseError::RefreshTokenExpired);
        }

        let Some(account) = self.users.find_by_id(&session.account_id).await? else {
            warn!(
                "Session {} references missing account {}",
                session.id, session.account_id
            );
            return Err(LinkpulseError::InvalidRefreshToken);
        };

        self.tokens.issue_access_token(&account)
    }

    /// 发起密码重置
    ///
    /// 邮箱不存在时同样返回成功。
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let Some(mut account) = self.users.find_by_email(email).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let code = self.tokens.generate_reset_code();
        let code_hash = self.hash_secret(&code).await?;
        let now = self.clock.now();

        account.pending_reset = Some(PasswordReset {
            code_hash,
            expires_at: now + self.reset_code_ttl,
        });
        account.updated_at = now;
        self.users.update(&account).await?;

        self.notifier
            .send_password_reset_code(&account.email, &code)
            .await?;

        info!("Password reset code issued for account {}", account.id);
        Ok(())
    }

    /// 使用重置码设置新密码，成功后删除账户的全部会话
    pub async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> Result<()> {
        validate_password(new_password)?;

        let Some(mut account) = self.users.find_by_email(email).await? else {
            return Err(LinkpulseError::ResetCodeNotFound);
        };
        let Some(reset) = account.pending_reset.clone() else {
            return Err(LinkpulseError::ResetCodeNotFound);
        };

        let now = self.clock.now();
        if reset.is_expired(now) {
            account.pending_reset = None;
            account.updated_at = now;
            if let Err(e) = self.users.update(&account).await {
                warn!(
                    "Failed to clear expired reset code for account {}: {}",
                    account.id, e
                );
            }
            return Err(LinkpulseError::ResetCodeExpired);
        }

        if !self.verify_secret(code, &reset.code_hash).await? {
            return Err(LinkpulseError::ResetCodeNotFound);
        }

        account.password_hash = self.hash_secret(new_password).await?;
        account.pending_reset = None;
        account.updated_at = now;
        self.users.update(&account).await?;

        let revoked = self.sessions.delete_by_account(&account.id).await?;
        info!(
            "Password reset for account {}, {} sessions revoked",
            account.id, revoked
        );
        Ok(())
    }

    /// 账户当前未过期的会话
    pub async fn active_sessions(&self, account_id: &str) -> Result<Vec<Session>> {
        self.sessions
            .find_active_by_account(account_id, self.clock.now())
            .await
    }

    /// 校验访问令牌，并要求账户仍有未过期的会话
    pub async fn authenticate(&self, access_token: &str) -> Result<AuthenticatedUser> {
        let claims = self.tokens.verify_access_token(access_token)?;

        if !self
            .sessions
            .has_active_session(&claims.sub, self.clock.now())
            .await?
        {
            debug!("Access token for {} has no backing session", claims.sub);
            return Err(LinkpulseError::InvalidAccessToken);
        }

        Ok(AuthenticatedUser {
            account_id: claims.sub,
            email: claims.email,
        })
    }

    /// 全局清扫过期会话
    pub async fn sweep_expired_sessions(&self) -> Result<u64> {
        self.sessions.delete_expired(self.clock.now()).await
    }

    async fn check_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<std::result::Result<Account, LoginFailure>> {
        let Some(account) = self.users.find_by_email(email).await? else {
            self.verify_secret(password, &self.dummy_hash).await?;
            return Ok(Err(LoginFailure::UnknownAccount));
        };

        let password_matches = self.verify_secret(password, &account.password_hash).await?;
        if !account.is_active {
            return Ok(Err(LoginFailure::Inactive));
        }
        if !password_matches {
            return Ok(Err(LoginFailure::PasswordMismatch));
        }
        Ok(Ok(account))
    }

    async fn hash_secret(&self, secret: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let secret = secret.to_string();

        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| LinkpulseError::hashing(format!("哈希任务异常退出: {}", e)))?
            .map_err(Into::into)
    }

    async fn verify_secret(&self, secret: &str, hash: &str) -> Result<bool> {
        let hasher = self.hasher.clone();
        let secret = secret.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || hasher.verify(&secret, &hash))
            .await
            .map_err(|e| LinkpulseError::hashing(format!("校验任务异常退出: {}", e)))?
            .map_err(Into::into)
    }
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(LinkpulseError::InvalidPassword);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RecordingNotifier;
    use crate::utils::ManualClock;
    use chrono::Utc;

    fn service() -> AuthService {
        let config = AuthConfig {
            jwt_secret: "unit-test-secret".to_string(),
            hash_memory_kib: 1024,
            hash_iterations: 1,
            ..Default::default()
        };
        AuthService::new(
            &config,
            &StorageHandles::in_memory(),
            Arc::new(RecordingNotifier::new()),
            Arc::new(ManualClock::new(Utc::now())),
        )
        .unwrap()
    }

    #[test]
    fn test_validate_password_counts_characters() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("ñññññññ").is_err());
    }

    #[test]
    fn test_validate_password_multibyte_boundary() {
        // 字节数已达标但字符数不足
        assert_eq!("ééééééé".len(), 14);
        assert_eq!(validate_password("ééééééé"), Err(LinkpulseError::InvalidPassword));
        assert_eq!("🔑🔑🔑🔑".len(), 16);
        assert_eq!(validate_password("🔑🔑🔑🔑"), Err(LinkpulseError::InvalidPassword));

        assert_eq!(validate_password("éééééééé"), Ok(()));
        assert_eq!(validate_password("密码密码密码密码"), Ok(()));
    }

    #[tokio::test]
    async fn test_register_rejects_short_multibyte_password() {
        let svc = service();
        assert_eq!(
            svc.register("multi@example.com", "ééééééé", "M").await,
            Err(LinkpulseError::InvalidPassword)
        );
        assert!(svc.register("multi@example.com", "éééééééé", "M").await.is_ok());
    }

    #[test]
    fn test_out_of_range_lifetimes_fail_construction() {
        let base = AuthConfig {
            jwt_secret: "unit-test-secret".to_string(),
            hash_memory_kib: 1024,
            hash_iterations: 1,
            ..Default::default()
        };
        let configs = [
            AuthConfig {
                refresh_token_days: u64::MAX,
                ..base.clone()
            },
            AuthConfig {
                refresh_token_days: i64::MAX as u64,
                ..base.clone()
            },
            AuthConfig {
                reset_code_minutes: u64::MAX,
                ..base.clone()
            },
            AuthConfig {
                access_token_minutes: 1 << 50,
                ..base.clone()
            },
        ];

        for config in &configs {
            let result = AuthService::new(
                config,
                &StorageHandles::in_memory(),
                Arc::new(RecordingNotifier::new()),
                Arc::new(ManualClock::new(Utc::now())),
            );
            assert!(matches!(result, Err(LinkpulseError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_register_validation_order() {
        let svc = service();
        assert_eq!(
            svc.register("not-an-email", "short", "X").await,
            Err(LinkpulseError::InvalidEmail)
        );
        assert_eq!(
            svc.register("a@example.com", "short", "X").await,
            Err(LinkpulseError::InvalidPassword)
        );

        svc.register("a@example.com", "long-enough", "X").await.unwrap();
        // 邮箱重复优先于密码长度检查
        assert_eq!(
            svc.register("a@example.com", "short", "X").await,
            Err(LinkpulseError::EmailExists)
        );
    }

    #[tokio::test]
    async fn test_inactive_account_cannot_log_in() {
        let svc = service();
        let view = svc.register("a@example.com", "long-enough", "X").await.unwrap();

        let mut account = svc.users.find_by_id(&view.id).await.unwrap().unwrap();
        account.is_active = false;
        svc.users.update(&account).await.unwrap();

        assert_eq!(
            svc.login("a@example.com", "long-enough").await.err(),
            Some(LinkpulseError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_check_credentials_tags_failure_cause() {
        let svc = service();
        svc.register("a@example.com", "long-enough", "X").await.unwrap();

        assert_eq!(
            svc.check_credentials("b@example.com", "long-enough")
                .await
                .unwrap()
                .err(),
            Some(LoginFailure::UnknownAccount)
        );
        assert_eq!(
            svc.check_credentials("a@example.com", "wrong-password")
                .await
                .unwrap()
                .err(),
            Some(LoginFailure::PasswordMismatch)
        );
    }
}
