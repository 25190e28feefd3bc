//! 访问令牌签发与校验，以及不透明随机值（刷新令牌、重置码）的生成
//!
//! 访问令牌为 HS256 JWT；刷新令牌与重置码是 CSPRNG 生成的随机值，
//! 与签名密钥无关，无法由密钥推导。

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AuthConfig;
use crate::errors::{LinkpulseError, Result};
use crate::storage::Account;
use crate::utils::{Clock, generate_secure_token};

const ACCESS_TOKEN_TYPE: &str = "access";
const REFRESH_TOKEN_BYTES: usize = 32;

/// Access Token Claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// 账户 ID
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: String,
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    clock: Arc<dyn Clock>,
}

/// 将配置中的时长换算为 `Duration`
///
/// 超出 `Duration` 表示范围，或加到当前时间会溢出时，返回校验错误。
pub(crate) fn configured_ttl(
    field: &str,
    value: u64,
    unit: fn(i64) -> Option<Duration>,
    clock: &dyn Clock,
) -> Result<Duration> {
    i64::try_from(value)
        .ok()
        .and_then(unit)
        .filter(|ttl| clock.now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| {
            LinkpulseError::validation(format!("auth.{} is out of range: {}", field, value))
        })
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let access_ttl = configured_ttl(
            "access_token_minutes",
            config.access_token_minutes,
            Duration::try_minutes,
            clock.as_ref(),
        )?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl,
            clock,
        })
    }

    /// 为账户签发访问令牌
    pub fn issue_access_token(&self, account: &Account) -> Result<String> {
        let now = self.clock.now();
        let claims = AccessClaims {
            sub: account.id.clone(),
            email: account.email.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// 校验访问令牌
    ///
    /// 只接受 HS256 签名；过期判断以注入的时钟为准，到达 `exp` 即失效。
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.required_spec_claims =
            HashSet::from(["exp".to_string(), "sub".to_string()]);

        let claims = decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                debug!("Access token rejected: {}", e);
                LinkpulseError::InvalidAccessToken
            })?
            .claims;

        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(LinkpulseError::InvalidAccessToken);
        }
        if self.clock.now().timestamp() >= claims.exp {
            debug!("Access token for {} expired", claims.sub);
            return Err(LinkpulseError::InvalidAccessToken);
        }

        Ok(claims)
    }

    /// 生成不透明的刷新令牌（32 字节随机值）
    pub fn generate_refresh_token(&self) -> String {
        generate_secure_token(REFRESH_TOKEN_BYTES)
    }

    /// 生成 6 位数字重置码
    pub fn generate_reset_code(&self) -> String {
        format!("{:06}", rand::random_range(0..1_000_000u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::{TimeZone, Utc};

    const SECRET: &str = "test_secret_key_32_bytes_long!!";

    fn setup() -> (TokenIssuer, Arc<ManualClock>, Account) {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let config = AuthConfig {
            jwt_secret: SECRET.to_string(),
            ..Default::default()
        };
        let issuer = TokenIssuer::new(&config, clock.clone()).unwrap();
        let account = Account::new("a@example.com".into(), "h".into(), "A".into(), start);
        (issuer, clock, account)
    }

    #[test]
    fn test_token_verifies_until_expiry_instant() {
        let (issuer, clock, account) = setup();
        let token = issuer.issue_access_token(&account).unwrap();

        let claims = issuer.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.email, "a@example.com");

        clock.advance(Duration::minutes(60) - Duration::seconds(1));
        assert!(issuer.verify_access_token(&token).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(
            issuer.verify_access_token(&token),
            Err(LinkpulseError::InvalidAccessToken)
        );
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let (issuer, _, account) = setup();
        let token = issuer.issue_access_token(&account).unwrap();

        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut sig_bytes = URL_SAFE_NO_PAD.decode(signature).unwrap();
        sig_bytes[0] ^= 0x01;
        let tampered = format!("{}.{}", head, URL_SAFE_NO_PAD.encode(sig_bytes));

        assert!(issuer.verify_access_token(&tampered).is_err());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let (issuer, _, account) = setup();
        let token = issuer.issue_access_token(&account).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "sub": "someone-else",
                "email": "x@example.com",
                "iat": 0,
                "exp": i64::MAX,
                "jti": "j",
                "token_type": "access",
            })
            .to_string(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(issuer.verify_access_token(&forged).is_err());
    }

    #[test]
    fn test_other_hmac_algorithm_rejected() {
        let (issuer, clock, account) = setup();
        let now = clock.now();
        let claims = AccessClaims {
            sub: account.id.clone(),
            email: account.email.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(60)).timestamp(),
            jti: "j".to_string(),
            token_type: "access".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(issuer.verify_access_token(&token).is_err());
    }

    #[test]
    fn test_unsigned_token_rejected() {
        let (issuer, clock, account) = setup();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "sub": account.id,
                "email": account.email,
                "iat": clock.now().timestamp(),
                "exp": clock.now().timestamp() + 3600,
                "jti": "j",
                "token_type": "access",
            })
            .to_string(),
        );

        assert!(issuer.verify_access_token(&format!("{}.{}.", header, payload)).is_err());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let (issuer, clock, account) = setup();
        let other = TokenIssuer::new(
            &AuthConfig {
                jwt_secret: "another-secret-entirely-000000000".to_string(),
                ..Default::default()
            },
            clock,
        )
        .unwrap();
        let token = other.issue_access_token(&account).unwrap();
        assert!(issuer.verify_access_token(&token).is_err());
    }

    #[test]
    fn test_out_of_range_lifetime_is_rejected() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        for minutes in [u64::MAX, i64::MAX as u64, 1 << 50] {
            let config = AuthConfig {
                jwt_secret: SECRET.to_string(),
                access_token_minutes: minutes,
                ..Default::default()
            };
            assert!(matches!(
                TokenIssuer::new(&config, clock.clone()),
                Err(LinkpulseError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_opaque_values() {
        let (issuer, _, _) = setup();

        let rt = issuer.generate_refresh_token();
        assert_eq!(rt.len(), 43);
        assert_ne!(rt, issuer.generate_refresh_token());
        assert_eq!(rt.split('.').count(), 1);

        for _ in 0..50 {
            let code = issuer.generate_reset_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }
}
