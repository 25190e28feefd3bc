//! 认证接口

use std::sync::Arc;

use actix_governor::{Governor, GovernorConfig, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use actix_web::{HttpResponse, web};
use anyhow::Context;
use governor::middleware::NoOpMiddleware;
use tracing::debug;

use crate::api::middleware::BearerAuth;
use crate::auth::{AuthService, AuthenticatedUser};
use crate::utils::ip::{extract_forwarded_ip_from_headers, resolve_client_ip};

use super::helpers::api_result;
use super::types::{
    ForgotPasswordRequest, LoginRequest, LogoutResponse, MessageResponse, RefreshRequest,
    RefreshResponse, RegisterRequest, ResetPasswordRequest,
};

pub type AuthRateLimit = GovernorConfig<AuthKeyExtractor, NoOpMiddleware>;

/// 基于客户端 IP 的限流 key 提取器
///
/// 只有来自可信代理（或私有网段）的连接才采用转发头中的地址。
#[derive(Clone)]
pub struct AuthKeyExtractor {
    trusted_proxies: Arc<Vec<String>>,
}

impl KeyExtractor for AuthKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        let peer = req.peer_addr().map(|addr| addr.ip().to_string());
        let key = resolve_client_ip(peer.as_deref(), &self.trusted_proxies, || {
            extract_forwarded_ip_from_headers(req.headers())
        })
        .ok_or_else(|| SimpleKeyExtractionError::new("Unable to extract client IP"))?;

        debug!("Auth rate limit key: {}", key);
        Ok(key)
    }
}

/// 登录、注册、找回密码共享的限流配置
///
/// 每秒补充 1 个令牌，突发最多 5 次请求，超限返回 429。
pub fn auth_rate_limit(trusted_proxies: &[String]) -> anyhow::Result<AuthRateLimit> {
    let config = GovernorConfigBuilder::default()
        .seconds_per_request(1)
        .burst_size(5)
        .key_extractor(AuthKeyExtractor {
            trusted_proxies: Arc::new(trusted_proxies.to_vec()),
        })
        .finish()
        .context("Invalid auth rate limit config")?;

    debug!("Auth rate limiter created: 1 req/s, burst 5");
    Ok(config)
}

pub async fn register(
    auth: web::Data<AuthService>,
    body: web::Json<RegisterRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    api_result(auth.register(&body.email, &body.password, &body.name).await)
}

pub async fn login(auth: web::Data<AuthService>, body: web::Json<LoginRequest>) -> HttpResponse {
    api_result(auth.login(&body.email, &body.password).await)
}

pub async fn refresh(
    auth: web::Data<AuthService>,
    body: web::Json<RefreshRequest>,
) -> HttpResponse {
    api_result(
        auth.refresh(&body.refresh_token)
            .await
            .map(|access_token| RefreshResponse { access_token }),
    )
}

pub async fn forgot_password(
    auth: web::Data<AuthService>,
    body: web::Json<ForgotPasswordRequest>,
) -> HttpResponse {
    api_result(auth.forgot_password(&body.email).await.map(|()| MessageResponse {
        message: "if the account exists, a reset code has been sent".to_string(),
    }))
}

pub async fn reset_password(
    auth: web::Data<AuthService>,
    body: web::Json<ResetPasswordRequest>,
) -> HttpResponse {
    api_result(
        auth.reset_password(&body.email, &body.code, &body.new_password)
            .await
            .map(|()| MessageResponse {
                message: "password has been reset".to_string(),
            }),
    )
}

pub async fn logout(
    auth: web::Data<AuthService>,
    user: web::ReqData<AuthenticatedUser>,
) -> HttpResponse {
    api_result(
        auth.logout(&user.account_id)
            .await
            .map(|sessions_removed| LogoutResponse { sessions_removed }),
    )
}

pub async fn sessions(
    auth: web::Data<AuthService>,
    user: web::ReqData<AuthenticatedUser>,
) -> HttpResponse {
    api_result(auth.active_sessions(&user.account_id).await)
}

/// 认证路由 `/auth`
///
/// - POST /auth/register, /auth/login, /auth/forgot-password（带限流）
/// - POST /auth/refresh, /auth/reset-password
/// - POST /auth/logout, GET /auth/sessions（需要访问令牌）
pub fn auth_routes(rate_limit: &AuthRateLimit) -> actix_web::Scope {
    web::scope("/auth")
        .route(
            "/register",
            web::post().to(register).wrap(Governor::new(rate_limit)),
        )
        .route("/login", web::post().to(login).wrap(Governor::new(rate_limit)))
        .route(
            "/forgot-password",
            web::post()
                .to(forgot_password)
                .wrap(Governor::new(rate_limit)),
        )
        .route("/refresh", web::post().to(refresh))
        .route("/reset-password", web::post().to(reset_password))
        .service(
            web::resource("/logout")
                .wrap(BearerAuth::required())
                .route(web::post().to(logout)),
        )
        .service(
            web::resource("/sessions")
                .wrap(BearerAuth::required())
                .route(web::get().to(sessions)),
        )
}
