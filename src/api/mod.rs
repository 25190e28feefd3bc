//! HTTP 接口层

pub mod middleware;
pub mod services;

use actix_web::web;

pub use services::{AuthRateLimit, auth_rate_limit};

/// 可信代理列表，用于确定客户端 IP
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(pub Vec<String>);

/// 注册全部路由；跳转路由必须最后注册
pub fn configure(cfg: &mut web::ServiceConfig, rate_limit: &AuthRateLimit) {
    cfg.service(services::api_routes(rate_limit))
        .service(services::redirect_routes());
}
