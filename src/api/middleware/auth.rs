//! 访问令牌认证中间件
//!
//! 从 `Authorization: Bearer` 头中取出访问令牌，交给 [`AuthService::authenticate`]，
//! 成功后把 [`AuthenticatedUser`] 放入请求扩展。

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use tracing::{debug, error, trace};

use crate::api::services::helpers::{error_from_linkpulse, error_response};
use crate::api::services::types::ErrorCode;
use crate::auth::{AuthService, AuthenticatedUser};

/// Bearer 认证
///
/// - `required()`：缺少令牌时返回 401
/// - `optional()`：缺少令牌时放行；带了无效令牌仍返回 401
#[derive(Clone, Copy)]
pub struct BearerAuth {
    required: bool,
}

impl BearerAuth {
    pub fn required() -> Self {
        Self { required: true }
    }

    pub fn optional() -> Self {
        Self { required: false }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthMiddleware {
            service: Rc::new(service),
            required: self.required,
        }))
    }
}

pub struct BearerAuthMiddleware<S> {
    service: Rc<S>,
    required: bool,
}

/// 从 Authorization header 提取 Bearer token
pub fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl<S, B> Service<ServiceRequest> for BearerAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let required = self.required;

        Box::pin(async move {
            let Some(token) = extract_bearer_token(&req) else {
                if required {
                    debug!("Missing bearer token for {}", req.path());
                    let resp = error_response(
                        StatusCode::UNAUTHORIZED,
                        ErrorCode::Unauthorized,
                        "missing bearer token",
                    );
                    return Ok(req.into_response(resp.map_into_right_body()));
                }
                return srv.call(req).await.map(ServiceResponse::map_into_left_body);
            };

            let Some(auth) = req.app_data::<web::Data<AuthService>>().cloned() else {
                error!("AuthService is not registered as app data");
                let resp = error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::InternalServerError,
                    "internal server error",
                );
                return Ok(req.into_response(resp.map_into_right_body()));
            };

            match auth.authenticate(&token).await {
                Ok(user) => {
                    trace!("Authenticated request from account {}", user.account_id);
                    req.extensions_mut().insert::<AuthenticatedUser>(user);
                    srv.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(e) => {
                    debug!("Bearer authentication failed: {}", e);
                    let resp = error_from_linkpulse(&e);
                    Ok(req.into_response(resp.map_into_right_body()))
                }
            }
        })
    }
}
