//! API 帮助函数

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::errors::LinkpulseError;

use super::types::{ApiResponse, ErrorCode};

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 LinkpulseError 构建错误响应
///
/// 内部错误只返回通用消息，详情写入日志。
pub fn error_from_linkpulse(err: &LinkpulseError) -> HttpResponse {
    let status = err.http_status();
    let code = ErrorCode::from(err);

    if err.is_client_facing() {
        error_response(status, code, err.message())
    } else {
        error!("Request failed: {} ({})", err, err.code());
        error_response(status, code, "internal server error")
    }
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T: Serialize>(result: Result<T, LinkpulseError>) -> HttpResponse {
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_linkpulse(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_internal_error_is_masked() {
        let resp = error_from_linkpulse(&LinkpulseError::database_operation("secret table name"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(!body.contains("secret table name"));
        assert!(body.contains("1005"));
    }

    #[actix_web::test]
    async fn test_client_error_keeps_message() {
        let resp = error_from_linkpulse(&LinkpulseError::EmailExists);
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(resp.into_body()).await.unwrap()).unwrap();
        assert_eq!(body["code"], 1009);
        assert_eq!(body["message"], "email is already registered");
        assert!(body.get("data").is_none());
    }

    #[actix_web::test]
    async fn test_api_result_success_envelope() {
        let resp = api_result(Ok::<_, LinkpulseError>(vec![1, 2]));
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(resp.into_body()).await.unwrap()).unwrap();
        assert_eq!(body["code"], 0);
        assert_eq!(body["data"], serde_json::json!([1, 2]));
    }
}
