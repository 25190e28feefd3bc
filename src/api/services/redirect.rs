//! 短链接跳转

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::{debug, error};

use crate::analytics::ClickPipeline;
use crate::api::TrustedProxies;
use crate::errors::LinkpulseError;
use crate::services::LinkService;
use crate::utils::ip::extract_client_ip;

fn header_str<'a>(req: &'a HttpRequest, name: &str) -> &'a str {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
}

/// GET /{code}
///
/// 命中时记录点击（不等待）并返回 307。
pub async fn handle_redirect(
    req: HttpRequest,
    path: web::Path<String>,
    links: web::Data<LinkService>,
    pipeline: web::Data<ClickPipeline>,
    proxies: web::Data<TrustedProxies>,
) -> HttpResponse {
    let code = path.into_inner();

    match links.resolve(&code).await {
        Ok(link) => {
            let ip = extract_client_ip(&req, &proxies.0).unwrap_or_default();
            pipeline.track_click(
                &link.code,
                &ip,
                header_str(&req, "user-agent"),
                header_str(&req, "referer"),
            );

            HttpResponse::TemporaryRedirect()
                .insert_header(("Location", link.destination_url))
                .finish()
        }
        Err(LinkpulseError::LinkNotFound) => {
            debug!("Redirect link not found: {}", code);
            not_found_response()
        }
        Err(e) => {
            error!("Storage error during redirect lookup: {}", e);
            HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
                .insert_header(("Content-Type", "text/html; charset=utf-8"))
                .body("Internal Server Error")
        }
    }
}

#[inline]
fn not_found_response() -> HttpResponse {
    HttpResponse::build(StatusCode::NOT_FOUND)
        .insert_header(("Content-Type", "text/html; charset=utf-8"))
        .insert_header(("Cache-Control", "public, max-age=60"))
        .body("Not Found")
}

pub fn redirect_routes() -> actix_web::Resource {
    web::resource("/{code}").route(web::get().to(handle_redirect))
}
