//! 短链接接口

use actix_web::dev::HttpServiceFactory;
use actix_web::{HttpRequest, HttpResponse, web};

use crate::analytics::StatsService;
use crate::api::middleware::BearerAuth;
use crate::auth::AuthenticatedUser;
use crate::services::LinkService;

use super::helpers::api_result;
use super::types::{CreateLinkRequest, CreateLinkResponse, StatsQuery};

/// 管理令牌请求头
pub const MANAGEMENT_TOKEN_HEADER: &str = "X-Management-Token";

/// POST /links
///
/// 带有效访问令牌时，链接归属于该账户。
pub async fn create_link(
    links: web::Data<LinkService>,
    user: Option<web::ReqData<AuthenticatedUser>>,
    body: web::Json<CreateLinkRequest>,
) -> HttpResponse {
    let owner = user.map(|u| u.into_inner().account_id);
    let result = links.create_link(&body.url, owner).await.map(|link| CreateLinkResponse {
        short_url: links.short_url(&link),
        stats_url: links.stats_url(&link),
        code: link.code,
        destination_url: link.destination_url,
        management_token: link.management_token,
        expires_at: link.expires_at.map(|t| t.to_rfc3339()),
    });
    api_result(result)
}

/// GET /links/{code}/stats
///
/// 管理令牌优先取请求头，其次取 `?token=`。
pub async fn link_stats(
    req: HttpRequest,
    stats: web::Data<StatsService>,
    path: web::Path<String>,
    query: web::Query<StatsQuery>,
    user: Option<web::ReqData<AuthenticatedUser>>,
) -> HttpResponse {
    let management_token = req
        .headers()
        .get(MANAGEMENT_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .or(query.token.as_deref());
    let account_id = user.as_ref().map(|u| u.account_id.as_str());

    api_result(stats.get_stats(&path, management_token, account_id).await)
}

pub fn links_routes() -> impl HttpServiceFactory {
    web::scope("/links")
        .wrap(BearerAuth::optional())
        .route("", web::post().to(create_link))
        .route("/{code}/stats", web::get().to(link_stats))
}
