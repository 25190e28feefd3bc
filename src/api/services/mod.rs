pub mod auth;
pub mod helpers;
pub mod links;
pub mod redirect;
pub mod types;

pub use auth::{AuthRateLimit, auth_rate_limit, auth_routes};
pub use links::links_routes;
pub use redirect::redirect_routes;
pub use types::{ApiResponse, ErrorCode};

/// `/api` 下的全部路由
pub fn api_routes(rate_limit: &AuthRateLimit) -> actix_web::Scope {
    actix_web::web::scope("/api")
        .service(auth_routes(rate_limit))
        .service(links_routes())
}
