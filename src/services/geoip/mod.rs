//! GeoIP 服务模块
//!
//! 提供 IP 地址到国家代码的解析，支持：
//! - MaxMind GeoLite2 本地数据库
//! - 外部 API fallback (ip-api.com)

mod external_api;
mod maxmind;
mod provider;
mod resolver;

pub use external_api::ExternalApiProvider;
pub use maxmind::MaxMindProvider;
pub use provider::{GeoIpLookup, create_provider};
pub use resolver::GeoResolver;
