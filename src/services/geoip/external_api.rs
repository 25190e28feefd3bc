//! 外部 GeoIP API 实现
//!
//! 通过 HTTP JSON 接口查询（如 ip-api.com），
//! 内置 Moka 缓存 + Singleflight，避免同一 IP 重复请求。

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{debug, trace};
use ureq::Agent;

use super::provider::GeoIpLookup;

/// GeoIP 缓存 TTL（15 分钟）
const GEOIP_CACHE_TTL_SECS: u64 = 15 * 60;
/// GeoIP 缓存最大容量
const GEOIP_CACHE_MAX_CAPACITY: u64 = 10_000;

/// 外部 API GeoIP Provider
///
/// - LRU 淘汰，最大 10000 条，TTL 15 分钟
/// - 同一 IP 的并发请求只发一次 HTTP
pub struct ExternalApiProvider {
    api_url_template: String,
    agent: Agent,
    /// IP → 国家代码（`None` 作为负缓存）
    cache: Cache<String, Option<String>>,
}

impl ExternalApiProvider {
    /// `api_url_template` 使用 `{ip}` 作为占位符
    pub fn new(api_url_template: &str, timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            api_url_template: api_url_template.to_string(),
            agent,
            cache: Cache::builder()
                .time_to_live(Duration::from_secs(GEOIP_CACHE_TTL_SECS))
                .max_capacity(GEOIP_CACHE_MAX_CAPACITY)
                .build(),
        }
    }

    /// 同步请求，在 spawn_blocking 中调用
    fn fetch_sync(agent: &Agent, url: &str) -> Option<String> {
        let resp = match agent.get(url).call() {
            Ok(r) => r,
            Err(e) => {
                debug!("GeoIP API request to \"{}\" failed: {}", url, e);
                return None;
            }
        };

        let json: serde_json::Value = match resp.into_body().read_json() {
            Ok(j) => j,
            Err(e) => {
                debug!("GeoIP API response from \"{}\" parse failed: {}", url, e);
                return None;
            }
        };

        parse_country(&json)
    }

    async fn fetch(&self, ip: &str) -> Option<String> {
        let url = self.api_url_template.replace("{ip}", ip);
        let agent = self.agent.clone();

        tokio::task::spawn_blocking(move || Self::fetch_sync(&agent, &url))
            .await
            .unwrap_or_else(|e| {
                debug!("GeoIP spawn_blocking failed: {}", e);
                None
            })
    }
}

/// 从响应中提取国家代码
///
/// 兼容 `countryCode` / `country_code` / `country` 字段，
/// `status: "fail"` 或空值视为失败。
pub(crate) fn parse_country(json: &serde_json::Value) -> Option<String> {
    if json["status"].as_str() == Some("fail") {
        trace!("External API returned fail status");
        return None;
    }

    json["countryCode"]
        .as_str()
        .or_else(|| json["country_code"].as_str())
        .or_else(|| json["country"].as_str())
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| code.to_ascii_uppercase())
}

#[async_trait]
impl GeoIpLookup for ExternalApiProvider {
    async fn lookup_country(&self, ip: &str) -> Option<String> {
        self.cache
            .get_with(ip.to_string(), async {
                trace!("GeoIP cache miss for {}, fetching from API", ip);
                self.fetch(ip).await
            })
            .await
    }

    fn name(&self) -> &'static str {
        "ExternalAPI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, HttpServer, web};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_country_variants() {
        assert_eq!(
            parse_country(&json!({"status": "success", "countryCode": "us"})).as_deref(),
            Some("US")
        );
        assert_eq!(
            parse_country(&json!({"country_code": "DE"})).as_deref(),
            Some("DE")
        );
        assert_eq!(parse_country(&json!({"country": "BR"})).as_deref(), Some("BR"));
        assert_eq!(
            parse_country(&json!({"status": "fail", "countryCode": "US"})),
            None
        );
        assert_eq!(parse_country(&json!({"countryCode": ""})), None);
        assert_eq!(parse_country(&json!({"message": "reserved range"})), None);
    }

    fn start_fake_api(hits: Arc<AtomicUsize>) -> String {
        let server = HttpServer::new(move || {
            let hits = hits.clone();
            App::new().route(
                "/json/{ip}",
                web::get().to(move |ip: web::Path<String>| {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        match ip.as_str() {
                            "8.8.8.8" => HttpResponse::Ok().json(json!({"status": "success", "countryCode": "US"})),
                            "1.1.1.1" => HttpResponse::Ok().body("not json"),
                            _ => HttpResponse::Ok().json(json!({"status": "fail"})),
                        }
                    }
                }),
            )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{}/json/{{ip}}", addr)
    }

    #[actix_web::test]
    async fn test_lookup_against_local_api_with_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let provider = ExternalApiProvider::new(&start_fake_api(hits.clone()), Duration::from_secs(2));

        assert_eq!(provider.lookup_country("8.8.8.8").await.as_deref(), Some("US"));
        assert_eq!(provider.lookup_country("8.8.8.8").await.as_deref(), Some("US"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert_eq!(provider.lookup_country("1.1.1.1").await, None);
        assert_eq!(provider.lookup_country("9.9.9.9").await, None);
    }

    #[actix_web::test]
    async fn test_lookup_connection_refused_is_none() {
        let provider = ExternalApiProvider::new("http://127.0.0.1:1/json/{ip}", Duration::from_secs(1));
        assert_eq!(provider.lookup_country("8.8.8.8").await, None);
    }
}
