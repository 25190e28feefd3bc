//! IP 地址处理工具
//!
//! 提供统一的客户端 IP 提取功能，支持：
//! - 可信代理配置（trusted_proxies）
//! - CIDR 匹配
//! - 私有 IP 自动检测
//!
//! 以及 GeoIP 查询前的地址分类。

use std::net::{IpAddr, SocketAddr};

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;
use tracing::debug;

/// 地址分类（决定 GeoIP 是否需要发起外部查询）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressScope {
    /// 回环或未指定地址（本机访问）
    Local,
    /// 私有、链路本地等不可公网路由的地址
    NonRoutable,
    /// 可公网路由的地址
    Public,
}

/// 对 IP 字符串进行分类；无法解析时返回 `None`
pub fn classify_ip(ip: &str) -> Option<AddressScope> {
    let addr = parse_ip_lenient(ip)?;

    if addr.is_loopback() || addr.is_unspecified() {
        return Some(AddressScope::Local);
    }

    let non_routable = match addr {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local() || v4.is_broadcast(),
        IpAddr::V6(_) => is_private_or_local(&addr),
    };

    Some(if non_routable {
        AddressScope::NonRoutable
    } else {
        AddressScope::Public
    })
}

/// 解析 IP，兼容 `ip:port`、`[v6]:port` 格式以及 IPv4 映射的 IPv6 地址
fn parse_ip_lenient(ip: &str) -> Option<IpAddr> {
    let ip = ip.trim();
    let addr = ip
        .parse::<IpAddr>()
        .ok()
        .or_else(|| ip.parse::<SocketAddr>().ok().map(|s| s.ip()))?;

    Some(match addr {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(addr),
        v4 => v4,
    })
}

/// 检查 IP 是否为私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            // - fc00::/7 (ULA, RFC 4193)
            // - fe80::/10 (Link-local)
            // - ::1 (Loopback)
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// 检查 IP 是否在可信代理列表中
pub fn is_trusted_proxy(ip: &str, trusted_proxies: &[String]) -> bool {
    let Some(ip_addr) = parse_ip_lenient(ip) else {
        return false;
    };

    trusted_proxies.iter().any(|proxy| {
        if proxy.contains('/') {
            ip_in_cidr(&ip_addr, proxy)
        } else {
            proxy
                .parse::<IpAddr>()
                .is_ok_and(|proxy_addr| proxy_addr == ip_addr)
        }
    })
}

/// CIDR 检查
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };

    let Ok(prefix_len): Result<u8, _> = prefix_len.parse() else {
        return false;
    };

    let Ok(network_addr) = network.parse::<IpAddr>() else {
        return false;
    };

    match (ip, network_addr) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => {
            if prefix_len > 32 {
                return false;
            }
            let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
            let ip_bits = u32::from_be_bytes(ip.octets());
            let net_bits = u32::from_be_bytes(net.octets());
            (ip_bits & mask) == (net_bits & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) => {
            if prefix_len > 128 {
                return false;
            }
            let mask = u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0);
            let ip_bits = u128::from_be_bytes(ip.octets());
            let net_bits = u128::from_be_bytes(net.octets());
            (ip_bits & mask) == (net_bits & mask)
        }
        _ => false,
    }
}

/// 根据对端地址和可信代理配置决定客户端 IP
///
/// 策略（按优先级）：
/// 1. 显式配置 trusted_proxies 且匹配 → 使用转发头
/// 2. 显式配置但不匹配 → 使用对端地址（不信任转发头）
/// 3. 未配置且对端为私有 IP → 视为反向代理，使用转发头
/// 4. 默认 → 使用对端地址
pub fn resolve_client_ip<F>(
    peer_ip: Option<&str>,
    trusted_proxies: &[String],
    get_forwarded_ip: F,
) -> Option<String>
where
    F: FnOnce() -> Option<String>,
{
    let Some(peer_ip) = peer_ip else {
        return get_forwarded_ip();
    };

    if !trusted_proxies.is_empty() {
        if is_trusted_proxy(peer_ip, trusted_proxies) {
            let real_ip = get_forwarded_ip().unwrap_or_else(|| peer_ip.to_string());
            debug!("Trusted proxy (explicit): {} -> {}", peer_ip, real_ip);
            return Some(real_ip);
        }
        return Some(peer_ip.to_string());
    }

    if let Some(addr) = parse_ip_lenient(peer_ip)
        && is_private_or_local(&addr)
        && let Some(real_ip) = get_forwarded_ip()
    {
        debug!(
            "Auto-detect proxy (private IP {}): using forwarded IP {}",
            peer_ip, real_ip
        );
        return Some(real_ip);
    }

    Some(peer_ip.to_string())
}

/// 从 HttpRequest 提取真实客户端 IP
pub fn extract_client_ip(req: &HttpRequest, trusted_proxies: &[String]) -> Option<String> {
    let peer = req.peer_addr().map(|addr| addr.ip().to_string());
    resolve_client_ip(peer.as_deref(), trusted_proxies, || {
        extract_forwarded_ip_from_headers(req.headers())
    })
}

/// 从 HeaderMap 提取转发的 IP（X-Forwarded-For 或 X-Real-IP）
pub fn extract_forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    // 优先 X-Forwarded-For（取第一个，即原始客户端 IP）
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ip() {
        assert_eq!(classify_ip("127.0.0.1"), Some(AddressScope::Local));
        assert_eq!(classify_ip("::1"), Some(AddressScope::Local));
        assert_eq!(classify_ip("0.0.0.0"), Some(AddressScope::Local));
        assert_eq!(classify_ip("[::1]:8080"), Some(AddressScope::Local));
        assert_eq!(classify_ip("::ffff:127.0.0.1"), Some(AddressScope::Local));
        assert_eq!(classify_ip("10.1.2.3"), Some(AddressScope::NonRoutable));
        assert_eq!(classify_ip("169.254.0.7"), Some(AddressScope::NonRoutable));
        assert_eq!(classify_ip("fd00::1"), Some(AddressScope::NonRoutable));
        assert_eq!(classify_ip("8.8.8.8"), Some(AddressScope::Public));
        assert_eq!(classify_ip("8.8.8.8:443"), Some(AddressScope::Public));
        assert_eq!(classify_ip("not-an-ip"), None);
        assert_eq!(classify_ip(""), None);
    }

    #[test]
    fn test_is_private_or_local() {
        assert!(is_private_or_local(&"10.0.0.1".parse().unwrap()));
        assert!(is_private_or_local(&"192.168.1.1".parse().unwrap()));
        assert!(is_private_or_local(&"127.0.0.1".parse().unwrap()));
        assert!(is_private_or_local(&"fe80::1".parse().unwrap()));
        assert!(!is_private_or_local(&"1.1.1.1".parse().unwrap()));
        assert!(!is_private_or_local(
            &"2001:4860:4860::8888".parse().unwrap()
        ));
    }

    #[test]
    fn test_ip_in_cidr() {
        let ip: IpAddr = "192.168.1.100".parse().unwrap();
        assert!(ip_in_cidr(&ip, "192.168.1.0/24"));
        assert!(!ip_in_cidr(&ip, "192.168.2.0/24"));
        assert!(!ip_in_cidr(&ip, "192.168.1.0/33"));
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        assert!(ip_in_cidr(&v6, "2001:db8::/32"));
        assert!(!ip_in_cidr(&v6, "10.0.0.0/8"));
    }

    #[test]
    fn test_is_trusted_proxy() {
        let proxies = vec!["127.0.0.1".to_string(), "192.168.1.0/24".to_string()];

        assert!(is_trusted_proxy("127.0.0.1", &proxies));
        assert!(is_trusted_proxy("127.0.0.1:8080", &proxies));
        assert!(is_trusted_proxy("192.168.1.50", &proxies));
        assert!(!is_trusted_proxy("8.8.8.8", &proxies));
        assert!(!is_trusted_proxy("garbage", &proxies));
    }

    #[test]
    fn test_resolve_client_ip_explicit_proxies() {
        let proxies = vec!["10.0.0.1".to_string()];
        let forwarded = || Some("203.0.113.9".to_string());

        assert_eq!(
            resolve_client_ip(Some("10.0.0.1"), &proxies, forwarded).as_deref(),
            Some("203.0.113.9")
        );
        // 不在可信列表中：忽略转发头
        assert_eq!(
            resolve_client_ip(Some("10.0.0.2"), &proxies, forwarded).as_deref(),
            Some("10.0.0.2")
        );
    }

    #[test]
    fn test_resolve_client_ip_auto_detect() {
        let forwarded = || Some("203.0.113.9".to_string());

        assert_eq!(
            resolve_client_ip(Some("192.168.0.5"), &[], forwarded).as_deref(),
            Some("203.0.113.9")
        );
        // 公网直连不信任转发头
        assert_eq!(
            resolve_client_ip(Some("198.51.100.1"), &[], forwarded).as_deref(),
            Some("198.51.100.1")
        );
        assert_eq!(
            resolve_client_ip(Some("192.168.0.5"), &[], || None).as_deref(),
            Some("192.168.0.5")
        );
    }

    #[test]
    fn test_extract_forwarded_ip_from_headers() {
        use actix_web::http::header::{HeaderName, HeaderValue};

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-real-ip"),
            HeaderValue::from_static("198.51.100.7"),
        );
        assert_eq!(
            extract_forwarded_ip_from_headers(&headers).as_deref(),
            Some("198.51.100.7")
        );

        headers.insert(
            HeaderName::from_static("x-forwarded-for"),
            HeaderValue::from_static("203.0.113.1, 10.0.0.1"),
        );
        assert_eq!(
            extract_forwarded_ip_from_headers(&headers).as_deref(),
            Some("203.0.113.1")
        );
    }
}
