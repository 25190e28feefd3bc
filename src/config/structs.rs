use std::path::Path;

use serde::{Deserialize, Serialize};

/// 静态配置（从 TOML + 环境变量加载，启动时使用）
///
/// 包含：
/// - server: 监听地址、端口、worker 数量、可信代理
/// - database: 数据库连接配置
/// - logging: 日志配置
/// - auth: 令牌签发与会话策略
/// - analytics: 点击采集管道与 GeoIP
/// - links: 短链接生成参数
/// - notification: 重置码投递
///
/// 配置对象在启动时构造一次，之后以引用形式显式传入各组件的构造函数。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：LP，分隔符：__
    /// 示例：LP__AUTH__JWT_SECRET=change-me
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        use config::{Config, Environment, File};

        Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 LP，分隔符 __
            .add_source(
                Environment::with_prefix("LP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<StaticConfig>()
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let mut sample_config = Self::default();
        // 示例文件不应携带运行机器的 CPU 数量
        sample_config.server.workers = 4;
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("# Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// 可信反向代理（单 IP 或 CIDR），仅这些来源的 X-Forwarded-For 会被采信
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
    /// 优雅关闭等待时间（秒）
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `:memory:` 使用进程内存储，其余按 URL 推断 SQLite / MySQL / PostgreSQL
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `text` 或 `json`
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 认证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 签名密钥；为空时启动阶段生成随机值
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: u64,
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: u64,
    /// 每个账户允许的并发会话上限
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
    #[serde(default = "default_reset_code_minutes")]
    pub reset_code_minutes: u64,
    /// 全局过期会话清扫间隔（秒）
    #[serde(default = "default_session_sweep_interval")]
    pub session_sweep_interval_secs: u64,
    /// Argon2id 内存代价（KiB）
    #[serde(default = "default_hash_memory_kib")]
    pub hash_memory_kib: u32,
    #[serde(default = "default_hash_iterations")]
    pub hash_iterations: u32,
    #[serde(default = "default_hash_parallelism")]
    pub hash_parallelism: u32,
}

/// 分析统计配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// 点击采集缓冲区容量，满时丢弃新事件
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// MaxMindDB 文件路径 (GeoLite2-Country.mmdb / GeoLite2-City.mmdb)
    /// 如果配置且文件可读，使用本地解析；否则使用外部 API
    #[serde(default)]
    pub maxminddb_path: Option<String>,

    /// 外部 GeoIP API URL
    /// 使用 {ip} 作为占位符，例如: http://ip-api.com/json/{ip}?fields=countryCode
    #[serde(default = "default_geoip_api_url")]
    pub geoip_api_url: String,

    /// 单次地理查询的硬超时（毫秒）
    #[serde(default = "default_geoip_timeout_ms")]
    pub geoip_timeout_ms: u64,

    /// 未解析 / 解析失败时的哨兵国家代码
    #[serde(default = "default_unknown_country")]
    pub unknown_country: String,

    /// 回环地址直接使用的国家代码
    #[serde(default = "default_local_country")]
    pub local_country: String,

    #[serde(default = "default_stats_date_buckets")]
    pub stats_date_buckets: u64,

    #[serde(default = "default_stats_top_n")]
    pub stats_top_n: u64,
}

/// 短链接生成配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    #[serde(default = "default_management_token_length")]
    pub management_token_length: usize,
    #[serde(default = "default_link_ttl_days")]
    pub default_ttl_days: i64,
    /// 对外展示短链接时使用的前缀
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// 通知投递配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// `log`（仅记录日志）或 `brevo`
    #[serde(default = "default_notification_provider")]
    pub provider: String,
    #[serde(default = "default_notification_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_sender_email")]
    pub sender_email: String,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    #[serde(default = "default_notification_timeout")]
    pub timeout_secs: u64,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_database_url() -> String {
    "sqlite://linkpulse.db?mode=rwc".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_access_token_minutes() -> u64 {
    60
}

fn default_refresh_token_days() -> u64 {
    7
}

fn default_max_sessions() -> u64 {
    3
}

fn default_reset_code_minutes() -> u64 {
    10
}

fn default_session_sweep_interval() -> u64 {
    3600
}

fn default_hash_memory_kib() -> u32 {
    19456
}

fn default_hash_iterations() -> u32 {
    2
}

fn default_hash_parallelism() -> u32 {
    1
}

fn default_buffer_capacity() -> usize {
    100
}

fn default_geoip_api_url() -> String {
    "http://ip-api.com/json/{ip}?fields=status,countryCode".to_string()
}

fn default_geoip_timeout_ms() -> u64 {
    2000
}

fn default_unknown_country() -> String {
    "XX".to_string()
}

fn default_local_country() -> String {
    "EC".to_string()
}

fn default_stats_date_buckets() -> u64 {
    30
}

fn default_stats_top_n() -> u64 {
    5
}

fn default_code_length() -> usize {
    6
}

fn default_management_token_length() -> usize {
    16
}

fn default_link_ttl_days() -> i64 {
    60
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_notification_provider() -> String {
    "log".to_string()
}

fn default_notification_api_url() -> String {
    "https://api.brevo.com/v3/smtp/email".to_string()
}

fn default_sender_email() -> String {
    "no-reply@linkpulse.local".to_string()
}

fn default_sender_name() -> String {
    "Linkpulse Support".to_string()
}

fn default_notification_timeout() -> u64 {
    10
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            workers: default_workers(),
            trusted_proxies: Vec::new(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_minutes: default_access_token_minutes(),
            refresh_token_days: default_refresh_token_days(),
            max_sessions: default_max_sessions(),
            reset_code_minutes: default_reset_code_minutes(),
            session_sweep_interval_secs: default_session_sweep_interval(),
            hash_memory_kib: default_hash_memory_kib(),
            hash_iterations: default_hash_iterations(),
            hash_parallelism: default_hash_parallelism(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            maxminddb_path: None,
            geoip_api_url: default_geoip_api_url(),
            geoip_timeout_ms: default_geoip_timeout_ms(),
            unknown_country: default_unknown_country(),
            local_country: default_local_country(),
            stats_date_buckets: default_stats_date_buckets(),
            stats_top_n: default_stats_top_n(),
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            management_token_length: default_management_token_length(),
            default_ttl_days: default_link_ttl_days(),
            base_url: default_base_url(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            provider: default_notification_provider(),
            api_url: default_notification_api_url(),
            api_key: String::new(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
            timeout_secs: default_notification_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_session_policy() {
        let config = StaticConfig::default();
        assert_eq!(config.auth.max_sessions, 3);
        assert_eq!(config.auth.refresh_token_days, 7);
        assert_eq!(config.auth.access_token_minutes, 60);
        assert_eq!(config.auth.reset_code_minutes, 10);
        assert_eq!(config.analytics.buffer_capacity, 100);
        assert_eq!(config.analytics.geoip_timeout_ms, 2000);
    }

    #[test]
    fn test_sample_config_round_trips() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.analytics.unknown_country, "XX");
        assert_eq!(parsed.links.code_length, 6);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: StaticConfig = toml::from_str(
            r#"
            [auth]
            jwt_secret = "s3cret"
            max_sessions = 5
            "#,
        )
        .unwrap();
        assert_eq!(parsed.auth.jwt_secret, "s3cret");
        assert_eq!(parsed.auth.max_sessions, 5);
        assert_eq!(parsed.auth.refresh_token_days, 7);
        assert_eq!(parsed.database.retry_count, 3);
    }

    #[test]
    fn test_save_to_file_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        StaticConfig::default().save_to_file(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[analytics]"));
    }
}
