//! 重置码投递
//!
//! - [`LogNotifier`]: 只记录日志，开发环境使用
//! - [`BrevoNotifier`]: 通过 Brevo 事务邮件 API 发送
//! - `RecordingNotifier`: 保存在内存中，供测试读取（`test-util` 特性）

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-util"))]
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};
use ureq::Agent;

use crate::config::NotificationConfig;
use crate::errors::{LinkpulseError, Result};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_password_reset_code(&self, email: &str, code: &str) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// 根据配置创建通知实现
pub fn create_notifier(config: &NotificationConfig) -> Arc<dyn Notifier> {
    match config.provider.as_str() {
        "brevo" if !config.api_key.is_empty() => Arc::new(BrevoNotifier::new(config)),
        "brevo" => {
            warn!("Brevo notifier selected but api_key is empty, falling back to log notifier");
            Arc::new(LogNotifier)
        }
        "log" => Arc::new(LogNotifier),
        other => {
            warn!("Unknown notification provider '{}', using log notifier", other);
            Arc::new(LogNotifier)
        }
    }
}

/// 仅记录日志，不输出重置码
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_password_reset_code(&self, email: &str, _code: &str) -> Result<()> {
        info!("Password reset code issued for {}", email);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[derive(Serialize)]
struct BrevoSender<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct BrevoRecipient<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoPayload<'a> {
    sender: BrevoSender<'a>,
    to: Vec<BrevoRecipient<'a>>,
    subject: &'a str,
    html_content: String,
}

/// Brevo 事务邮件
pub struct BrevoNotifier {
    client: Arc<BrevoClient>,
}

struct BrevoClient {
    agent: Agent,
    api_url: String,
    api_key: String,
    sender_email: String,
    sender_name: String,
}

impl BrevoNotifier {
    pub fn new(config: &NotificationConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            client: Arc::new(BrevoClient {
                agent,
                api_url: config.api_url.clone(),
                api_key: config.api_key.clone(),
                sender_email: config.sender_email.clone(),
                sender_name: config.sender_name.clone(),
            }),
        }
    }
}

impl BrevoClient {
    fn send_sync(&self, email: &str, code: &str) -> Result<()> {
        let payload = BrevoPayload {
            sender: BrevoSender {
                name: &self.sender_name,
                email: &self.sender_email,
            },
            to: vec![BrevoRecipient { email }],
            subject: "Your password reset code",
            html_content: format!(
                "<h1>Password reset</h1><p>Your one-time code is:</p><h2>{}</h2><p>This code expires in 10 minutes.</p>",
                code
            ),
        };

        let response = self
            .agent
            .post(&self.api_url)
            .header("accept", "application/json")
            .header("api-key", &self.api_key)
            .send_json(&payload)
            .map_err(|e| LinkpulseError::notification(format!("邮件服务请求失败: {}", e)))?;

        // 只有 201 Created 表示已受理
        let status = response.status().as_u16();
        if status != 201 {
            return Err(LinkpulseError::notification(format!(
                "邮件服务返回异常状态码: {}",
                status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for BrevoNotifier {
    async fn send_password_reset_code(&self, email: &str, code: &str) -> Result<()> {
        let client = self.client.clone();
        let to = email.to_string();
        let code = code.to_string();

        // ureq 是同步客户端，放到阻塞线程池执行
        tokio::task::spawn_blocking(move || client.send_sync(&to, &code))
            .await
            .map_err(|e| LinkpulseError::notification(format!("发送任务异常退出: {}", e)))??;

        info!("Password reset code sent to {}", email);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "brevo"
    }
}

/// 保存已发送重置码的通知实现（测试用）
#[cfg(any(test, feature = "test-util"))]
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: Mutex<bool>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后的发送全部失败
    pub fn fail_next_sends(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    /// 最近一次发给该邮箱的重置码
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_password_reset_code(&self, email: &str, code: &str) -> Result<()> {
        if *self.fail.lock() {
            return Err(LinkpulseError::notification("delivery refused"));
        }
        self.sent.lock().push((email.to_string(), code.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};

    async fn fake_brevo(req: HttpRequest, body: web::Json<serde_json::Value>) -> HttpResponse {
        let key = req
            .headers()
            .get("api-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if key != "good-key" {
            return HttpResponse::Unauthorized().finish();
        }
        let html = body["htmlContent"].as_str().unwrap_or_default();
        if body["to"][0]["email"] == "user@example.com" && html.contains("123456") {
            HttpResponse::Created().json(serde_json::json!({"messageId": "m-1"}))
        } else {
            HttpResponse::Ok().finish()
        }
    }

    fn start_fake_brevo() -> String {
        let server = HttpServer::new(|| App::new().route("/v3/smtp/email", web::post().to(fake_brevo)))
            .workers(1)
            .bind(("127.0.0.1", 0))
            .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{}/v3/smtp/email", addr)
    }

    fn brevo_config(api_url: String, api_key: &str) -> NotificationConfig {
        NotificationConfig {
            provider: "brevo".to_string(),
            api_url,
            api_key: api_key.to_string(),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[actix_web::test]
    async fn test_brevo_success_requires_created() {
        let url = start_fake_brevo();

        let ok = BrevoNotifier::new(&brevo_config(url.clone(), "good-key"));
        assert!(ok.send_password_reset_code("user@example.com", "123456").await.is_ok());

        // 200 也视为失败
        assert!(matches!(
            ok.send_password_reset_code("other@example.com", "123456").await,
            Err(LinkpulseError::Notification(_))
        ));

        let bad_key = BrevoNotifier::new(&brevo_config(url, "bad-key"));
        assert!(matches!(
            bad_key.send_password_reset_code("user@example.com", "123456").await,
            Err(LinkpulseError::Notification(_))
        ));
    }

    #[actix_web::test]
    async fn test_brevo_unreachable_is_error() {
        let notifier = BrevoNotifier::new(&brevo_config("http://127.0.0.1:1/".to_string(), "k"));
        assert!(notifier.send_password_reset_code("a@b.co", "000000").await.is_err());
    }

    #[test]
    fn test_create_notifier_selection() {
        let mut config = NotificationConfig::default();
        assert_eq!(create_notifier(&config).name(), "log");

        config.provider = "brevo".to_string();
        assert_eq!(create_notifier(&config).name(), "log");

        config.api_key = "k".to_string();
        assert_eq!(create_notifier(&config).name(), "brevo");
    }

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.send_password_reset_code("a@b.co", "111111").await.unwrap();
        notifier.send_password_reset_code("a@b.co", "222222").await.unwrap();
        assert_eq!(notifier.last_code_for("a@b.co").as_deref(), Some("222222"));
        assert_eq!(notifier.sent_count(), 2);

        notifier.fail_next_sends(true);
        assert!(notifier.send_password_reset_code("a@b.co", "3").await.is_err());
    }
}
