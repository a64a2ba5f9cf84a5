use crate::consult::error::{ConsultError, ConsultResult};
use crate::consult::serialization::jwt_expiry;
use crate::consult::types::{handle_http_response, parse_row};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// 用户角色：学生客户或顾问（后台管理员）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Client,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Client => "client",
            UserRole::Admin => "admin",
        }
    }
}

/// 认证用户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    /// 角色写在 user_metadata.role，缺失或未知时按学生处理
    pub fn role(&self) -> UserRole {
        match self.user_metadata.get("role").and_then(|v| v.as_str()) {
            Some(r) if r.eq_ignore_ascii_case("admin") => UserRole::Admin,
            _ => UserRole::Client,
        }
    }

    pub fn display_name(&self) -> String {
        self.user_metadata
            .get("full_name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.id.clone())
    }
}

/// 登录会话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// 过期时间（epoch 秒）
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl Session {
    /// 会话过期时间；服务端未返回 expires_at 时从 JWT 的 exp 推导
    pub fn expiry(&self) -> Option<i64> {
        self.expires_at.or_else(|| jwt_expiry(&self.access_token))
    }

    /// 按签发时间补全 expires_at
    ///
    /// 优先级：expires_at、JWT exp、签发时间 + expires_in。
    pub fn with_issue_time(mut self, issued_at: i64) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = jwt_expiry(&self.access_token)
                .or_else(|| self.expires_in.map(|secs| issued_at + secs));
        }
        self
    }
}

/// 认证协作方
///
/// 只暴露当前会话、登录、登出三种能力，测试中可替换为内存实现。
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// 当前会话（未登录时为 None）
    async fn current_session(&self) -> Option<Session>;

    /// 邮箱密码登录，成功后成为当前会话
    async fn sign_in_with_password(&self, email: &str, password: &str) -> ConsultResult<Session>;

    /// 登出并清空本地会话
    async fn sign_out(&self) -> ConsultResult<()>;
}

#[derive(Debug, Serialize)]
struct PasswordGrantRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// 基于 HTTP 的认证实现
pub struct HttpAuthBackend {
    client: reqwest::Client,
    api_base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
}

impl HttpAuthBackend {
    pub fn new(client: reqwest::Client, api_base_url: String, anon_key: String) -> Self {
        Self {
            client,
            api_base_url,
            anon_key,
            session: RwLock::new(None),
        }
    }

    /// 直接设置会话（例如从外部存储恢复）
    pub async fn set_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> ConsultResult<Session> {
        let session = request_password_grant(
            &self.client,
            &self.api_base_url,
            &self.anon_key,
            email,
            password,
        )
        .await?;
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> ConsultResult<()> {
        // 无论远程登出是否成功，本地会话都要清掉
        let previous = self.session.write().await.take();
        let Some(session) = previous else {
            debug!("[Auth] 当前没有会话，跳过登出请求");
            return Ok(());
        };

        let url = format!("{}/auth/v1/logout", self.api_base_url);
        info!("[Auth] 🚪 正在登出，用户ID: {}", session.user.id);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await;

        match response {
            Ok(resp) => {
                if let Err(e) = handle_http_response(resp, "登出").await {
                    warn!("[Auth] 远程登出失败（本地会话已清除）: {}", e);
                }
            }
            Err(e) => warn!("[Auth] 登出请求失败（本地会话已清除）: {}", e),
        }
        Ok(())
    }
}

async fn request_password_grant(
    client: &reqwest::Client,
    api_base_url: &str,
    anon_key: &str,
    email: &str,
    password: &str,
) -> ConsultResult<Session> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ConsultError::validation("邮箱和密码不能为空"));
    }
    let url = format!("{}/auth/v1/token?grant_type=password", api_base_url);

    info!("[Auth] 🔐 正在登录...");
    let issued_at = Utc::now().timestamp();
    debug!("[Auth]   URL: {}", url);
    debug!("[Auth]   邮箱: {}", email);

    let response = client
        .post(&url)
        .header("apikey", anon_key)
        .header("Content-Type", "application/json")
        .json(&PasswordGrantRequest { email, password })
        .send()
        .await?;

    let body = handle_http_response(response, "登录").await?;
    let session = parse_row::<Session>(body, "登录会话")?.with_issue_time(issued_at);
    info!("[Auth] ✅ 登录成功，用户ID: {}", session.user.id);
    Ok(session)
}

/// 一次性登录：不保存会话，只返回登录结果
pub async fn login_async(
    api_base_url: &str,
    anon_key: &str,
    email: &str,
    password: &str,
    timeout: Duration,
) -> ConsultResult<Session> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    request_password_grant(&client, api_base_url, anon_key, email, password).await
}
