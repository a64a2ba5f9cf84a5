//! 咨询客户端核心实现模块
//!
//! 对外的统一入口：持有配置、远程协作方、会话守卫和各业务 API。
//! 生命周期：`init()` 校验会话并启动后台任务，`teardown()` 停止所有后台任务。

use crate::consult::advisor::{
    AdvisorApi, AdvisorAvailability, AdvisorPoller, AdvisorSnapshot, DestinationStat,
};
use crate::consult::application::{
    Application, ApplicationDraft, ApplicationService, ConsultationDraft, ConsultationRequest,
};
use crate::consult::auth::{AuthBackend, HttpAuthBackend, Session};
use crate::consult::chat::{ChatApi, ChatMessage, MessageAggregator, MessageFeed};
use crate::consult::config::{ClientConfig, Preferences};
use crate::consult::error::{ConsultError, ConsultResult};
use crate::consult::remote::{HttpRemoteStore, RemoteStore};
use crate::consult::session::{
    EmptySessionListener, FreshnessState, SessionGuard, SessionListener,
};
use crate::consult::timeline::{TimelineApi, TimelineView};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 咨询客户端
pub struct ConsultClient {
    config: ClientConfig,
    auth: Arc<dyn AuthBackend>,
    session_guard: Arc<SessionGuard>,
    chat_api: Arc<ChatApi>,
    aggregator: MessageAggregator,
    timeline_api: TimelineApi,
    application_service: ApplicationService,
    advisor_api: Arc<AdvisorApi>,
    advisor_poller: Option<AdvisorPoller>,
    session_watch: Option<JoinHandle<()>>,
}

impl ConsultClient {
    /// 使用 HTTP 协作方创建客户端
    pub fn new(config: ClientConfig) -> ConsultResult<Self> {
        Self::with_listener(config, Arc::new(EmptySessionListener))
    }

    /// 使用 HTTP 协作方创建客户端（带会话监听器）
    pub fn with_listener(
        config: ClientConfig,
        listener: Arc<dyn SessionListener>,
    ) -> ConsultResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let auth: Arc<dyn AuthBackend> = Arc::new(HttpAuthBackend::new(
            http_client.clone(),
            config.api_base_url.clone(),
            config.anon_key.clone(),
        ));
        let store: Arc<dyn RemoteStore> = Arc::new(HttpRemoteStore::new(
            http_client,
            config.api_base_url.clone(),
            config.anon_key.clone(),
            auth.clone(),
        ));
        Ok(Self::with_backends(config, store, auth, listener))
    }

    /// 使用自定义协作方创建客户端
    pub fn with_backends(
        config: ClientConfig,
        store: Arc<dyn RemoteStore>,
        auth: Arc<dyn AuthBackend>,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        info!("[Client] 创建咨询客户端，服务地址: {}", config.api_base_url);
        let chat_api = Arc::new(ChatApi::new(store.clone()));
        Self {
            session_guard: Arc::new(SessionGuard::with_listener(auth.clone(), listener)),
            aggregator: MessageAggregator::new(chat_api.clone()),
            chat_api,
            timeline_api: TimelineApi::new(store.clone()),
            application_service: ApplicationService::new(store.clone(), auth.clone()),
            advisor_api: Arc::new(AdvisorApi::new(store)),
            advisor_poller: None,
            session_watch: None,
            auth,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn preferences(&self) -> Preferences {
        self.config.preferences
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        info!("[Client] 更新偏好: {:?}", preferences);
        self.config.preferences = preferences;
    }

    /// 初始化：检查已有会话，启动顾问列表刷新和（可选的）会话巡检
    pub async fn init(&mut self) -> ConsultResult<()> {
        let session = self.auth.current_session().await;
        self.session_guard.on_session_changed(session.as_ref()).await?;

        if self.advisor_poller.is_none() {
            self.advisor_poller = Some(AdvisorPoller::spawn(
                self.advisor_api.clone(),
                self.config.advisor_refresh_interval,
            )?);
        }
        if self.session_watch.is_none() {
            if let Some(period) = self.config.session_check_interval {
                self.session_watch = Some(self.session_guard.clone().spawn_watch(period)?);
            }
        }
        info!("[Client] ✅ 初始化完成");
        Ok(())
    }

    /// 停止所有后台任务；可重复调用
    pub fn teardown(&mut self) {
        if let Some(poller) = self.advisor_poller.take() {
            poller.stop();
        }
        if let Some(handle) = self.session_watch.take() {
            handle.abort();
        }
        info!("[Client] 后台任务已停止");
    }

    pub fn is_running(&self) -> bool {
        self.advisor_poller
            .as_ref()
            .map(AdvisorPoller::is_running)
            .unwrap_or(false)
    }

    // ========== 认证 ==========

    pub async fn sign_in(&self, email: &str, password: &str) -> ConsultResult<Session> {
        let session = self.auth.sign_in_with_password(email, password).await?;
        self.session_guard.on_session_changed(Some(&session)).await?;
        Ok(session)
    }

    pub async fn sign_out(&self) -> ConsultResult<()> {
        self.auth.sign_out().await?;
        self.session_guard.on_session_changed(None).await?;
        Ok(())
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.auth.current_session().await
    }

    /// 会话对象发生变化（例如 token 刷新）时由宿主调用
    pub async fn notify_session_changed(&self) -> ConsultResult<FreshnessState> {
        let session = self.auth.current_session().await;
        self.session_guard.on_session_changed(session.as_ref()).await
    }

    async fn require_session(&self) -> ConsultResult<Session> {
        let session = self
            .auth
            .current_session()
            .await
            .ok_or_else(|| ConsultError::auth_required("请先登录"))?;
        // 过期会话会在这里被强制登出
        if self.session_guard.on_session_changed(Some(&session)).await? == FreshnessState::Expired {
            return Err(ConsultError::auth_required("登录已过期，请重新登录"));
        }
        Ok(session)
    }

    // ========== 聊天 ==========

    /// 当前用户全部聊天室的消息，按时间倒序
    pub async fn get_message_feed(&self) -> ConsultResult<MessageFeed> {
        let session = self.require_session().await?;
        let feed = self
            .aggregator
            .aggregate(&session.user.id, session.user.role())
            .await?;
        if feed.is_partial() {
            warn!(
                "[Client] ⚠️ 消息聚合部分失败，失败聊天室: {:?}",
                feed.failures.iter().map(|f| &f.room_id).collect::<Vec<_>>()
            );
        }
        Ok(feed)
    }

    pub async fn send_message(
        &self,
        room_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> ConsultResult<ChatMessage> {
        let session = self.require_session().await?;
        self.chat_api
            .send_message(room_id, &session.user, text, reply_to)
            .await
    }

    // ========== 申请与时间线 ==========

    pub async fn submit_application(&self, draft: &ApplicationDraft) -> ConsultResult<Application> {
        self.require_session().await?;
        self.application_service.submit_application(draft).await
    }

    pub async fn request_consultation(
        &self,
        draft: &ConsultationDraft,
    ) -> ConsultResult<ConsultationRequest> {
        self.require_session().await?;
        self.application_service.request_consultation(draft).await
    }

    pub async fn list_my_applications(&self) -> ConsultResult<Vec<Application>> {
        self.require_session().await?;
        self.application_service.list_my_applications().await
    }

    pub async fn get_timeline(&self, application_id: &str) -> ConsultResult<TimelineView> {
        self.require_session().await?;
        self.timeline_api.list_timeline(application_id).await
    }

    // ========== 顾问与统计 ==========

    /// 最近一次刷新得到的顾问列表；未启动刷新或首次刷新尚未完成时直接请求一次
    pub async fn available_advisors(&self) -> ConsultResult<Vec<AdvisorAvailability>> {
        let snapshot = self
            .advisor_poller
            .as_ref()
            .filter(|poller| poller.is_running())
            .and_then(AdvisorPoller::latest);
        match snapshot {
            Some(advisors) => Ok(advisors),
            None => self.advisor_api.get_available_advisors().await,
        }
    }

    pub fn subscribe_advisors(&self) -> Option<tokio::sync::watch::Receiver<AdvisorSnapshot>> {
        self.advisor_poller.as_ref().map(AdvisorPoller::subscribe)
    }

    pub async fn destination_stats(&self) -> ConsultResult<Vec<DestinationStat>> {
        self.advisor_api.get_destination_stats().await
    }
}

impl Drop for ConsultClient {
    fn drop(&mut self) {
        if let Some(handle) = self.session_watch.take() {
            handle.abort();
        }
    }
}
