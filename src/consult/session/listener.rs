//! 会话监听器回调接口

use async_trait::async_trait;

/// 会话状态回调
#[async_trait]
pub trait SessionListener: Send + Sync {
    /// 会话即将过期（非阻塞提示）
    async fn on_session_expiring(&self, remaining_secs: i64);

    /// 会话已过期，已强制登出（阻塞提示）
    async fn on_session_expired(&self);
}

/// 空实现（默认监听器）
pub struct EmptySessionListener;

#[async_trait]
impl SessionListener for EmptySessionListener {
    async fn on_session_expiring(&self, _remaining_secs: i64) {}
    async fn on_session_expired(&self) {}
}
