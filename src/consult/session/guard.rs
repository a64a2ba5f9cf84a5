//! 会话有效期守卫
//!
//! 状态：valid → expiring-soon（剩余 < 5 分钟）→ expired（剩余 ≤ 0）。
//! 每次会话对象变化时重新评估；只在进入新状态时触发回调。
//! 长时间没有会话变化时可选开启定时巡检（`spawn_watch`）。

use crate::consult::auth::{AuthBackend, Session};
use crate::consult::error::{ConsultError, ConsultResult};
use crate::consult::session::listener::{EmptySessionListener, SessionListener};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

/// 剩余有效期低于该值（秒）时提示即将过期
pub const EXPIRY_WARNING_WINDOW_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessState {
    Valid,
    ExpiringSoon,
    Expired,
}

/// 根据过期时间判断会话状态；没有过期时间视为有效
pub fn classify_freshness(expires_at: Option<i64>, now: i64) -> FreshnessState {
    let Some(expires_at) = expires_at else {
        return FreshnessState::Valid;
    };
    let remaining = expires_at - now;
    if remaining <= 0 {
        FreshnessState::Expired
    } else if remaining < EXPIRY_WARNING_WINDOW_SECS {
        FreshnessState::ExpiringSoon
    } else {
        FreshnessState::Valid
    }
}

pub struct SessionGuard {
    auth: Arc<dyn AuthBackend>,
    listener: Arc<dyn SessionListener>,
    state: Mutex<FreshnessState>,
}

impl SessionGuard {
    pub fn new(auth: Arc<dyn AuthBackend>) -> Self {
        Self::with_listener(auth, Arc::new(EmptySessionListener))
    }

    pub fn with_listener(auth: Arc<dyn AuthBackend>, listener: Arc<dyn SessionListener>) -> Self {
        Self {
            auth,
            listener,
            state: Mutex::new(FreshnessState::Valid),
        }
    }

    pub async fn state(&self) -> FreshnessState {
        *self.state.lock().await
    }

    /// 会话对象变化时调用
    pub async fn on_session_changed(
        &self,
        session: Option<&Session>,
    ) -> ConsultResult<FreshnessState> {
        self.evaluate_at(session, Utc::now().timestamp()).await
    }

    /// 以指定时间评估会话状态
    pub async fn evaluate_at(
        &self,
        session: Option<&Session>,
        now: i64,
    ) -> ConsultResult<FreshnessState> {
        // 没有会话时无需守卫，复位即可
        let Some(session) = session else {
            *self.state.lock().await = FreshnessState::Valid;
            return Ok(FreshnessState::Valid);
        };

        let expires_at = session.expiry();
        let next = classify_freshness(expires_at, now);
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut *state, next)
        };
        if previous == next {
            debug!("[SessionGuard] 会话状态未变化: {:?}", next);
            return Ok(next);
        }
        info!(
            "[SessionGuard] 会话状态变化: {:?} -> {:?}，用户ID: {}",
            previous, next, session.user.id
        );

        match next {
            FreshnessState::Valid => {}
            FreshnessState::ExpiringSoon => {
                let remaining = expires_at.map(|e| e - now).unwrap_or_default();
                warn!("[SessionGuard] ⚠️ 会话将在 {} 秒后过期", remaining);
                self.listener.on_session_expiring(remaining).await;
            }
            FreshnessState::Expired => {
                warn!("[SessionGuard] ⛔ 会话已过期，强制登出");
                if let Err(e) = self.auth.sign_out().await {
                    error!("[SessionGuard] 强制登出失败: {}", e);
                }
                self.listener.on_session_expired().await;
            }
        }
        Ok(next)
    }

    /// 定时巡检当前会话，弥补会话长时间不变化时检测不到过期的问题
    ///
    /// 周期为 0 时返回校验错误
    pub fn spawn_watch(self: Arc<Self>, period: Duration) -> ConsultResult<JoinHandle<()>> {
        if period.is_zero() {
            return Err(ConsultError::validation("会话巡检周期不能为 0"));
        }
        info!("[SessionGuard] 启动会话巡检，周期: {:?}", period);
        Ok(tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                let session = self.auth.current_session().await;
                if let Err(e) = self.on_session_changed(session.as_ref()).await {
                    error!("[SessionGuard] 会话巡检失败: {}", e);
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consult::testing::{session_expiring_at, FakeAuth, RecordingSessionListener};
    use std::sync::atomic::Ordering;

    const NOW: i64 = 1_700_000_000;

    fn guard_with(auth: Arc<FakeAuth>) -> (SessionGuard, Arc<RecordingSessionListener>) {
        let listener = Arc::new(RecordingSessionListener::default());
        (SessionGuard::with_listener(auth, listener.clone()), listener)
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(classify_freshness(None, NOW), FreshnessState::Valid);
        assert_eq!(classify_freshness(Some(NOW + 300), NOW), FreshnessState::Valid);
        assert_eq!(classify_freshness(Some(NOW + 299), NOW), FreshnessState::ExpiringSoon);
        assert_eq!(classify_freshness(Some(NOW + 1), NOW), FreshnessState::ExpiringSoon);
        assert_eq!(classify_freshness(Some(NOW), NOW), FreshnessState::Expired);
        assert_eq!(classify_freshness(Some(NOW - 1), NOW), FreshnessState::Expired);
    }

    #[tokio::test]
    async fn expiring_soon_warns_without_sign_out() {
        let session = session_expiring_at("u-1", NOW + 200);
        let auth = Arc::new(FakeAuth::with_session(session.clone()));
        let (guard, listener) = guard_with(auth.clone());

        let state = guard.evaluate_at(Some(&session), NOW).await.unwrap();

        assert_eq!(state, FreshnessState::ExpiringSoon);
        assert_eq!(auth.sign_out_calls.load(Ordering::SeqCst), 0);
        assert_eq!(*listener.expiring.lock().await, vec![200]);
        assert_eq!(listener.expired.load(Ordering::SeqCst), 0);
        assert!(auth.current_session().await.is_some());
    }

    #[tokio::test]
    async fn expired_session_is_signed_out() {
        let session = session_expiring_at("u-1", NOW - 1);
        let auth = Arc::new(FakeAuth::with_session(session.clone()));
        let (guard, listener) = guard_with(auth.clone());

        let state = guard.evaluate_at(Some(&session), NOW).await.unwrap();

        assert_eq!(state, FreshnessState::Expired);
        assert_eq!(auth.sign_out_calls.load(Ordering::SeqCst), 1);
        assert_eq!(listener.expired.load(Ordering::SeqCst), 1);
        assert!(auth.current_session().await.is_none());
    }

    #[tokio::test]
    async fn notices_fire_only_on_state_entry() {
        let session = session_expiring_at("u-1", NOW + 200);
        let auth = Arc::new(FakeAuth::with_session(session.clone()));
        let (guard, listener) = guard_with(auth);

        guard.evaluate_at(Some(&session), NOW).await.unwrap();
        guard.evaluate_at(Some(&session), NOW + 10).await.unwrap();
        guard.evaluate_at(Some(&session), NOW + 20).await.unwrap();

        assert_eq!(listener.expiring.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn refreshed_session_returns_to_valid() {
        let old = session_expiring_at("u-1", NOW + 60);
        let auth = Arc::new(FakeAuth::with_session(old.clone()));
        let (guard, listener) = guard_with(auth);

        guard.evaluate_at(Some(&old), NOW).await.unwrap();
        let refreshed = session_expiring_at("u-1", NOW + 3600);
        let state = guard.evaluate_at(Some(&refreshed), NOW).await.unwrap();

        assert_eq!(state, FreshnessState::Valid);
        assert_eq!(guard.state().await, FreshnessState::Valid);
        // 再次临近过期会重新提示
        guard.evaluate_at(Some(&refreshed), NOW + 3500).await.unwrap();
        assert_eq!(listener.expiring.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn no_session_resets_without_notice() {
        let auth = Arc::new(FakeAuth::default());
        let (guard, listener) = guard_with(auth.clone());

        let state = guard.evaluate_at(None, NOW).await.unwrap();

        assert_eq!(state, FreshnessState::Valid);
        assert_eq!(auth.sign_out_calls.load(Ordering::SeqCst), 0);
        assert!(listener.expiring.lock().await.is_empty());
    }

    #[tokio::test]
    async fn watch_detects_expiry_without_session_change() {
        let expired = session_expiring_at("u-1", Utc::now().timestamp() - 5);
        let auth = Arc::new(FakeAuth::with_session(expired));
        let (guard, listener) = guard_with(auth.clone());
        let guard = Arc::new(guard);

        let handle = guard.clone().spawn_watch(Duration::from_millis(10)).unwrap();
        for _ in 0..50 {
            if listener.expired.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert_eq!(listener.expired.load(Ordering::SeqCst), 1);
        assert_eq!(auth.sign_out_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn watch_rejects_zero_period() {
        let (guard, _listener) = guard_with(Arc::new(FakeAuth::default()));

        let err = Arc::new(guard).spawn_watch(Duration::ZERO).unwrap_err();

        assert!(matches!(err, ConsultError::ValidationFailure(_)));
    }
}
