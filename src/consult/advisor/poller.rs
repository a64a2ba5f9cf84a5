//! 顾问在线列表定时刷新
//!
//! 固定周期拉取，不做退避；拉取失败保留上一次结果。停止或销毁时取消后台任务。
//! 第一次拉取成功之前快照为 None，和“没有可用顾问”区分开。

use crate::consult::advisor::api::AdvisorApi;
use crate::consult::advisor::models::AdvisorAvailability;
use crate::consult::error::{ConsultError, ConsultResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// 默认刷新周期
pub const ADVISOR_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// 顾问列表快照；None 表示尚未加载
pub type AdvisorSnapshot = Option<Vec<AdvisorAvailability>>;

pub struct AdvisorPoller {
    receiver: watch::Receiver<AdvisorSnapshot>,
    handle: JoinHandle<()>,
}

impl AdvisorPoller {
    /// 启动后台刷新任务，第一次拉取立即执行
    ///
    /// 周期为 0 时返回校验错误
    pub fn spawn(api: Arc<AdvisorApi>, period: Duration) -> ConsultResult<Self> {
        if period.is_zero() {
            return Err(ConsultError::validation("顾问列表刷新周期不能为 0"));
        }
        let (sender, receiver) = watch::channel(None);
        info!("[AdvisorPoller] 启动顾问列表刷新，周期: {:?}", period);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                match api.get_available_advisors().await {
                    Ok(advisors) => {
                        debug!("[AdvisorPoller] 刷新完成，顾问数: {}", advisors.len());
                        if sender.send(Some(advisors)).is_err() {
                            // 所有订阅方都已释放
                            break;
                        }
                    }
                    Err(e) => warn!("[AdvisorPoller] ⚠️ 刷新失败，保留上次结果: {}", e),
                }
            }
        });
        Ok(Self { receiver, handle })
    }

    /// 最近一次成功拉取的顾问列表；尚未拉取成功时为 None
    pub fn latest(&self) -> AdvisorSnapshot {
        self.receiver.borrow().clone()
    }

    /// 订阅列表变化
    pub fn subscribe(&self) -> watch::Receiver<AdvisorSnapshot> {
        self.receiver.clone()
    }

    pub fn stop(&self) {
        if !self.handle.is_finished() {
            info!("[AdvisorPoller] 停止顾问列表刷新");
            self.handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for AdvisorPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
