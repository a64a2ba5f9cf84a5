//! 时间线远程 API

use crate::consult::error::{ConsultError, ConsultResult};
use crate::consult::remote::{Filter, InsertedRecord, Order, RemoteStore};
use crate::consult::timeline::models::TimelineView;
use crate::consult::timeline::service::normalize_rows;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub const TABLE_APPLICATION_TIMELINE: &str = "application_timeline";

pub struct TimelineApi {
    store: Arc<dyn RemoteStore>,
}

impl TimelineApi {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// 读取某个申请的时间线并规整
    pub async fn list_timeline(&self, application_id: &str) -> ConsultResult<TimelineView> {
        info!("[TimelineAPI] 📡 请求申请时间线，申请ID: {}", application_id);
        let rows = self
            .store
            .select(
                TABLE_APPLICATION_TIMELINE,
                &[Filter::eq("application_id", application_id)],
                Some(&Order::desc("date")),
            )
            .await?;
        normalize_rows(rows)
    }

    /// 记录一条时间线事件
    pub async fn record_event(
        &self,
        application_id: &str,
        status: &str,
        note: Option<&str>,
    ) -> ConsultResult<InsertedRecord> {
        if status.trim().is_empty() {
            return Err(ConsultError::validation("时间线状态不能为空"));
        }
        info!(
            "[TimelineAPI] 📝 记录时间线事件，申请ID: {}, 状态: {}",
            application_id, status
        );
        self.store
            .insert(
                TABLE_APPLICATION_TIMELINE,
                json!({
                    "application_id": application_id,
                    "status": status.trim(),
                    "note": note,
                    "date": Utc::now().to_rfc3339(),
                }),
            )
            .await
    }
}
