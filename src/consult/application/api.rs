//! 申请/咨询远程 API

use crate::consult::application::models::{Application, ConsultationRequest};
use crate::consult::error::ConsultResult;
use crate::consult::remote::{Filter, Order, RemoteStore, Row};
use crate::consult::types::parse_row;
use std::sync::Arc;
use tracing::{debug, info};

pub const TABLE_APPLICATIONS: &str = "applications";
pub const TABLE_CONSULTATION_REQUESTS: &str = "consultation_requests";

pub struct ApplicationApi {
    store: Arc<dyn RemoteStore>,
}

impl ApplicationApi {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn insert_application(&self, record: Row) -> ConsultResult<Application> {
        info!("[ApplicationAPI] 📝 提交申请");
        debug!("[ApplicationAPI]   记录: {}", record);
        let inserted = self.store.insert(TABLE_APPLICATIONS, record).await?;
        parse_row(inserted.row, "申请")
    }

    pub async fn insert_consultation(&self, record: Row) -> ConsultResult<ConsultationRequest> {
        info!("[ApplicationAPI] 📝 提交咨询预约");
        debug!("[ApplicationAPI]   记录: {}", record);
        let inserted = self
            .store
            .insert(TABLE_CONSULTATION_REQUESTS, record)
            .await?;
        parse_row(inserted.row, "咨询预约")
    }

    /// 用户的全部申请，按创建时间倒序
    pub async fn list_applications(&self, user_id: &str) -> ConsultResult<Vec<Application>> {
        info!("[ApplicationAPI] 📡 请求申请列表，用户ID: {}", user_id);
        let rows = self
            .store
            .select(
                TABLE_APPLICATIONS,
                &[Filter::eq("user_id", user_id)],
                Some(&Order::desc("created_at")),
            )
            .await?;
        rows.into_iter().map(|row| parse_row(row, "申请")).collect()
    }
}
