//! 顾问/统计远程 API

use crate::consult::advisor::models::{AdvisorAvailability, DestinationStat};
use crate::consult::error::ConsultResult;
use crate::consult::remote::RemoteStore;
use crate::consult::types::parse_row;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub const RPC_GET_AVAILABLE_ADMINS: &str = "get_available_admins";
pub const RPC_GET_DESTINATION_STATS: &str = "get_destination_stats";

pub struct AdvisorApi {
    store: Arc<dyn RemoteStore>,
}

impl AdvisorApi {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// 当前可接待的顾问，在线优先、接待量少的优先
    pub async fn get_available_advisors(&self) -> ConsultResult<Vec<AdvisorAvailability>> {
        let rows = self.store.call(RPC_GET_AVAILABLE_ADMINS, json!({})).await?;
        let mut advisors = rows
            .into_iter()
            .map(|row| parse_row::<AdvisorAvailability>(row, "顾问"))
            .collect::<ConsultResult<Vec<_>>>()?;
        advisors.sort_by(|a, b| {
            b.is_online
                .cmp(&a.is_online)
                .then_with(|| a.active_chats.cmp(&b.active_chats))
        });
        info!("[AdvisorAPI] ✅ 可用顾问数: {}", advisors.len());
        Ok(advisors)
    }

    pub async fn get_destination_stats(&self) -> ConsultResult<Vec<DestinationStat>> {
        let rows = self.store.call(RPC_GET_DESTINATION_STATS, json!({})).await?;
        let stats = rows
            .into_iter()
            .map(|row| parse_row::<DestinationStat>(row, "目的地统计"))
            .collect::<ConsultResult<Vec<_>>>()?;
        info!("[AdvisorAPI] ✅ 目的地统计条数: {}", stats.len());
        Ok(stats)
    }
}
