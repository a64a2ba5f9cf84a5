//! 顾问与目的地统计模型

use crate::consult::serialization::{deserialize_id, deserialize_vec_or_null};
use serde::{Deserialize, Serialize};

/// 顾问在线状态（`get_available_admins` 的行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorAvailability {
    #[serde(alias = "id", deserialize_with = "deserialize_id")]
    pub admin_id: String,
    #[serde(alias = "full_name")]
    pub name: String,
    #[serde(default, alias = "avatar_url")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub active_chats: u32,
    #[serde(default, deserialize_with = "deserialize_vec_or_null")]
    pub specialties: Vec<String>,
}

/// 目的地申请统计（`get_destination_stats` 的行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationStat {
    pub destination: String,
    #[serde(default)]
    pub application_count: u64,
    #[serde(default)]
    pub approved_count: u64,
}

impl DestinationStat {
    /// 录取率（0.0 ~ 1.0）；没有申请时为 0
    pub fn approval_rate(&self) -> f64 {
        if self.application_count == 0 {
            return 0.0;
        }
        self.approved_count as f64 / self.application_count as f64
    }
}
