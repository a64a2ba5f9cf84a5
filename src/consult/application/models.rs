//! 留学申请与咨询预约模型

use crate::consult::serialization::{deserialize_id, deserialize_opt_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 优先级
///
/// 不认识的取值一律按 `Medium` 处理（宽松策略），不会拒绝请求。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Priority::coerce).unwrap_or_default())
    }
}

/// 用户填写的申请表
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// 目标国家/地区
    pub destination: String,
    /// 目标专业或项目
    pub program: String,
    /// 入学季，例如 "2025 Fall"
    #[serde(default)]
    pub intake: Option<String>,
    /// 原始优先级文本，提交时宽松转换
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// 已提交的申请
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub destination: String,
    pub program: String,
    #[serde(default)]
    pub intake: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// 咨询预约表单
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsultationDraft {
    /// 指定顾问，不指定时由后台分配
    #[serde(default)]
    pub advisor_id: Option<String>,
    pub topic: String,
    #[serde(default)]
    pub preferred_time: Option<String>,
    #[serde(default)]
    pub priority: String,
    pub contact_email: String,
}

/// 已提交的咨询预约
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationRequest {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub user_id: String,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub advisor_id: Option<String>,
    pub topic: String,
    #[serde(default)]
    pub preferred_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    pub contact_email: String,
    #[serde(default)]
    pub status: Option<String>,
}
