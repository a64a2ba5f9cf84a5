//! 申请时间线模型定义

use crate::consult::error::ConsultError;
use crate::consult::serialization::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 时间线事件（由服务端事件日志产生，记录后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub date: DateTime<Utc>,
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// 状态分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusBucket {
    Success,
    Failure,
    Pending,
}

impl StatusBucket {
    /// 按状态名分类（忽略大小写）
    pub fn classify(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "approved" | "completed" => StatusBucket::Success,
            "rejected" | "cancelled" => StatusBucket::Failure,
            _ => StatusBucket::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusBucket::Success => "success",
            StatusBucket::Failure => "failure",
            StatusBucket::Pending => "pending",
        }
    }

    /// 渲染用图标名
    pub fn icon(&self) -> &'static str {
        match self {
            StatusBucket::Success => "check-circle",
            StatusBucket::Failure => "x-circle",
            StatusBucket::Pending => "clock",
        }
    }

    /// 渲染用颜色标记
    pub fn color(&self) -> &'static str {
        match self {
            StatusBucket::Success => "green",
            StatusBucket::Failure => "red",
            StatusBucket::Pending => "amber",
        }
    }
}

/// 带分类标注的时间线条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    #[serde(flatten)]
    pub event: TimelineEvent,
    pub bucket: StatusBucket,
}

/// 时间线展示结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "entries", rename_all = "snake_case")]
pub enum TimelineView {
    /// 没有任何事件
    NoEvents,
    /// 按时间倒序排列的事件
    Events(Vec<TimelineEntry>),
}

impl TimelineView {
    pub fn entries(&self) -> &[TimelineEntry] {
        match self {
            TimelineView::NoEvents => &[],
            TimelineView::Events(entries) => entries,
        }
    }
}

/// `application_timeline` 表的行
///
/// 事件时间优先取 `date`，没有时退回 `created_at`。
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineEventRow {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl TryFrom<TimelineEventRow> for TimelineEvent {
    type Error = ConsultError;

    fn try_from(row: TimelineEventRow) -> Result<Self, Self::Error> {
        if row.status.trim().is_empty() {
            return Err(ConsultError::validation("时间线事件缺少状态"));
        }
        let raw_date = row
            .date
            .or(row.created_at)
            .ok_or_else(|| ConsultError::validation("时间线事件缺少时间"))?;
        Ok(TimelineEvent {
            date: parse_timestamp(&raw_date)?,
            status: row.status,
            note: row.note.filter(|n| !n.trim().is_empty()),
        })
    }
}
