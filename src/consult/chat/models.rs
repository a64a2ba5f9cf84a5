//! 聊天本地模型定义

use crate::consult::error::{ConsultError, ConsultResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 发送者类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    Client,
    Admin,
    System,
}

impl FromStr for SenderType {
    type Err = ConsultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(SenderType::Client),
            "admin" => Ok(SenderType::Admin),
            "system" => Ok(SenderType::System),
            other => Err(ConsultError::validation(format!("未知的发送者类型: {}", other))),
        }
    }
}

/// 消息状态，只能向前流转：sending → sent → delivered → read
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
        }
    }

    /// 流转到目标状态；回退视为非法，停留在原状态是幂等的
    pub fn advance(self, to: MessageStatus) -> ConsultResult<MessageStatus> {
        if to < self {
            return Err(ConsultError::validation(format!(
                "消息状态不能从 {} 回退到 {}",
                self, to
            )));
        }
        Ok(to)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = ConsultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sending" => Ok(MessageStatus::Sending),
            "sent" => Ok(MessageStatus::Sent),
            "delivered" => Ok(MessageStatus::Delivered),
            "read" => Ok(MessageStatus::Read),
            other => Err(ConsultError::validation(format!("未知的消息状态: {}", other))),
        }
    }
}

/// 消息发送者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: String,
    #[serde(rename = "type")]
    pub sender_type: SenderType,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// 聊天消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
    pub chat_id: String,
    #[serde(default)]
    pub reply_to: Option<String>,
}

impl ChatMessage {
    pub fn mark(&mut self, status: MessageStatus) -> ConsultResult<()> {
        self.status = self.status.advance(status)?;
        Ok(())
    }
}

/// 聊天室（咨询会话）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: String,
    pub title: String,
    pub client_id: String,
    /// 尚未分配顾问时为空
    pub admin_id: Option<String>,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    /// 由服务端维护
    pub unread_count: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// 消息相对当前用户的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn for_sender(sender_id: &str, current_user_id: &str) -> Self {
        if sender_id == current_user_id {
            Direction::Outgoing
        } else {
            Direction::Incoming
        }
    }
}

/// 聚合视图中的一条消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedMessage {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub direction: Direction,
}

/// 聚合时拉取失败的聊天室
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomFetchFailure {
    pub room_id: String,
    pub reason: String,
}

impl From<RoomFetchFailure> for ConsultError {
    fn from(f: RoomFetchFailure) -> Self {
        ConsultError::PartialFetchFailure {
            room_id: f.room_id,
            reason: f.reason,
        }
    }
}

/// 跨聊天室聚合结果：消息按时间倒序，失败的聊天室单独记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFeed {
    pub messages: Vec<AggregatedMessage>,
    pub failures: Vec<RoomFetchFailure>,
}

impl MessageFeed {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// 以错误形式返回失败的聊天室，便于统一上报
    pub fn partial_errors(&self) -> Vec<ConsultError> {
        self.failures.iter().cloned().map(ConsultError::from).collect()
    }
}
