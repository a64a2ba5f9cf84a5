//! 聊天 RPC 行结构（边界解析）
//!
//! RPC 返回的原始行先反序列化成这里的结构体，再校验转换成业务模型；
//! 格式不对的行直接返回校验错误，不会以松散 JSON 的形式进入业务层。

use crate::consult::chat::models::{ChatMessage, ChatRoom, MessageStatus, Sender, SenderType};
use crate::consult::error::{ConsultError, ConsultResult};
use crate::consult::remote::Row;
use crate::consult::serialization::{deserialize_id, deserialize_opt_id, parse_timestamp};
use crate::consult::types::parse_row;
use serde::Deserialize;

/// `get_user_chats` 返回的行
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRoomRow {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(deserialize_with = "deserialize_id")]
    pub client_id: String,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub admin_id: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_time: Option<String>,
    #[serde(default)]
    pub unread_count: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    pub created_at: String,
}

impl TryFrom<ChatRoomRow> for ChatRoom {
    type Error = ConsultError;

    fn try_from(row: ChatRoomRow) -> Result<Self, Self::Error> {
        let last_message_time = row
            .last_message_time
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;
        let unread_count = match row.unread_count {
            Some(n) if n < 0 => {
                return Err(ConsultError::validation(format!(
                    "聊天室 {} 未读数为负: {}",
                    row.id, n
                )))
            }
            Some(n) => u32::try_from(n).unwrap_or(u32::MAX),
            None => 0,
        };
        Ok(ChatRoom {
            title: row.title.unwrap_or_default(),
            client_id: row.client_id,
            admin_id: row.admin_id,
            last_message: row.last_message,
            last_message_time,
            unread_count,
            is_active: row.is_active.unwrap_or(true),
            created_at: parse_timestamp(&row.created_at)?,
            id: row.id,
        })
    }
}

/// `get_chat_messages` 返回的行
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageRow {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(alias = "text")]
    pub content: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub sender_id: String,
    pub sender_type: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub sender_avatar: Option<String>,
    #[serde(alias = "timestamp")]
    pub created_at: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(deserialize_with = "deserialize_id")]
    pub chat_id: String,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub reply_to: Option<String>,
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = ConsultError;

    fn try_from(row: ChatMessageRow) -> Result<Self, Self::Error> {
        let sender_type: SenderType = row.sender_type.parse()?;
        // 服务端已落库的消息至少是 sent
        let status = match row.status.as_deref() {
            Some(s) => s.parse()?,
            None => MessageStatus::Sent,
        };
        Ok(ChatMessage {
            sender: Sender {
                name: row.sender_name.unwrap_or_default(),
                avatar: row.sender_avatar.filter(|a| !a.is_empty()),
                id: row.sender_id,
                sender_type,
            },
            timestamp: parse_timestamp(&row.created_at)?,
            id: row.id,
            text: row.content,
            status,
            chat_id: row.chat_id,
            reply_to: row.reply_to,
        })
    }
}

pub fn parse_room_row(row: Row) -> ConsultResult<ChatRoom> {
    parse_row::<ChatRoomRow>(row, "聊天室")?.try_into()
}

pub fn parse_message_row(row: Row) -> ConsultResult<ChatMessage> {
    parse_row::<ChatMessageRow>(row, "聊天消息")?.try_into()
}
