//! 聊天远程 API
//!
//! 负责聊天室列表、消息列表与发送消息相关的远程调用

use crate::consult::auth::{AuthUser, UserRole};
use crate::consult::chat::models::{ChatMessage, ChatRoom, MessageStatus, SenderType};
use crate::consult::chat::types::{parse_message_row, parse_room_row};
use crate::consult::error::{ConsultError, ConsultResult};
use crate::consult::remote::RemoteStore;
use crate::consult::serialization::generate_client_msg_id;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

pub const RPC_GET_USER_CHATS: &str = "get_user_chats";
pub const RPC_GET_CHAT_MESSAGES: &str = "get_chat_messages";
pub const TABLE_CHAT_MESSAGES: &str = "chat_messages";

/// 聚合器依赖的聊天数据源
#[async_trait]
pub trait ChatSource: Send + Sync {
    /// 用户参与的全部聊天室
    async fn list_rooms_for_user(&self, user_id: &str, role: UserRole)
        -> ConsultResult<Vec<ChatRoom>>;

    /// 某个聊天室最近的 `limit` 条消息
    async fn list_messages(&self, room_id: &str, limit: usize) -> ConsultResult<Vec<ChatMessage>>;
}

/// 聊天相关的远程 API 客户端
pub struct ChatApi {
    store: Arc<dyn RemoteStore>,
}

impl ChatApi {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// 发送文本消息
    pub async fn send_message(
        &self,
        room_id: &str,
        sender: &AuthUser,
        text: &str,
        reply_to: Option<&str>,
    ) -> ConsultResult<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ConsultError::validation("消息内容不能为空"));
        }
        if room_id.is_empty() {
            return Err(ConsultError::validation("聊天室 ID 不能为空"));
        }
        let sender_type = match sender.role() {
            UserRole::Admin => SenderType::Admin,
            UserRole::Client => SenderType::Client,
        };
        let client_msg_id = generate_client_msg_id();

        info!("[ChatAPI] 📤 发送消息，聊天室: {}", room_id);
        debug!("[ChatAPI]   clientMsgID: {}", client_msg_id);

        let record = json!({
            "chat_id": room_id,
            "content": text,
            "sender_id": sender.id,
            "sender_type": sender_type,
            "sender_name": sender.display_name(),
            "status": MessageStatus::Sent,
            "reply_to": reply_to,
            "client_msg_id": client_msg_id,
            "created_at": Utc::now().to_rfc3339(),
        });
        let inserted = self.store.insert(TABLE_CHAT_MESSAGES, record).await?;
        let message = parse_message_row(inserted.row)?;
        info!("[ChatAPI] ✅ 消息已发送，消息ID: {}", message.id);
        Ok(message)
    }
}

#[async_trait]
impl ChatSource for ChatApi {
    async fn list_rooms_for_user(
        &self,
        user_id: &str,
        role: UserRole,
    ) -> ConsultResult<Vec<ChatRoom>> {
        info!("[ChatAPI] 📡 请求聊天室列表，用户ID: {}", user_id);
        let rows = self
            .store
            .call(
                RPC_GET_USER_CHATS,
                json!({ "p_user_id": user_id, "p_role": role.as_str() }),
            )
            .await?;
        let rooms = rows
            .into_iter()
            .map(parse_room_row)
            .collect::<ConsultResult<Vec<_>>>()?;
        info!("[ChatAPI] ✅ 聊天室数: {}", rooms.len());
        Ok(rooms)
    }

    async fn list_messages(&self, room_id: &str, limit: usize) -> ConsultResult<Vec<ChatMessage>> {
        debug!("[ChatAPI] 📡 请求消息列表，聊天室: {}, limit: {}", room_id, limit);
        let rows = self
            .store
            .call(
                RPC_GET_CHAT_MESSAGES,
                json!({ "p_chat_id": room_id, "p_limit": limit }),
            )
            .await?;
        rows.into_iter().map(parse_message_row).collect()
    }
}
