//! 单元测试共用的内存替身

use crate::consult::auth::{AuthBackend, AuthUser, Session};
use crate::consult::chat::models::{ChatMessage, ChatRoom, MessageStatus, Sender, SenderType};
use crate::consult::chat::ChatSource;
use crate::consult::error::{ConsultError, ConsultResult};
use crate::consult::remote::{inserted_record_from_rows, Filter, InsertedRecord, Order, RemoteStore, Row};
use crate::consult::session::SessionListener;
use crate::consult::auth::UserRole;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::Duration;
use tokio::sync::Mutex;

static INIT_LOGGER: Once = Once::new();

pub fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::EnvFilter;

        let filter_layer = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,consult_sdk_core_rust=debug,reqwest=info"));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_test_writer();

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    });
}

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn session_expiring_at(user_id: &str, expires_at: i64) -> Session {
    Session {
        access_token: format!("token-{}", user_id),
        refresh_token: String::new(),
        token_type: Some("bearer".into()),
        expires_in: None,
        expires_at: Some(expires_at),
        user: AuthUser {
            id: user_id.into(),
            email: Some(format!("{}@example.com", user_id)),
            user_metadata: serde_json::Value::Null,
        },
    }
}

pub fn message(id: &str, room: &str, sender_id: &str, at: i64) -> ChatMessage {
    ChatMessage {
        id: id.into(),
        text: format!("text {}", id),
        sender: Sender {
            id: sender_id.into(),
            sender_type: if sender_id.starts_with("admin") {
                SenderType::Admin
            } else {
                SenderType::Client
            },
            name: sender_id.into(),
            avatar: None,
        },
        timestamp: ts(at),
        status: MessageStatus::Sent,
        chat_id: room.into(),
        reply_to: None,
    }
}

pub fn room(id: &str, client_id: &str) -> ChatRoom {
    ChatRoom {
        id: id.into(),
        title: format!("room {}", id),
        client_id: client_id.into(),
        admin_id: Some("admin-1".into()),
        last_message: None,
        last_message_time: None,
        unread_count: 0,
        is_active: true,
        created_at: ts(1_700_000_000),
    }
}

/// 内存认证替身
#[derive(Default)]
pub struct FakeAuth {
    pub session: Mutex<Option<Session>>,
    pub sign_out_calls: AtomicUsize,
    /// 登录时返回的会话；None 表示登录失败
    pub login_result: Mutex<Option<Session>>,
}

impl FakeAuth {
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AuthBackend for FakeAuth {
    async fn current_session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> ConsultResult<Session> {
        let session = self
            .login_result
            .lock()
            .await
            .clone()
            .ok_or_else(|| ConsultError::remote(Some("Invalid login credentials".into())))?;
        *self.session.lock().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> ConsultResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.session.lock().await = None;
        Ok(())
    }
}

/// 记录回调的会话监听器
#[derive(Default)]
pub struct RecordingSessionListener {
    pub expiring: Mutex<Vec<i64>>,
    pub expired: AtomicUsize,
}

#[async_trait]
impl SessionListener for RecordingSessionListener {
    async fn on_session_expiring(&self, remaining_secs: i64) {
        self.expiring.lock().await.push(remaining_secs);
    }

    async fn on_session_expired(&self) {
        self.expired.fetch_add(1, Ordering::SeqCst);
    }
}

/// 内存远程存储替身
///
/// insert 会记录下来并回显带自增 id 的记录；RPC 和查询返回预置结果。
#[derive(Default)]
pub struct FakeStore {
    pub inserts: Mutex<Vec<(String, Row)>>,
    pub insert_errors: Mutex<HashMap<String, ConsultError>>,
    pub rpc_results: Mutex<HashMap<String, ConsultResult<Vec<Row>>>>,
    pub rpc_calls: Mutex<Vec<(String, Row)>>,
    pub select_results: Mutex<HashMap<String, Vec<Row>>>,
    pub selects: Mutex<Vec<(String, Vec<Filter>, Option<Order>)>>,
}

impl FakeStore {
    pub async fn set_rpc(&self, procedure: &str, result: ConsultResult<Vec<Row>>) {
        self.rpc_results
            .lock()
            .await
            .insert(procedure.to_string(), result);
    }

    pub async fn set_select(&self, table: &str, rows: Vec<Row>) {
        self.select_results
            .lock()
            .await
            .insert(table.to_string(), rows);
    }

    pub async fn fail_insert(&self, table: &str, err: ConsultError) {
        self.insert_errors
            .lock()
            .await
            .insert(table.to_string(), err);
    }

    pub async fn inserted(&self, table: &str) -> Vec<Row> {
        self.inserts
            .lock()
            .await
            .iter()
            .filter(|(t, _)| t == table)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn insert(&self, table: &str, record: Row) -> ConsultResult<InsertedRecord> {
        if let Some(err) = self.insert_errors.lock().await.get(table) {
            return Err(err.clone());
        }
        let mut inserts = self.inserts.lock().await;
        inserts.push((table.to_string(), record.clone()));
        let mut row = record;
        if let Some(obj) = row.as_object_mut() {
            obj.insert("id".into(), serde_json::json!(inserts.len()));
        }
        inserted_record_from_rows(table, vec![row])
    }

    async fn call(&self, procedure: &str, params: Row) -> ConsultResult<Vec<Row>> {
        self.rpc_calls
            .lock()
            .await
            .push((procedure.to_string(), params));
        self.rpc_results
            .lock()
            .await
            .get(procedure)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> ConsultResult<Vec<Row>> {
        self.selects
            .lock()
            .await
            .push((table.to_string(), filters.to_vec(), order.cloned()));
        Ok(self
            .select_results
            .lock()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default())
    }
}

/// 内存聊天数据源替身
#[derive(Default)]
pub struct FakeChatSource {
    pub rooms: Vec<ChatRoom>,
    pub rooms_error: Option<ConsultError>,
    pub messages: HashMap<String, Vec<ChatMessage>>,
    pub failing_rooms: Vec<String>,
    pub slow_rooms: Vec<String>,
    pub panicking_rooms: Vec<String>,
    pub message_calls: AtomicUsize,
}

#[async_trait]
impl ChatSource for FakeChatSource {
    async fn list_rooms_for_user(&self, _user_id: &str, _role: UserRole) -> ConsultResult<Vec<ChatRoom>> {
        match &self.rooms_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.rooms.clone()),
        }
    }

    async fn list_messages(&self, room_id: &str, _limit: usize) -> ConsultResult<Vec<ChatMessage>> {
        self.message_calls.fetch_add(1, Ordering::SeqCst);
        if self.slow_rooms.iter().any(|r| r == room_id) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.panicking_rooms.iter().any(|r| r == room_id) {
            panic!("room {} exploded", room_id);
        }
        if self.failing_rooms.iter().any(|r| r == room_id) {
            return Err(ConsultError::remote(Some(format!("room {} unavailable", room_id))));
        }
        // 不按 limit 截断，和不遵守 p_limit 的后端一样
        Ok(self.messages.get(room_id).cloned().unwrap_or_default())
    }
}
