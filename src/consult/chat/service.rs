//! 跨聊天室消息聚合
//!
//! 先拉取用户的全部聊天室，再为每个聊天室并发拉取最近消息（scatter），
//! 等全部分支结束后合并（gather）。单个聊天室失败只记录并跳过，不影响其他分支。

use crate::consult::auth::UserRole;
use crate::consult::chat::api::ChatSource;
use crate::consult::chat::models::{AggregatedMessage, ChatMessage, Direction, MessageFeed, RoomFetchFailure};
use crate::consult::error::ConsultResult;
use futures_util::future::join_all;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 每个聊天室拉取的消息条数上限
pub const ROOM_MESSAGE_LIMIT: usize = 50;

/// 聚合视图的排序：时间倒序，时间相同时按消息 ID 升序
pub fn feed_order(a: &ChatMessage, b: &ChatMessage) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| compare_ids(&a.id, &b.id))
}

/// 两个 ID 都是数字时按数值比较，否则按字符串比较
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// 跨聊天室消息聚合器
pub struct MessageAggregator {
    source: Arc<dyn ChatSource>,
    limit: usize,
    /// 单个聊天室的等待上限；None 时只依赖底层请求超时
    room_timeout: Option<Duration>,
}

impl MessageAggregator {
    pub fn new(source: Arc<dyn ChatSource>) -> Self {
        Self {
            source,
            limit: ROOM_MESSAGE_LIMIT,
            room_timeout: None,
        }
    }

    pub fn with_room_timeout(mut self, timeout: Duration) -> Self {
        self.room_timeout = Some(timeout);
        self
    }

    /// 聚合用户全部聊天室的消息
    ///
    /// 聊天室列表拉取失败时整体失败；没有聊天室时返回空结果。
    pub async fn aggregate(&self, user_id: &str, role: UserRole) -> ConsultResult<MessageFeed> {
        let rooms = self.source.list_rooms_for_user(user_id, role).await?;
        if rooms.is_empty() {
            info!("[Aggregator] 用户 {} 没有聊天室，返回空结果", user_id);
            return Ok(MessageFeed::default());
        }
        info!(
            "[Aggregator] 🔄 开始聚合消息，用户ID: {}, 聊天室数: {}",
            user_id,
            rooms.len()
        );

        // 每个聊天室一个独立任务，某个任务失败或 panic 不会取消其他任务
        let handles: Vec<_> = rooms
            .into_iter()
            .map(|room| {
                let source = self.source.clone();
                let limit = self.limit;
                let room_timeout = self.room_timeout;
                let room_id = room.id;
                let task_room_id = room_id.clone();
                let handle = tokio::spawn(async move {
                    let fetch = source.list_messages(&task_room_id, limit);
                    match room_timeout {
                        Some(t) => match tokio::time::timeout(t, fetch).await {
                            Ok(result) => result.map_err(|e| e.to_string()),
                            Err(_) => Err(format!("等待超过 {:?}", t)),
                        },
                        None => fetch.await.map_err(|e| e.to_string()),
                    }
                });
                async move { (room_id, handle.await) }
            })
            .collect();

        let settled = join_all(handles).await;

        let mut messages: Vec<AggregatedMessage> = Vec::new();
        let mut failures: Vec<RoomFetchFailure> = Vec::new();
        for (room_id, joined) in settled {
            let reason = match joined {
                Ok(Ok(mut batch)) => {
                    debug!("[Aggregator] 聊天室 {} 返回 {} 条消息", room_id, batch.len());
                    // 后端不一定遵守 p_limit，这里只保留最新的 limit 条
                    if batch.len() > self.limit {
                        batch.sort_by(feed_order);
                        batch.truncate(self.limit);
                    }
                    messages.extend(batch.into_iter().map(|message| AggregatedMessage {
                        direction: Direction::for_sender(&message.sender.id, user_id),
                        message,
                    }));
                    continue;
                }
                Ok(Err(reason)) => {
                    warn!("[Aggregator] ⚠️ 聊天室 {} 消息拉取失败，已跳过: {}", room_id, reason);
                    reason
                }
                Err(join_err) => {
                    error!("[Aggregator] 聊天室 {} 拉取任务异常退出: {}", room_id, join_err);
                    format!("拉取任务异常退出: {}", join_err)
                }
            };
            failures.push(RoomFetchFailure { room_id, reason });
        }

        messages.sort_by(|a, b| feed_order(&a.message, &b.message));
        info!(
            "[Aggregator] ✅ 聚合完成，消息数: {}, 失败聊天室数: {}",
            messages.len(),
            failures.len()
        );
        Ok(MessageFeed { messages, failures })
    }
}
