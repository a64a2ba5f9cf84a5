//! 聊天模块
//!
//! 聊天室/消息的远程访问，以及跨聊天室消息聚合

pub mod api;
pub mod models;
pub mod service;
pub mod types;

// 重新导出主要类型和函数
pub use api::{ChatApi, ChatSource};
pub use models::{
    AggregatedMessage, ChatMessage, ChatRoom, Direction, MessageFeed, MessageStatus,
    RoomFetchFailure, Sender, SenderType,
};
pub use service::{MessageAggregator, ROOM_MESSAGE_LIMIT};
