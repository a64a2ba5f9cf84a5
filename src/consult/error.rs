//! SDK 错误类型
//!
//! 对外只暴露四类错误：未登录、参数校验失败、远程调用失败、部分数据获取失败。

use thiserror::Error;

/// 远程服务没有返回可读错误信息时使用的通用文案
pub const GENERIC_REMOTE_ERROR: &str = "远程服务调用失败，请稍后重试";

pub type ConsultResult<T> = Result<T, ConsultError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsultError {
    /// 当前没有有效会话
    #[error("需要登录: {0}")]
    AuthenticationRequired(String),

    /// 输入或远程返回的数据不合法
    #[error("参数校验失败: {0}")]
    ValidationFailure(String),

    /// 远程调用失败，消息尽量保留服务端原文
    #[error("{0}")]
    RemoteCallFailure(String),

    /// 聚合时某个聊天室的消息拉取失败（本地恢复，不会中断整体操作）
    #[error("聊天室 {room_id} 消息拉取失败: {reason}")]
    PartialFetchFailure { room_id: String, reason: String },
}

impl ConsultError {
    pub fn auth_required(msg: impl Into<String>) -> Self {
        Self::AuthenticationRequired(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailure(msg.into())
    }

    /// 构造远程调用错误；服务端消息为空时退回通用文案
    pub fn remote(msg: Option<String>) -> Self {
        match msg {
            Some(m) if !m.trim().is_empty() => Self::RemoteCallFailure(m),
            _ => Self::RemoteCallFailure(GENERIC_REMOTE_ERROR.to_string()),
        }
    }

    /// 需要中断操作并直接提示用户的错误
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Self::PartialFetchFailure { .. })
    }
}

impl From<anyhow::Error> for ConsultError {
    fn from(e: anyhow::Error) -> Self {
        Self::RemoteCallFailure(format!("{:#}", e))
    }
}

impl From<reqwest::Error> for ConsultError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::RemoteCallFailure(format!("请求超时: {}", e))
        } else {
            Self::RemoteCallFailure(format!("请求失败: {}", e))
        }
    }
}
