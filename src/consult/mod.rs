pub mod advisor;
pub mod application;
pub mod auth;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod remote;
pub mod serialization;
pub mod session;
pub mod timeline;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出认证相关函数
pub use auth::{login_async, AuthBackend, AuthUser, HttpAuthBackend, Session, UserRole};

// 重新导出远程存储相关类型
pub use remote::{Filter, HttpRemoteStore, InsertedRecord, Order, RemoteStore, Row};
