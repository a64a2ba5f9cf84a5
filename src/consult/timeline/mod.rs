//! 申请时间线模块

pub mod api;
pub mod models;
pub mod service;

pub use api::TimelineApi;
pub use models::{StatusBucket, TimelineEntry, TimelineEvent, TimelineView};
pub use service::{normalize, normalize_rows};
