//! 会话有效期守卫模块

pub mod guard;
pub mod listener;

pub use guard::{classify_freshness, FreshnessState, SessionGuard, EXPIRY_WARNING_WINDOW_SECS};
pub use listener::{EmptySessionListener, SessionListener};
