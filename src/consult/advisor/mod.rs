//! 顾问在线列表与目的地统计模块

pub mod api;
pub mod models;
pub mod poller;

pub use api::AdvisorApi;
pub use models::{AdvisorAvailability, DestinationStat};
pub use poller::{AdvisorPoller, AdvisorSnapshot, ADVISOR_REFRESH_INTERVAL};
