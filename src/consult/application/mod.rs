//! 留学申请与咨询预约模块

pub mod api;
pub mod models;
pub mod service;

pub use api::ApplicationApi;
pub use models::{Application, ApplicationDraft, ConsultationDraft, ConsultationRequest, Priority};
pub use service::{validate_email, ApplicationService};
