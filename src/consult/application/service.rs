//! 申请与咨询预约流程
//!
//! 提交前校验登录状态和表单，优先级宽松转换；申请落库后补一条 `Submitted` 时间线事件。

use crate::consult::application::api::ApplicationApi;
use crate::consult::application::models::{
    Application, ApplicationDraft, ConsultationDraft, ConsultationRequest, Priority,
};
use crate::consult::auth::{AuthBackend, Session};
use crate::consult::error::{ConsultError, ConsultResult};
use crate::consult::remote::RemoteStore;
use crate::consult::serialization::parse_timestamp;
use crate::consult::timeline::TimelineApi;
use regex::Regex;
use serde_json::json;
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

pub const INITIAL_APPLICATION_STATUS: &str = "Submitted";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

pub fn validate_email(email: &str) -> ConsultResult<()> {
    if EMAIL_RE.is_match(email.trim()) {
        Ok(())
    } else {
        Err(ConsultError::validation(format!("邮箱格式不正确: {}", email)))
    }
}

fn require(field: &str, value: &str) -> ConsultResult<()> {
    if value.trim().is_empty() {
        return Err(ConsultError::validation(format!("{}不能为空", field)));
    }
    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub struct ApplicationService {
    api: ApplicationApi,
    timeline: TimelineApi,
    auth: Arc<dyn AuthBackend>,
}

impl ApplicationService {
    pub fn new(store: Arc<dyn RemoteStore>, auth: Arc<dyn AuthBackend>) -> Self {
        Self {
            api: ApplicationApi::new(store.clone()),
            timeline: TimelineApi::new(store),
            auth,
        }
    }

    async fn require_session(&self) -> ConsultResult<Session> {
        self.auth
            .current_session()
            .await
            .ok_or_else(|| ConsultError::auth_required("请先登录后再提交"))
    }

    /// 提交留学申请
    pub async fn submit_application(&self, draft: &ApplicationDraft) -> ConsultResult<Application> {
        let session = self.require_session().await?;
        require("姓名", &draft.full_name)?;
        validate_email(&draft.email)?;
        require("目标国家", &draft.destination)?;
        require("目标项目", &draft.program)?;

        let priority = Priority::coerce(&draft.priority);
        if priority.as_str() != draft.priority.trim() {
            info!(
                "[Application] 优先级 {:?} 不合法，按 {} 处理",
                draft.priority,
                priority.as_str()
            );
        }

        let record = json!({
            "user_id": session.user.id,
            "full_name": draft.full_name.trim(),
            "email": draft.email.trim(),
            "phone": non_blank(&draft.phone),
            "destination": draft.destination.trim(),
            "program": draft.program.trim(),
            "intake": non_blank(&draft.intake),
            "priority": priority,
            "status": INITIAL_APPLICATION_STATUS,
            "notes": non_blank(&draft.notes),
        });
        let application = self.api.insert_application(record).await?;
        info!("[Application] ✅ 申请已提交，申请ID: {}", application.id);

        // 时间线补记失败不回滚申请
        if let Err(e) = self
            .timeline
            .record_event(&application.id, INITIAL_APPLICATION_STATUS, Some("申请已提交"))
            .await
        {
            warn!(
                "[Application] ⚠️ 申请 {} 的时间线事件记录失败: {}",
                application.id, e
            );
        }
        Ok(application)
    }

    /// 提交咨询预约
    pub async fn request_consultation(
        &self,
        draft: &ConsultationDraft,
    ) -> ConsultResult<ConsultationRequest> {
        let session = self.require_session().await?;
        require("咨询主题", &draft.topic)?;
        validate_email(&draft.contact_email)?;
        // 入库前统一成 RFC 3339，回显时才能解析
        let preferred_time = non_blank(&draft.preferred_time)
            .map(parse_timestamp)
            .transpose()?;

        let record = json!({
            "user_id": session.user.id,
            "advisor_id": non_blank(&draft.advisor_id),
            "topic": draft.topic.trim(),
            "preferred_time": preferred_time.map(|t| t.to_rfc3339()),
            "priority": Priority::coerce(&draft.priority),
            "contact_email": draft.contact_email.trim(),
            "status": "pending",
        });
        let request = self.api.insert_consultation(record).await?;
        info!("[Application] ✅ 咨询预约已提交，ID: {}", request.id);
        Ok(request)
    }

    /// 当前用户的申请列表
    pub async fn list_my_applications(&self) -> ConsultResult<Vec<Application>> {
        let session = self.require_session().await?;
        self.api.list_applications(&session.user.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consult::application::api::{TABLE_APPLICATIONS, TABLE_CONSULTATION_REQUESTS};
    use crate::consult::testing::{session_expiring_at, FakeAuth, FakeStore};
    use crate::consult::timeline::api::TABLE_APPLICATION_TIMELINE;

    fn draft() -> ApplicationDraft {
        ApplicationDraft {
            full_name: "李雷".into(),
            email: "lilei@example.com".into(),
            phone: Some("  ".into()),
            destination: "United Kingdom".into(),
            program: "MSc Computer Science".into(),
            intake: Some("2025 Fall".into()),
            priority: "High".into(),
            notes: None,
        }
    }

    fn service_with(store: Arc<FakeStore>, signed_in: bool) -> ApplicationService {
        let auth = if signed_in {
            FakeAuth::with_session(session_expiring_at("u-1", i64::MAX))
        } else {
            FakeAuth::default()
        };
        ApplicationService::new(store, Arc::new(auth))
    }

    #[tokio::test]
    async fn submit_stores_application_and_first_timeline_event() {
        let store = Arc::new(FakeStore::default());
        let service = service_with(store.clone(), true);

        let app = service.submit_application(&draft()).await.unwrap();

        assert_eq!(app.user_id, "u-1");
        assert_eq!(app.priority, Priority::High);
        assert_eq!(app.status, INITIAL_APPLICATION_STATUS);
        assert_eq!(app.phone, None);
        let events = store.inserted(TABLE_APPLICATION_TIMELINE).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["application_id"], app.id.as_str());
        assert_eq!(events[0]["status"], "Submitted");
    }

    #[tokio::test]
    async fn nonsense_priority_is_stored_as_medium() {
        let store = Arc::new(FakeStore::default());
        let service = service_with(store.clone(), true);
        let mut d = draft();
        d.priority = "Nonsense".into();

        let app = service.submit_application(&d).await.unwrap();

        assert_eq!(app.priority, Priority::Medium);
        assert_eq!(store.inserted(TABLE_APPLICATIONS).await[0]["priority"], "Medium");
    }

    #[tokio::test]
    async fn submit_requires_session() {
        let store = Arc::new(FakeStore::default());
        let service = service_with(store.clone(), false);

        let err = service.submit_application(&draft()).await.unwrap_err();

        assert!(matches!(err, ConsultError::AuthenticationRequired(_)));
        assert!(store.inserts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_email_aborts_before_insert() {
        let store = Arc::new(FakeStore::default());
        let service = service_with(store.clone(), true);
        let mut d = draft();
        d.email = "lilei at example".into();

        let err = service.submit_application(&d).await.unwrap_err();

        assert!(matches!(err, ConsultError::ValidationFailure(_)));
        assert!(store.inserts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn insert_failure_surfaces_remote_message() {
        let store = Arc::new(FakeStore::default());
        store
            .fail_insert(
                TABLE_APPLICATIONS,
                ConsultError::remote(Some("new row violates row-level security policy".into())),
            )
            .await;
        let service = service_with(store.clone(), true);

        let err = service.submit_application(&draft()).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "new row violates row-level security policy"
        );
        assert!(store.inserted(TABLE_APPLICATION_TIMELINE).await.is_empty());
    }

    #[tokio::test]
    async fn timeline_failure_does_not_fail_submission() {
        let store = Arc::new(FakeStore::default());
        store
            .fail_insert(TABLE_APPLICATION_TIMELINE, ConsultError::remote(None))
            .await;
        let service = service_with(store.clone(), true);

        assert!(service.submit_application(&draft()).await.is_ok());
    }

    #[tokio::test]
    async fn consultation_request_is_validated_and_coerced() {
        let store = Arc::new(FakeStore::default());
        let service = service_with(store.clone(), true);

        let req = service
            .request_consultation(&ConsultationDraft {
                advisor_id: None,
                topic: "文书修改".into(),
                preferred_time: Some("2024-06-01T09:00:00Z".into()),
                priority: "asap".into(),
                contact_email: "lilei@example.com".into(),
            })
            .await
            .unwrap();

        assert_eq!(req.priority, Priority::Medium);
        assert_eq!(req.advisor_id, None);
        assert!(req.preferred_time.is_some());
        assert_eq!(store.inserted(TABLE_CONSULTATION_REQUESTS).await.len(), 1);

        let err = service
            .request_consultation(&ConsultationDraft {
                topic: " ".into(),
                contact_email: "lilei@example.com".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ConsultError::ValidationFailure(_)));
    }

    #[tokio::test]
    async fn consultation_time_is_normalized_before_insert() {
        let store = Arc::new(FakeStore::default());
        let service = service_with(store.clone(), true);

        let req = service
            .request_consultation(&ConsultationDraft {
                topic: "签证".into(),
                preferred_time: Some("2024-06-01 09:30:00".into()),
                contact_email: "lilei@example.com".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            req.preferred_time.map(|t| t.to_rfc3339()),
            Some("2024-06-01T09:30:00+00:00".to_string())
        );

        let err = service
            .request_consultation(&ConsultationDraft {
                topic: "签证".into(),
                preferred_time: Some("next tuesday".into()),
                contact_email: "lilei@example.com".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ConsultError::ValidationFailure(_)));
        assert_eq!(store.inserted(TABLE_CONSULTATION_REQUESTS).await.len(), 1);
    }

    #[test]
    fn email_validation() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email(" han.meimei+uk@uni.ac.uk ").is_ok());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@c.com").is_err());
        assert!(validate_email("").is_err());
    }
}
