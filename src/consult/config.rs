//! 客户端配置
//!
//! 语言、主题等偏好作为显式配置传入客户端，不使用全局可变状态。

use crate::consult::advisor::ADVISOR_REFRESH_INTERVAL;
use crate::consult::error::{ConsultError, ConsultResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

/// 界面语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

impl Language {
    /// 不认识的语言回退到默认值
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en-gb" | "english" => Language::En,
            "zh" | "zh-cn" | "zh-hans" | "chinese" => Language::Zh,
            other => {
                warn!("[Config] 未知语言 {:?}，使用默认值", other);
                Language::default()
            }
        }
    }
}

/// 界面主题
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Theme::Light,
            "dark" => Theme::Dark,
            "system" => Theme::System,
            other => {
                warn!("[Config] 未知主题 {:?}，跟随系统", other);
                Theme::default()
            }
        }
    }
}

/// 用户偏好
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    pub language: Language,
    pub theme: Theme,
}

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// 后端服务基础地址，例如 `https://xyz.example.co`
    pub api_base_url: String,
    /// 匿名访问 key（所有请求的 `apikey` 头）
    pub anon_key: String,
    /// 单次远程调用超时
    pub request_timeout: Duration,
    /// 顾问在线列表刷新周期
    pub advisor_refresh_interval: Duration,
    /// 会话定时巡检周期；None 表示只在会话变化时检查
    pub session_check_interval: Option<Duration>,
    pub preferences: Preferences,
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new(api_base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            request_timeout: Duration::from_secs(15),
            advisor_refresh_interval: ADVISOR_REFRESH_INTERVAL,
            session_check_interval: None,
            preferences: Preferences::default(),
        }
    }

    /// 从环境变量（以及当前目录的 `.env`）读取配置
    ///
    /// 必填：`CONSULT_API_URL`、`CONSULT_ANON_KEY`；
    /// 可选：`CONSULT_REQUEST_TIMEOUT_SECS`、`CONSULT_SESSION_CHECK_SECS`、
    /// `CONSULT_LANGUAGE`、`CONSULT_THEME`。
    pub fn from_env() -> ConsultResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("[Config] 已加载 {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> ConsultResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConsultError::validation(format!("缺少环境变量 {}", key)))
        };
        // 周期和超时都必须为正数
        let secs = |key: &str| -> ConsultResult<Option<Duration>> {
            match lookup(key) {
                None => Ok(None),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(s) if s > 0 => Ok(Some(Duration::from_secs(s))),
                    _ => Err(ConsultError::validation(format!(
                        "{} 必须是正整数秒数: {}",
                        key, raw
                    ))),
                },
            }
        };

        let mut config = Self::new(required("CONSULT_API_URL")?, required("CONSULT_ANON_KEY")?);
        if let Some(timeout) = secs("CONSULT_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = timeout;
        }
        config.session_check_interval = secs("CONSULT_SESSION_CHECK_SECS")?;
        if let Some(lang) = lookup("CONSULT_LANGUAGE") {
            config.preferences.language = Language::parse_lenient(&lang);
        }
        if let Some(theme) = lookup("CONSULT_THEME") {
            config.preferences.theme = Theme::parse_lenient(&theme);
        }
        Ok(config)
    }
}
