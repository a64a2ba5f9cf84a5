use crate::consult::error::{ConsultError, ConsultResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// 反序列化 ID 字段：服务端既可能返回字符串（uuid），也可能返回数字（自增主键）
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    id_from_value(&value).ok_or_else(|| serde::de::Error::custom(format!("无效的 ID: {}", value)))
}

/// 反序列化可选 ID 字段（null 或缺失时为 None）
pub fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_from_value))
}

/// 反序列化数组字段，处理 null 值
pub fn deserialize_vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

pub(crate) fn id_from_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 解析服务端时间
///
/// 支持 RFC 3339、Postgres 文本格式（`2024-01-01 10:00:00+00`）、
/// 不带时区的日期时间（按 UTC 处理）以及纯日期（当天 00:00 UTC）。
pub fn parse_timestamp(raw: &str) -> ConsultResult<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(ConsultError::validation(format!("无法解析时间: {:?}", raw)))
}

/// 从 JWT access token 的 payload 中读取 `exp`（epoch 秒）
///
/// 只做解码，不做签名校验；签名由服务端负责。
pub fn jwt_expiry(token: &str) -> Option<i64> {
    use base64::Engine;
    let payload = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp").and_then(|v| v.as_i64())
}

/// 生成客户端消息 ID
pub fn generate_client_msg_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use chrono::TimeZone;

    #[test]
    fn parses_supported_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T08:30:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01T16:30:00+08:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01 08:30:00+00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01 08:30:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-03-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(matches!(
            parse_timestamp("next tuesday"),
            Err(ConsultError::ValidationFailure(_))
        ));
    }

    #[test]
    fn reads_exp_from_jwt_payload() {
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(br#"{"sub":"u1","exp":1700000000}"#);
        let token = format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", payload);
        assert_eq!(jwt_expiry(&token), Some(1_700_000_000));
        assert_eq!(jwt_expiry("not-a-jwt"), None);
    }

    #[test]
    fn id_accepts_numbers_and_strings() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(deserialize_with = "deserialize_id")]
            id: String,
        }
        let a: Row = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        let b: Row = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(a.id, "42");
        assert_eq!(b.id, "abc");
        assert!(serde_json::from_str::<Row>(r#"{"id": null}"#).is_err());
    }
}
