use crate::consult::error::{ConsultError, ConsultResult};
use serde::Deserialize;
use tracing::{debug, error, info};

/// 服务端错误响应体
///
/// 表/RPC 接口返回 `message`/`code`/`hint`，认证接口返回
/// `error`/`error_description` 或 `msg`，这里统一兼容。
#[derive(Debug, Default, Deserialize)]
pub struct RemoteErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl RemoteErrorBody {
    /// 取最适合直接展示给用户的错误信息
    pub fn best_message(&self) -> Option<String> {
        [
            &self.message,
            &self.error_description,
            &self.msg,
            &self.error,
        ]
        .into_iter()
        .flatten()
        .find(|m| !m.trim().is_empty())
        .cloned()
    }
}

/// 根据 HTTP 状态和响应体构造错误
///
/// 401 视为未登录；其余错误尽量保留服务端原文。
pub fn remote_error_from_body(status: u16, body: &[u8]) -> ConsultError {
    let parsed: RemoteErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed.best_message();
    if status == 401 {
        return ConsultError::auth_required(
            message.unwrap_or_else(|| "会话无效或已过期".to_string()),
        );
    }
    ConsultError::remote(message)
}

/// 通用 HTTP 响应处理函数：校验状态码并把 body 解析成 JSON
///
/// 空 body（例如 204）返回 `Value::Null`。所有远程接口共用此方法。
pub async fn handle_http_response(
    response: reqwest::Response,
    operation_name: &str,
) -> ConsultResult<serde_json::Value> {
    let status = response.status();

    // 读取 body bytes（只能读取一次）
    let body_bytes = response.bytes().await.map_err(|e| {
        error!("[HTTP] {}读取响应 body 失败: {}", operation_name, e);
        ConsultError::from(e)
    })?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        return Err(remote_error_from_body(status.as_u16(), &body_bytes));
    }
    info!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);

    if body_bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(serde_json::Value::Null);
    }

    serde_json::from_slice(&body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        ConsultError::validation(format!("{}响应不是合法 JSON: {}", operation_name, e))
    })
}

/// 把响应统一展开成行列表：数组逐行，对象视为单行，null 视为空
pub fn rows_from_value(value: serde_json::Value) -> Vec<serde_json::Value> {
    match value {
        serde_json::Value::Array(rows) => rows,
        serde_json::Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// 把一行 JSON 解析成强类型记录，失败时返回校验错误
pub fn parse_row<T: serde::de::DeserializeOwned>(
    row: serde_json::Value,
    what: &str,
) -> ConsultResult<T> {
    serde_json::from_value(row).map_err(|e| {
        error!("[Parse] {}数据格式不合法: {}", what, e);
        ConsultError::validation(format!("{}数据格式不合法: {}", what, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_body_prefers_message_field() {
        let err = remote_error_from_body(
            409,
            br#"{"code":"23505","message":"duplicate key value","hint":null}"#,
        );
        assert_eq!(err, ConsultError::RemoteCallFailure("duplicate key value".into()));
    }

    #[test]
    fn auth_error_body_is_understood() {
        let err = remote_error_from_body(
            400,
            br#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(
            err,
            ConsultError::RemoteCallFailure("Invalid login credentials".into())
        );
    }

    #[test]
    fn unauthorized_maps_to_authentication_required() {
        let err = remote_error_from_body(401, br#"{"message":"JWT expired"}"#);
        assert_eq!(err, ConsultError::AuthenticationRequired("JWT expired".into()));
    }

    #[test]
    fn unreadable_body_uses_generic_message() {
        let err = remote_error_from_body(502, b"<html>Bad Gateway</html>");
        assert_eq!(err, ConsultError::remote(None));
    }

    #[test]
    fn rows_are_flattened() {
        assert_eq!(rows_from_value(json!([{"a": 1}, {"a": 2}])).len(), 2);
        assert_eq!(rows_from_value(json!({"a": 1})).len(), 1);
        assert!(rows_from_value(serde_json::Value::Null).is_empty());
    }
}
