//! 远程数据协作方
//!
//! 后端服务对本 SDK 来说是不透明的请求/响应服务，只通过
//! `insert` / `call` / `select` 三种操作访问。

use crate::consult::auth::AuthBackend;
use crate::consult::error::{ConsultError, ConsultResult};
use crate::consult::serialization::id_from_value;
use crate::consult::types::{handle_http_response, rows_from_value};
use anyhow::Context;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 远程返回的一行原始数据，进入业务层前必须解析成强类型记录
pub type Row = serde_json::Value;

/// 过滤操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Is,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Is => "is",
        };
        f.write_str(s)
    }
}

/// 列过滤条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    /// 转为查询参数 `(column, "op.value")`
    pub fn to_query_pair(&self) -> (String, String) {
        (self.column.clone(), format!("{}.{}", self.op, self.value))
    }
}

/// 排序条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    pub fn to_query_value(&self) -> String {
        let dir = if self.ascending { "asc" } else { "desc" };
        format!("{}.{}", self.column, dir)
    }
}

/// 插入结果
#[derive(Debug, Clone, PartialEq)]
pub struct InsertedRecord {
    pub id: String,
    /// 服务端返回的完整记录
    pub row: Row,
}

/// 远程存储协作方
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// 插入一条记录，返回服务端生成的 ID
    async fn insert(&self, table: &str, record: Row) -> ConsultResult<InsertedRecord>;

    /// 调用远程过程（RPC），返回结果行
    async fn call(&self, procedure: &str, params: Row) -> ConsultResult<Vec<Row>>;

    /// 简单过滤查询
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> ConsultResult<Vec<Row>>;
}

/// 从插入返回的行中提取 ID
pub fn inserted_record_from_rows(table: &str, rows: Vec<Row>) -> ConsultResult<InsertedRecord> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ConsultError::remote(Some(format!("插入 {} 后服务端未返回记录", table))))?;
    let id = row
        .get("id")
        .and_then(id_from_value)
        .ok_or_else(|| ConsultError::validation(format!("插入 {} 返回的记录缺少 id", table)))?;
    Ok(InsertedRecord { id, row })
}

/// 基于 HTTP 的远程存储实现
///
/// 每次请求都从认证协作方读取当前 access token；未登录时用匿名 key。
pub struct HttpRemoteStore {
    client: reqwest::Client,
    api_base_url: String,
    anon_key: String,
    auth: Arc<dyn AuthBackend>,
}

impl HttpRemoteStore {
    /// `client` 应该已经在外部配置好超时
    pub fn new(
        client: reqwest::Client,
        api_base_url: String,
        anon_key: String,
        auth: Arc<dyn AuthBackend>,
    ) -> Self {
        Self {
            client,
            api_base_url,
            anon_key,
            auth,
        }
    }

    async fn bearer_token(&self) -> String {
        match self.auth.current_session().await {
            Some(session) => session.access_token,
            None => self.anon_key.clone(),
        }
    }

    async fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = self.bearer_token().await;
        builder
            .header("apikey", &self.anon_key)
            .header("operationID", Uuid::new_v4().to_string())
            .bearer_auth(token)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn insert(&self, table: &str, record: Row) -> ConsultResult<InsertedRecord> {
        let url = format!("{}/rest/v1/{}", self.api_base_url, table);
        info!("[RemoteStore] 📝 插入记录，表: {}", table);
        debug!("[RemoteStore]   请求URL: {}, 记录: {}", url, record);

        let request = self
            .authorized(self.client.post(&url))
            .await
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(&record);
        let response = request
            .send()
            .await
            .with_context(|| format!("插入{}请求发送失败", table))?;
        let body = handle_http_response(response, &format!("插入{}", table)).await?;
        inserted_record_from_rows(table, rows_from_value(body))
    }

    async fn call(&self, procedure: &str, params: Row) -> ConsultResult<Vec<Row>> {
        let url = format!("{}/rest/v1/rpc/{}", self.api_base_url, procedure);
        info!("[RemoteStore] 📡 调用 RPC: {}", procedure);
        debug!("[RemoteStore]   请求URL: {}, 参数: {}", url, params);

        let request = self
            .authorized(self.client.post(&url))
            .await
            .header("Content-Type", "application/json")
            .json(&params);
        let response = request
            .send()
            .await
            .with_context(|| format!("RPC {} 请求发送失败", procedure))?;
        let body = handle_http_response(response, &format!("RPC {}", procedure)).await?;
        let rows = rows_from_value(body);
        debug!("[RemoteStore] RPC {} 返回 {} 行", procedure, rows.len());
        Ok(rows)
    }

    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> ConsultResult<Vec<Row>> {
        let url = format!("{}/rest/v1/{}", self.api_base_url, table);
        let mut query: Vec<(String, String)> = vec![("select".to_string(), "*".to_string())];
        query.extend(filters.iter().map(Filter::to_query_pair));
        if let Some(order) = order {
            query.push(("order".to_string(), order.to_query_value()));
        }
        info!("[RemoteStore] 🔍 查询表: {}", table);
        debug!("[RemoteStore]   请求URL: {}, 条件: {:?}", url, query);

        let request = self.authorized(self.client.get(&url)).await.query(&query);
        let response = request
            .send()
            .await
            .with_context(|| format!("查询{}请求发送失败", table))?;
        let body = handle_http_response(response, &format!("查询{}", table)).await?;
        Ok(rows_from_value(body))
    }
}
