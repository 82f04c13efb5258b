//! 连接 HTTP API 客户端
//!
//! `ConnectionBackend` 是控制器访问后端的唯一入口，`ConnectionApi` 是基于 reqwest 的实现

use crate::dl::config::ClientConfig;
use crate::dl::connection::models::{Connection, ConnectionOptions, ConversationSummary};
use crate::dl::connection::types::{
    ConnectionResp, ConnectionsResp, CreateConnectionReq, CreateConversationReq,
    CreateFileConnectionReq, CreatedConversationResp, RefreshSchemaResp, UpdateConnectionPayload,
};
use crate::dl::error::{TransportError, TransportErrorKind};
use crate::dl::types::{handle_empty_response, handle_http_response};
use anyhow::Context;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

/// 控制器依赖的外部接口
#[async_trait]
pub trait ConnectionBackend: Send + Sync {
    async fn create_connection(&self, req: CreateConnectionReq)
        -> Result<Connection, TransportError>;

    async fn create_file_connection(
        &self,
        req: CreateFileConnectionReq,
    ) -> Result<Connection, TransportError>;

    async fn get_connection(&self, id: &str) -> Result<Connection, TransportError>;

    async fn get_connections(&self) -> Result<Vec<Connection>, TransportError>;

    async fn update_connection(
        &self,
        id: &str,
        payload: UpdateConnectionPayload,
    ) -> Result<Connection, TransportError>;

    async fn delete_connection(&self, id: &str) -> Result<(), TransportError>;

    async fn refresh_connection_schema(&self, id: &str)
        -> Result<ConnectionOptions, TransportError>;

    async fn get_conversations(&self) -> Result<Vec<ConversationSummary>, TransportError>;

    /// 在指定连接上新建会话，返回会话 ID
    async fn create_conversation(
        &self,
        connection_id: &str,
        name: &str,
    ) -> Result<String, TransportError>;
}

/// 连接相关的 HTTP API 客户端
pub struct ConnectionApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl ConnectionApi {
    /// 使用已配置好的 client 创建
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 根据配置创建（token 通过 default_headers 自动添加）
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("无效的 token")?,
            );
        }
        let client = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("创建 HTTP 客户端失败")?;
        Ok(Self::new(client, config.base_url().to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.url(path);
        debug!("[ConnApi]   {} {} 操作ID: {}", method, url, operation_id);
        self.client
            .request(method, url)
            .header("operationID", operation_id)
    }

    async fn send(
        builder: reqwest::RequestBuilder,
        operation_name: &str,
    ) -> Result<reqwest::Response, TransportError> {
        builder.send().await.map_err(|e| {
            error!("[ConnApi] {}请求失败: {}", operation_name, e);
            TransportError::from(e)
        })
    }
}

#[async_trait]
impl ConnectionBackend for ConnectionApi {
    async fn create_connection(
        &self,
        req: CreateConnectionReq,
    ) -> Result<Connection, TransportError> {
        info!("[ConnApi] 📡 创建数据库连接: {}", req.name);
        let builder = self.request(reqwest::Method::POST, "/connect").json(&req);
        let response = Self::send(builder, "创建连接").await?;
        let resp: ConnectionResp = handle_http_response(response, "创建连接").await?;
        info!("[ConnApi] ✅ 连接已创建，ID: {}", resp.connection.id);
        Ok(resp.connection)
    }

    async fn create_file_connection(
        &self,
        req: CreateFileConnectionReq,
    ) -> Result<Connection, TransportError> {
        info!(
            "[ConnApi] 📡 上传文件创建连接: {}（{}，{} 字节）",
            req.name, req.file_type, req.file.size
        );
        let bytes = tokio::fs::read(&req.file.path).await.map_err(|e| {
            error!(
                "[ConnApi] 读取上传文件失败: {}, {}",
                req.file.path.display(),
                e
            );
            TransportError::new(TransportErrorKind::Io, format!("读取文件失败: {}", e))
        })?;
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(req.file.file_name.clone()),
            )
            .text("name", req.name.clone())
            .text("type", req.file_type.as_str())
            .text("system_prompt", req.system_prompt.clone());

        let builder = self
            .request(reqwest::Method::POST, "/connect/file")
            .multipart(form);
        let response = Self::send(builder, "上传文件创建连接").await?;
        let resp: ConnectionResp = handle_http_response(response, "上传文件创建连接").await?;
        info!("[ConnApi] ✅ 文件连接已创建，ID: {}", resp.connection.id);
        Ok(resp.connection)
    }

    async fn get_connection(&self, id: &str) -> Result<Connection, TransportError> {
        info!("[ConnApi] 📡 获取连接: {}", id);
        let builder = self.request(reqwest::Method::GET, &format!("/connection/{}", id));
        let response = Self::send(builder, "获取连接").await?;
        let resp: ConnectionResp = handle_http_response(response, "获取连接").await?;
        Ok(resp.connection)
    }

    async fn get_connections(&self) -> Result<Vec<Connection>, TransportError> {
        info!("[ConnApi] 📡 获取连接列表");
        let builder = self.request(reqwest::Method::GET, "/connections");
        let response = Self::send(builder, "获取连接列表").await?;
        let resp: ConnectionsResp = handle_http_response(response, "获取连接列表").await?;
        info!("[ConnApi] ✅ 连接数: {}", resp.connections.len());
        Ok(resp.connections)
    }

    async fn update_connection(
        &self,
        id: &str,
        payload: UpdateConnectionPayload,
    ) -> Result<Connection, TransportError> {
        info!("[ConnApi] 📡 更新连接: {}", id);
        let builder = self
            .request(reqwest::Method::PATCH, &format!("/connection/{}", id))
            .json(&payload);
        let response = Self::send(builder, "更新连接").await?;
        let resp: ConnectionResp = handle_http_response(response, "更新连接").await?;
        Ok(resp.connection)
    }

    async fn delete_connection(&self, id: &str) -> Result<(), TransportError> {
        info!("[ConnApi] 📡 删除连接: {}", id);
        let builder = self.request(reqwest::Method::DELETE, &format!("/connection/{}", id));
        let response = Self::send(builder, "删除连接").await?;
        handle_empty_response(response, "删除连接").await
    }

    async fn refresh_connection_schema(
        &self,
        id: &str,
    ) -> Result<ConnectionOptions, TransportError> {
        info!("[ConnApi] 📡 刷新 schema: {}", id);
        let builder = self.request(
            reqwest::Method::POST,
            &format!("/connection/{}/schemas", id),
        );
        let response = Self::send(builder, "刷新 schema").await?;
        let resp: RefreshSchemaResp = handle_http_response(response, "刷新 schema").await?;
        info!("[ConnApi] ✅ schema 数: {}", resp.options.schemas.len());
        Ok(resp.options)
    }

    async fn get_conversations(&self) -> Result<Vec<ConversationSummary>, TransportError> {
        debug!("[ConnApi] 📡 获取会话列表");
        let builder = self.request(reqwest::Method::GET, "/conversations");
        let response = Self::send(builder, "获取会话列表").await?;
        handle_http_response(response, "获取会话列表").await
    }

    async fn create_conversation(
        &self,
        connection_id: &str,
        name: &str,
    ) -> Result<String, TransportError> {
        info!("[ConnApi] 📡 新建会话，连接: {}", connection_id);
        let body = CreateConversationReq {
            connection_id: connection_id.to_string(),
            name: name.to_string(),
        };
        let builder = self
            .request(reqwest::Method::POST, "/conversation")
            .json(&body);
        let response = Self::send(builder, "新建会话").await?;
        let resp: CreatedConversationResp = handle_http_response(response, "新建会话").await?;
        Ok(resp.id)
    }
}
