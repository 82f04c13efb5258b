//! 测试辅助：内存后端与记录型监听器

use crate::dl::connection::api::ConnectionBackend;
use crate::dl::connection::models::{
    Connection, ConnectionOptions, ConversationSummary, SchemaNode, TableNode,
};
use crate::dl::connection::types::{
    CreateConnectionReq, CreateFileConnectionReq, UpdateConnectionPayload,
};
use crate::dl::error::TransportError;
use crate::dl::listener::{NavigationListener, NotificationListener, Route, Severity};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, Once};
use tokio::sync::Notify;

static INIT_LOGGER: Once = Once::new();

pub fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::EnvFilter;

        let filter_layer = EnvFilter::new("info,dataline_sdk_core=debug");

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_test_writer();

        let _ = tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .try_init();
    });
}

/// 后端收到的调用
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateConnection(CreateConnectionReq),
    CreateFileConnection(CreateFileConnectionReq),
    GetConnection(String),
    GetConnections,
    UpdateConnection(String, UpdateConnectionPayload),
    DeleteConnection(String),
    RefreshSchema(String),
    GetConversations,
    CreateConversation(String, String),
}

/// 内存后端
#[derive(Default)]
pub struct MockBackend {
    pub calls: Mutex<Vec<Call>>,
    pub connections: Mutex<Vec<Connection>>,
    pub conversations: Mutex<Vec<ConversationSummary>>,
    pub refreshed_options: Mutex<ConnectionOptions>,
    /// 设置后，下一次变更类调用返回该错误
    pub fail_next: Mutex<Option<TransportError>>,
    /// 设置后，变更类调用在返回前等待通知
    pub gate: Option<Arc<Notify>>,
    /// 设置后，get_connection 在返回前等待通知
    pub read_gate: Option<Arc<Notify>>,
    /// 设置后，get_conversations 一直返回该错误
    pub conversations_error: Mutex<Option<TransportError>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gate(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn with_read_gate(gate: Arc<Notify>) -> Self {
        Self {
            read_gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn with_connection(self, connection: Connection) -> Self {
        self.connections.lock().unwrap().push(connection);
        self
    }

    pub fn with_conversations(self, connection_id: &str, count: usize) -> Self {
        {
            let mut convs = self.conversations.lock().unwrap();
            for i in 0..count {
                convs.push(ConversationSummary {
                    id: format!("conv-{}-{}", connection_id, i),
                    name: "Untitled chat".into(),
                    connection_id: connection_id.to_string(),
                });
            }
        }
        self
    }

    pub fn fail_next(&self, err: TransportError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    pub fn fail_conversations(&self, err: Option<TransportError>) {
        *self.conversations_error.lock().unwrap() = err;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn mutation(&self) -> Result<(), TransportError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn find(&self, id: &str) -> Result<Connection, TransportError> {
        self.connections
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| TransportError::http(404, "Connection not found"))
    }
}

#[async_trait]
impl ConnectionBackend for MockBackend {
    async fn create_connection(
        &self,
        req: CreateConnectionReq,
    ) -> Result<Connection, TransportError> {
        self.record(Call::CreateConnection(req.clone()));
        self.mutation().await?;
        let conn = Connection {
            dsn: Some(req.dsn),
            system_prompt: Some(req.system_prompt),
            ..connection("new-db", &req.name)
        };
        self.connections.lock().unwrap().push(conn.clone());
        Ok(conn)
    }

    async fn create_file_connection(
        &self,
        req: CreateFileConnectionReq,
    ) -> Result<Connection, TransportError> {
        self.record(Call::CreateFileConnection(req.clone()));
        self.mutation().await?;
        let conn = Connection {
            connection_type: req.file_type.as_str().to_string(),
            system_prompt: Some(req.system_prompt),
            ..connection("new-file", &req.name)
        };
        self.connections.lock().unwrap().push(conn.clone());
        Ok(conn)
    }

    async fn get_connection(&self, id: &str) -> Result<Connection, TransportError> {
        self.record(Call::GetConnection(id.to_string()));
        if let Some(gate) = &self.read_gate {
            gate.notified().await;
        }
        self.find(id)
    }

    async fn get_connections(&self) -> Result<Vec<Connection>, TransportError> {
        self.record(Call::GetConnections);
        Ok(self.connections.lock().unwrap().clone())
    }

    async fn update_connection(
        &self,
        id: &str,
        payload: UpdateConnectionPayload,
    ) -> Result<Connection, TransportError> {
        self.record(Call::UpdateConnection(id.to_string(), payload.clone()));
        self.mutation().await?;
        let mut conn = self.find(id)?;
        if let Some(name) = payload.name {
            conn.name = name;
        }
        if let Some(dsn) = payload.dsn {
            conn.dsn = Some(dsn);
        }
        if let Some(options) = payload.options {
            conn.options = options;
        }
        if let Some(prompt) = payload.system_prompt {
            conn.system_prompt = Some(prompt);
        }
        Ok(conn)
    }

    async fn delete_connection(&self, id: &str) -> Result<(), TransportError> {
        self.record(Call::DeleteConnection(id.to_string()));
        self.mutation().await?;
        self.connections.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }

    async fn refresh_connection_schema(
        &self,
        id: &str,
    ) -> Result<ConnectionOptions, TransportError> {
        self.record(Call::RefreshSchema(id.to_string()));
        self.mutation().await?;
        Ok(self.refreshed_options.lock().unwrap().clone())
    }

    async fn get_conversations(&self) -> Result<Vec<ConversationSummary>, TransportError> {
        self.record(Call::GetConversations);
        if let Some(err) = self.conversations_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.conversations.lock().unwrap().clone())
    }

    async fn create_conversation(
        &self,
        connection_id: &str,
        name: &str,
    ) -> Result<String, TransportError> {
        self.record(Call::CreateConversation(
            connection_id.to_string(),
            name.to_string(),
        ));
        self.mutation().await?;
        Ok(format!("conv-new-{}", connection_id))
    }
}

/// 记录所有通知与导航
#[derive(Default)]
pub struct Recorder {
    pub notifications: Mutex<Vec<(Severity, String)>>,
    pub routes: Mutex<Vec<Route>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notifications(&self) -> Vec<(Severity, String)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }

    pub fn last_notification(&self) -> Option<(Severity, String)> {
        self.notifications.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl NotificationListener for Recorder {
    async fn on_notify(&self, severity: Severity, message: String) {
        self.notifications.lock().unwrap().push((severity, message));
    }
}

#[async_trait]
impl NavigationListener for Recorder {
    async fn on_navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

pub fn connection(id: &str, name: &str) -> Connection {
    Connection {
        id: id.to_string(),
        name: name.to_string(),
        dialect: "postgresql".into(),
        connection_type: "postgres".into(),
        database: "app".into(),
        dsn: None,
        is_sample: false,
        system_prompt: None,
        options: ConnectionOptions::default(),
    }
}

/// `public` schema 下包含 users（开启）和 logs（关闭）
pub fn public_schema_connection(id: &str) -> Connection {
    Connection {
        dsn: Some("postgres://u:p@localhost:5432/app".into()),
        system_prompt: Some("This is the production app database".into()),
        options: ConnectionOptions {
            schemas: vec![SchemaNode {
                name: "public".into(),
                enabled: true,
                tables: vec![
                    TableNode {
                        name: "users".into(),
                        enabled: true,
                    },
                    TableNode {
                        name: "logs".into(),
                        enabled: false,
                    },
                ],
            }],
        },
        ..connection(id, "prod")
    }
}
