//! 连接列表：选择连接并开始新会话

use crate::dl::connection::api::ConnectionBackend;
use crate::dl::connection::models::Connection;
use crate::dl::error::ConnectionError;
use crate::dl::listener::{NavigationListener, NotificationListener, Route, Severity};
use crate::dl::pending::PendingFlag;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 新会话的默认名称
pub const DEFAULT_CONVERSATION_NAME: &str = "Untitled chat";

pub struct ConnectionSelector {
    backend: Arc<dyn ConnectionBackend>,
    notifier: Arc<dyn NotificationListener>,
    navigator: Arc<dyn NavigationListener>,
    pending: PendingFlag,
}

impl ConnectionSelector {
    pub fn new(
        backend: Arc<dyn ConnectionBackend>,
        notifier: Arc<dyn NotificationListener>,
        navigator: Arc<dyn NavigationListener>,
    ) -> Self {
        Self {
            backend,
            notifier,
            navigator,
            pending: PendingFlag::new(),
        }
    }

    pub async fn connections(&self) -> Result<Vec<Connection>, ConnectionError> {
        match self.backend.get_connections().await {
            Ok(connections) => {
                debug!("[ConnSelect] 连接数: {}", connections.len());
                Ok(connections)
            }
            Err(e) => {
                warn!("[ConnSelect] ❌ 获取连接列表失败: {}", e);
                self.notifier.on_notify(Severity::Error, e.to_string()).await;
                Err(e.into())
            }
        }
    }

    /// 在选中的连接上新建会话并跳转到聊天页
    pub async fn start_conversation(&self, connection_id: &str) -> Result<String, ConnectionError> {
        let Some(_guard) = self.pending.try_begin() else {
            debug!("[ConnSelect] 新建会话请求在途，忽略");
            return Err(ConnectionError::Busy);
        };

        match self
            .backend
            .create_conversation(connection_id, DEFAULT_CONVERSATION_NAME)
            .await
        {
            Ok(conversation_id) => {
                info!(
                    "[ConnSelect] 💬 新会话 {}，连接: {}",
                    conversation_id, connection_id
                );
                self.navigator
                    .on_navigate(Route::Chat(conversation_id.clone()))
                    .await;
                Ok(conversation_id)
            }
            Err(e) => {
                warn!("[ConnSelect] ❌ 新建会话失败: {}", e);
                self.notifier.on_notify(Severity::Error, e.to_string()).await;
                Err(e.into())
            }
        }
    }

    pub async fn open_new_connection(&self) {
        self.navigator.on_navigate(Route::NewConnection).await;
    }

    pub async fn open_settings(&self, connection_id: &str) {
        self.navigator
            .on_navigate(Route::EditConnection(connection_id.to_string()))
            .await;
    }
}
