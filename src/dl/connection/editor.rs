//! 编辑已有连接
//!
//! 加载一次连接并以其为基线，任何字段修改都会标记为未保存；
//! 保存时只提交与基线不同的 dsn / system prompt，name 与 options 总是提交。

use crate::dl::config::ClientConfig;
use crate::dl::connection::api::ConnectionBackend;
use crate::dl::connection::models::{Connection, ConnectionOptions, ConversationSummary};
use crate::dl::connection::types::UpdateConnectionPayload;
use crate::dl::connection::validation::ValidationRules;
use crate::dl::error::ConnectionError;
use crate::dl::listener::{NavigationListener, NotificationListener, Route, Severity};
use crate::dl::pending::{Liveness, PendingFlag};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// 可编辑字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditFields {
    pub name: String,
    pub dsn: String,
    pub options: ConnectionOptions,
    pub system_prompt: String,
}

impl EditFields {
    fn from_connection(connection: &Connection) -> Self {
        Self {
            name: connection.name.clone(),
            dsn: connection.dsn.clone().unwrap_or_default(),
            options: connection.options.clone(),
            system_prompt: connection.system_prompt.clone().unwrap_or_default(),
        }
    }
}

/// 需要用户确认的弹窗
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorPrompt {
    DiscardChanges,
    DeleteConnection { related_conversations: usize },
}

impl EditorPrompt {
    pub fn title(&self) -> &'static str {
        match self {
            EditorPrompt::DiscardChanges => "Discard Unsaved Changes?",
            EditorPrompt::DeleteConnection { .. } => "Delete Connection?",
        }
    }

    pub fn message(&self) -> String {
        match self {
            EditorPrompt::DiscardChanges => {
                "You have unsaved changes. Discard changes?".to_string()
            }
            EditorPrompt::DeleteConnection {
                related_conversations,
            } => format!(
                "This will delete {} related conversation(s)!",
                related_conversations
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// 没有未保存的修改，直接离开
    Unchanged,
    Updated(Connection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// 存在关联会话，等待 `confirm_delete`
    NeedsConfirmation { related_conversations: usize },
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    /// 存在未保存修改，等待 `confirm_discard` 或 `cancel_prompt`
    NeedsConfirmation,
    Left,
}

#[derive(Debug, Default)]
struct EditorState {
    baseline: Option<Connection>,
    fields: EditFields,
    dirty: bool,
    /// `None` 表示尚未成功统计
    related_conversations: Option<usize>,
    prompt: Option<EditorPrompt>,
}

/// 编辑连接控制器
pub struct EditController {
    connection_id: Option<String>,
    backend: Arc<dyn ConnectionBackend>,
    notifier: Arc<dyn NotificationListener>,
    navigator: Arc<dyn NavigationListener>,
    rules: ValidationRules,
    state: Mutex<EditorState>,
    load_pending: PendingFlag,
    update_pending: PendingFlag,
    delete_pending: PendingFlag,
    refresh_pending: PendingFlag,
    liveness: Liveness,
}

impl EditController {
    pub fn new(
        config: &ClientConfig,
        connection_id: Option<String>,
        backend: Arc<dyn ConnectionBackend>,
        notifier: Arc<dyn NotificationListener>,
        navigator: Arc<dyn NavigationListener>,
    ) -> Self {
        Self {
            connection_id: connection_id.filter(|id| !id.is_empty()),
            backend,
            notifier,
            navigator,
            rules: ValidationRules::from(config),
            state: Mutex::new(EditorState::default()),
            load_pending: PendingFlag::new(),
            update_pending: PendingFlag::new(),
            delete_pending: PendingFlag::new(),
            refresh_pending: PendingFlag::new(),
            liveness: Liveness::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn notify(&self, severity: Severity, message: String) {
        self.notifier.on_notify(severity, message).await;
    }

    async fn navigate(&self, route: Route) {
        self.navigator.on_navigate(route).await;
    }

    /// 缺少连接 ID 时提示错误（不会中断程序）
    async fn require_id(&self) -> Result<&str, ConnectionError> {
        match self.connection_id.as_deref() {
            Some(id) => Ok(id),
            None => {
                warn!("[ConnEdit] 缺少连接 ID");
                let err = ConnectionError::MissingConnectionId;
                self.notify(Severity::Error, err.to_string()).await;
                Err(err)
            }
        }
    }

    // ========== 读取状态 ==========

    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    pub fn fields(&self) -> EditFields {
        self.state().fields.clone()
    }

    pub fn baseline(&self) -> Option<Connection> {
        self.state().baseline.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state().baseline.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    /// 关联会话数；加载时获取失败为 `None`
    pub fn related_conversations(&self) -> Option<usize> {
        self.state().related_conversations
    }

    /// 当前等待确认的弹窗
    pub fn prompt(&self) -> Option<EditorPrompt> {
        self.state().prompt
    }

    pub fn is_loading(&self) -> bool {
        self.load_pending.is_pending()
    }

    pub fn is_saving(&self) -> bool {
        self.update_pending.is_pending()
    }

    pub fn is_deleting(&self) -> bool {
        self.delete_pending.is_pending()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_pending.is_pending()
    }

    pub fn tear_down(&self) {
        self.liveness.tear_down();
    }

    // ========== 加载 ==========

    /// 加载连接与关联会话数，只执行一次
    pub async fn load(&self) -> Result<Connection, ConnectionError> {
        let id = self.require_id().await?;
        if let Some(loaded) = self.baseline() {
            debug!("[ConnEdit] 连接 {} 已加载，跳过", id);
            return Ok(loaded);
        }
        let Some(_guard) = self.load_pending.try_begin() else {
            debug!("[ConnEdit] 加载请求在途，忽略");
            return Err(ConnectionError::Busy);
        };

        info!("[ConnEdit] 📥 加载连接: {}", id);
        let (connection, conversations) = tokio::join!(
            self.backend.get_connection(id),
            self.backend.get_conversations()
        );

        if !self.liveness.is_alive() {
            return connection.map_err(Into::into);
        }

        let connection = match connection {
            Ok(connection) => connection,
            Err(e) => {
                warn!("[ConnEdit] ❌ 加载连接失败: {}", e);
                self.notify(Severity::Error, e.to_string()).await;
                return Err(e.into());
            }
        };

        let related = match conversations {
            Ok(conversations) => Some(count_related(&conversations, id)),
            Err(e) => {
                warn!("[ConnEdit] 获取会话列表失败，删除前重新统计: {}", e);
                None
            }
        };

        {
            let mut state = self.state();
            state.fields = EditFields::from_connection(&connection);
            state.baseline = Some(connection.clone());
            state.related_conversations = related;
        }
        info!(
            "[ConnEdit] ✅ 连接已加载: {}，关联会话数: {:?}",
            connection.name, related
        );
        Ok(connection)
    }

    // ========== 字段修改（都会标记为未保存） ==========

    fn mutate(&self, f: impl FnOnce(&mut EditFields)) {
        let mut state = self.state();
        f(&mut state.fields);
        state.dirty = true;
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.mutate(|fields| fields.name = name);
    }

    pub fn set_dsn(&self, dsn: impl Into<String>) {
        let dsn = dsn.into();
        self.mutate(|fields| fields.dsn = dsn);
    }

    pub fn set_system_prompt(&self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.mutate(|fields| fields.system_prompt = prompt);
    }

    /// 开关 schema 并级联到其下所有表；下标无效时返回 false
    pub fn set_schema_enabled(&self, schema_index: usize, enabled: bool) -> bool {
        let mut state = self.state();
        if schema_index >= state.fields.options.schemas.len() {
            debug!("[ConnEdit] schema 下标越界: {}", schema_index);
            return false;
        }
        state.fields.options = state.fields.options.with_schema_enabled(schema_index, enabled);
        state.dirty = true;
        true
    }

    /// 只开关一张表；下标无效时返回 false
    pub fn set_table_enabled(
        &self,
        schema_index: usize,
        table_index: usize,
        enabled: bool,
    ) -> bool {
        let mut state = self.state();
        if !state.fields.options.has_table(schema_index, table_index) {
            debug!(
                "[ConnEdit] 表下标越界: schema={}, table={}",
                schema_index, table_index
            );
            return false;
        }
        state.fields.options =
            state
                .fields
                .options
                .with_table_enabled(schema_index, table_index, enabled);
        state.dirty = true;
        true
    }

    // ========== 保存 ==========

    /// 根据基线构造部分更新
    fn build_payload(
        &self,
        state: &EditorState,
    ) -> Result<UpdateConnectionPayload, ConnectionError> {
        self.rules
            .require_system_prompt(&state.fields.system_prompt)?;
        let baseline = state.baseline.as_ref().ok_or(ConnectionError::NotLoaded)?;

        let fields = &state.fields;
        let baseline_dsn = baseline.dsn.as_deref().unwrap_or_default();
        let baseline_prompt = baseline.system_prompt.as_deref().unwrap_or_default();
        Ok(UpdateConnectionPayload {
            name: Some(fields.name.clone()),
            dsn: (fields.dsn != baseline_dsn).then(|| fields.dsn.clone()),
            options: Some(fields.options.clone()),
            system_prompt: (fields.system_prompt != baseline_prompt)
                .then(|| fields.system_prompt.clone()),
        })
    }

    /// 保存修改；没有修改时直接返回首页
    pub async fn submit(&self) -> Result<SaveOutcome, ConnectionError> {
        if !self.is_dirty() {
            debug!("[ConnEdit] 没有未保存的修改，直接离开");
            self.navigate(Route::Home).await;
            return Ok(SaveOutcome::Unchanged);
        }

        let Some(_guard) = self.update_pending.try_begin() else {
            debug!("[ConnEdit] 更新请求在途，忽略重复提交");
            return Err(ConnectionError::Busy);
        };
        let id = self.require_id().await?;

        let payload = self.build_payload(&self.state());
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                warn!("[ConnEdit] 保存前校验失败: {}", e);
                self.notify(Severity::Error, e.to_string()).await;
                return Err(e);
            }
        };

        info!(
            "[ConnEdit] 💾 保存连接 {}，dsn 变更: {}，prompt 变更: {}",
            id,
            payload.dsn.is_some(),
            payload.system_prompt.is_some()
        );
        let result = self.backend.update_connection(id, payload).await;

        if !self.liveness.is_alive() {
            return result.map(SaveOutcome::Updated).map_err(Into::into);
        }

        match result {
            Ok(updated) => {
                {
                    let mut state = self.state();
                    state.fields = EditFields::from_connection(&updated);
                    state.baseline = Some(updated.clone());
                    state.dirty = false;
                }
                info!("[ConnEdit] ✅ 连接已保存: {}", updated.id);
                self.navigate(Route::Home).await;
                Ok(SaveOutcome::Updated(updated))
            }
            Err(e) => {
                warn!("[ConnEdit] ❌ 保存连接失败: {}", e);
                self.notify(Severity::Error, e.to_string()).await;
                Err(e.into())
            }
        }
    }

    // ========== 删除 ==========

    /// 关联会话数未知时重新获取；获取失败则不删除
    async fn ensure_related_conversations(&self, id: &str) -> Result<usize, ConnectionError> {
        if let Some(related) = self.related_conversations() {
            return Ok(related);
        }
        debug!("[ConnEdit] 重新统计关联会话: {}", id);
        match self.backend.get_conversations().await {
            Ok(conversations) => {
                let related = count_related(&conversations, id);
                self.state().related_conversations = Some(related);
                Ok(related)
            }
            Err(e) => {
                warn!("[ConnEdit] ❌ 无法统计关联会话，取消删除: {}", e);
                self.notify(Severity::Error, e.to_string()).await;
                Err(e.into())
            }
        }
    }

    /// 请求删除：存在关联会话时先弹窗确认，否则立即删除
    pub async fn request_delete(&self) -> Result<DeleteOutcome, ConnectionError> {
        if !self.is_loaded() {
            warn!("[ConnEdit] 连接尚未加载，拒绝删除");
            return Err(ConnectionError::NotLoaded);
        }
        let id = self.require_id().await?;
        let related = self.ensure_related_conversations(id).await?;
        if related > 0 {
            info!("[ConnEdit] ⚠️ 删除将级联 {} 个会话，等待确认", related);
            self.state().prompt = Some(EditorPrompt::DeleteConnection {
                related_conversations: related,
            });
            return Ok(DeleteOutcome::NeedsConfirmation {
                related_conversations: related,
            });
        }
        self.perform_delete().await
    }

    /// 用户已确认删除
    pub async fn confirm_delete(&self) -> Result<DeleteOutcome, ConnectionError> {
        self.state().prompt = None;
        self.perform_delete().await
    }

    async fn perform_delete(&self) -> Result<DeleteOutcome, ConnectionError> {
        let Some(_guard) = self.delete_pending.try_begin() else {
            debug!("[ConnEdit] 删除请求在途，忽略重复操作");
            return Err(ConnectionError::Busy);
        };
        let id = self.require_id().await?;

        info!("[ConnEdit] 🗑️ 删除连接: {}", id);
        let result = self.backend.delete_connection(id).await;

        if !self.liveness.is_alive() {
            return result.map(|_| DeleteOutcome::Deleted).map_err(Into::into);
        }

        match result {
            Ok(()) => {
                info!("[ConnEdit] ✅ 连接已删除: {}", id);
                self.navigate(Route::Home).await;
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                warn!("[ConnEdit] ❌ 删除连接失败: {}", e);
                self.notify(Severity::Error, e.to_string()).await;
                Err(e.into())
            }
        }
    }

    // ========== 离开页面 ==========

    /// 关闭按钮 / 取消按钮 / Escape 键的统一入口
    pub async fn request_back(&self) -> BackOutcome {
        let dirty = {
            let mut state = self.state();
            if state.dirty {
                state.prompt = Some(EditorPrompt::DiscardChanges);
            }
            state.dirty
        };
        if dirty {
            debug!("[ConnEdit] 存在未保存修改，等待确认");
            return BackOutcome::NeedsConfirmation;
        }
        self.navigate(Route::Home).await;
        BackOutcome::Left
    }

    /// 丢弃内存中的修改并离开
    pub async fn confirm_discard(&self) {
        {
            let mut state = self.state();
            state.fields = state
                .baseline
                .as_ref()
                .map(EditFields::from_connection)
                .unwrap_or_default();
            state.dirty = false;
            state.prompt = None;
        }
        info!("[ConnEdit] 已丢弃未保存的修改");
        self.navigate(Route::Back).await;
    }

    /// 关闭弹窗，保留编辑状态
    pub fn cancel_prompt(&self) {
        self.state().prompt = None;
    }

    // ========== 刷新 schema ==========

    /// 重新获取 schema 树并整体替换本地 options（不合并）
    pub async fn refresh_schema(&self) -> Result<ConnectionOptions, ConnectionError> {
        let Some(_guard) = self.refresh_pending.try_begin() else {
            debug!("[ConnEdit] 刷新请求在途，忽略重复操作");
            return Err(ConnectionError::Busy);
        };
        let id = self.require_id().await?;

        info!("[ConnEdit] 🔄 刷新 schema: {}", id);
        let result = self.backend.refresh_connection_schema(id).await;

        if !self.liveness.is_alive() {
            return result.map_err(Into::into);
        }

        match result {
            Ok(options) => {
                self.state().fields.options = options.clone();
                info!("[ConnEdit] ✅ schema 已刷新，schema 数: {}", options.schemas.len());
                Ok(options)
            }
            Err(e) => {
                warn!("[ConnEdit] ❌ 刷新 schema 失败: {}", e);
                self.notify(Severity::Error, e.to_string()).await;
                Err(e.into())
            }
        }
    }
}

fn count_related(conversations: &[ConversationSummary], connection_id: &str) -> usize {
    conversations
        .iter()
        .filter(|c| c.connection_id == connection_id)
        .count()
}
