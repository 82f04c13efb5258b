//! 新建连接流程
//!
//! 校验表单 → 按模式调用对应的创建接口 → 成功后通知并返回首页。
//! 失败时表单保持原样，便于直接重新提交。

use crate::dl::config::ClientConfig;
use crate::dl::connection::api::ConnectionBackend;
use crate::dl::connection::draft::{ConnectionDraft, CreateRequest};
use crate::dl::connection::models::{Connection, FileHandle, FileType};
use crate::dl::connection::validation::ValidationRules;
use crate::dl::error::{ConnectionError, Field, ValidationError};
use crate::dl::listener::{NavigationListener, NotificationListener, Route, Severity};
use crate::dl::pending::{Liveness, PendingFlag};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// 数据源选项的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// 示例数据集（仅在配置开启时出现）。
    /// 示例数据集由前端的示例选择页处理，不进入连接表单
    Sample,
    Database,
    File(FileType),
}

/// 数据源选择列表中的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOption {
    pub kind: SourceKind,
    pub title: &'static str,
    pub description: &'static str,
}

/// 新建连接控制器
pub struct CreationController {
    backend: Arc<dyn ConnectionBackend>,
    notifier: Arc<dyn NotificationListener>,
    navigator: Arc<dyn NavigationListener>,
    rules: ValidationRules,
    show_sample_datasets: bool,
    draft: Mutex<ConnectionDraft>,
    pending: PendingFlag,
    liveness: Liveness,
}

impl CreationController {
    pub fn new(
        config: &ClientConfig,
        backend: Arc<dyn ConnectionBackend>,
        notifier: Arc<dyn NotificationListener>,
        navigator: Arc<dyn NavigationListener>,
    ) -> Self {
        Self {
            backend,
            notifier,
            navigator,
            rules: ValidationRules::from(config),
            show_sample_datasets: config.show_sample_datasets,
            draft: Mutex::new(ConnectionDraft::new()),
            pending: PendingFlag::new(),
            liveness: Liveness::default(),
        }
    }

    fn lock_draft(&self) -> MutexGuard<'_, ConnectionDraft> {
        self.draft.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 当前表单快照
    pub fn draft(&self) -> ConnectionDraft {
        self.lock_draft().clone()
    }

    /// 修改表单
    pub fn update_draft<R>(&self, f: impl FnOnce(&mut ConnectionDraft) -> R) -> R {
        f(&mut *self.lock_draft())
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.update_draft(|d| d.set_name(name));
    }

    pub fn set_system_prompt(&self, prompt: impl Into<String>) {
        self.update_draft(|d| d.set_system_prompt(prompt));
    }

    pub fn select_database(&self) {
        self.update_draft(ConnectionDraft::select_database);
    }

    pub fn select_file_type(&self, file_type: FileType) {
        self.update_draft(|d| d.select_file_type(file_type));
    }

    pub fn set_dsn(&self, dsn: impl Into<String>) -> bool {
        self.update_draft(|d| d.set_dsn(dsn))
    }

    pub fn bind_file(&self, file: FileHandle) -> bool {
        self.update_draft(|d| d.bind_file(file))
    }

    pub fn clear_file(&self) {
        self.update_draft(ConnectionDraft::clear_file);
    }

    /// 可选择的数据源
    pub fn source_options(&self) -> Vec<SourceOption> {
        let mut options = Vec::with_capacity(6);
        if self.show_sample_datasets {
            options.push(SourceOption {
                kind: SourceKind::Sample,
                title: "Sample Dataset",
                description: "Get started quickly with pre-loaded sample data including Netflix, Spotify, and more",
            });
        }
        options.push(SourceOption {
            kind: SourceKind::Database,
            title: "Database Connection",
            description: "Postgres, MySQL, Snowflake, or MS SQL Server",
        });
        options.extend(FileType::ALL.into_iter().map(|file_type| SourceOption {
            kind: SourceKind::File(file_type),
            title: file_type.label(),
            description: match file_type {
                FileType::Sqlite => "Local SQLite database file",
                FileType::Csv => "Comma-separated values file",
                FileType::Excel => "Microsoft Excel spreadsheet",
                FileType::Sas7bdat => "SAS7BDAT statistical data file",
            },
        }));
        options
    }

    /// 按选中的数据源切换表单模式；示例数据集不改变表单，返回 false
    pub fn select_source(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Database => {
                self.select_database();
                true
            }
            SourceKind::File(file_type) => {
                self.select_file_type(file_type);
                true
            }
            SourceKind::Sample => {
                debug!("[ConnCreate] 选择示例数据集，交由示例选择页处理");
                false
            }
        }
    }

    /// 创建请求在途时禁用提交
    pub fn is_submit_disabled(&self) -> bool {
        self.pending.is_pending()
    }

    /// 视图销毁；之后完成的请求不再通知或跳转
    pub fn tear_down(&self) {
        self.liveness.tear_down();
    }

    async fn notify(&self, severity: Severity, message: String) {
        self.notifier.on_notify(severity, message).await;
    }

    /// 提交表单
    pub async fn submit(&self) -> Result<Connection, ConnectionError> {
        let Some(_guard) = self.pending.try_begin() else {
            debug!("[ConnCreate] 创建请求在途，忽略重复提交");
            return Err(ConnectionError::Busy);
        };

        let validated = self.lock_draft().validate(&self.rules);
        let request = match validated {
            Ok(request) => request,
            Err(e) => {
                warn!("[ConnCreate] 表单校验失败: {}", e);
                self.notify(validation_severity(&e), e.to_string()).await;
                return Err(e.into());
            }
        };

        let result = match request {
            CreateRequest::Database(req) => {
                info!("[ConnCreate] 🚀 通过 DSN 创建连接: {}", req.name);
                self.backend.create_connection(req).await
            }
            CreateRequest::File(req) => {
                info!(
                    "[ConnCreate] 🚀 通过文件创建连接: {}（{}）",
                    req.name, req.file_type
                );
                self.backend.create_file_connection(req).await
            }
        };

        if !self.liveness.is_alive() {
            debug!("[ConnCreate] 视图已销毁，忽略完成回调");
            return result.map_err(Into::into);
        }

        match result {
            Ok(connection) => {
                info!("[ConnCreate] ✅ 连接已创建: {}", connection.id);
                self.notify(Severity::Success, "Connection created".to_string())
                    .await;
                self.navigator.on_navigate(Route::Home).await;
                Ok(connection)
            }
            Err(e) => {
                warn!("[ConnCreate] ❌ 创建连接失败: {}", e);
                self.notify(Severity::Error, e.to_string()).await;
                Err(e.into())
            }
        }
    }
}

/// system prompt 问题以错误级别提示，其余缺项以普通提示
fn validation_severity(err: &ValidationError) -> Severity {
    match err.field {
        Field::SystemPrompt => Severity::Error,
        _ => Severity::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dl::connection::draft::DraftMode;
    use crate::dl::error::{TransportError, ValidationKind};
    use crate::dl::testing::{init_test_logger, Call, MockBackend, Recorder};
    use tokio::sync::Notify;

    const PROMPT: &str = "Orders link to customers via customer_id";

    fn controller(backend: Arc<MockBackend>, recorder: Arc<Recorder>) -> CreationController {
        init_test_logger();
        CreationController::new(
            &ClientConfig::default(),
            backend,
            recorder.clone(),
            recorder,
        )
    }

    fn is_create(call: &Call) -> bool {
        matches!(
            call,
            Call::CreateConnection(_) | Call::CreateFileConnection(_)
        )
    }

    #[tokio::test]
    async fn empty_dsn_never_reaches_backend() {
        let backend = Arc::new(MockBackend::new());
        let recorder = Recorder::new();
        let ctrl = controller(backend.clone(), recorder.clone());
        ctrl.set_name("prod");
        ctrl.select_database();
        ctrl.set_dsn("   ");
        ctrl.set_system_prompt(PROMPT);

        let err = ctrl.submit().await.unwrap_err();
        assert_eq!(
            err,
            ConnectionError::Validation(ValidationError::new(Field::Dsn, ValidationKind::Empty))
        );
        assert_eq!(backend.count(is_create), 0);
        assert_eq!(
            recorder.notifications(),
            vec![(
                Severity::Info,
                "Please enter a dsn for this connection".to_string()
            )]
        );
        assert!(recorder.routes().is_empty());
    }

    #[tokio::test]
    async fn short_prompt_is_reported_as_error() {
        let backend = Arc::new(MockBackend::new());
        let recorder = Recorder::new();
        let ctrl = controller(backend.clone(), recorder.clone());
        ctrl.set_name("prod");
        ctrl.select_database();
        ctrl.set_dsn("postgres://localhost/app");
        ctrl.set_system_prompt("short");

        assert!(ctrl.submit().await.is_err());
        assert_eq!(backend.count(is_create), 0);
        let (severity, _) = recorder.last_notification().unwrap();
        assert_eq!(severity, Severity::Error);
    }

    #[tokio::test]
    async fn database_success_notifies_and_navigates_home() {
        let backend = Arc::new(MockBackend::new());
        let recorder = Recorder::new();
        let ctrl = controller(backend.clone(), recorder.clone());
        ctrl.set_name("prod");
        ctrl.select_database();
        ctrl.set_dsn("postgres://localhost/app");
        ctrl.set_system_prompt(PROMPT);

        let conn = ctrl.submit().await.unwrap();
        assert_eq!(conn.name, "prod");
        assert_eq!(
            backend.calls(),
            vec![Call::CreateConnection(crate::dl::connection::types::CreateConnectionReq {
                dsn: "postgres://localhost/app".into(),
                name: "prod".into(),
                system_prompt: PROMPT.into(),
                is_sample: false,
            })]
        );
        assert_eq!(
            recorder.notifications(),
            vec![(Severity::Success, "Connection created".to_string())]
        );
        assert_eq!(recorder.routes(), vec![Route::Home]);
        assert!(!ctrl.is_submit_disabled());
    }

    #[tokio::test]
    async fn file_mode_uses_file_endpoint() {
        let backend = Arc::new(MockBackend::new());
        let recorder = Recorder::new();
        let ctrl = controller(backend.clone(), recorder.clone());
        ctrl.set_name("titanic");
        ctrl.select_file_type(FileType::Csv);
        ctrl.bind_file(FileHandle::new("/tmp/titanic.csv", "titanic.csv", 1024));
        ctrl.set_system_prompt(PROMPT);

        ctrl.submit().await.unwrap();
        let csv_uploads = backend.count(|c| {
            matches!(c, Call::CreateFileConnection(req) if req.file_type == FileType::Csv)
        });
        assert_eq!(csv_uploads, 1);
        assert_eq!(
            backend.count(|c| matches!(c, Call::CreateConnection(_))),
            0
        );
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_locally() {
        let backend = Arc::new(MockBackend::new());
        let recorder = Recorder::new();
        let ctrl = controller(backend.clone(), recorder.clone());
        ctrl.set_name("big");
        ctrl.select_file_type(FileType::Sqlite);
        ctrl.bind_file(FileHandle::new("/tmp/big.db", "big.db", 600 * 1024 * 1024));
        ctrl.set_system_prompt(PROMPT);

        let err = ctrl.submit().await.unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::Validation(ValidationError {
                kind: ValidationKind::TooLarge { .. },
                ..
            })
        ));
        assert_eq!(backend.count(is_create), 0);
        assert_eq!(
            recorder.last_notification().unwrap().1,
            "File size exceeds 500MB limit"
        );
    }

    #[tokio::test]
    async fn transport_failure_keeps_draft_for_resubmission() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_next(TransportError::http(400, "Invalid DSN"));
        let recorder = Recorder::new();
        let ctrl = controller(backend.clone(), recorder.clone());
        ctrl.set_name("prod");
        ctrl.select_database();
        ctrl.set_dsn("postgres://bad");
        ctrl.set_system_prompt(PROMPT);
        let before = ctrl.draft();

        let err = ctrl.submit().await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid DSN");
        assert_eq!(ctrl.draft(), before);
        assert_eq!(
            recorder.last_notification(),
            Some((Severity::Error, "Invalid DSN".to_string()))
        );
        assert!(recorder.routes().is_empty());

        // 无需重新输入即可再次提交
        ctrl.submit().await.unwrap();
        assert_eq!(backend.count(is_create), 2);
        assert_eq!(recorder.routes(), vec![Route::Home]);
    }

    #[tokio::test]
    async fn second_submit_while_pending_is_dropped() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(MockBackend::with_gate(gate.clone()));
        let recorder = Recorder::new();
        let ctrl = controller(backend.clone(), recorder.clone());
        ctrl.set_name("prod");
        ctrl.select_database();
        ctrl.set_dsn("postgres://localhost/app");
        ctrl.set_system_prompt(PROMPT);

        let (first, second) = tokio::join!(ctrl.submit(), async {
            assert!(ctrl.is_submit_disabled());
            let r = ctrl.submit().await;
            gate.notify_one();
            r
        });

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err(), ConnectionError::Busy);
        assert_eq!(backend.count(is_create), 1);
        assert!(!ctrl.is_submit_disabled());
    }

    #[tokio::test]
    async fn torn_down_view_ignores_completion() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(MockBackend::with_gate(gate.clone()));
        let recorder = Recorder::new();
        let ctrl = controller(backend.clone(), recorder.clone());
        ctrl.set_name("prod");
        ctrl.select_database();
        ctrl.set_dsn("postgres://localhost/app");
        ctrl.set_system_prompt(PROMPT);

        let (result, _) = tokio::join!(ctrl.submit(), async {
            ctrl.tear_down();
            gate.notify_one();
        });

        // 远端仍然完成了创建，但不再通知或跳转
        assert!(result.is_ok());
        assert_eq!(backend.connections.lock().unwrap().len(), 1);
        assert!(recorder.notifications().is_empty());
        assert!(recorder.routes().is_empty());
    }

    #[test]
    fn selecting_a_source_switches_draft_mode() {
        let ctrl = controller(Arc::new(MockBackend::new()), Recorder::new());

        assert!(ctrl.select_source(SourceKind::File(FileType::Excel)));
        assert!(matches!(
            ctrl.draft().mode,
            DraftMode::File {
                file_type: FileType::Excel,
                ..
            }
        ));

        assert!(ctrl.select_source(SourceKind::Database));
        assert!(matches!(ctrl.draft().mode, DraftMode::Database { .. }));

        // 示例数据集不改动表单
        assert!(!ctrl.select_source(SourceKind::Sample));
        assert!(matches!(ctrl.draft().mode, DraftMode::Database { .. }));
    }

    #[test]
    fn sample_option_follows_config() {
        let backend = Arc::new(MockBackend::new());
        let recorder = Recorder::new();
        let ctrl = controller(backend.clone(), recorder.clone());
        let kinds: Vec<SourceKind> = ctrl.source_options().iter().map(|o| o.kind).collect();
        assert_eq!(kinds.len(), 5);
        assert!(!kinds.contains(&SourceKind::Sample));

        let config = ClientConfig {
            show_sample_datasets: true,
            ..ClientConfig::default()
        };
        let ctrl = CreationController::new(&config, backend, recorder.clone(), recorder);
        let options = ctrl.source_options();
        assert_eq!(options[0].kind, SourceKind::Sample);
        assert_eq!(options.len(), 6);
        assert_eq!(options[2].title, "SQLite data file");
    }
}
