//! DataLine 连接管理 CLI
//!
//! 所有操作都经由库中的控制器完成，通知与跳转输出到日志

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dataline_sdk_core::dl::connection::{
    ConnectionApi, ConnectionBackend, ConnectionSelector, CreationController, DeleteOutcome,
    EditController, FileHandle, FileType, SaveOutcome,
};
use dataline_sdk_core::dl::listener::{NavigationListener, Route, TracingNotificationListener};
use dataline_sdk_core::ClientConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// DataLine 连接管理 CLI
#[derive(Parser, Debug)]
#[command(name = "dataline-cli")]
#[command(about = "DataLine 连接管理 CLI - 新建、编辑、删除数据源连接", long_about = None)]
struct Cli {
    /// 后端地址（默认读取 DATALINE_API_BASE_URL）
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// 日志级别
    #[arg(long, global = true, default_value = "info,dataline_sdk_core=info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 列出所有连接
    List,
    /// 新建连接（--dsn 或 --file + --type 二选一）
    Create(CreateArgs),
    /// 编辑连接
    Edit(EditArgs),
    /// 删除连接
    Delete {
        id: String,
        /// 存在关联会话时确认级联删除
        #[arg(long)]
        yes: bool,
    },
    /// 在连接上开始新会话
    Chat { id: String },
}

#[derive(Args, Debug)]
struct CreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    prompt: String,
    #[arg(long, conflicts_with_all = ["file", "file_type"])]
    dsn: Option<String>,
    #[arg(long, requires = "file_type")]
    file: Option<PathBuf>,
    /// sqlite / csv / excel / sas7bdat
    #[arg(long = "type", value_parser = parse_file_type)]
    file_type: Option<FileType>,
}

#[derive(Args, Debug)]
struct EditArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    dsn: Option<String>,
    #[arg(long)]
    prompt: Option<String>,
    /// 保存前从数据源重新获取 schema（覆盖本地选择）
    #[arg(long)]
    refresh: bool,
    /// 开启 schema 及其下所有表（按下标）
    #[arg(long)]
    enable_schema: Vec<usize>,
    /// 关闭 schema 及其下所有表（按下标）
    #[arg(long)]
    disable_schema: Vec<usize>,
    /// 开启单张表，格式 SCHEMA:TABLE
    #[arg(long, value_parser = parse_table_ref)]
    enable_table: Vec<(usize, usize)>,
    /// 关闭单张表，格式 SCHEMA:TABLE
    #[arg(long, value_parser = parse_table_ref)]
    disable_table: Vec<(usize, usize)>,
    /// 只打印 schema 树，不保存
    #[arg(long)]
    show: bool,
}

fn parse_file_type(s: &str) -> Result<FileType, String> {
    s.parse()
}

fn parse_table_ref(s: &str) -> Result<(usize, usize), String> {
    let (schema, table) = s
        .split_once(':')
        .ok_or_else(|| format!("格式应为 SCHEMA:TABLE，实际为 {}", s))?;
    let schema = schema.parse().map_err(|e| format!("无效的 schema 下标: {}", e))?;
    let table = table.parse().map_err(|e| format!("无效的表下标: {}", e))?;
    Ok((schema, table))
}

/// 初始化日志
fn init_logger(log_level: &str) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .init();
}

/// CLI 中的跳转只记录日志
struct CliNavigationListener;

#[async_trait::async_trait]
impl NavigationListener for CliNavigationListener {
    async fn on_navigate(&self, route: Route) {
        info!("[CLI] ➡️ 跳转: {:?}", route);
    }
}

async fn run_create(
    config: &ClientConfig,
    backend: Arc<dyn ConnectionBackend>,
    args: CreateArgs,
) -> Result<()> {
    let ctrl = CreationController::new(
        config,
        backend,
        Arc::new(TracingNotificationListener),
        Arc::new(CliNavigationListener),
    );
    ctrl.set_name(args.name);
    ctrl.set_system_prompt(args.prompt);

    match (args.dsn, args.file, args.file_type) {
        (Some(dsn), _, _) => {
            ctrl.select_database();
            ctrl.set_dsn(dsn);
        }
        (None, Some(path), Some(file_type)) => {
            ctrl.select_file_type(file_type);
            let handle = FileHandle::from_path(&path).await?;
            ctrl.bind_file(handle);
        }
        (None, None, Some(file_type)) => ctrl.select_file_type(file_type),
        _ => {}
    }

    let connection = ctrl.submit().await?;
    println!("{}\t{}", connection.id, connection.name);
    Ok(())
}

async fn run_edit(
    config: &ClientConfig,
    backend: Arc<dyn ConnectionBackend>,
    args: EditArgs,
) -> Result<()> {
    let ctrl = EditController::new(
        config,
        Some(args.id),
        backend,
        Arc::new(TracingNotificationListener),
        Arc::new(CliNavigationListener),
    );
    ctrl.load().await?;

    if args.refresh {
        ctrl.refresh_schema().await?;
    }

    if args.show {
        let options = ctrl.fields().options;
        for (si, schema) in options.displayable_schemas() {
            println!("[{}] {} {}", si, if schema.enabled { "✔" } else { "✘" }, schema.name);
            for (ti, table) in schema.tables.iter().enumerate() {
                let mark = if schema.is_table_active(ti) { "✔" } else { "✘" };
                println!("    [{}:{}] {} {}", si, ti, mark, table.name);
            }
        }
        return Ok(());
    }

    if let Some(name) = args.name {
        ctrl.set_name(name);
    }
    if let Some(dsn) = args.dsn {
        ctrl.set_dsn(dsn);
    }
    if let Some(prompt) = args.prompt {
        ctrl.set_system_prompt(prompt);
    }
    for idx in args.enable_schema {
        anyhow::ensure!(ctrl.set_schema_enabled(idx, true), "schema 下标无效: {}", idx);
    }
    for idx in args.disable_schema {
        anyhow::ensure!(ctrl.set_schema_enabled(idx, false), "schema 下标无效: {}", idx);
    }
    for (si, ti) in args.enable_table {
        anyhow::ensure!(ctrl.set_table_enabled(si, ti, true), "表下标无效: {}:{}", si, ti);
    }
    for (si, ti) in args.disable_table {
        anyhow::ensure!(ctrl.set_table_enabled(si, ti, false), "表下标无效: {}:{}", si, ti);
    }

    match ctrl.submit().await? {
        SaveOutcome::Unchanged => info!("[CLI] 没有修改"),
        SaveOutcome::Updated(connection) => info!("[CLI] ✅ 已保存: {}", connection.name),
    }
    Ok(())
}

async fn run_delete(
    config: &ClientConfig,
    backend: Arc<dyn ConnectionBackend>,
    id: String,
    yes: bool,
) -> Result<()> {
    let ctrl = EditController::new(
        config,
        Some(id),
        backend,
        Arc::new(TracingNotificationListener),
        Arc::new(CliNavigationListener),
    );
    ctrl.load().await?;

    match ctrl.request_delete().await? {
        DeleteOutcome::Deleted => {}
        DeleteOutcome::NeedsConfirmation { .. } if yes => {
            ctrl.confirm_delete().await?;
        }
        DeleteOutcome::NeedsConfirmation { .. } => {
            if let Some(prompt) = ctrl.prompt() {
                println!("{} {}", prompt.title(), prompt.message());
            }
            println!("使用 --yes 确认删除");
            ctrl.cancel_prompt();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(&cli.log_level);

    let mut config = ClientConfig::load().context("加载配置失败")?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    info!("[CLI] 🚀 后端: {}", config.base_url());

    let backend: Arc<dyn ConnectionBackend> = Arc::new(ConnectionApi::from_config(&config)?);

    match cli.command {
        Command::List => {
            let selector = ConnectionSelector::new(
                backend,
                Arc::new(TracingNotificationListener),
                Arc::new(CliNavigationListener),
            );
            for connection in selector.connections().await? {
                println!(
                    "{}\t{}\t{}\t{} tables",
                    connection.id,
                    connection.dialect,
                    connection.name,
                    connection.options.active_tables().len()
                );
            }
        }
        Command::Create(args) => run_create(&config, backend, args).await?,
        Command::Edit(args) => run_edit(&config, backend, args).await?,
        Command::Delete { id, yes } => run_delete(&config, backend, id, yes).await?,
        Command::Chat { id } => {
            let selector = ConnectionSelector::new(
                backend,
                Arc::new(TracingNotificationListener),
                Arc::new(CliNavigationListener),
            );
            let conversation_id = selector.start_conversation(&id).await?;
            println!("{}", conversation_id);
        }
    }

    Ok(())
}
