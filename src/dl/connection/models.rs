//! 连接本地模型定义

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 表选择节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNode {
    pub name: String,
    pub enabled: bool,
}

/// Schema 选择节点，`tables` 保持服务器返回的顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaNode {
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub tables: Vec<TableNode>,
}

/// 连接的 schema 选项树
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    #[serde(default)]
    pub schemas: Vec<SchemaNode>,
}

/// 连接数据结构（可直接从服务器返回的 JSON 反序列化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub name: String,
    /// 数据库方言，例如 postgresql、sqlite
    #[serde(default)]
    pub dialect: String,
    /// 连接类型，例如 postgres、sqlite、csv
    #[serde(rename = "type", default)]
    pub connection_type: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub dsn: Option<String>,
    #[serde(default)]
    pub is_sample: bool,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub options: ConnectionOptions,
}

/// 会话摘要（只用于统计依赖某个连接的会话数）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub connection_id: String,
}

/// 支持上传的文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Sqlite,
    Csv,
    Excel,
    Sas7bdat,
}

impl FileType {
    pub const ALL: [FileType; 4] = [
        FileType::Sqlite,
        FileType::Csv,
        FileType::Excel,
        FileType::Sas7bdat,
    ];

    /// 接口中使用的类型标识
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Sqlite => "sqlite",
            FileType::Csv => "csv",
            FileType::Excel => "excel",
            FileType::Sas7bdat => "sas7bdat",
        }
    }

    /// 界面展示名称
    pub fn label(&self) -> &'static str {
        match self {
            FileType::Sqlite => "SQLite data file",
            FileType::Csv => "CSV file",
            FileType::Excel => "Excel file",
            FileType::Sas7bdat => "sas7bdat file",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FileType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown file type: {}", s))
    }
}

/// 已选择的本地文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub path: PathBuf,
    /// 上传时使用的文件名
    pub file_name: String,
    /// 文件大小（字节）
    pub size: u64,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>, file_name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
            size,
        }
    }

    /// 从磁盘读取文件名与大小
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("读取文件信息失败: {}", path.display()))?;
        if !metadata.is_file() {
            anyhow::bail!("不是普通文件: {}", path.display());
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("无法获取文件名: {}", path.display()))?;
        Ok(Self::new(path, file_name, metadata.len()))
    }
}
