//! 错误类型定义
//!
//! - `ValidationError`：本地提交前校验失败，永远不会到达网络层
//! - `TransportError`：外部接口调用失败（网络、HTTP、反序列化、服务器错误）
//! - `ConnectionError`：控制器对外返回的统一错误

use std::fmt;
use thiserror::Error;

/// 被校验的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Dsn,
    File,
    SystemPrompt,
    /// 数据源类型（未选择数据库或文件时）
    Source,
}

/// 校验失败的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Empty,
    TooShort { min: usize },
    Missing,
    TooLarge { max: u64 },
}

/// 本地校验错误，`Display` 即面向用户的提示文案
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.message())]
pub struct ValidationError {
    pub field: Field,
    pub kind: ValidationKind,
}

const MIB: u64 = 1024 * 1024;

impl ValidationError {
    pub fn new(field: Field, kind: ValidationKind) -> Self {
        Self { field, kind }
    }

    /// 面向用户的提示文案
    pub fn message(&self) -> String {
        match (self.field, self.kind) {
            (Field::Name, _) => "Please add a name".to_string(),
            (Field::Dsn, _) => "Please enter a dsn for this connection".to_string(),
            (Field::File, ValidationKind::TooLarge { max }) if max < MIB => {
                format!("File size exceeds {} bytes limit", max)
            }
            (Field::File, ValidationKind::TooLarge { max }) => {
                format!("File size exceeds {}MB limit", max / MIB)
            }
            (Field::File, _) => "Please add a file".to_string(),
            (Field::SystemPrompt, ValidationKind::TooShort { min }) => format!(
                "System prompt should have at least {} characters. Please provide more detailed instructions.",
                min
            ),
            (Field::SystemPrompt, _) => "System prompt is required. Please provide instructions for the AI to understand your database.".to_string(),
            (Field::Source, _) => "Please select a data source type".to_string(),
        }
    }
}

/// 外部接口失败的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// 请求未发出或连接中断
    Network,
    /// 非 2xx 状态码
    Http(u16),
    /// 响应体无法解析
    Decode,
    /// 响应中缺少 data 等服务器侧错误
    Server,
    /// 读取本地上传文件失败
    Io,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Http(status) => write!(f, "http {}", status),
            Self::Decode => write!(f, "decode"),
            Self::Server => write!(f, "server"),
            Self::Io => write!(f, "io"),
        }
    }
}

/// 外部接口调用失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Http(status), message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Decode, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Server, message)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Self::decode(e.to_string());
        }
        match e.status() {
            Some(status) => Self::http(status.as_u16(), e.to_string()),
            None => Self::network(e.to_string()),
        }
    }
}

/// 控制器统一错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("No connection id provided - something went wrong")]
    MissingConnectionId,

    #[error("Connection has not been loaded yet")]
    NotLoaded,

    /// 同一操作已有请求在途，本次触发被丢弃
    #[error("Another request is already in flight")]
    Busy,
}
