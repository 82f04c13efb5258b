//! 新建连接的表单状态

use crate::dl::connection::models::{FileHandle, FileType};
use crate::dl::connection::types::{CreateConnectionReq, CreateFileConnectionReq};
use crate::dl::connection::validation::ValidationRules;
use crate::dl::error::{Field, ValidationError, ValidationKind};

/// 数据源模式
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DraftMode {
    #[default]
    Unset,
    Database {
        dsn: String,
    },
    File {
        handle: Option<FileHandle>,
        file_type: FileType,
    },
}

/// 校验通过后的创建请求，按模式分派到不同的接口
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateRequest {
    Database(CreateConnectionReq),
    File(CreateFileConnectionReq),
}

/// 新建连接表单
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionDraft {
    pub name: String,
    pub mode: DraftMode,
    pub system_prompt: String,
}

impl ConnectionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// 切换到数据库模式；已经是数据库模式时保留已输入的 DSN
    pub fn select_database(&mut self) {
        if !matches!(self.mode, DraftMode::Database { .. }) {
            self.mode = DraftMode::Database { dsn: String::new() };
        }
    }

    /// 切换文件类型；在文件类型之间切换时保留已选择的文件
    pub fn select_file_type(&mut self, file_type: FileType) {
        let handle = match std::mem::take(&mut self.mode) {
            DraftMode::File { handle, .. } => handle,
            _ => None,
        };
        self.mode = DraftMode::File { handle, file_type };
    }

    /// 设置 DSN，非数据库模式下返回 false
    pub fn set_dsn(&mut self, value: impl Into<String>) -> bool {
        match &mut self.mode {
            DraftMode::Database { dsn } => {
                *dsn = value.into();
                true
            }
            _ => false,
        }
    }

    /// 绑定文件，非文件模式下返回 false
    pub fn bind_file(&mut self, file: FileHandle) -> bool {
        match &mut self.mode {
            DraftMode::File { handle, .. } => {
                *handle = Some(file);
                true
            }
            _ => false,
        }
    }

    pub fn clear_file(&mut self) {
        if let DraftMode::File { handle, .. } = &mut self.mode {
            *handle = None;
        }
    }

    /// 按顺序校验：名称 → DSN/文件 → 文件大小 → system prompt，遇到第一个失败即返回
    pub fn validate(&self, rules: &ValidationRules) -> Result<CreateRequest, ValidationError> {
        rules.require_name(&self.name)?;
        match &self.mode {
            DraftMode::Unset => Err(ValidationError::new(Field::Source, ValidationKind::Missing)),
            DraftMode::Database { dsn } => {
                rules.require_dsn(dsn)?;
                rules.require_system_prompt(&self.system_prompt)?;
                Ok(CreateRequest::Database(CreateConnectionReq {
                    dsn: dsn.clone(),
                    name: self.name.clone(),
                    system_prompt: self.system_prompt.clone(),
                    is_sample: false,
                }))
            }
            DraftMode::File { handle, file_type } => {
                let file = rules.require_file(handle.as_ref())?;
                rules.require_file_size_limit(file)?;
                rules.require_system_prompt(&self.system_prompt)?;
                Ok(CreateRequest::File(CreateFileConnectionReq {
                    file: file.clone(),
                    name: self.name.clone(),
                    file_type: *file_type,
                    system_prompt: self.system_prompt.clone(),
                }))
            }
        }
    }
}
