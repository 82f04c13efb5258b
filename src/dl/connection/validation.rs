//! 字段校验规则（纯函数，无副作用）

use crate::dl::config::{ClientConfig, DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_MIN_SYSTEM_PROMPT_LEN};
use crate::dl::connection::models::FileHandle;
use crate::dl::error::{Field, ValidationError, ValidationKind};

/// 校验规则及其阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub max_file_size_bytes: u64,
    pub min_system_prompt_len: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            min_system_prompt_len: DEFAULT_MIN_SYSTEM_PROMPT_LEN,
        }
    }
}

impl From<&ClientConfig> for ValidationRules {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_file_size_bytes: config.max_file_size_bytes,
            min_system_prompt_len: config.min_system_prompt_len,
        }
    }
}

impl ValidationRules {
    pub fn require_name(&self, name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::new(Field::Name, ValidationKind::Empty));
        }
        Ok(())
    }

    pub fn require_dsn(&self, dsn: &str) -> Result<(), ValidationError> {
        if dsn.trim().is_empty() {
            return Err(ValidationError::new(Field::Dsn, ValidationKind::Empty));
        }
        Ok(())
    }

    pub fn require_file<'a>(
        &self,
        file: Option<&'a FileHandle>,
    ) -> Result<&'a FileHandle, ValidationError> {
        file.ok_or(ValidationError::new(Field::File, ValidationKind::Missing))
    }

    pub fn require_file_size_limit(&self, file: &FileHandle) -> Result<(), ValidationError> {
        if file.size > self.max_file_size_bytes {
            return Err(ValidationError::new(
                Field::File,
                ValidationKind::TooLarge {
                    max: self.max_file_size_bytes,
                },
            ));
        }
        Ok(())
    }

    /// 长度按字符数计算（去除首尾空白后）
    pub fn require_system_prompt(&self, text: &str) -> Result<(), ValidationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::new(
                Field::SystemPrompt,
                ValidationKind::Empty,
            ));
        }
        if trimmed.chars().count() < self.min_system_prompt_len {
            return Err(ValidationError::new(
                Field::SystemPrompt,
                ValidationKind::TooShort {
                    min: self.min_system_prompt_len,
                },
            ));
        }
        Ok(())
    }
}
