//! 客户端配置
//!
//! 默认值可被 `DATALINE_*` 环境变量覆盖，例如 `DATALINE_API_BASE_URL`

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// 默认的后端地址
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:7377";

/// 上传文件大小上限：500MB
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 500 * 1024 * 1024;

/// System prompt 最小长度（去除首尾空白后）
pub const DEFAULT_MIN_SYSTEM_PROMPT_LEN: usize = 10;

/// 客户端配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// HTTP API 基础地址
    pub api_base_url: String,
    /// 认证 token，存在时以 Bearer 方式附加到每个请求
    pub token: Option<String>,
    /// 是否在数据源列表中展示示例数据集
    pub show_sample_datasets: bool,
    /// 上传文件大小上限（字节）
    pub max_file_size_bytes: u64,
    /// System prompt 最小长度
    pub min_system_prompt_len: usize,
    /// 请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            show_sample_datasets: false,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            min_system_prompt_len: DEFAULT_MIN_SYSTEM_PROMPT_LEN,
            request_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// 默认值 + `DATALINE_*` 环境变量
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(ClientConfig::default()))
            .merge(Env::prefixed("DATALINE_"))
    }

    /// 去掉末尾的 `/`，便于拼接路径
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}
