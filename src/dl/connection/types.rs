//! 连接 API DTO（请求和响应结构体）

use crate::dl::connection::models::{Connection, ConnectionOptions, FileHandle, FileType};
use serde::{Deserialize, Deserializer, Serialize};

/// 反序列化数组字段，处理 null 值
pub(crate) fn deserialize_vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// 通过 DSN 创建连接
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateConnectionReq {
    pub dsn: String,
    pub name: String,
    pub system_prompt: String,
    pub is_sample: bool,
}

/// 通过上传文件创建连接（multipart 表单）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFileConnectionReq {
    pub file: FileHandle,
    pub name: String,
    pub file_type: FileType,
    pub system_prompt: String,
}

/// 部分更新：缺失的字段不序列化，避免用旧值覆盖服务器数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateConnectionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ConnectionOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// 新建会话
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateConversationReq {
    pub connection_id: String,
    pub name: String,
}

/// 单个连接响应
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionResp {
    pub connection: Connection,
}

/// 连接列表响应
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionsResp {
    #[serde(deserialize_with = "deserialize_vec_or_null")]
    pub connections: Vec<Connection>,
}

/// 刷新 schema 后返回的连接（只使用 options）
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshSchemaResp {
    #[serde(default)]
    pub options: ConnectionOptions,
}

/// 新建会话响应
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedConversationResp {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dl::connection::models::ConversationSummary;

    #[test]
    fn update_payload_omits_absent_fields() {
        let payload = UpdateConnectionPayload {
            name: Some("prod".into()),
            options: Some(ConnectionOptions::default()),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "prod", "options": {"schemas": []}})
        );
    }

    #[test]
    fn null_lists_decode_as_empty() {
        let resp: ConnectionsResp = serde_json::from_str(r#"{"connections": null}"#).unwrap();
        assert!(resp.connections.is_empty());

        let convs: Vec<ConversationSummary> = serde_json::from_str(
            r#"[{"id": "v1", "name": "chat", "connection_id": "c1"}]"#,
        )
        .unwrap();
        assert_eq!(convs[0].connection_id, "c1");
    }
}
