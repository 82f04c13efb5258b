use crate::dl::error::TransportError;
use serde::Deserialize;
use tracing::{debug, error};

/// 统一的 API 响应包装结构体
/// 成功时为 `{"data": ...}`，失败时后端返回 `{"detail": "..."}`
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
}

/// 错误响应体
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// 从错误响应中提取用户可读的信息，`detail` 缺失时回退为原始 body
fn error_message(body_bytes: &[u8]) -> String {
    let body_str = String::from_utf8_lossy(body_bytes);
    match serde_json::from_slice::<ErrorBody>(body_bytes) {
        Ok(ErrorBody {
            detail: Some(serde_json::Value::String(s)),
        }) => s,
        Ok(ErrorBody {
            detail: Some(other),
        }) => other.to_string(),
        _ => body_str.into_owned(),
    }
}

/// 解析响应：检查状态码、反序列化外层包装、取出 data
///
/// 与网络 I/O 分离，便于在没有服务器的情况下测试
pub fn decode_api_response<T: serde::de::DeserializeOwned>(
    status: u16,
    body_bytes: &[u8],
    operation_name: &str,
) -> Result<T, TransportError> {
    let body_str = String::from_utf8_lossy(body_bytes);

    if !(200..300).contains(&status) {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        return Err(TransportError::http(status, error_message(body_bytes)));
    }
    debug!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);

    let api_resp: ApiResponse<T> = serde_json::from_slice(body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        TransportError::decode(format!("反序列化响应失败: {}", e))
    })?;

    api_resp.data.ok_or_else(|| {
        error!("[HTTP] {}响应中缺少 data 字段", operation_name);
        TransportError::server("响应中缺少 data 字段")
    })
}

/// 通用 HTTP 响应处理函数：读取 body 后交给 `decode_api_response`
/// 所有 API 都可以共用此方法
pub async fn handle_http_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> Result<T, TransportError> {
    let status = response.status();

    // 读取 body bytes（只能读取一次）
    let body_bytes = response.bytes().await.map_err(|e| {
        error!("[HTTP] {}读取响应 body 失败: {}", operation_name, e);
        TransportError::network(format!("读取响应 body 失败: {}", e))
    })?;
    debug!(
        "[HTTP] {}响应 Body: {}",
        operation_name,
        String::from_utf8_lossy(&body_bytes)
    );

    decode_api_response(status.as_u16(), &body_bytes, operation_name)
}

/// 处理没有 data 的响应（例如删除），只检查状态码
pub async fn handle_empty_response(
    response: reqwest::Response,
    operation_name: &str,
) -> Result<(), TransportError> {
    let status = response.status();
    let body_bytes = response.bytes().await.map_err(|e| {
        TransportError::network(format!("读取响应 body 失败: {}", e))
    })?;

    if !status.is_success() {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name,
            status,
            String::from_utf8_lossy(&body_bytes)
        );
        return Err(TransportError::http(
            status.as_u16(),
            error_message(&body_bytes),
        ));
    }
    debug!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);
    Ok(())
}
