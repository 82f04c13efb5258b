//! 通知与导航回调接口
//!
//! 渲染层通过实现这两个 trait 接收用户提示和页面跳转

use async_trait::async_trait;
use std::fmt;
use tracing::{error, info};

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// 页面路由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// 默认落地页
    Home,
    /// 返回上一页
    Back,
    NewConnection,
    EditConnection(String),
    Chat(String),
}

/// 通知回调（fire-and-forget，不返回结果）
#[async_trait]
pub trait NotificationListener: Send + Sync {
    async fn on_notify(&self, severity: Severity, message: String);
}

/// 导航回调
#[async_trait]
pub trait NavigationListener: Send + Sync {
    async fn on_navigate(&self, route: Route);
}

/// 默认空实现（无操作）
pub struct EmptyNotificationListener;

#[async_trait]
impl NotificationListener for EmptyNotificationListener {
    async fn on_notify(&self, _severity: Severity, _message: String) {}
}

/// 默认空实现（无操作）
pub struct EmptyNavigationListener;

#[async_trait]
impl NavigationListener for EmptyNavigationListener {
    async fn on_navigate(&self, _route: Route) {}
}

/// 把通知写入日志，适用于没有界面的场景（CLI）
pub struct TracingNotificationListener;

#[async_trait]
impl NotificationListener for TracingNotificationListener {
    async fn on_notify(&self, severity: Severity, message: String) {
        match severity {
            Severity::Error => error!("[Notify] ❌ {}", message),
            Severity::Success => info!("[Notify] ✅ {}", message),
            Severity::Info => info!("[Notify] 💡 {}", message),
        }
    }
}
