pub mod dl;

// 重新导出常用类型，方便外部使用
pub use dl::{
    config::ClientConfig,
    connection::{
        Connection, ConnectionApi, ConnectionBackend, ConnectionSelector, CreationController,
        EditController,
    },
    error::{ConnectionError, TransportError, ValidationError},
    listener::{NavigationListener, NotificationListener, Route, Severity},
};
