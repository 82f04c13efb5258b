//! 连接模块
//!
//! 新建、编辑、删除数据源连接，以及 schema 选择

pub mod api;
pub mod creator;
pub mod draft;
pub mod editor;
pub mod models;
pub mod schema;
pub mod selector;
pub mod types;
pub mod validation;

// 重新导出主要类型
pub use api::{ConnectionApi, ConnectionBackend};
pub use creator::{CreationController, SourceKind, SourceOption};
pub use draft::{ConnectionDraft, CreateRequest, DraftMode};
pub use editor::{BackOutcome, DeleteOutcome, EditController, EditFields, EditorPrompt, SaveOutcome};
pub use models::{
    Connection, ConnectionOptions, ConversationSummary, FileHandle, FileType, SchemaNode,
    TableNode,
};
pub use selector::ConnectionSelector;
pub use types::UpdateConnectionPayload;
pub use validation::ValidationRules;
