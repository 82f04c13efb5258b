//! Schema 选择模型
//!
//! 所有更新都返回一棵新树，原树保持不变。
//! 表的实际启用状态 = schema.enabled && table.enabled。

use crate::dl::connection::models::{ConnectionOptions, SchemaNode};

impl SchemaNode {
    /// 表的实际启用状态
    pub fn is_table_active(&self, table_index: usize) -> bool {
        self.enabled
            && self
                .tables
                .get(table_index)
                .map(|t| t.enabled)
                .unwrap_or(false)
    }

    /// 没有表的 schema 不参与交互展示，但仍原样保存
    pub fn is_displayable(&self) -> bool {
        !self.tables.is_empty()
    }
}

impl ConnectionOptions {
    /// 设置 schema 开关，并把其下所有表覆盖为相同的值
    ///
    /// 下标越界时返回未修改的副本
    pub fn with_schema_enabled(&self, schema_index: usize, enabled: bool) -> Self {
        Self {
            schemas: self
                .schemas
                .iter()
                .enumerate()
                .map(|(idx, schema)| {
                    if idx != schema_index {
                        return schema.clone();
                    }
                    let mut schema = schema.clone();
                    schema.enabled = enabled;
                    for table in &mut schema.tables {
                        table.enabled = enabled;
                    }
                    schema
                })
                .collect(),
        }
    }

    /// 只设置一张表的开关，schema 自身与兄弟表不变
    pub fn with_table_enabled(
        &self,
        schema_index: usize,
        table_index: usize,
        enabled: bool,
    ) -> Self {
        let mut next = self.clone();
        if let Some(table) = next
            .schemas
            .get_mut(schema_index)
            .and_then(|s| s.tables.get_mut(table_index))
        {
            table.enabled = enabled;
        }
        next
    }

    pub fn has_table(&self, schema_index: usize, table_index: usize) -> bool {
        self.schemas
            .get(schema_index)
            .is_some_and(|s| table_index < s.tables.len())
    }

    /// 可交互展示的 schema（按原始顺序，附带原始下标）
    pub fn displayable_schemas(&self) -> impl Iterator<Item = (usize, &SchemaNode)> {
        self.schemas
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_displayable())
    }

    /// 实际启用的 `schema.table` 列表
    pub fn active_tables(&self) -> Vec<String> {
        self.schemas
            .iter()
            .filter(|s| s.enabled)
            .flat_map(|s| {
                s.tables
                    .iter()
                    .filter(|t| t.enabled)
                    .map(move |t| format!("{}.{}", s.name, t.name))
            })
            .collect()
    }
}
