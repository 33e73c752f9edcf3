//! Statement configuration
//!
//! Attribute overrides applied to a statement handle right after it is
//! created. Anything left unset keeps the client library default.

use crate::types::{AttrValue, CursorType, StmtAttr};

/// Statement attribute overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementConfig {
    /// STMT_ATTR_UPDATE_MAX_LENGTH (library default: false)
    pub update_max_length: Option<bool>,
    /// STMT_ATTR_CURSOR_TYPE (library default: no cursor)
    pub cursor_type: Option<CursorType>,
    /// STMT_ATTR_PREFETCH_ROWS (library default: 1)
    pub prefetch_rows: Option<u32>,
}

impl StatementConfig {
    /// Config overriding nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Set STMT_ATTR_UPDATE_MAX_LENGTH
    pub fn update_max_length(mut self, enabled: bool) -> Self {
        self.update_max_length = Some(enabled);
        self
    }

    /// Set STMT_ATTR_CURSOR_TYPE
    pub fn cursor_type(mut self, cursor: CursorType) -> Self {
        self.cursor_type = Some(cursor);
        self
    }

    /// Set STMT_ATTR_PREFETCH_ROWS
    pub fn prefetch_rows(mut self, rows: u32) -> Self {
        self.prefetch_rows = Some(rows);
        self
    }

    /// Overrides in the order they are applied
    pub fn attributes(&self) -> Vec<(StmtAttr, AttrValue)> {
        let mut attrs = Vec::new();
        if let Some(enabled) = self.update_max_length {
            attrs.push((StmtAttr::UpdateMaxLength, AttrValue::Bool(enabled)));
        }
        if let Some(cursor) = self.cursor_type {
            attrs.push((StmtAttr::CursorType, AttrValue::Unsigned(cursor.bits())));
        }
        if let Some(rows) = self.prefetch_rows {
            attrs.push((StmtAttr::PrefetchRows, AttrValue::Unsigned(rows)));
        }
        attrs
    }
}
