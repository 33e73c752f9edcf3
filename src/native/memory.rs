//! In-process statement engine
//!
//! Implements the native statement traits without a server: placeholders are
//! counted, `INSERT` appends the bound values to a per-table row list,
//! `SELECT ... FROM t` answers with those rows and `DELETE FROM t` empties
//! the table. Every native call lands in a journal, and any call can be made
//! to fail once through [`MemoryConnection::fail_next`].
//!
//! Handles share the connection state through `Rc<RefCell<_>>` and are
//! therefore confined to one thread, like real client handles.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use lazy_static::lazy_static;

use super::{NativeConnection, NativeStatement, AFFECTED_ROWS_ERROR};
use crate::api::BindSlot;
use crate::types::{CursorType, StmtAttr};

pub const ER_DUP_ENTRY: u32 = 1062;
pub const ER_PARSE_ERROR: u32 = 1064;
pub const ER_EMPTY_QUERY: u32 = 1065;
pub const ER_NO_SUCH_TABLE: u32 = 1146;
pub const CR_OUT_OF_MEMORY: u32 = 2008;
pub const CR_SERVER_LOST: u32 = 2013;
pub const CR_COMMANDS_OUT_OF_SYNC: u32 = 2014;
pub const CR_NO_PREPARE_STMT: u32 = 2030;
pub const CR_PARAMS_NOT_BOUND: u32 = 2031;
pub const CR_INVALID_PARAMETER_NO: u32 = 2034;
pub const CR_NOT_IMPLEMENTED: u32 = 2054;

lazy_static! {
    /// errno -> (sqlstate, message)
    static ref ERRORS: HashMap<u32, (&'static str, &'static str)> = {
        let mut m = HashMap::new();
        m.insert(ER_DUP_ENTRY, ("23000", "Duplicate entry for key 'PRIMARY'"));
        m.insert(ER_PARSE_ERROR, ("42000", "You have an error in your SQL syntax"));
        m.insert(ER_EMPTY_QUERY, ("42000", "Query was empty"));
        m.insert(ER_NO_SUCH_TABLE, ("42S02", "Table doesn't exist"));
        m.insert(CR_OUT_OF_MEMORY, ("HY000", "MySQL client ran out of memory"));
        m.insert(CR_SERVER_LOST, ("HY000", "Lost connection to MySQL server during query"));
        m.insert(
            CR_COMMANDS_OUT_OF_SYNC,
            ("HY000", "Commands out of sync; you can't run this command now"),
        );
        m.insert(CR_NO_PREPARE_STMT, ("HY000", "Statement not prepared"));
        m.insert(
            CR_PARAMS_NOT_BOUND,
            ("HY000", "No data supplied for parameters in prepared statement"),
        );
        m.insert(CR_INVALID_PARAMETER_NO, ("HY000", "Invalid parameter number"));
        m.insert(CR_NOT_IMPLEMENTED, ("HY000", "This feature is not implemented yet"));
        m
    };
}

/// Native calls that can be journaled and made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Prepare,
    BindParam,
    Execute,
    StoreResult,
    FreeResult,
    Reset,
    Close,
    AttrSet,
}

impl Call {
    /// C function the call stands for
    pub fn name(self) -> &'static str {
        match self {
            Call::Prepare => "mysql_stmt_prepare",
            Call::BindParam => "mysql_stmt_bind_param",
            Call::Execute => "mysql_stmt_execute",
            Call::StoreResult => "mysql_stmt_store_result",
            Call::FreeResult => "mysql_stmt_free_result",
            Call::Reset => "mysql_stmt_reset",
            Call::Close => "mysql_stmt_close",
            Call::AttrSet => "mysql_stmt_attr_set",
        }
    }
}

#[derive(Default)]
struct Server {
    tables: HashMap<String, Vec<Vec<BindSlot>>>,
    next_insert_id: u64,
    journal: Vec<&'static str>,
    failures: HashMap<Call, u32>,
    out_of_memory: bool,
    open_statements: usize,
}

impl Server {
    /// Journal `call`; returns the injected errno if it is due to fail
    fn enter(&mut self, call: Call) -> Option<u32> {
        self.journal.push(call.name());
        self.failures.remove(&call)
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Connection to the in-process engine. Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryConnection {
    server: Rc<RefCell<Server>>,
}

impl MemoryConnection {
    /// Fresh engine with no tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `call` on any statement of this connection fail with `errno`
    pub fn fail_next(&self, call: Call, errno: u32) {
        self.server.borrow_mut().failures.insert(call, errno);
    }

    /// Make `stmt_init` fail as the client library does when allocation fails
    pub fn set_out_of_memory(&self, out_of_memory: bool) {
        self.server.borrow_mut().out_of_memory = out_of_memory;
    }

    /// Native calls issued so far, in order
    pub fn journal(&self) -> Vec<&'static str> {
        self.server.borrow().journal.clone()
    }

    /// Forget the calls journaled so far
    pub fn clear_journal(&self) {
        self.server.borrow_mut().journal.clear();
    }

    /// Rows inserted into `table`
    pub fn rows(&self, table: &str) -> Vec<Vec<BindSlot>> {
        self.server
            .borrow()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Statement handles created and not yet closed
    pub fn open_statements(&self) -> usize {
        self.server.borrow().open_statements
    }
}

impl NativeConnection for MemoryConnection {
    type Statement = MemoryStatement;

    fn stmt_init(&mut self) -> Option<MemoryStatement> {
        let mut server = self.server.borrow_mut();
        server.journal.push("mysql_stmt_init");
        if server.out_of_memory {
            return None;
        }
        server.open_statements += 1;
        Some(MemoryStatement::new(Rc::clone(&self.server)))
    }
}

// ============================================================================
// Query Shape
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum QueryKind {
    Select { table: Option<String>, fields: u32 },
    Insert { table: String },
    Delete { table: String },
    Other,
}

#[derive(Debug, Clone)]
struct ParsedQuery {
    kind: QueryKind,
    param_count: u64,
}

fn parse_query(query: &str) -> Result<ParsedQuery, u32> {
    let trimmed = query.trim().trim_end_matches(';').trim();
    if trimmed.is_empty() {
        return Err(ER_EMPTY_QUERY);
    }

    let upper = trimmed.to_uppercase();
    let words: Vec<&str> = upper.split_whitespace().collect();
    let original: Vec<&str> = trimmed.split_whitespace().collect();
    let word_after = |keyword: &str| {
        words
            .iter()
            .position(|w| *w == keyword)
            .and_then(|i| original.get(i + 1))
            .map(|w| table_name(w))
            .filter(|w| !w.is_empty())
    };

    let kind = match words[0] {
        "SELECT" => {
            let from = words.iter().position(|w| *w == "FROM");
            let list = &original[1..from.unwrap_or(original.len())].join(" ");
            QueryKind::Select {
                table: word_after("FROM"),
                fields: count_outside_quotes(list, b',') + u32::from(!list.is_empty()),
            }
        }
        "INSERT" | "REPLACE" => QueryKind::Insert {
            table: word_after("INTO").ok_or(ER_PARSE_ERROR)?,
        },
        "DELETE" => QueryKind::Delete {
            table: word_after("FROM").ok_or(ER_PARSE_ERROR)?,
        },
        "UPDATE" | "CREATE" | "DROP" | "ALTER" | "TRUNCATE" | "SET" | "DO" | "CALL" => {
            QueryKind::Other
        }
        _ => return Err(ER_PARSE_ERROR),
    };

    Ok(ParsedQuery {
        kind,
        param_count: count_outside_quotes(trimmed, b'?') as u64,
    })
}

fn table_name(word: &str) -> String {
    word.split('(')
        .next()
        .unwrap_or_default()
        .trim_matches('`')
        .to_string()
}

/// Count `needle` bytes outside quoted strings, quoted identifiers and
/// comments (`-- `, `#` and `/* */`)
fn count_outside_quotes(sql: &str, needle: u8) -> u32 {
    let bytes = sql.as_bytes();
    let mut count = 0;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == b'\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                b'\'' | b'"' | b'`' => quote = Some(c),
                b'#' => i = skip_line(bytes, i),
                // MySQL needs whitespace (or end of input) after `--`
                b'-' if bytes.get(i + 1) == Some(&b'-')
                    && bytes.get(i + 2).map_or(true, u8::is_ascii_whitespace) =>
                {
                    i = skip_line(bytes, i)
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = bytes[i + 2..]
                        .windows(2)
                        .position(|w| w == b"*/")
                        .map_or(bytes.len(), |end| i + 2 + end + 1);
                }
                c if c == needle => count += 1,
                _ => {}
            },
        }
        i += 1;
    }

    count
}

/// Index of the newline ending the line at `start`, or the end of input
fn skip_line(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |end| start + end)
}

// ============================================================================
// Statement
// ============================================================================

/// Metadata handed over for a `SELECT`
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryMetadata {
    pub table: Option<String>,
    pub field_count: u32,
}

/// Statement handle of the in-process engine
pub struct MemoryStatement {
    server: Rc<RefCell<Server>>,
    query: Option<ParsedQuery>,
    bound: Option<Vec<BindSlot>>,
    result: Option<Vec<Vec<BindSlot>>>,
    stored: bool,
    cursor: Cell<u64>,
    affected_rows: u64,
    insert_id: u64,
    errno: u32,
    update_max_length: bool,
    cursor_type: u64,
    prefetch_rows: u64,
}

impl MemoryStatement {
    fn new(server: Rc<RefCell<Server>>) -> Self {
        Self {
            server,
            query: None,
            bound: None,
            result: None,
            stored: false,
            cursor: Cell::new(0),
            affected_rows: 0,
            insert_id: 0,
            errno: 0,
            update_max_length: false,
            cursor_type: CursorType::NO_CURSOR.bits() as u64,
            prefetch_rows: 1,
        }
    }

    fn enter(&mut self, call: Call) -> bool {
        let injected = self.server.borrow_mut().enter(call);
        match injected {
            Some(errno) => self.fail(errno),
            None => {
                self.errno = 0;
                true
            }
        }
    }

    /// Record `errno` as the last error; always `false` for tail calls
    fn fail(&mut self, errno: u32) -> bool {
        self.errno = errno;
        false
    }

    /// Next row of the result set, advancing the cursor
    pub fn fetch_row(&self) -> Option<Vec<BindSlot>> {
        let cursor = self.cursor.get();
        let row = self.result.as_ref()?.get(cursor as usize)?.clone();
        self.cursor.set(cursor + 1);
        Some(row)
    }

    /// Values registered by the last successful bind
    pub fn bound(&self) -> Option<&[BindSlot]> {
        self.bound.as_deref()
    }
}

impl NativeStatement for MemoryStatement {
    type Metadata = MemoryMetadata;

    fn prepare(&mut self, query: &str) -> bool {
        self.query = None;
        self.bound = None;
        self.result = None;
        self.stored = false;
        if !self.enter(Call::Prepare) {
            return false;
        }
        match parse_query(query) {
            Ok(parsed) => {
                self.query = Some(parsed);
                true
            }
            Err(errno) => self.fail(errno),
        }
    }

    fn param_count(&self) -> u64 {
        self.query.as_ref().map_or(0, |q| q.param_count)
    }

    unsafe fn bind_param(&mut self, params: &mut [BindSlot]) -> bool {
        if !self.enter(Call::BindParam) {
            return false;
        }
        if self.query.is_none() {
            return self.fail(CR_NO_PREPARE_STMT);
        }
        if params.len() as u64 != self.param_count() {
            return self.fail(CR_INVALID_PARAMETER_NO);
        }
        self.bound = Some(params.to_vec());
        true
    }

    fn execute(&mut self) -> bool {
        if !self.enter(Call::Execute) {
            return false;
        }
        let Some(query) = self.query.clone() else {
            return self.fail(CR_NO_PREPARE_STMT);
        };
        if query.param_count > 0 && self.bound.is_none() {
            return self.fail(CR_PARAMS_NOT_BOUND);
        }

        self.result = None;
        self.stored = false;
        self.cursor.set(0);

        let mut server = self.server.borrow_mut();
        match query.kind {
            QueryKind::Insert { table } => {
                let row = self.bound.clone().unwrap_or_default();
                server.tables.entry(table).or_default().push(row);
                server.next_insert_id += 1;
                self.insert_id = server.next_insert_id;
                self.affected_rows = 1;
            }
            QueryKind::Select { table, .. } => {
                let rows = match table {
                    Some(table) => server.tables.get(&table).cloned(),
                    None => Some(vec![self.bound.clone().unwrap_or_default()]),
                };
                drop(server);
                let Some(rows) = rows else {
                    return self.fail(ER_NO_SUCH_TABLE);
                };
                self.result = Some(rows);
                self.affected_rows = AFFECTED_ROWS_ERROR;
            }
            QueryKind::Delete { table } => {
                let removed = server.tables.get_mut(&table).map(std::mem::take);
                self.affected_rows = removed.map_or(0, |rows| rows.len() as u64);
            }
            QueryKind::Other => self.affected_rows = 0,
        }
        true
    }

    fn store_result(&mut self) -> bool {
        if !self.enter(Call::StoreResult) {
            return false;
        }
        if let Some(rows) = &self.result {
            self.stored = true;
            self.cursor.set(0);
            self.affected_rows = rows.len() as u64;
        }
        true
    }

    fn free_result(&mut self) -> bool {
        if !self.enter(Call::FreeResult) {
            return false;
        }
        self.result = None;
        self.stored = false;
        self.cursor.set(0);
        true
    }

    fn reset(&mut self) -> bool {
        if !self.enter(Call::Reset) {
            return false;
        }
        if self.query.is_none() {
            return self.fail(CR_NO_PREPARE_STMT);
        }
        self.result = None;
        self.stored = false;
        self.cursor.set(0);
        true
    }

    fn close(mut self) -> bool {
        let ok = self.enter(Call::Close);
        self.server.borrow_mut().open_statements -= 1;
        ok
    }

    fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    fn insert_id(&self) -> u64 {
        self.insert_id
    }

    fn field_count(&self) -> u32 {
        match self.query.as_ref().map(|q| &q.kind) {
            Some(QueryKind::Select { fields, .. }) => *fields,
            _ => 0,
        }
    }

    fn num_rows(&self) -> u64 {
        match &self.result {
            Some(rows) if self.stored => rows.len() as u64,
            _ => 0,
        }
    }

    fn data_seek(&mut self, row: u64) {
        self.cursor.set(row);
    }

    fn errno(&self) -> u32 {
        self.errno
    }

    fn error(&self) -> String {
        ERRORS
            .get(&self.errno)
            .map(|(_, message)| message.to_string())
            .unwrap_or_default()
    }

    fn sqlstate(&self) -> String {
        ERRORS
            .get(&self.errno)
            .map_or("00000", |(state, _)| *state)
            .to_string()
    }

    fn attr_get(&self, attr: StmtAttr) -> Option<u64> {
        Some(match attr {
            StmtAttr::UpdateMaxLength => self.update_max_length as u64,
            StmtAttr::CursorType => self.cursor_type,
            StmtAttr::PrefetchRows => self.prefetch_rows,
        })
    }

    fn attr_set(&mut self, attr: StmtAttr, value: u64) -> bool {
        if !self.enter(Call::AttrSet) {
            return false;
        }
        match attr {
            StmtAttr::UpdateMaxLength => self.update_max_length = value != 0,
            // Only read-only cursors are implemented by the client library
            StmtAttr::CursorType if value > CursorType::READ_ONLY.bits() as u64 => {
                return self.fail(CR_NOT_IMPLEMENTED)
            }
            StmtAttr::CursorType => self.cursor_type = value,
            StmtAttr::PrefetchRows if value == 0 => return self.fail(CR_NOT_IMPLEMENTED),
            StmtAttr::PrefetchRows => self.prefetch_rows = value,
        }
        true
    }

    fn result_metadata(&mut self) -> Option<MemoryMetadata> {
        match &self.query.as_ref()?.kind {
            QueryKind::Select { table, fields } => Some(MemoryMetadata {
                table: table.clone(),
                field_count: *fields,
            }),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
