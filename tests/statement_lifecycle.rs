mod common;

use chrono::{TimeZone, Utc};
use common::{init_logs, open};
use mysql_bindings::native::memory::{Call, MemoryConnection, MemoryStatement, ER_DUP_ENTRY};
use mysql_bindings::{
    AttrValue, BindSlot, CursorType, Error, HostValue, NativeStatement, Statement,
    StatementConfig, StmtAttr, StmtState,
};

#[test]
fn test_insert_end_to_end() {
    let (conn, mut stmt) = open();

    assert!(stmt
        .prepare("INSERT INTO t(a,b,c,d) VALUES (?,?,?,?)")
        .unwrap());
    assert_eq!(stmt.param_count().unwrap(), 4);

    let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    stmt.bind_parameters(&[
        HostValue::Null,
        HostValue::Integer(7),
        HostValue::from("x"),
        HostValue::from(date),
    ])
    .unwrap();

    assert!(stmt.execute().unwrap());
    assert_eq!(stmt.affected_rows().unwrap(), 1);
    assert_eq!(stmt.last_insert_id().unwrap(), 1);

    let rows = conn.rows("t");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], BindSlot::Null);
    assert_eq!(rows[0][1], BindSlot::SignedInt(7));
    assert_eq!(rows[0][2], BindSlot::text("x").unwrap());
    let BindSlot::DateTime(t) = &rows[0][3] else {
        panic!("expected datetime, got {:?}", rows[0][3]);
    };
    assert_eq!((t.year, t.month, t.day, t.hour, t.minute, t.second), (2024, 1, 1, 0, 0, 0));
}

#[test]
fn test_param_count_matches_placeholders() {
    let (_conn, mut stmt) = open();

    for n in 0..6 {
        let placeholders = vec!["?"; n].join(", ");
        let query = format!("SELECT {}", placeholders);
        assert!(stmt.prepare(&query).unwrap(), "prepare failed for {}", query);
        assert_eq!(stmt.param_count().unwrap(), n as u64);
        assert_eq!(stmt.params().len(), n);
    }
}

#[test]
fn test_execute_before_prepare() {
    let (_conn, mut stmt) = open();
    assert_eq!(stmt.execute(), Err(Error::NotPrepared));
    assert_eq!(stmt.affected_rows(), Err(Error::NotPrepared));
    assert_eq!(stmt.bind_parameters(&[]), Err(Error::NotPrepared));
    assert_eq!(stmt.reset(), Err(Error::NotPrepared));
}

#[test]
fn test_failed_prepare_is_soft_and_unprepares() {
    let (_conn, mut stmt) = open();

    assert!(stmt.prepare("SELECT ?").unwrap());
    assert!(!stmt.prepare("SELEKT 1").unwrap());
    assert_eq!(stmt.errno().unwrap(), 1064);
    assert_eq!(stmt.sql_state().unwrap(), "42000");
    assert!(!stmt.error().unwrap().is_empty());

    assert_eq!(stmt.state(), StmtState::Initialized);
    assert_eq!(stmt.query(), None);
    assert!(stmt.params().is_empty());
    assert_eq!(stmt.execute(), Err(Error::NotPrepared));
}

#[test]
fn test_execute_requires_bound_parameters() {
    let (_conn, mut stmt) = open();
    assert!(stmt.prepare("INSERT INTO t(a) VALUES (?)").unwrap());
    assert_eq!(
        stmt.execute(),
        Err(Error::ParametersNotBound { param_count: 1 })
    );
}

#[test]
fn test_execute_failure_is_soft() {
    let (conn, mut stmt) = open();
    assert!(stmt.prepare("INSERT INTO t(a) VALUES (?)").unwrap());
    stmt.bind_parameters(&[HostValue::Integer(1)]).unwrap();

    conn.fail_next(Call::Execute, ER_DUP_ENTRY);
    assert!(!stmt.execute().unwrap());
    assert_eq!(stmt.errno().unwrap(), ER_DUP_ENTRY);
    assert_eq!(stmt.sql_state().unwrap(), "23000");
    assert_eq!(stmt.state(), StmtState::Bound);

    // the same binding can simply be executed again
    assert!(stmt.execute().unwrap());
    assert_eq!(stmt.errno().unwrap(), 0);
    assert_eq!(conn.rows("t").len(), 1);
}

#[test]
fn test_reset_keeps_query_and_clears_bindings() {
    let (_conn, mut stmt) = open();
    assert!(stmt.prepare("INSERT INTO t(a, b) VALUES (?, ?)").unwrap());
    stmt.bind_parameters(&[HostValue::Integer(1), HostValue::from("b")])
        .unwrap();
    assert!(stmt.execute().unwrap());
    assert!(stmt.store_result().unwrap());
    assert!(stmt.is_stored());

    stmt.reset().unwrap();

    assert_eq!(stmt.state(), StmtState::Prepared);
    assert!(!stmt.is_stored());
    assert!(!stmt.has_bound_params());
    assert_eq!(stmt.param_count().unwrap(), 2);
    assert_eq!(stmt.query(), Some("INSERT INTO t(a, b) VALUES (?, ?)"));
    assert!(stmt.params().iter().all(BindSlot::is_null));
    assert_eq!(
        stmt.execute(),
        Err(Error::ParametersNotBound { param_count: 2 })
    );

    stmt.bind_parameters(&[HostValue::Integer(2), HostValue::from("c")])
        .unwrap();
    assert!(stmt.execute().unwrap());
}

#[test]
fn test_native_handle_stays_in_step() {
    let (conn, mut stmt) = open();
    assert!(stmt.prepare("SELECT ?").unwrap());
    assert_eq!(stmt.handle().unwrap().param_count(), 1);
    assert_eq!(stmt.params().len(), 1);

    stmt.bind_parameters(&[HostValue::Integer(1)]).unwrap();
    stmt.reset().unwrap();
    conn.clear_journal();

    // released slots are never handed to a native execute
    assert_eq!(
        stmt.execute(),
        Err(Error::ParametersNotBound { param_count: 1 })
    );
    assert!(conn.journal().is_empty());

    stmt.bind_parameters(&[HostValue::Integer(2)]).unwrap();
    assert_eq!(stmt.handle().unwrap().bound(), Some(stmt.params()));
    assert!(stmt.execute().unwrap());
    assert_eq!(
        conn.journal(),
        vec!["mysql_stmt_bind_param", "mysql_stmt_execute"]
    );
}

#[test]
fn test_reset_failure_is_hard() {
    let (conn, mut stmt) = open();
    assert!(stmt.prepare("SELECT 1").unwrap());
    conn.fail_next(Call::Reset, 2013);
    assert!(matches!(stmt.reset(), Err(Error::ResetFailed { .. })));
}

#[test]
fn test_store_and_seek() {
    let (_conn, mut stmt) = open();

    assert!(stmt.prepare("INSERT INTO users(name) VALUES (?)").unwrap());
    for name in ["ada", "grace", "edsger"] {
        stmt.bind_parameters(&[HostValue::from(name)]).unwrap();
        assert!(stmt.execute().unwrap());
    }

    assert!(stmt.prepare("SELECT name FROM users").unwrap());
    assert_eq!(stmt.store_result(), Err(Error::NotExecuted));
    assert!(stmt.execute().unwrap());
    assert_eq!(stmt.field_count().unwrap(), 1);
    assert_eq!(stmt.affected_rows(), Err(Error::AffectedRowsUnavailable));
    assert_eq!(stmt.num_rows(), Err(Error::NotStored));
    assert_eq!(stmt.data_seek(0), Err(Error::NotStored));

    assert!(stmt.store_result().unwrap());
    assert_eq!(stmt.num_rows().unwrap(), 3);
    assert_eq!(stmt.affected_rows().unwrap(), 3);

    stmt.data_seek(2).unwrap();
    let row = stmt.handle().unwrap().fetch_row().unwrap();
    assert_eq!(row, vec![BindSlot::text("edsger").unwrap()]);
    assert_eq!(
        stmt.data_seek(3),
        Err(Error::InvalidRowOffset {
            row: 3,
            num_rows: 3
        })
    );

    assert!(stmt.free_result().unwrap());
    assert!(!stmt.is_stored());
    assert_eq!(stmt.num_rows(), Err(Error::NotStored));
}

#[test]
fn test_result_metadata() {
    let (_conn, mut stmt) = open();

    assert!(stmt.prepare("CREATE TABLE t(a INT, b INT)").unwrap());
    assert!(stmt.result_metadata().unwrap().is_none());

    assert!(stmt.prepare("SELECT a, b FROM t WHERE a > ?").unwrap());
    let metadata = stmt.result_metadata().unwrap().unwrap();
    assert_eq!(metadata.field_count, 2);
    assert_eq!(metadata.handle.table.as_deref(), Some("t"));
}

#[test]
fn test_close_twice() {
    let (conn, mut stmt) = open();
    assert!(stmt.prepare("SELECT ?").unwrap());

    stmt.close().unwrap();
    assert_eq!(stmt.state(), StmtState::Uninitialized);
    assert_eq!(conn.open_statements(), 0);
    assert_eq!(stmt.close(), Err(Error::AlreadyClosed));
}

#[test]
fn test_drop_after_close_makes_no_native_calls() {
    let (conn, mut stmt) = open();
    stmt.close().unwrap();

    conn.clear_journal();
    drop(stmt);
    assert!(conn.journal().is_empty());
}

#[test]
fn test_drop_releases_handle() {
    let (conn, mut stmt) = open();
    assert!(stmt.prepare("SELECT ?").unwrap());
    conn.clear_journal();

    drop(stmt);
    assert_eq!(
        conn.journal(),
        vec!["mysql_stmt_free_result", "mysql_stmt_close"]
    );
    assert_eq!(conn.open_statements(), 0);
}

#[test]
fn test_drop_swallows_native_errors() {
    let (conn, stmt) = open();
    conn.fail_next(Call::FreeResult, 2013);
    conn.fail_next(Call::Close, 2013);
    drop(stmt);
    assert_eq!(conn.open_statements(), 0);
}

#[test]
fn test_close_failure_reported_once() {
    let (conn, mut stmt) = open();
    conn.fail_next(Call::Close, 2013);

    assert_eq!(stmt.close(), Err(Error::CloseFailed));
    assert_eq!(stmt.close(), Err(Error::AlreadyClosed));
    assert_eq!(conn.open_statements(), 0);
}

#[test]
fn test_init_out_of_memory() {
    init_logs();
    let mut conn = MemoryConnection::new();
    conn.set_out_of_memory(true);
    let result = Statement::<MemoryStatement>::init(&mut conn);
    assert!(matches!(result, Err(Error::OutOfMemory)));
}

#[test]
fn test_init_with_config() {
    init_logs();
    let mut conn = MemoryConnection::new();
    let config = StatementConfig::new()
        .update_max_length(true)
        .cursor_type(CursorType::READ_ONLY)
        .prefetch_rows(32);
    let stmt = Statement::init_with(&mut conn, &config).unwrap();

    assert_eq!(
        stmt.attr_get(StmtAttr::UpdateMaxLength).unwrap(),
        AttrValue::Bool(true)
    );
    assert_eq!(
        stmt.attr_get(StmtAttr::CursorType).unwrap(),
        AttrValue::Unsigned(1)
    );
    assert_eq!(
        stmt.attr_get(StmtAttr::PrefetchRows).unwrap(),
        AttrValue::Unsigned(32)
    );
}

#[test]
fn test_init_with_rejected_config() {
    init_logs();
    let mut conn = MemoryConnection::new();
    let config = StatementConfig::new().cursor_type(CursorType::SCROLLABLE);
    let result = Statement::init_with(&mut conn, &config);
    assert!(matches!(result, Err(Error::UnsupportedAttribute)));
    // the half-built statement was dropped and its handle released
    assert_eq!(conn.open_statements(), 0);
}
