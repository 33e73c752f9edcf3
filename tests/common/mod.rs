#![allow(dead_code)]

use std::env;

use log::LevelFilter;
use mysql_bindings::native::memory::{MemoryConnection, MemoryStatement};
use mysql_bindings::Statement;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

pub fn open() -> (MemoryConnection, Statement<MemoryStatement>) {
    init_logs();
    let mut conn = MemoryConnection::new();
    let stmt = Statement::init(&mut conn).unwrap();
    (conn, stmt)
}
