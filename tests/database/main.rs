//! PostgreSQL store tests. Each test starts its own container.

#[path = "../common/mod.rs"]
mod common;

mod db_tests;
mod transaction_tests;
