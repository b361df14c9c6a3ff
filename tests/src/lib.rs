//! Shared setup for the integration tests.
//!
//! Every test gets its own SQLite database holding the tables and rows of
//! `fixture.sql`, with the schema read back from the catalog. The database
//! is in memory unless the test needs several live connections.

pub use std_util::prelude::*;

use std::{path::Path, sync::Once};
use tablet::{Builder, Database, PoolConfig, Sqlite, Value};

/// Tables and rows every test starts from.
pub const FIXTURE: &str = include_str!("fixture.sql");

/// A fresh database with the fixture loaded.
pub async fn setup() -> Database {
    setup_with(|_| {}).await
}

/// Like [`setup`], with `configure` applied to the builder first.
pub async fn setup_with(configure: impl FnOnce(&mut Builder)) -> Database {
    init_tracing();

    let mut builder = Database::builder();
    builder.script(FIXTURE);
    configure(&mut builder);

    assert_ok!(builder.connect("sqlite::memory:").await)
}

/// The fixture in a database file at `path`, shared by up to `max_size`
/// pooled connections.
pub async fn setup_file(path: &Path, max_size: usize) -> Database {
    init_tracing();

    let mut builder = Database::builder();
    builder
        .script(FIXTURE)
        .pool(PoolConfig::new().max_size(max_size));

    assert_ok!(builder.build(Sqlite::open(path)).await)
}

/// Converts rows or values for comparison against `json!` literals.
pub fn json(value: impl Into<Value>) -> serde_json::Value {
    value.into().into()
}

fn init_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
