#![allow(dead_code)]

pub mod flaky;

use dalgo_rust::{Database, DatabaseOptions, InMemoryBackend, Record, RecordState, Validate};
use serde::{Deserialize, Serialize};

pub use flaky::FlakyBackend;

pub const E2E_TEST_KIND1: &str = "E2ETest1";
pub const E2E_TEST_KIND2: &str = "E2ETest2";

/// Entity stored by the end-to-end tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct TestData {
    #[serde(rename = "StringProp")]
    #[validate(required)]
    pub string_prop: String,
    #[serde(rename = "IntegerProp")]
    #[validate(min = 0)]
    pub integer_prop: i64,
}

impl TestData {
    pub fn new(string_prop: impl Into<String>, integer_prop: i64) -> Self {
        Self {
            string_prop: string_prop.into(),
            integer_prop,
        }
    }
}

/// One database per dispatch strategy, each on its own empty store.
pub fn databases() -> Vec<(&'static str, Database<InMemoryBackend>)> {
    vec![
        ("native", Database::new(InMemoryBackend::new())),
        (
            "fan_out",
            Database::open(InMemoryBackend::new(), DatabaseOptions::fan_out()).unwrap(),
        ),
        (
            "fan_out_parallel",
            Database::open(InMemoryBackend::new(), DatabaseOptions::fan_out().parallel(true))
                .unwrap(),
        ),
        (
            "native_chunked",
            Database::open(InMemoryBackend::new(), DatabaseOptions::default().max_batch_size(2))
                .unwrap(),
        ),
    ]
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn records_must_exist(name: &str, records: &[Record]) {
    for record in records {
        assert!(
            record.error().is_none(),
            "[{}] unexpected error for {}: {:?}",
            name,
            record.key(),
            record.error()
        );
        assert!(record.exists(), "[{}] record {} was expected to exist", name, record.key());
    }
}

pub fn records_must_not_exist(name: &str, records: &[Record]) {
    for record in records {
        assert_eq!(
            record.state(),
            RecordState::NotFound,
            "[{}] record {} was expected to be missing",
            name,
            record.key()
        );
        assert!(!record.exists());
        assert!(record.error().unwrap().is_not_found());
    }
}
