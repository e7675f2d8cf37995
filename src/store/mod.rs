//! Persistence contracts consumed by the attendance engine.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::NaiveDate;
use derive_more::Display;

use crate::model::{attendance::AttendanceRecord, enrollment::Enrollment};

pub use memory::{MemoryRecordStore, MemoryRoster};
pub use mysql::{MySqlRecordStore, MySqlRoster};

#[derive(Debug, Display)]
pub enum StoreError {
    /// (student_id, date) already has a record.
    #[display(fmt = "attendance record for {} on {} already exists", student_id, date)]
    Conflict { student_id: String, date: NaiveDate },

    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),

    #[display(fmt = "store unavailable: {}", _0)]
    Unavailable(String),
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Keyed storage of one record per (student_id, date).
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find(
        &self,
        student_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Fails with [`StoreError::Conflict`] if the key already exists.
    async fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    /// Writes `check_out` and `status` only while the stored row has no
    /// check-out yet. `Ok(false)` when another check-out got there first.
    async fn record_check_out(&self, record: &AttendanceRecord) -> Result<bool, StoreError>;

    /// All-or-nothing. Rows whose key already exists are skipped; returns the
    /// number of rows actually inserted.
    async fn bulk_insert(&self, records: &[AttendanceRecord]) -> Result<u64, StoreError>;
}

/// Enrolled students and known courses.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn all_students(&self) -> Result<Vec<Enrollment>, StoreError>;

    async fn student_exists(&self, student_id: &str) -> Result<bool, StoreError>;

    async fn course_exists(&self, course_id: &str) -> Result<bool, StoreError>;
}
