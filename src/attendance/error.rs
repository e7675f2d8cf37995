use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use derive_more::Display;

use crate::store::StoreError;

#[derive(Debug, Display)]
pub enum AttendanceError {
    #[display(fmt = "student {} not found", _0)]
    StudentNotFound(String),

    #[display(fmt = "course {} not found", _0)]
    CourseNotFound(String),

    /// The absence backfill, if any, has already been applied.
    #[display(fmt = "course has ended at {}, check-in not allowed at {}", course_end, at)]
    CourseEnded {
        course_end: NaiveTime,
        at: NaiveDateTime,
    },

    #[display(fmt = "check-in already completed today")]
    DuplicateCheckIn { first_check_in: Option<NaiveTime> },

    #[display(fmt = "check-out already completed at {}", check_out)]
    DuplicateCheckOut { check_out: NaiveTime },

    #[display(fmt = "check-in required before check-out")]
    CheckInRequired,

    #[display(fmt = "{}", _0)]
    Storage(StoreError),
}

impl std::error::Error for AttendanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttendanceError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for AttendanceError {
    fn from(e: StoreError) -> Self {
        AttendanceError::Storage(e)
    }
}

#[derive(Debug, Display)]
pub enum ReconcileError {
    /// Absences for a day that has not started would block its check-ins.
    #[display(fmt = "cannot reconcile {}, today is {}", date, today)]
    FutureDate { date: NaiveDate, today: NaiveDate },

    #[display(fmt = "{}", _0)]
    Storage(StoreError),
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::Storage(e) => Some(e),
            ReconcileError::FutureDate { .. } => None,
        }
    }
}

impl From<StoreError> for ReconcileError {
    fn from(e: StoreError) -> Self {
        ReconcileError::Storage(e)
    }
}
