use chrono::{NaiveDate, NaiveTime, Timelike};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Attendance status of one student for one course day.
///
/// Labels are what gets persisted and serialized; `LateAndEarly` keeps the
/// historical `"Late + Early"` label.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
pub enum AttendanceStatus {
    Normal,
    Late,
    Early,
    #[serde(rename = "Late + Early")]
    #[strum(to_string = "Late + Early")]
    LateAndEarly,
    Absent,
    Anomaly,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

/// Start/end time-of-day of the course, shared by every course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CourseTimeWindow {
    #[schema(example = "09:00:00", value_type = String, format = "time")]
    pub start: NaiveTime,
    #[schema(example = "23:50:00", value_type = String, format = "time")]
    pub end: NaiveTime,
}

#[derive(Debug, Display, PartialEq, Eq)]
#[display(fmt = "course window start {} must be before end {}", start, end)]
pub struct InvalidWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl std::error::Error for InvalidWindow {}

impl CourseTimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, InvalidWindow> {
        if start >= end {
            return Err(InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }
}

/// One row per (student_id, date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = "20250001")]
    pub student_id: String,

    #[schema(example = "CS101")]
    pub course_id: String,

    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "09:10:00", value_type = String, format = "time", nullable = true)]
    pub check_in: Option<NaiveTime>,

    #[schema(example = "23:45:00", value_type = String, format = "time", nullable = true)]
    pub check_out: Option<NaiveTime>,

    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    /// Absence record with no timestamps.
    pub fn absent(student_id: impl Into<String>, course_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            student_id: student_id.into(),
            course_id: course_id.into(),
            date,
            check_in: None,
            check_out: None,
            status: AttendanceStatus::Absent,
        }
    }
}

/// Raw `attendance` table row; status comes back as its label.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub student_id: String,
    pub course_id: String,
    pub date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub status: String,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = strum::ParseError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: AttendanceStatus::from_str(&row.status)?,
            student_id: row.student_id,
            course_id: row.course_id,
            date: row.date,
            check_in: row.check_in,
            check_out: row.check_out,
        })
    }
}

/// Drop sub-second precision; the `TIME` column stores whole seconds.
/// Window boundaries are judged on the truncated time, so 23:50:00.4 is
/// still inside a window that ends at 23:50.
pub fn to_seconds(time: NaiveTime) -> NaiveTime {
    time.with_nanosecond(0).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn status_labels_round_trip() {
        for status in AttendanceStatus::iter() {
            let label = status.to_string();
            assert_eq!(AttendanceStatus::from_str(&label).unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", label));
        }
        assert_eq!(AttendanceStatus::LateAndEarly.as_str(), "Late + Early");
    }

    #[test]
    fn unknown_label_is_rejected() {
        assert!(AttendanceStatus::from_str("Late+Early").is_err());
        assert!(AttendanceStatus::from_str("Present").is_err());
    }

    #[test]
    fn window_must_be_ordered() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        assert!(CourseTimeWindow::new(nine, five).is_ok());
        assert_eq!(
            CourseTimeWindow::new(five, nine),
            Err(InvalidWindow { start: five, end: nine })
        );
        assert!(CourseTimeWindow::new(nine, nine).is_err());
    }

    #[test]
    fn row_with_compound_label_converts() {
        let row = AttendanceRow {
            student_id: "s1".into(),
            course_id: "c1".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            check_in: NaiveTime::from_hms_opt(9, 30, 0),
            check_out: NaiveTime::from_hms_opt(20, 0, 0),
            status: "Late + Early".into(),
        };
        let record = AttendanceRecord::try_from(row).unwrap();
        assert_eq!(record.status, AttendanceStatus::LateAndEarly);
    }
}
