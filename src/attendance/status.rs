//! Status rules. Everything here is pure and total.

use chrono::{Duration, NaiveTime};

use crate::model::attendance::{AttendanceStatus, CourseTimeWindow};

/// Grace period on both ends of the course window.
pub const GRACE_MINUTES: i64 = 15;

fn grace() -> Duration {
    Duration::minutes(GRACE_MINUTES)
}

/// More than 15 minutes after the course start. Exactly 15 is on time.
pub fn is_late(check_in: NaiveTime, window: &CourseTimeWindow) -> bool {
    check_in.signed_duration_since(window.start) > grace()
}

/// More than 15 minutes before the course end. Exactly 15 is on time.
pub fn is_early(check_out: NaiveTime, window: &CourseTimeWindow) -> bool {
    window.end.signed_duration_since(check_out) > grace()
}

/// Completed-day rule. First match wins:
/// no timestamps is `Absent`, a single timestamp is `Anomaly`, otherwise
/// lateness and earliness combine.
pub fn evaluate(
    check_in: Option<NaiveTime>,
    check_out: Option<NaiveTime>,
    window: &CourseTimeWindow,
) -> AttendanceStatus {
    match (check_in, check_out) {
        (None, None) => AttendanceStatus::Absent,
        (None, Some(_)) | (Some(_), None) => AttendanceStatus::Anomaly,
        (Some(check_in), Some(check_out)) => {
            match (is_late(check_in, window), is_early(check_out, window)) {
                (true, true) => AttendanceStatus::LateAndEarly,
                (true, false) => AttendanceStatus::Late,
                (false, true) => AttendanceStatus::Early,
                (false, false) => AttendanceStatus::Normal,
            }
        }
    }
}

/// Status assigned on a same-day check-in, before any check-out exists.
pub fn check_in_status(at: NaiveTime, window: &CourseTimeWindow) -> AttendanceStatus {
    if is_late(at, window) {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Normal
    }
}

/// Check-out shortcut: appends the early marker to the check-in status and
/// never re-derives from scratch.
pub fn check_out_status(
    current: AttendanceStatus,
    at: NaiveTime,
    window: &CourseTimeWindow,
) -> AttendanceStatus {
    if !is_early(at, window) {
        return current;
    }
    match current {
        AttendanceStatus::Normal => AttendanceStatus::Early,
        AttendanceStatus::Late => AttendanceStatus::LateAndEarly,
        other => other,
    }
}
