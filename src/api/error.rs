use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

use crate::attendance::{AttendanceError, ReconcileError};
use crate::report::ReportError;

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::StudentNotFound(_) | AttendanceError::CourseNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AttendanceError::CourseEnded { .. }
            | AttendanceError::DuplicateCheckIn { .. }
            | AttendanceError::DuplicateCheckOut { .. }
            | AttendanceError::CheckInRequired => StatusCode::BAD_REQUEST,
            AttendanceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AttendanceError::StudentNotFound(_) | AttendanceError::CourseNotFound(_) => json!({
                "error": "Student or course not found",
                "detail": self.to_string()
            }),
            AttendanceError::CourseEnded { course_end, at } => json!({
                "error": "Course has ended, check-in not allowed",
                "course_end_time": course_end.format("%H:%M:%S").to_string(),
                "current_time": at.format("%Y-%m-%d %H:%M:%S").to_string()
            }),
            AttendanceError::DuplicateCheckIn { first_check_in } => json!({
                "error": "Check-in already completed today",
                "first_checkin": first_check_in
            }),
            AttendanceError::DuplicateCheckOut { check_out } => json!({
                "error": "Check-out already completed",
                "check_out_time": check_out
            }),
            AttendanceError::CheckInRequired => json!({
                "error": "Check-in required before check-out"
            }),
            // details stay in the logs
            AttendanceError::Storage(_) => json!({
                "error": "Internal server error"
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl ResponseError for ReconcileError {
    fn status_code(&self) -> StatusCode {
        match self {
            ReconcileError::FutureDate { .. } => StatusCode::BAD_REQUEST,
            ReconcileError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ReconcileError::FutureDate { date, today } => json!({
                "error": "Cannot reconcile a future date",
                "date": date,
                "today": today
            }),
            ReconcileError::Storage(_) => json!({
                "error": "Internal server error"
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl ResponseError for ReportError {
    fn status_code(&self) -> StatusCode {
        match self {
            ReportError::NoData => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ReportError::NoData => "No data to export",
            _ => "Export failed",
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use chrono::NaiveTime;

    #[test]
    fn status_codes() {
        assert_eq!(
            AttendanceError::StudentNotFound("s".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AttendanceError::DuplicateCheckIn { first_check_in: NaiveTime::from_hms_opt(9, 0, 0) }
                .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AttendanceError::Storage(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ReportError::NoData.status_code(), StatusCode::BAD_REQUEST);
        let day = chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(
            ReconcileError::FutureDate { date: day, today: day }.status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
