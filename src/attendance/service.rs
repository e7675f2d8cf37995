use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use super::error::AttendanceError;
use super::status;
use crate::clock::Clock;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, CourseTimeWindow, to_seconds};
use crate::store::{RecordStore, RosterProvider, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CheckInOutcome {
    pub status: AttendanceStatus,
    #[schema(example = "09:10:00", value_type = String, format = "time")]
    pub time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CheckOutOutcome {
    pub status: AttendanceStatus,
    #[schema(example = "23:45:00", value_type = String, format = "time")]
    pub check_out_time: NaiveTime,
}

/// Today's record for one student alongside the course window.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TodayView {
    #[schema(example = "2026-01-01T09:12:00", value_type = String, format = "date-time")]
    pub system_time: NaiveDateTime,
    pub course_schedule: CourseTimeWindow,
    pub attendance: Option<AttendanceRecord>,
}

/// Check-in/check-out orchestration for single student actions.
#[derive(Clone)]
pub struct AttendanceService {
    store: Arc<dyn RecordStore>,
    roster: Arc<dyn RosterProvider>,
    clock: Arc<dyn Clock>,
    window: CourseTimeWindow,
}

impl AttendanceService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        roster: Arc<dyn RosterProvider>,
        clock: Arc<dyn Clock>,
        window: CourseTimeWindow,
    ) -> Self {
        Self {
            store,
            roster,
            clock,
            window,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn window(&self) -> &CourseTimeWindow {
        &self.window
    }

    #[instrument(name = "check_in", skip(self, at), fields(at = %at))]
    pub async fn check_in(
        &self,
        student_id: &str,
        course_id: &str,
        at: NaiveDateTime,
    ) -> Result<CheckInOutcome, AttendanceError> {
        if !self.roster.student_exists(student_id).await? {
            warn!("Unknown student");
            return Err(AttendanceError::StudentNotFound(student_id.to_string()));
        }
        if !self.roster.course_exists(course_id).await? {
            warn!("Unknown course");
            return Err(AttendanceError::CourseNotFound(course_id.to_string()));
        }

        let today = at.date();
        let time = to_seconds(at.time());

        if time > self.window.end {
            warn!(course_end = %self.window.end, "Course has ended, check-in rejected");
            self.backfill_absence(student_id, course_id, at).await?;
            return Err(AttendanceError::CourseEnded {
                course_end: self.window.end,
                at,
            });
        }

        if let Some(existing) = self.store.find(student_id, today).await? {
            warn!(first_check_in = ?existing.check_in, "Duplicate check-in");
            return Err(AttendanceError::DuplicateCheckIn {
                first_check_in: existing.check_in,
            });
        }

        let status = status::check_in_status(time, &self.window);
        let record = AttendanceRecord {
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
            date: today,
            check_in: Some(time),
            check_out: None,
            status,
        };
        debug!(?record, "Inserting attendance record");

        match self.store.insert(&record).await {
            Ok(()) => {}
            Err(StoreError::Conflict { .. }) => {
                // lost the race against a concurrent check-in for the same key
                let winner = self.store.find(student_id, today).await?;
                warn!("Concurrent duplicate check-in rejected by store");
                return Err(AttendanceError::DuplicateCheckIn {
                    first_check_in: winner.and_then(|r| r.check_in),
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Check-in failed");
                return Err(e.into());
            }
        }

        info!(%status, "Checked in");
        Ok(CheckInOutcome { status, time })
    }

    /// Writes an `Absent` record for a check-in that arrived after the
    /// course window closed, unless the day already has a record.
    async fn backfill_absence(
        &self,
        student_id: &str,
        course_id: &str,
        at: NaiveDateTime,
    ) -> Result<(), AttendanceError> {
        if self.store.find(student_id, at.date()).await?.is_some() {
            return Ok(());
        }
        let record = AttendanceRecord::absent(student_id, course_id, at.date());
        match self.store.insert(&record).await {
            Ok(()) => {
                info!("Absence recorded for late arrival");
                Ok(())
            }
            Err(StoreError::Conflict { .. }) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, "Absence backfill failed");
                Err(e.into())
            }
        }
    }

    #[instrument(name = "check_out", skip(self, at), fields(at = %at))]
    pub async fn check_out(
        &self,
        student_id: &str,
        at: NaiveDateTime,
    ) -> Result<CheckOutOutcome, AttendanceError> {
        let mut record = match self.store.find(student_id, at.date()).await? {
            Some(record) if record.check_in.is_some() => record,
            _ => {
                warn!("No check-in found for today");
                return Err(AttendanceError::CheckInRequired);
            }
        };

        if let Some(check_out) = record.check_out {
            warn!(%check_out, "Duplicate check-out");
            return Err(AttendanceError::DuplicateCheckOut { check_out });
        }

        let time = to_seconds(at.time());
        record.check_out = Some(time);
        record.status = status::check_out_status(record.status, time, &self.window);

        let written = match self.store.record_check_out(&record).await {
            Ok(written) => written,
            Err(e) => {
                tracing::error!(error = %e, "Check-out failed");
                return Err(e.into());
            }
        };
        if !written {
            // a concurrent check-out landed between the read and the write
            let winner = self.store.find(student_id, at.date()).await?;
            warn!("Concurrent duplicate check-out rejected by store");
            return match winner.and_then(|r| r.check_out) {
                Some(check_out) => Err(AttendanceError::DuplicateCheckOut { check_out }),
                None => Err(AttendanceError::CheckInRequired),
            };
        }

        info!(status = %record.status, "Checked out");
        Ok(CheckOutOutcome {
            status: record.status,
            check_out_time: time,
        })
    }

    pub async fn today(
        &self,
        student_id: &str,
        at: NaiveDateTime,
    ) -> Result<TodayView, AttendanceError> {
        let attendance = self.store.find(student_id, at.date()).await?;
        Ok(TodayView {
            system_time: at,
            course_schedule: self.window,
            attendance,
        })
    }
}
