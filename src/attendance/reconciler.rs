use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::model::attendance::AttendanceRecord;
use super::error::ReconcileError;
use crate::store::{RecordStore, RosterProvider};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReconcileSummary {
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,
    /// Students on the roster at the time of the run.
    pub enrolled: usize,
    /// Students with no record when the roster was checked.
    pub missing: usize,
    /// Absence records actually written; lower than `missing` when a
    /// concurrent check-in won the key.
    pub inserted: u64,
}

/// Ensures every enrolled student has a record for the day. Safe to run any
/// number of times per day.
#[derive(Clone)]
pub struct DailyReconciler {
    store: Arc<dyn RecordStore>,
    roster: Arc<dyn RosterProvider>,
    clock: Arc<dyn Clock>,
}

impl DailyReconciler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        roster: Arc<dyn RosterProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            roster,
            clock,
        }
    }

    pub async fn reconcile_day(&self) -> Result<ReconcileSummary, ReconcileError> {
        let today = self.clock.now().date();
        self.reconcile(today).await
    }

    /// Fails with [`ReconcileError::FutureDate`] for any day after today.
    #[instrument(name = "reconcile", skip(self))]
    pub async fn reconcile(&self, date: NaiveDate) -> Result<ReconcileSummary, ReconcileError> {
        let today = self.clock.now().date();
        if date > today {
            warn!(%today, "Refusing to reconcile a future day");
            return Err(ReconcileError::FutureDate { date, today });
        }

        info!("Reconciling attendance");

        let students = self.roster.all_students().await.map_err(|e| {
            error!(error = %e, "Failed to load roster");
            e
        })?;

        let mut absent = Vec::new();
        for enrollment in &students {
            if self.store.find(&enrollment.student_id, date).await?.is_none() {
                absent.push(AttendanceRecord::absent(
                    enrollment.student_id.clone(),
                    enrollment.course_id.clone(),
                    date,
                ));
            }
        }

        let inserted = if absent.is_empty() {
            0
        } else {
            self.store.bulk_insert(&absent).await.map_err(|e| {
                error!(error = %e, missing = absent.len(), "Absence batch aborted");
                e
            })?
        };

        let summary = ReconcileSummary {
            date,
            enrolled: students.len(),
            missing: absent.len(),
            inserted,
        };
        info!(
            enrolled = summary.enrolled,
            missing = summary.missing,
            inserted = summary.inserted,
            "Reconciliation complete"
        );
        Ok(summary)
    }
}
