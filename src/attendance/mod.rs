pub mod error;
pub mod reconciler;
pub mod scheduler;
pub mod service;
pub mod status;

pub use error::{AttendanceError, ReconcileError};
pub use reconciler::{DailyReconciler, ReconcileSummary};
pub use scheduler::{DailyJob, Scheduler};
pub use service::{AttendanceService, CheckInOutcome, CheckOutOutcome, TodayView};
