//! Daily trigger for reconciliation and reports.
//!
//! The scheduler owns no attendance state: it only decides *when* to call
//! the hooks it is given. `main` spawns it next to the HTTP server.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{error, info};

use crate::clock::Clock;

pub type JobFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A hook invoked once per day at a fixed civil time.
#[derive(Clone)]
pub struct DailyJob {
    pub name: &'static str,
    pub at: NaiveTime,
    pub run: JobFn,
}

impl DailyJob {
    pub fn new<F>(name: &'static str, at: NaiveTime, run: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static,
    {
        Self {
            name,
            at,
            run: Arc::new(run),
        }
    }
}

/// Next civil datetime strictly after `now` whose time-of-day is `at`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

pub struct Scheduler {
    clock: Arc<dyn Clock>,
    jobs: Vec<DailyJob>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            jobs: Vec::new(),
        }
    }

    pub fn with_job(mut self, job: DailyJob) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn jobs(&self) -> &[DailyJob] {
        &self.jobs
    }

    /// Runs forever. A failing job is logged and retried the next day.
    pub async fn run(self) {
        if self.jobs.is_empty() {
            return;
        }

        let now = self.clock.now();
        let mut due: Vec<NaiveDateTime> = self
            .jobs
            .iter()
            .map(|job| next_run_after(now, job.at))
            .collect();

        info!(
            jobs = ?self.jobs.iter().map(|j| (j.name, j.at)).collect::<Vec<_>>(),
            "Scheduler started"
        );

        loop {
            let (idx, when) = match due.iter().enumerate().min_by_key(|(_, when)| **when) {
                Some((idx, when)) => (idx, *when),
                None => return,
            };

            let wait = when
                .signed_duration_since(self.clock.now())
                .to_std()
                .unwrap_or_default();
            actix_web::rt::time::sleep(wait).await;

            let job = &self.jobs[idx];
            info!(job = job.name, "Running scheduled job");
            match (job.run)().await {
                Ok(()) => info!(job = job.name, "Scheduled job finished"),
                Err(e) => error!(job = job.name, error = %e, "Scheduled job failed"),
            }

            let reference = when.max(self.clock.now());
            due[idx] = next_run_after(reference, job.at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn next_run_later_today() {
        assert_eq!(next_run_after(dt(2, 20, 0), t(21, 2)), dt(2, 21, 2));
    }

    #[test]
    fn next_run_rolls_to_tomorrow() {
        assert_eq!(next_run_after(dt(2, 21, 2), t(21, 2)), dt(3, 21, 2));
        assert_eq!(next_run_after(dt(2, 23, 0), t(21, 2)), dt(3, 21, 2));
    }

    #[test]
    fn next_run_crosses_month_end() {
        let last = NaiveDate::from_ymd_opt(2026, 3, 31)
            .unwrap()
            .and_hms_opt(22, 30, 0)
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2026, 4, 1)
            .unwrap()
            .and_hms_opt(22, 0, 0)
            .unwrap();
        assert_eq!(next_run_after(last, t(22, 0)), expected);
    }

    #[test]
    fn builder_collects_jobs() {
        let clock = Arc::new(crate::clock::FixedClock::new(dt(2, 0, 0)));
        let scheduler = Scheduler::new(clock)
            .with_job(DailyJob::new("a", t(21, 2), || Box::pin(async { Ok::<_, anyhow::Error>(()) })))
            .with_job(DailyJob::new("b", t(22, 0), || Box::pin(async { Ok::<_, anyhow::Error>(()) })));
        let names: Vec<_> = scheduler.jobs().iter().map(|j| j.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[actix_web::test]
    async fn due_job_runs_even_when_it_fails() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let clock = Arc::new(crate::clock::FixedClock::new(dt(2, 21, 1)));
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        // one millisecond after the clock
        let at = NaiveTime::from_hms_milli_opt(21, 1, 0, 1).unwrap();
        let scheduler = Scheduler::new(clock).with_job(DailyJob::new("flaky", at, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err::<(), _>(anyhow::anyhow!("boom")) })
        }));

        let handle = actix_web::rt::spawn(scheduler.run());
        for _ in 0..200 {
            if runs.load(Ordering::SeqCst) > 0 {
                break;
            }
            actix_web::rt::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        handle.abort();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
