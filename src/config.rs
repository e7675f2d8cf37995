use anyhow::{Context, Result, anyhow};
use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::model::attendance::CourseTimeWindow;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub db_max_connections: u32,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Course day
    pub course_window: CourseTimeWindow,
    pub utc_offset: FixedOffset,

    // Daily jobs
    pub reconcile_at: NaiveTime,
    pub report_at: NaiveTime,
    pub report_dir: PathBuf,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parse_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|e| anyhow!("invalid {key}={raw}: {e}"))
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .with_context(|| format!("invalid time of day: {raw}"))
}

fn time_or(key: &str, default: &str) -> Result<NaiveTime> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    parse_time(&raw).with_context(|| format!("invalid {key}"))
}

pub fn offset_from_hours(hours: i32) -> Result<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| anyhow!("UTC offset out of range: {hours}"))
}

/// Daily jobs run after the course window closes, and the report after the
/// reconciliation it includes.
pub fn check_schedule(
    window: &CourseTimeWindow,
    reconcile_at: NaiveTime,
    report_at: NaiveTime,
) -> Result<()> {
    if reconcile_at <= window.end {
        return Err(anyhow!(
            "RECONCILE_AT={reconcile_at} must be after COURSE_END_TIME={}",
            window.end
        ));
    }
    if report_at < reconcile_at {
        return Err(anyhow!(
            "REPORT_AT={report_at} must not be before RECONCILE_AT={reconcile_at}"
        ));
    }
    Ok(())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let course_window = CourseTimeWindow::new(
            time_or("COURSE_START_TIME", "09:00")?,
            time_or("COURSE_END_TIME", "23:50")?,
        )?;
        let reconcile_at = time_or("RECONCILE_AT", "23:55")?;
        let report_at = time_or("REPORT_AT", "23:58")?;
        check_schedule(&course_window, reconcile_at, report_at)?;

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or("ACCESS_TOKEN_TTL", "172800")?, // default 48 h
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", "10")?,

            rate_login_per_min: parse_or("RATE_LOGIN_PER_MIN", "60")?,
            rate_protected_per_min: parse_or("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            course_window,
            utc_offset: offset_from_hours(parse_or("UTC_OFFSET_HOURS", "8")?)?,

            reconcile_at,
            report_at,
            report_dir: PathBuf::from(env::var("REPORT_DIR").unwrap_or_else(|_| "reports".to_string())),
        })
    }

    /// Configuration for tests and local tooling; no environment involved,
    /// times are UTC.
    pub fn for_window(course_window: CourseTimeWindow, jwt_secret: &str) -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: jwt_secret.to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 3600,
            db_max_connections: 1,
            rate_login_per_min: 60,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            course_window,
            utc_offset: Utc.fix(),
            reconcile_at: NaiveTime::default(),
            report_at: NaiveTime::default(),
            report_dir: PathBuf::from("reports"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_time_formats() {
        assert_eq!(parse_time("09:00").unwrap(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(
            parse_time("23:50:30").unwrap(),
            NaiveTime::from_hms_opt(23, 50, 30).unwrap()
        );
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("nine").is_err());
    }

    #[test]
    fn daily_jobs_wait_for_the_course_to_end() {
        let window = CourseTimeWindow::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 50, 0).unwrap(),
        )
        .unwrap();
        let t = |raw| parse_time(raw).unwrap();

        assert!(check_schedule(&window, t("23:55"), t("23:58")).is_ok());
        assert!(check_schedule(&window, t("23:55"), t("23:55")).is_ok());
        // inside the window a late check-in would find an absence
        assert!(check_schedule(&window, t("21:02"), t("23:58")).is_err());
        assert!(check_schedule(&window, t("23:50"), t("23:58")).is_err());
        // a report before reconciliation misses the absences
        assert!(check_schedule(&window, t("23:56"), t("23:55")).is_err());
    }

    #[test]
    fn offset_bounds() {
        assert_eq!(offset_from_hours(8).unwrap().local_minus_utc(), 8 * 3600);
        assert!(offset_from_hours(30).is_err());
    }
}
