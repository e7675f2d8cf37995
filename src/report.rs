//! Attendance listings and CSV exports.

use chrono::{NaiveDate, NaiveTime};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceStatus;

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 500;

const CSV_HEADER: [&str; 7] = [
    "date",
    "student_id",
    "student_name",
    "course",
    "check_in",
    "check_out",
    "status",
];

#[derive(Debug, Display)]
pub enum ReportError {
    #[display(fmt = "no data to export")]
    NoData,
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    #[display(fmt = "csv error: {}", _0)]
    Csv(csv::Error),
    #[display(fmt = "io error: {}", _0)]
    Io(std::io::Error),
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::NoData => None,
            ReportError::Database(e) => Some(e),
            ReportError::Csv(e) => Some(e),
            ReportError::Io(e) => Some(e),
        }
    }
}

impl From<sqlx::Error> for ReportError {
    fn from(e: sqlx::Error) -> Self {
        ReportError::Database(e)
    }
}

impl From<csv::Error> for ReportError {
    fn from(e: csv::Error) -> Self {
        ReportError::Csv(e)
    }
}

impl From<std::io::Error> for ReportError {
    fn from(e: std::io::Error) -> Self {
        ReportError::Io(e)
    }
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct ReportFilter {
    /// Exact student id
    #[schema(example = "20250001")]
    pub student_id: Option<String>,
    /// Substring of the student's name
    #[schema(example = "Li")]
    pub student_name: Option<String>,
    /// Exact status label
    pub status: Option<AttendanceStatus>,
    /// Only applied together with `end_date`
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: Option<NaiveDate>,
    /// Only applied together with `start_date`
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    pub end_date: Option<NaiveDate>,
}

impl ReportFilter {
    pub fn for_day(date: NaiveDate) -> Self {
        Self {
            start_date: Some(date),
            end_date: Some(date),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReportRow {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "20250001")]
    pub student_id: String,
    #[schema(example = "Li Wei")]
    pub student_name: String,
    #[schema(example = "Intro to Programming")]
    pub course_name: String,
    #[schema(example = "09:10:00", format = "time", value_type = String, nullable = true)]
    pub check_in: Option<NaiveTime>,
    #[schema(example = "23:45:00", format = "time", value_type = String, nullable = true)]
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
}

#[derive(sqlx::FromRow)]
struct ReportSqlRow {
    date: NaiveDate,
    student_id: String,
    student_name: String,
    course_name: String,
    check_in: Option<NaiveTime>,
    check_out: Option<NaiveTime>,
    status: String,
}

impl TryFrom<ReportSqlRow> for ReportRow {
    type Error = sqlx::Error;

    fn try_from(row: ReportSqlRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: AttendanceStatus::from_str(&row.status)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            date: row.date,
            student_id: row.student_id,
            student_name: row.student_name,
            course_name: row.course_name,
            check_in: row.check_in,
            check_out: row.check_out,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportPage {
    pub data: Vec<ReportRow>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

const FROM_JOINS: &str = r#"
    FROM attendance a
    JOIN students s ON s.student_id = a.student_id
    JOIN courses c ON c.course_id = a.course_id
    WHERE 1 = 1"#;

fn push_filters(qb: &mut QueryBuilder<'_, MySql>, filter: &ReportFilter) {
    if let Some(student_id) = &filter.student_id {
        qb.push(" AND a.student_id = ").push_bind(student_id.clone());
    }
    if let Some(name) = &filter.student_name {
        qb.push(" AND s.name LIKE ").push_bind(format!("%{}%", name));
    }
    if let Some(status) = filter.status {
        qb.push(" AND a.status = ").push_bind(status.as_str().to_string());
    }
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        qb.push(" AND a.date BETWEEN ")
            .push_bind(start)
            .push(" AND ")
            .push_bind(end);
    }
}

/// Row query; `page` is a (limit, offset) pair.
pub fn rows_query(filter: &ReportFilter, page: Option<(u64, u64)>) -> QueryBuilder<'static, MySql> {
    let mut qb = QueryBuilder::new(
        "SELECT a.date, a.student_id, s.name AS student_name, c.course_name, \
         a.check_in, a.check_out, a.status",
    );
    qb.push(FROM_JOINS);
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY a.date DESC, a.student_id ASC");
    if let Some((limit, offset)) = page {
        qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
    }
    qb
}

pub fn count_query(filter: &ReportFilter) -> QueryBuilder<'static, MySql> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*)");
    qb.push(FROM_JOINS);
    push_filters(&mut qb, filter);
    qb
}

/// 1-based page number and clamped page size.
pub fn paginate(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

pub async fn fetch_page(
    pool: &MySqlPool,
    filter: &ReportFilter,
    page: Option<u64>,
    per_page: Option<u64>,
) -> Result<ReportPage, ReportError> {
    let (page, per_page) = paginate(page, per_page);
    let offset = (page - 1) * per_page;

    let total: i64 = count_query(filter)
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let data = rows_query(filter, Some((per_page, offset)))
        .build_query_as::<ReportSqlRow>()
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(ReportRow::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReportPage {
        data,
        page,
        per_page,
        total,
    })
}

pub async fn fetch_all(pool: &MySqlPool, filter: &ReportFilter) -> Result<Vec<ReportRow>, ReportError> {
    let rows = rows_query(filter, None)
        .build_query_as::<ReportSqlRow>()
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(ReportRow::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn format_time(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn write_csv<W: Write>(rows: &[ReportRow], writer: W) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for row in rows {
        wtr.write_record([
            row.date.format("%Y-%m-%d").to_string(),
            row.student_id.clone(),
            row.student_name.clone(),
            row.course_name.clone(),
            format_time(row.check_in),
            format_time(row.check_out),
            row.status.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// CSV bytes for every row matching `filter`.
pub async fn export_filtered(pool: &MySqlPool, filter: &ReportFilter) -> Result<Vec<u8>, ReportError> {
    let rows = fetch_all(pool, filter).await?;
    if rows.is_empty() {
        return Err(ReportError::NoData);
    }
    let mut buf = Vec::new();
    write_csv(&rows, &mut buf)?;
    Ok(buf)
}

pub fn daily_report_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("attendance_{}.csv", date.format("%Y%m%d")))
}

/// Writes the report for `date` into `dir`, creating the directory if needed.
pub fn write_daily_report(dir: &Path, date: NaiveDate, rows: &[ReportRow]) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir)?;
    let path = daily_report_path(dir, date);
    let file = std::fs::File::create(&path)?;
    write_csv(rows, std::io::BufWriter::new(file))?;
    Ok(path)
}

pub async fn export_daily(pool: &MySqlPool, dir: &Path, date: NaiveDate) -> Result<PathBuf, ReportError> {
    let rows = fetch_all(pool, &ReportFilter::for_day(date)).await?;
    let path = write_daily_report(dir, date, &rows)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Daily report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: AttendanceStatus, check_in: Option<NaiveTime>) -> ReportRow {
        ReportRow {
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            student_id: "20250001".into(),
            student_name: "Li, Wei".into(),
            course_name: "Intro".into(),
            check_in,
            check_out: None,
            status,
        }
    }

    #[test]
    fn csv_formats_times_and_labels() {
        let rows = vec![
            row(AttendanceStatus::LateAndEarly, NaiveTime::from_hms_opt(9, 31, 12)),
            row(AttendanceStatus::Absent, None),
        ];
        let mut buf = Vec::new();
        write_csv(&rows, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "date,student_id,student_name,course,check_in,check_out,status");
        assert_eq!(lines[1], "2026-03-02,20250001,\"Li, Wei\",Intro,09:31,N/A,Late + Early");
        assert_eq!(lines[2], "2026-03-02,20250001,\"Li, Wei\",Intro,N/A,N/A,Absent");
    }

    #[test]
    fn date_range_needs_both_ends() {
        let only_start = ReportFilter {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            ..ReportFilter::default()
        };
        assert!(!rows_query(&only_start, None).sql().contains("BETWEEN"));

        let both = ReportFilter::for_day(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert!(rows_query(&both, None).sql().contains("a.date BETWEEN ? AND ?"));
    }

    #[test]
    fn filters_and_paging_are_bound() {
        let filter = ReportFilter {
            student_id: Some("s1".into()),
            student_name: Some("Li".into()),
            status: Some(AttendanceStatus::Late),
            ..ReportFilter::default()
        };
        let sql = rows_query(&filter, Some((20, 40))).into_sql();
        assert!(sql.contains("a.student_id = ?"));
        assert!(sql.contains("s.name LIKE ?"));
        assert!(sql.contains("a.status = ?"));
        assert!(sql.ends_with("LIMIT ? OFFSET ?"));
        assert!(count_query(&filter).sql().starts_with("SELECT COUNT(*)"));
    }

    #[test]
    fn paging_defaults_and_clamps() {
        assert_eq!(paginate(None, None), (1, DEFAULT_PER_PAGE));
        assert_eq!(paginate(Some(0), Some(0)), (1, 1));
        assert_eq!(paginate(Some(3), Some(10_000)), (3, MAX_PER_PAGE));
    }

    #[test]
    fn daily_report_lands_in_dir() {
        let dir = std::env::temp_dir().join(format!("attendance-report-{}", uuid::Uuid::new_v4()));
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let path = write_daily_report(&dir, date, &[row(AttendanceStatus::Normal, None)]).unwrap();
        assert_eq!(path.file_name().unwrap(), "attendance_20260302.csv");
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
