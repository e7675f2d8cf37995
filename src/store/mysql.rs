use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::MySqlPool;

use super::{RecordStore, RosterProvider, StoreError};
use crate::model::attendance::{AttendanceRecord, AttendanceRow};
use crate::model::enrollment::Enrollment;

/// Duplicate key on `UNIQUE (student_id, date)`.
pub(crate) fn is_duplicate_key(e: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = e {
        return db_err.is_unique_violation();
    }
    false
}

fn decode(row: AttendanceRow) -> Result<AttendanceRecord, StoreError> {
    AttendanceRecord::try_from(row)
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

#[derive(Clone)]
pub struct MySqlRecordStore {
    pool: MySqlPool,
}

impl MySqlRecordStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    async fn find(
        &self,
        student_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT student_id, course_id, date, check_in, check_out, status
            FROM attendance
            WHERE student_id = ? AND date = ?
            "#,
        )
        .bind(student_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        row.map(decode).transpose()
    }

    async fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (student_id, course_id, date, check_in, check_out, status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.student_id)
        .bind(&record.course_id)
        .bind(record.date)
        .bind(record.check_in)
        .bind(record.check_out)
        .bind(record.status.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Conflict {
                student_id: record.student_id.clone(),
                date: record.date,
            }),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    async fn record_check_out(&self, record: &AttendanceRecord) -> Result<bool, StoreError> {
        let done = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, status = ?
            WHERE student_id = ? AND date = ? AND check_out IS NULL
            "#,
        )
        .bind(record.check_out)
        .bind(record.status.as_str())
        .bind(&record.student_id)
        .bind(record.date)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        Ok(done.rows_affected() == 1)
    }

    async fn bulk_insert(&self, records: &[AttendanceRecord]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::Database)?;
        let mut inserted = 0;

        for record in records {
            // A failed statement only rolls back itself in InnoDB; the
            // transaction stays usable after a duplicate key.
            let result = sqlx::query(
                r#"
                INSERT INTO attendance (student_id, course_id, date, check_in, check_out, status)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.student_id)
            .bind(&record.course_id)
            .bind(record.date)
            .bind(record.check_in)
            .bind(record.check_out)
            .bind(record.status.as_str())
            .execute(&mut *tx)
            .await;

            match result {
                Ok(done) => inserted += done.rows_affected(),
                Err(e) if is_duplicate_key(&e) => {
                    tracing::debug!(
                        student_id = %record.student_id,
                        date = %record.date,
                        "Record already exists, skipping"
                    );
                }
                // dropping `tx` rolls the batch back
                Err(e) => return Err(StoreError::Database(e)),
            }
        }

        tx.commit().await.map_err(StoreError::Database)?;
        Ok(inserted)
    }
}

#[derive(Clone)]
pub struct MySqlRoster {
    pool: MySqlPool,
}

impl MySqlRoster {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RosterProvider for MySqlRoster {
    async fn all_students(&self) -> Result<Vec<Enrollment>, StoreError> {
        sqlx::query_as::<_, Enrollment>("SELECT student_id, course_id FROM students")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Database)
    }

    async fn student_exists(&self, student_id: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM students WHERE student_id = ? LIMIT 1)",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::Database)
    }

    async fn course_exists(&self, course_id: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM courses WHERE course_id = ? LIMIT 1)",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::Database)
    }
}
