use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{RecordStore, RosterProvider, StoreError};
use crate::model::{attendance::AttendanceRecord, enrollment::Enrollment};

type Key = (String, NaiveDate);

/// In-process record store. The map key gives the same (student_id, date)
/// uniqueness the `attendance` table enforces.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<Key, AttendanceRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`StoreError::Unavailable`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.lock().values().cloned().collect()
    }

    pub fn records_on(&self, date: NaiveDate) -> Vec<AttendanceRecord> {
        self.lock()
            .values()
            .filter(|r| r.date == date)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<Key, AttendanceRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

fn key_of(record: &AttendanceRecord) -> Key {
    (record.student_id.clone(), record.date)
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find(
        &self,
        student_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.lock().get(&(student_id.to_string(), date)).cloned())
    }

    async fn insert(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut records = self.lock();
        let key = key_of(record);
        if records.contains_key(&key) {
            return Err(StoreError::Conflict {
                student_id: record.student_id.clone(),
                date: record.date,
            });
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn record_check_out(&self, record: &AttendanceRecord) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut records = self.lock();
        match records.get_mut(&key_of(record)) {
            Some(existing) if existing.check_out.is_none() => {
                existing.check_out = record.check_out;
                existing.status = record.status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn bulk_insert(&self, records: &[AttendanceRecord]) -> Result<u64, StoreError> {
        self.check_writable()?;
        let mut stored = self.lock();
        let mut inserted = 0;
        for record in records {
            let key = key_of(record);
            if stored.contains_key(&key) {
                continue;
            }
            stored.insert(key, record.clone());
            inserted += 1;
        }
        Ok(inserted)
    }
}

/// In-process roster.
#[derive(Debug, Default)]
pub struct MemoryRoster {
    students: Mutex<Vec<Enrollment>>,
    courses: Mutex<HashSet<String>>,
}

impl MemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_course(&self, course_id: &str) {
        self.courses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(course_id.to_string());
    }

    /// Enrolls a student; the course is registered as well.
    pub fn enroll(&self, student_id: &str, course_id: &str) {
        self.add_course(course_id);
        let mut students = self.students.lock().unwrap_or_else(|e| e.into_inner());
        students.retain(|s| s.student_id != student_id);
        students.push(Enrollment {
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
        });
    }

    pub fn withdraw(&self, student_id: &str) {
        self.students
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|s| s.student_id != student_id);
    }

    pub fn courses_by_student(&self) -> HashMap<String, String> {
        self.students
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|s| (s.student_id.clone(), s.course_id.clone()))
            .collect()
    }
}

#[async_trait]
impl RosterProvider for MemoryRoster {
    async fn all_students(&self) -> Result<Vec<Enrollment>, StoreError> {
        Ok(self.students.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn student_exists(&self, student_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .students
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|s| s.student_id == student_id))
    }

    async fn course_exists(&self, course_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .courses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(course_id))
    }
}
