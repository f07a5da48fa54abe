//! In-process store used by the engine and handler tests.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{AttendanceStore, SettingsStore, StoreError, StudentDay, StudentDirectory};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, NewAttendance},
    student::Student,
};

#[derive(Default)]
struct Inner {
    students: Vec<Student>,
    attendance: HashMap<(u64, NaiveDate), AttendanceRecord>,
    settings: HashMap<String, String>,
    // write that lands right after the next attendance read
    interleaved: Option<NewAttendance>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    offline: AtomicBool,
    yielding: AtomicBool,
    rejected_inserts: AtomicUsize,
    status_updates: AtomicUsize,
}

impl MemoryStore {
    pub fn with_students(students: Vec<Student>) -> Self {
        let store = Self::default();
        store.inner.lock().unwrap().students = students;
        store
    }

    /// Simulates an unreachable database for every subsequent call.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Queues a row written by "another writer" right after the next
    /// attendance read, bulk or single.
    pub fn interleave_after_read(&self, new: NewAttendance) {
        self.inner.lock().unwrap().interleaved = Some(new);
    }

    /// Makes every attendance read and write give up the executor once
    /// before touching the map, so futures polled together interleave.
    pub fn yield_on_access(&self, on: bool) {
        self.yielding.store(on, Ordering::SeqCst);
    }

    /// Inserts refused because a row already existed.
    pub fn rejected_inserts(&self) -> usize {
        self.rejected_inserts.load(Ordering::SeqCst)
    }

    /// Conditional status updates issued, whether or not they matched.
    pub fn status_updates(&self) -> usize {
        self.status_updates.load(Ordering::SeqCst)
    }

    pub fn record(&self, student_id: u64, date: NaiveDate) -> Option<AttendanceRecord> {
        self.inner
            .lock()
            .unwrap()
            .attendance
            .get(&(student_id, date))
            .cloned()
    }

    pub fn record_count(&self) -> usize {
        self.inner.lock().unwrap().attendance.len()
    }

    pub fn setting(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().settings.get(key).cloned()
    }

    async fn pause(&self) {
        if self.yielding.load(Ordering::SeqCst) {
            actix_web::rt::task::yield_now().await;
        }
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

fn insert_if_absent(inner: &mut Inner, new: &NewAttendance) -> bool {
    match inner.attendance.entry((new.student_id, new.date)) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(new.clone().into_record());
            true
        }
    }
}

#[async_trait]
impl StudentDirectory for MemoryStore {
    async fn students_with_attendance(&self, date: NaiveDate) -> Result<Vec<StudentDay>, StoreError> {
        self.check_online()?;
        self.pause().await;
        let mut inner = self.inner.lock().unwrap();

        let days = inner
            .students
            .iter()
            .map(|student| StudentDay {
                student: student.clone(),
                record: inner.attendance.get(&(student.id, date)).cloned(),
            })
            .collect();

        if let Some(new) = inner.interleaved.take() {
            insert_if_absent(&mut inner, &new);
        }

        Ok(days)
    }

    async fn find_student(&self, id: u64) -> Result<Option<Student>, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.students.iter().find(|s| s.id == id).cloned())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_by_student_and_date(
        &self,
        student_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        self.check_online()?;
        self.pause().await;
        let mut inner = self.inner.lock().unwrap();
        let record = inner.attendance.get(&(student_id, date)).cloned();
        if let Some(new) = inner.interleaved.take() {
            insert_if_absent(&mut inner, &new);
        }
        Ok(record)
    }

    async fn create_if_absent(&self, new: &NewAttendance) -> Result<bool, StoreError> {
        self.check_online()?;
        self.pause().await;
        let mut inner = self.inner.lock().unwrap();
        let inserted = insert_if_absent(&mut inner, new);
        if !inserted {
            self.rejected_inserts.fetch_add(1, Ordering::SeqCst);
        }
        Ok(inserted)
    }

    async fn update_status_if_currently_auto_absent(
        &self,
        student_id: u64,
        date: NaiveDate,
        overridden_by: &str,
        overridden_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.check_online()?;
        self.pause().await;
        self.status_updates.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().unwrap();
        match inner.attendance.get_mut(&(student_id, date)) {
            Some(record) if record.status == AttendanceStatus::AbsentAuto => {
                record.status = AttendanceStatus::Present;
                record.overridden_at = Some(overridden_at);
                record.overridden_by = Some(overridden_by.to_string());
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_online()?;
        Ok(self.setting(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_online()?;
        self.inner
            .lock()
            .unwrap()
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
