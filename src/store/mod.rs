//! Persistence seams used by the attendance engine.
//!
//! Every writer of attendance rows goes through [`AttendanceStore::create_if_absent`]
//! or [`AttendanceStore::update_status_if_currently_auto_absent`]; implementations
//! must enforce one row per (student, date) in storage, not in application code.

pub mod marker;
#[cfg(test)]
pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;

use crate::model::{
    attendance::{AttendanceRecord, NewAttendance},
    student::Student,
};

pub use marker::{RunMarker, SettingsRunMarker};
pub use mysql::MySqlStore;

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),

    #[display(fmt = "corrupt row: {}", _0)]
    Corrupt(String),

    #[display(fmt = "store unavailable: {}", _0)]
    Unavailable(String),
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

/// A student together with whatever row exists for the requested day.
#[derive(Debug, Clone)]
pub struct StudentDay {
    pub student: Student,
    pub record: Option<AttendanceRecord>,
}

#[async_trait]
pub trait StudentDirectory: Send + Sync {
    /// All students joined with their attendance for `date`, in one round trip.
    async fn students_with_attendance(&self, date: NaiveDate) -> Result<Vec<StudentDay>, StoreError>;

    async fn find_student(&self, id: u64) -> Result<Option<Student>, StoreError>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_by_student_and_date(
        &self,
        student_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Inserts the row unless one already exists for (student, date).
    /// Returns `Ok(false)` when another writer got there first.
    async fn create_if_absent(&self, new: &NewAttendance) -> Result<bool, StoreError>;

    /// Flips ABSENT_AUTO to PRESENT and stamps the override fields.
    /// Returns the number of rows changed (0 or 1).
    async fn update_status_if_currently_auto_absent(
        &self,
        student_id: u64,
        date: NaiveDate,
        overridden_by: &str,
        overridden_at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Everything the engine needs from one backing store.
pub trait Store: StudentDirectory + AttendanceStore + SettingsStore {}

impl<T: StudentDirectory + AttendanceStore + SettingsStore> Store for T {}
