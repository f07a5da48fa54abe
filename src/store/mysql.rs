use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, MySqlPool};
use tracing::debug;

use super::{AttendanceStore, SettingsStore, StoreError, StudentDay, StudentDirectory};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, NewAttendance},
    student::Student,
};

/// MySQL-backed store. The `attendance` primary key on
/// `(student_id, attendance_date)` is what keeps concurrent writers honest.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    student_id: u64,
    attendance_date: NaiveDate,
    status: String,
    is_makeup: bool,
    marked_by: String,
    marked_at: NaiveDateTime,
    overridden_at: Option<NaiveDateTime>,
    overridden_by: Option<String>,
    notes: Option<String>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(AttendanceRecord {
            student_id: row.student_id,
            date: row.attendance_date,
            status: parse_status(&row.status)?,
            is_makeup: row.is_makeup,
            marked_by: row.marked_by,
            marked_at: row.marked_at.and_utc(),
            overridden_at: row.overridden_at.map(|t| t.and_utc()),
            overridden_by: row.overridden_by,
            notes: row.notes,
        })
    }
}

// LEFT JOIN result: every attendance column is nullable.
#[derive(FromRow)]
struct StudentDayRow {
    id: u64,
    full_name: String,
    group_pattern: String,
    session_time: String,
    enrollment_date: NaiveDate,
    status: Option<String>,
    is_makeup: Option<bool>,
    marked_by: Option<String>,
    marked_at: Option<NaiveDateTime>,
    overridden_at: Option<NaiveDateTime>,
    overridden_by: Option<String>,
    notes: Option<String>,
}

impl StudentDayRow {
    fn into_student_day(self, date: NaiveDate) -> Result<StudentDay, StoreError> {
        let record = match self.status {
            Some(status) => Some(AttendanceRecord {
                student_id: self.id,
                date,
                status: parse_status(&status)?,
                is_makeup: self.is_makeup.unwrap_or(false),
                marked_by: self.marked_by.unwrap_or_default(),
                marked_at: self
                    .marked_at
                    .ok_or_else(|| {
                        StoreError::Corrupt(format!("attendance for student {} has no marked_at", self.id))
                    })?
                    .and_utc(),
                overridden_at: self.overridden_at.map(|t| t.and_utc()),
                overridden_by: self.overridden_by,
                notes: self.notes,
            }),
            None => None,
        };

        Ok(StudentDay {
            student: Student {
                id: self.id,
                full_name: self.full_name,
                group_pattern: self.group_pattern,
                session_time: self.session_time,
                enrollment_date: self.enrollment_date,
            },
            record,
        })
    }
}

fn parse_status(raw: &str) -> Result<AttendanceStatus, StoreError> {
    AttendanceStatus::from_str(raw)
        .map_err(|_| StoreError::Corrupt(format!("unknown attendance status '{}'", raw)))
}

#[async_trait]
impl StudentDirectory for MySqlStore {
    async fn students_with_attendance(&self, date: NaiveDate) -> Result<Vec<StudentDay>, StoreError> {
        let rows = sqlx::query_as::<_, StudentDayRow>(
            r#"
            SELECT
                s.id,
                s.full_name,
                s.group_pattern,
                s.session_time,
                s.enrollment_date,
                a.status,
                a.is_makeup,
                a.marked_by,
                a.marked_at,
                a.overridden_at,
                a.overridden_by,
                a.notes
            FROM students s
            LEFT JOIN attendance a
                ON a.student_id = s.id
                AND a.attendance_date = ?
            ORDER BY s.id
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        debug!(%date, students = rows.len(), "Loaded students with attendance");

        rows.into_iter().map(|row| row.into_student_day(date)).collect()
    }

    async fn find_student(&self, id: u64) -> Result<Option<Student>, StoreError> {
        let student = sqlx::query_as::<_, Student>(
            r#"
            SELECT id, full_name, group_pattern, session_time, enrollment_date
            FROM students
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn find_by_student_and_date(
        &self,
        student_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT student_id, attendance_date, status, is_makeup, marked_by,
                   marked_at, overridden_at, overridden_by, notes
            FROM attendance
            WHERE student_id = ?
            AND attendance_date = ?
            "#,
        )
        .bind(student_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn create_if_absent(&self, new: &NewAttendance) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (student_id, attendance_date, status, is_makeup, marked_by, marked_at, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.student_id)
        .bind(new.date)
        .bind(new.status.as_ref())
        .bind(new.is_makeup)
        .bind(&new.marked_by)
        .bind(new.marked_at.naive_utc())
        .bind(&new.notes)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                // Duplicate (student_id, attendance_date)
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        debug!(
                            student_id = new.student_id,
                            date = %new.date,
                            "Attendance already recorded, insert skipped"
                        );
                        return Ok(false);
                    }
                }
                Err(e.into())
            }
        }
    }

    async fn update_status_if_currently_auto_absent(
        &self,
        student_id: u64,
        date: NaiveDate,
        overridden_by: &str,
        overridden_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET status = ?, overridden_at = ?, overridden_by = ?
            WHERE student_id = ?
            AND attendance_date = ?
            AND status = ?
            "#,
        )
        .bind(AttendanceStatus::Present.as_ref())
        .bind(overridden_at.naive_utc())
        .bind(overridden_by)
        .bind(student_id)
        .bind(date)
        .bind(AttendanceStatus::AbsentAuto.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SettingsStore for MySqlStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT setting_value FROM settings WHERE setting_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO settings (setting_key, setting_value)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE setting_value = VALUES(setting_value)
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day_row(status: Option<&str>) -> StudentDayRow {
        let marked_at = NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(12, 15, 0)
            .unwrap();
        StudentDayRow {
            id: 7,
            full_name: "Karim Nabil".into(),
            group_pattern: "Saturday+Tuesday".into(),
            session_time: "02:00 PM".into(),
            enrollment_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            status: status.map(str::to_string),
            is_makeup: status.map(|_| false),
            marked_by: status.map(|_| "SYSTEM".to_string()),
            marked_at: status.map(|_| marked_at),
            overridden_at: None,
            overridden_by: None,
            notes: None,
        }
    }

    #[test]
    fn unjoined_row_maps_to_unrecorded() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let day = day_row(None).into_student_day(date).unwrap();
        assert_eq!(day.student.id, 7);
        assert!(day.record.is_none());
    }

    #[test]
    fn joined_row_carries_the_record() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let day = day_row(Some("ABSENT_AUTO")).into_student_day(date).unwrap();
        let record = day.record.unwrap();
        assert_eq!(record.status, AttendanceStatus::AbsentAuto);
        assert_eq!(record.date, date);
        assert_eq!(record.marked_by, "SYSTEM");
    }

    #[test]
    fn unknown_status_is_reported_as_corrupt() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let err = day_row(Some("LATE")).into_student_day(date).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
