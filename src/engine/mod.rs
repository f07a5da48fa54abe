//! Attendance engine: schedule resolution, grace period, state machine,
//! the auto-absence sweep and the restart-safe trigger that drives it.

pub mod clock;
pub mod grace;
pub mod schedule;
pub mod state;
pub mod sweep;
pub mod trigger;

use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use derive_more::Display;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{attendance::AttendanceRecord, student::Student};
use crate::store::{Store, StoreError, StudentDay};

use clock::Clock;
use schedule::GroupPattern;
use state::AttendanceState;

#[derive(Debug, Display)]
pub enum EngineError {
    #[display(fmt = "{}", _0)]
    Store(StoreError),

    #[display(fmt = "student {} not found", _0)]
    StudentNotFound(u64),
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}

/// One line of the day sheet shown to staff taking attendance.
#[derive(Debug, Serialize, ToSchema)]
pub struct DaySheetEntry {
    pub student: Student,
    /// Whether the date falls on one of the student's group days
    pub scheduled: bool,
    /// Group days as 0 = Sunday .. 6 = Saturday; empty when the pattern is unknown
    pub session_days: Vec<u32>,
    #[schema(example = "UNRECORDED")]
    pub state: String,
    pub record: Option<AttendanceRecord>,
}

/// Entry point the HTTP layer and the trigger talk to.
///
/// Dates are computed in a fixed reference offset so "today" is the
/// program's calendar day regardless of where the server runs.
pub struct AttendanceEngine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl AttendanceEngine {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self {
            store,
            clock,
            offset,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn local_now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.local_now().date_naive()
    }

    /// Every student with their state for `date`, from one bulk read.
    pub async fn day_sheet(&self, date: NaiveDate) -> Result<Vec<DaySheetEntry>, EngineError> {
        let days = self.store.students_with_attendance(date).await?;

        Ok(days
            .into_iter()
            .map(|StudentDay { student, record }| {
                let pattern = GroupPattern::parse(&student.group_pattern).ok();
                DaySheetEntry {
                    scheduled: pattern.is_some_and(|p| p.includes(date.weekday())),
                    session_days: pattern.map(|p| p.weekday_indices()).unwrap_or_default(),
                    state: AttendanceState::of(record.as_ref()).label().to_string(),
                    student,
                    record,
                }
            })
            .collect())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn today_follows_the_reference_offset() {
        // 23:30 UTC on Friday is already Saturday at +02:00
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 23, 30, 0).unwrap();
        let (engine, _, _) = engine(vec![], at);
        assert_eq!(engine.today(), date(2026, 10, 17));
    }

    #[actix_web::test]
    async fn day_sheet_lists_every_student_with_state() {
        let enrolled = date(2026, 9, 1);
        let students = vec![
            student(1, "Saturday+Tuesday", "02:00 PM", enrolled),
            student(2, "Sunday+Wednesday", "04:00 PM", enrolled),
            student(3, "Fortnightly", "04:00 PM", enrolled),
        ];
        let (engine, _, _) = engine(students, local(2026, 10, 17, 14, 20));
        engine.run_sweep().await.unwrap();

        let sheet = engine.day_sheet(date(2026, 10, 17)).await.unwrap();
        assert_eq!(sheet.len(), 3);

        assert!(sheet[0].scheduled);
        assert_eq!(sheet[0].session_days, vec![2, 6]);
        assert_eq!(sheet[0].state, "ABSENT_AUTO");

        assert!(!sheet[1].scheduled);
        assert_eq!(sheet[1].state, "UNRECORDED");
        assert!(sheet[1].record.is_none());

        assert!(!sheet[2].scheduled);
        assert!(sheet[2].session_days.is_empty());
    }
}
