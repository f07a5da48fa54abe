//! Attendance state machine for a single (student, day).
//!
//! ```text
//!               MarkPresent            Override
//! Unrecorded ──────────────▶ Present ◀──────────── AbsentAuto
//!     │   │                                             ▲
//!     │   └──── MarkAbsent ──▶ AbsentManual             │
//!     └───────────────────── AutoAbsent ────────────────┘
//! ```
//!
//! Creation transitions are guarded by the storage-level key; the override is
//! a conditional update. Nothing leaves AbsentManual or an overridden Present.

use chrono::{Datelike, NaiveDate, Utc};
use tracing::{debug, info, warn};

use super::schedule::GroupPattern;
use super::{AttendanceEngine, EngineError};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, NewAttendance};
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceState {
    Unrecorded,
    Present { overridden: bool },
    AbsentManual,
    AbsentAuto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    MarkPresent,
    MarkAbsent,
    AutoAbsent,
    Override,
}

impl AttendanceState {
    pub fn of(record: Option<&AttendanceRecord>) -> Self {
        match record {
            None => AttendanceState::Unrecorded,
            Some(r) => match r.status {
                AttendanceStatus::Present => AttendanceState::Present {
                    overridden: r.overridden_at.is_some(),
                },
                AttendanceStatus::AbsentManual => AttendanceState::AbsentManual,
                AttendanceStatus::AbsentAuto => AttendanceState::AbsentAuto,
            },
        }
    }

    /// The full transition table. `None` means the move is rejected.
    pub fn apply(self, transition: Transition) -> Option<AttendanceState> {
        use AttendanceState::*;
        use Transition::*;

        match (self, transition) {
            (Unrecorded, MarkPresent) => Some(Present { overridden: false }),
            (Unrecorded, MarkAbsent) => Some(AbsentManual),
            (Unrecorded, AutoAbsent) => Some(AbsentAuto),
            (AbsentAuto, Override) => Some(Present { overridden: true }),
            (Unrecorded, Override)
            | (Present { .. }, _)
            | (AbsentManual, _)
            | (AbsentAuto, MarkPresent | MarkAbsent | AutoAbsent) => None,
        }
    }

    /// Stored status for this state; `None` for Unrecorded.
    pub fn status(self) -> Option<AttendanceStatus> {
        match self {
            AttendanceState::Unrecorded => None,
            AttendanceState::Present { .. } => Some(AttendanceStatus::Present),
            AttendanceState::AbsentManual => Some(AttendanceStatus::AbsentManual),
            AttendanceState::AbsentAuto => Some(AttendanceStatus::AbsentAuto),
        }
    }

    pub fn label(self) -> &'static str {
        match self.status() {
            Some(status) => status.into(),
            None => "UNRECORDED",
        }
    }
}

/// The two marks staff can record.
#[derive(Debug, Clone, Copy)]
enum HumanMark {
    Present,
    Absent,
}

impl HumanMark {
    fn transition(self) -> Transition {
        match self {
            HumanMark::Present => Transition::MarkPresent,
            HumanMark::Absent => Transition::MarkAbsent,
        }
    }

    fn status(self) -> AttendanceStatus {
        match self {
            HumanMark::Present => AttendanceStatus::Present,
            HumanMark::Absent => AttendanceStatus::AbsentManual,
        }
    }
}

/// Result of a human mark attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    Recorded(AttendanceRecord),
    /// Someone already marked this student today; the existing row is returned.
    AlreadyRecorded(AttendanceRecord),
}

impl AttendanceEngine {
    /// Marks a student present for today.
    ///
    /// `is_makeup` defaults to "today is not one of the student's group days".
    pub async fn mark_present(
        &self,
        student_id: u64,
        marked_by: &str,
        notes: Option<String>,
        is_makeup: Option<bool>,
    ) -> Result<MarkOutcome, EngineError> {
        self.record_human_mark(student_id, HumanMark::Present, marked_by, notes, is_makeup)
            .await
    }

    /// Explicit human "absent" for today. The sweep never touches it afterwards.
    pub async fn mark_absent(
        &self,
        student_id: u64,
        marked_by: &str,
        notes: Option<String>,
    ) -> Result<MarkOutcome, EngineError> {
        self.record_human_mark(student_id, HumanMark::Absent, marked_by, notes, Some(false))
            .await
    }

    /// Flips an ABSENT_AUTO row to PRESENT. Returns `true` iff a row changed;
    /// any other state is left alone and reported as `false`.
    pub async fn override_auto_absence(
        &self,
        student_id: u64,
        date: NaiveDate,
        overridden_by: &str,
    ) -> Result<bool, EngineError> {
        let current = self.store.find_by_student_and_date(student_id, date).await?;
        let from = AttendanceState::of(current.as_ref());
        if from.apply(Transition::Override).is_none() {
            debug!(student_id, %date, overridden_by, state = from.label(), "Override ignored, record is not ABSENT_AUTO");
            return Ok(false);
        }

        // the update re-checks the status; a concurrent override may have won
        let changed = self
            .store
            .update_status_if_currently_auto_absent(student_id, date, overridden_by, self.now())
            .await?;

        if changed > 0 {
            info!(student_id, %date, overridden_by, "Auto-absence overridden to present");
        } else {
            debug!(student_id, %date, overridden_by, "Override lost to a concurrent change");
        }

        Ok(changed > 0)
    }

    pub async fn record_for(
        &self,
        student_id: u64,
        date: NaiveDate,
    ) -> Result<(AttendanceState, Option<AttendanceRecord>), EngineError> {
        let record = self.store.find_by_student_and_date(student_id, date).await?;
        Ok((AttendanceState::of(record.as_ref()), record))
    }

    async fn record_human_mark(
        &self,
        student_id: u64,
        mark: HumanMark,
        marked_by: &str,
        notes: Option<String>,
        is_makeup: Option<bool>,
    ) -> Result<MarkOutcome, EngineError> {
        let student = self
            .store
            .find_student(student_id)
            .await?
            .ok_or(EngineError::StudentNotFound(student_id))?;

        let now = self.local_now();
        let today = now.date_naive();

        if let Some(record) = self.store.find_by_student_and_date(student_id, today).await? {
            // every recorded state refuses both creation transitions
            debug_assert!(AttendanceState::of(Some(&record)).apply(mark.transition()).is_none());
            info!(student_id, %today, status = record.status.as_ref(), "Already marked today");
            return Ok(MarkOutcome::AlreadyRecorded(record));
        }
        let status = mark.status();

        let is_makeup = is_makeup.unwrap_or_else(|| match GroupPattern::parse(&student.group_pattern) {
            Ok(pattern) => !pattern.includes(today.weekday()),
            Err(e) => {
                warn!(student_id, error = %e, "Cannot derive makeup flag");
                false
            }
        });

        let new = NewAttendance {
            student_id,
            date: today,
            status,
            is_makeup,
            marked_by: marked_by.to_string(),
            marked_at: now.with_timezone(&Utc),
            notes,
        };

        if self.store.create_if_absent(&new).await? {
            info!(student_id, %today, status = status.as_ref(), marked_by, is_makeup, "Attendance recorded");
            return Ok(MarkOutcome::Recorded(new.into_record()));
        }

        // Lost the race to a concurrent writer; report what they wrote.
        match self.store.find_by_student_and_date(student_id, today).await? {
            Some(record) => Ok(MarkOutcome::AlreadyRecorded(record)),
            None => Err(StoreError::Corrupt(format!(
                "insert for student {} on {} was rejected but no row exists",
                student_id, today
            ))
            .into()),
        }
    }
}
