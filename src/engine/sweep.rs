//! The auto-absence sweep: one pass over every student for "today".

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::schedule::{GroupPattern, ScheduleError, parse_session_minutes};
use super::state::{AttendanceState, Transition};
use super::{AttendanceEngine, EngineError};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, NewAttendance, SYSTEM_ACTOR};
use crate::model::student::Student;
use crate::store::StudentDay;

/// Result of one sweep; also returned by the "run now" endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({ "processed": 42, "marked": 3, "errors": [] }))]
pub struct SweepReport {
    /// Students examined
    pub processed: u32,
    /// Students newly marked ABSENT_AUTO
    pub marked: u32,
    /// Per-student failures; they never abort the sweep
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    NotScheduledToday,
    NotYetEnrolled,
    AlreadyRecorded,
    WithinGrace { deadline: u32 },
    Due { deadline: u32 },
}

/// Pure eligibility check for a single student.
pub(crate) fn evaluate(
    student: &Student,
    record: Option<&AttendanceRecord>,
    today: NaiveDate,
    current_minutes: u32,
    grace_minutes: u32,
) -> Result<Decision, ScheduleError> {
    let pattern = GroupPattern::parse(&student.group_pattern)?;
    if !pattern.includes(today.weekday()) {
        return Ok(Decision::NotScheduledToday);
    }

    if student.enrollment_date > today {
        return Ok(Decision::NotYetEnrolled);
    }

    if AttendanceState::of(record).apply(Transition::AutoAbsent).is_none() {
        return Ok(Decision::AlreadyRecorded);
    }

    let deadline = parse_session_minutes(&student.session_time)? + grace_minutes;
    if current_minutes >= deadline {
        Ok(Decision::Due { deadline })
    } else {
        Ok(Decision::WithinGrace { deadline })
    }
}

impl AttendanceEngine {
    /// Marks every eligible, unrecorded student whose grace deadline has
    /// passed as ABSENT_AUTO.
    ///
    /// Safe to run concurrently and repeatedly: each write goes through the
    /// uniqueness-guarded insert and a lost race is just a skip. A storage
    /// failure aborts the pass; rows already written stay written.
    ///
    /// Deadlines never roll into the next day. A session whose start plus
    /// grace reaches midnight (1440 minutes) is never marked, and no later
    /// pass goes back to fill that day in.
    pub async fn run_sweep(&self) -> Result<SweepReport, EngineError> {
        let now = self.local_now();
        let today = now.date_naive();
        let current_minutes = now.hour() * 60 + now.minute();
        let marked_at = now.with_timezone(&Utc);

        let grace = self.grace_period().await?;
        let roster = self.store.students_with_attendance(today).await?;

        let mut report = SweepReport::default();

        for StudentDay { student, record } in roster {
            report.processed += 1;

            let decision = match evaluate(&student, record.as_ref(), today, current_minutes, grace) {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(student_id = student.id, error = %e, "Skipping student with invalid schedule");
                    report.errors.push(format!("student {}: {}", student.id, e));
                    continue;
                }
            };

            let Decision::Due { deadline } = decision else {
                debug!(student_id = student.id, ?decision, "Not marking");
                continue;
            };

            if self
                .mark_auto_absent(&student, today, deadline, grace, marked_at)
                .await?
            {
                report.marked += 1;
            }
        }

        info!(
            %today,
            current_minutes,
            grace,
            processed = report.processed,
            marked = report.marked,
            errors = report.errors.len(),
            "Auto-absence sweep finished"
        );

        Ok(report)
    }

    async fn mark_auto_absent(
        &self,
        student: &Student,
        today: NaiveDate,
        deadline: u32,
        grace: u32,
        marked_at: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        let new = NewAttendance {
            student_id: student.id,
            date: today,
            status: AttendanceStatus::AbsentAuto,
            is_makeup: false,
            marked_by: SYSTEM_ACTOR.to_string(),
            marked_at,
            notes: Some(format!(
                "Auto-marked absent: no attendance {} minutes after the {} session",
                grace, student.session_time
            )),
        };

        let created = self.store.create_if_absent(&new).await?;
        if created {
            info!(student_id = student.id, %today, deadline, "Marked ABSENT_AUTO");
        } else {
            debug!(student_id = student.id, %today, "Another writer recorded first, skipping");
        }
        Ok(created)
    }
}
