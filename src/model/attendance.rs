use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter, EnumString, IntoStaticStr};
use utoipa::ToSchema;

/// Actor recorded on rows written by the auto-absence sweep.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    AbsentAuto,
    AbsentManual,
}

/// The single attendance row for a (student, day) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "student_id": 1,
    "date": "2026-10-17",
    "status": "ABSENT_AUTO",
    "is_makeup": false,
    "marked_by": "SYSTEM",
    "marked_at": "2026-10-17T12:15:00Z",
    "overridden_at": null,
    "overridden_by": null,
    "notes": "Auto-marked absent: no attendance 15 minutes after the 02:00 PM session"
}))]
pub struct AttendanceRecord {
    pub student_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub is_makeup: bool,
    pub marked_by: String,
    #[schema(value_type = String, format = "date-time")]
    pub marked_at: DateTime<Utc>,
    /// Set only when an ABSENT_AUTO row was flipped to PRESENT
    #[schema(value_type = Option<String>, format = "date-time")]
    pub overridden_at: Option<DateTime<Utc>>,
    pub overridden_by: Option<String>,
    pub notes: Option<String>,
}

/// Insert payload for the uniqueness-guarded write path.
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub student_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub is_makeup: bool,
    pub marked_by: String,
    pub marked_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl NewAttendance {
    pub fn into_record(self) -> AttendanceRecord {
        AttendanceRecord {
            student_id: self.student_id,
            date: self.date,
            status: self.status,
            is_makeup: self.is_makeup,
            marked_by: self.marked_by,
            marked_at: self.marked_at,
            overridden_at: None,
            overridden_by: None,
            notes: self.notes,
        }
    }
}
