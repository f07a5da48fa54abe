use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A row of the student directory.
///
/// `group_pattern` and `session_time` are kept exactly as stored; they are
/// resolved per student during a sweep so a single bad row only fails itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "full_name": "Mona Adel",
        "group_pattern": "Saturday+Tuesday",
        "session_time": "02:00 PM",
        "enrollment_date": "2026-09-01"
    })
)]
pub struct Student {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Mona Adel")]
    pub full_name: String,

    #[schema(example = "Saturday+Tuesday")]
    pub group_pattern: String,

    #[schema(example = "02:00 PM")]
    pub session_time: String,

    #[schema(example = "2026-09-01", value_type = String, format = "date")]
    pub enrollment_date: NaiveDate,
}
