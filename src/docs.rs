use crate::api::attendance::{MarkRequest, OverrideResponse, RecordResponse};
use crate::api::scheduler::{GracePeriod, SchedulerStatus};
use crate::engine::DaySheetEntry;
use crate::engine::sweep::SweepReport;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::student::Student;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tutoring Attendance API",
        version = "1.0.0",
        description = r#"
## Tutoring Attendance

Attendance tracking for a tutoring program where every student belongs to a
weekly group (for example *Saturday+Tuesday*) with a fixed session time.

### 🔹 Key Features
- **Attendance**
  - Mark students present or absent, one record per student per day
  - Day sheet of every student with their state
- **Auto-absence**
  - Students with no attendance a grace period after their session start are marked `ABSENT_AUTO`
  - Admins can override an automatic absence to present, once
- **Scheduler**
  - Run the sweep on demand, inspect the last run, tune the grace period (5 to 60 minutes)

### 🔐 Security
All endpoints require a **JWT Bearer** access token.
Overrides, manual sweeps and grace-period changes are **Admin** only.
"#,
    ),
    paths(
        crate::api::attendance::mark_present,
        crate::api::attendance::mark_absent,
        crate::api::attendance::override_absence,
        crate::api::attendance::get_record,
        crate::api::attendance::day_sheet,

        crate::api::scheduler::run_now,
        crate::api::scheduler::status,
        crate::api::scheduler::get_grace_period,
        crate::api::scheduler::set_grace_period
    ),
    components(
        schemas(
            AttendanceRecord,
            AttendanceStatus,
            Student,
            DaySheetEntry,
            MarkRequest,
            RecordResponse,
            OverrideResponse,
            SweepReport,
            SchedulerStatus,
            GracePeriod
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Daily attendance APIs"),
        (name = "Scheduler", description = "Auto-absence sweep APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
