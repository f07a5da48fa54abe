use crate::auth::auth::AuthUser;
use crate::engine::state::MarkOutcome;
use crate::engine::{AttendanceEngine, DaySheetEntry, EngineError};
use crate::model::attendance::AttendanceRecord;
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MarkRequest {
    #[schema(example = "Came late, joined at 2:10")]
    pub notes: Option<String>,
    /// Defaults to true when today is not one of the student's group days
    pub is_makeup: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct RecordResponse {
    #[schema(example = "ABSENT_AUTO")]
    pub state: String,
    pub record: AttendanceRecord,
}

#[derive(Serialize, ToSchema)]
pub struct OverrideResponse {
    /// True only if an ABSENT_AUTO record was flipped to PRESENT
    pub overridden: bool,
}

#[derive(Deserialize, IntoParams)]
pub struct DaySheetQuery {
    /// Defaults to today in the program's reference timezone
    #[param(value_type = Option<String>, format = "date", example = "2026-10-17")]
    pub date: Option<NaiveDate>,
}

fn engine_failure(e: EngineError, student_id: u64) -> actix_web::Result<HttpResponse> {
    match e {
        EngineError::StudentNotFound(_) => Ok(HttpResponse::NotFound().json(json!({
            "message": "Student not found"
        }))),
        other => {
            tracing::error!(error = %other, student_id, "Attendance operation failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

fn mark_response(
    outcome: Result<MarkOutcome, EngineError>,
    student_id: u64,
) -> actix_web::Result<HttpResponse> {
    match outcome {
        Ok(MarkOutcome::Recorded(record)) => Ok(HttpResponse::Ok().json(record)),
        Ok(MarkOutcome::AlreadyRecorded(record)) => Ok(HttpResponse::Conflict().json(json!({
            "message": "Already marked today",
            "record": record
        }))),
        Err(e) => engine_failure(e, student_id),
    }
}

/// Mark a student present for today
#[utoipa::path(
    post,
    path = "/api/attendance/{student_id}/present",
    params(
        ("student_id" = u64, Path, description = "Student to mark")
    ),
    request_body(content = MarkRequest, description = "Optional notes and makeup flag"),
    responses(
        (status = 200, description = "Marked present", body = AttendanceRecord),
        (status = 409, description = "Already marked today", body = Object, example = json!({
            "message": "Already marked today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn mark_present(
    auth: AuthUser,
    path: web::Path<u64>,
    body: Option<web::Json<MarkRequest>>,
    engine: web::Data<AttendanceEngine>,
) -> actix_web::Result<HttpResponse> {
    auth.require_staff()?;
    let student_id = path.into_inner();
    let MarkRequest { notes, is_makeup } = body.map(|b| b.into_inner()).unwrap_or_default();

    let outcome = engine
        .mark_present(student_id, &auth.username, notes, is_makeup)
        .await;
    mark_response(outcome, student_id)
}

/// Mark a student absent for today
///
/// A manual absence is final for the day; the auto-absence sweep never rewrites it.
#[utoipa::path(
    post,
    path = "/api/attendance/{student_id}/absent",
    params(
        ("student_id" = u64, Path, description = "Student to mark")
    ),
    request_body(content = MarkRequest, description = "Optional notes"),
    responses(
        (status = 200, description = "Marked absent", body = AttendanceRecord),
        (status = 409, description = "Already marked today", body = Object, example = json!({
            "message": "Already marked today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn mark_absent(
    auth: AuthUser,
    path: web::Path<u64>,
    body: Option<web::Json<MarkRequest>>,
    engine: web::Data<AttendanceEngine>,
) -> actix_web::Result<HttpResponse> {
    auth.require_staff()?;
    let student_id = path.into_inner();
    let notes = body.and_then(|b| b.into_inner().notes);

    let outcome = engine.mark_absent(student_id, &auth.username, notes).await;
    mark_response(outcome, student_id)
}

/// Override an automatic absence to present
#[utoipa::path(
    put,
    path = "/api/attendance/{student_id}/{date}/override",
    params(
        ("student_id" = u64, Path, description = "Student whose record to correct"),
        ("date" = String, Path, description = "Attendance date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Whether an ABSENT_AUTO record was changed", body = OverrideResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn override_absence(
    auth: AuthUser,
    path: web::Path<(u64, NaiveDate)>,
    engine: web::Data<AttendanceEngine>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    let (student_id, date) = path.into_inner();

    match engine
        .override_auto_absence(student_id, date, &auth.username)
        .await
    {
        Ok(overridden) => Ok(HttpResponse::Ok().json(OverrideResponse { overridden })),
        Err(e) => engine_failure(e, student_id),
    }
}

/// Get a student's attendance record for a date
#[utoipa::path(
    get,
    path = "/api/attendance/{student_id}/{date}",
    params(
        ("student_id" = u64, Path, description = "Student ID"),
        ("date" = String, Path, description = "Attendance date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Record found", body = RecordResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No attendance recorded for that day"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn get_record(
    _auth: AuthUser,
    path: web::Path<(u64, NaiveDate)>,
    engine: web::Data<AttendanceEngine>,
) -> actix_web::Result<HttpResponse> {
    let (student_id, date) = path.into_inner();

    match engine.record_for(student_id, date).await {
        Ok((state, Some(record))) => Ok(HttpResponse::Ok().json(RecordResponse {
            state: state.label().to_string(),
            record,
        })),
        Ok((_, None)) => Ok(HttpResponse::NotFound().json(json!({
            "message": "No attendance recorded"
        }))),
        Err(e) => engine_failure(e, student_id),
    }
}

/// Day sheet: every student with their attendance state
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(DaySheetQuery),
    responses(
        (status = 200, description = "All students for the day", body = Vec<DaySheetEntry>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn day_sheet(
    _auth: AuthUser,
    query: web::Query<DaySheetQuery>,
    engine: web::Data<AttendanceEngine>,
) -> actix_web::Result<HttpResponse> {
    let date = query.date.unwrap_or_else(|| engine.today());

    let sheet = engine.day_sheet(date).await.map_err(|e| {
        tracing::error!(error = %e, %date, "Failed to load day sheet");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(sheet))
}
