use crate::auth::auth::AuthUser;
use crate::engine::grace::clamp_grace_minutes;
use crate::engine::sweep::SweepReport;
use crate::engine::trigger::ResilientTrigger;
use crate::engine::AttendanceEngine;
use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct SchedulerStatus {
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_run: Option<DateTime<Utc>>,
    pub interval_minutes: i64,
    pub grace_minutes: u32,
    #[schema(value_type = String, format = "date")]
    pub today: NaiveDate,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct GracePeriod {
    /// Clamped to 5..=60 when stored
    #[schema(example = 15)]
    pub minutes: i64,
}

/// Run the auto-absence sweep now
#[utoipa::path(
    post,
    path = "/api/scheduler/run",
    responses(
        (status = 200, description = "Sweep finished", body = SweepReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Sweep failed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Scheduler"
)]
pub async fn run_now(
    auth: AuthUser,
    trigger: web::Data<ResilientTrigger>,
) -> actix_web::Result<HttpResponse> {
    auth.require_scheduler()?;

    let report = trigger.run_now().await.map_err(|e| {
        tracing::error!(error = %e, requested_by = %auth.username, "Manual sweep failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    tracing::info!(requested_by = %auth.username, marked = report.marked, "Manual sweep finished");
    Ok(HttpResponse::Ok().json(report))
}

/// Scheduler status
#[utoipa::path(
    get,
    path = "/api/scheduler/status",
    responses(
        (status = 200, description = "Last run and current settings", body = SchedulerStatus),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Scheduler"
)]
pub async fn status(
    _auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    trigger: web::Data<ResilientTrigger>,
) -> actix_web::Result<HttpResponse> {

    let grace_minutes = engine.grace_period().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to read grace period");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(SchedulerStatus {
        last_run: trigger.last_run().await,
        interval_minutes: trigger.interval().num_minutes(),
        grace_minutes,
        today: engine.today(),
    }))
}

/// Current grace period
#[utoipa::path(
    get,
    path = "/api/scheduler/grace-period",
    responses(
        (status = 200, description = "Grace period in minutes", body = GracePeriod),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Scheduler"
)]
pub async fn get_grace_period(
    _auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
) -> actix_web::Result<HttpResponse> {

    let minutes = engine.grace_period().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to read grace period");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(GracePeriod {
        minutes: minutes as i64,
    }))
}

/// Update the grace period
#[utoipa::path(
    put,
    path = "/api/scheduler/grace-period",
    request_body(content = GracePeriod, description = "New grace period; out-of-range values are clamped"),
    responses(
        (status = 200, description = "Stored", body = Object, example = json!({
            "updated": true,
            "minutes": 60
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 503, description = "Settings store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Scheduler"
)]
pub async fn set_grace_period(
    auth: AuthUser,
    body: web::Json<GracePeriod>,
    engine: web::Data<AttendanceEngine>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;

    if !engine.set_grace_period(body.minutes).await {
        return Ok(HttpResponse::ServiceUnavailable().json(json!({
            "updated": false
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "updated": true,
        "minutes": clamp_grace_minutes(body.minutes)
    })))
}
