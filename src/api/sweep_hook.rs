use crate::config::Config;
use crate::engine::trigger::{ResilientTrigger, TriggerOutcome};
use actix_web::middleware::Next;
use actix_web::{
    Error,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use tracing::debug;

/// Gives the auto-absence trigger a chance to run before the request is
/// served. The trigger swallows its own failures, so the request never
/// fails because of a sweep.
pub async fn sweep_hook(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let enabled = req
        .app_data::<Data<Config>>()
        .is_some_and(|config| config.sweep_on_request);

    if enabled {
        if let Some(trigger) = req.app_data::<Data<ResilientTrigger>>().cloned() {
            if let TriggerOutcome::Ran(report) = trigger.maybe_run().await {
                debug!(path = %req.path(), ?report, "Sweep ran on request");
            }
        }
    }

    next.call(req).await
}
