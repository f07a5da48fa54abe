use crate::{
    api::{attendance, scheduler, sweep_hook::sweep_hook},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / requests_per_min as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("period and burst are non-zero");
        Governor::new(&cfg)
    }

    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));
    let admin_limiter = Arc::new(build_limiter(config.rate_admin_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // reads run the due sweep first; writes never do, so a
                    // late mark cannot collide with a row swept in the same request
                    // /attendance?date=
                    .service(
                        web::resource("")
                            .wrap(from_fn(sweep_hook))
                            .route(web::get().to(attendance::day_sheet)),
                    )
                    // /attendance/{student_id}/present
                    .service(
                        web::resource("/{student_id}/present")
                            .route(web::post().to(attendance::mark_present)),
                    )
                    // /attendance/{student_id}/absent
                    .service(
                        web::resource("/{student_id}/absent")
                            .route(web::post().to(attendance::mark_absent)),
                    )
                    // /attendance/{student_id}/{date}/override
                    .service(
                        web::resource("/{student_id}/{date}/override")
                            .route(web::put().to(attendance::override_absence)),
                    )
                    // /attendance/{student_id}/{date}
                    .service(
                        web::resource("/{student_id}/{date}")
                            .wrap(from_fn(sweep_hook))
                            .route(web::get().to(attendance::get_record)),
                    ),
            )
            .service(
                web::scope("/scheduler")
                    .service(
                        web::resource("/run")
                            .wrap(admin_limiter.clone())
                            .route(web::post().to(scheduler::run_now)),
                    )
                    .service(web::resource("/status").route(web::get().to(scheduler::status)))
                    .service(
                        web::resource("/grace-period")
                            .wrap(admin_limiter)
                            .route(web::get().to(scheduler::get_grace_period))
                            .route(web::put().to(scheduler::set_grace_period)),
                    ),
            ),
    );
}
