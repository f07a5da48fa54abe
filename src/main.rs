use std::sync::Arc;
use std::time::Duration as StdDuration;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod engine;
mod model;
mod models;
mod routes;
mod store;

use config::Config;
use db::init_db;
use engine::AttendanceEngine;
use engine::clock::SystemClock;
use engine::trigger::{ResilientTrigger, spawn_ticker};
use store::{MySqlStore, SettingsRunMarker};

use crate::docs::ApiDoc;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(offset = %config.timezone_offset, "Server starting...");

    let pool = init_db(&config).await?;

    let store = Arc::new(MySqlStore::new(pool));
    let engine = Arc::new(AttendanceEngine::new(
        store.clone(),
        Arc::new(SystemClock),
        config.timezone_offset,
    ));
    let trigger = Arc::new(ResilientTrigger::new(
        engine.clone(),
        Arc::new(SettingsRunMarker::new(store)),
        chrono::Duration::minutes(config.sweep_interval_minutes),
    ));

    if config.sweep_tick_seconds > 0 {
        spawn_ticker(trigger.clone(), StdDuration::from_secs(config.sweep_tick_seconds));
    } else {
        info!("Auto-absence ticker disabled, relying on request traffic");
    }

    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(Data::from(engine.clone()))
            .app_data(Data::from(trigger.clone()))
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
