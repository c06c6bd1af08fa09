use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod services;
mod store;
mod utils;

use config::Config;
use db::{init_db, run_migrations};
use services::{AttendanceService, ShiftCatalog, time_accounting::BreakPolicy};
use store::{AttendanceStore, MemoryStore, MySqlStore, ShiftStore};
use utils::clock::SystemClock;

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let (attendance_store, shift_store): (Arc<dyn AttendanceStore>, Arc<dyn ShiftStore>) =
        match &config.database_url {
            Some(url) => {
                let pool = init_db(url).await.context("Failed to connect to database")?;
                if config.run_migrations {
                    run_migrations(&pool)
                        .await
                        .context("Failed to run migrations")?;
                }
                let store = Arc::new(MySqlStore::new(pool));
                (store.clone() as Arc<dyn AttendanceStore>, store as Arc<dyn ShiftStore>)
            }
            None => {
                warn!("DATABASE_URL not set, attendance data lives in memory only");
                let store = Arc::new(MemoryStore::default());
                (store.clone() as Arc<dyn AttendanceStore>, store as Arc<dyn ShiftStore>)
            }
        };

    let attendance = Data::new(AttendanceService::new(
        attendance_store,
        Arc::new(SystemClock),
        BreakPolicy {
            unpaid_daily_limit: config.unpaid_break_daily_limit,
        },
    ));
    let shifts = Data::new(ShiftCatalog::new(shift_store));

    let server_addr = config.server_addr.clone();
    info!(%server_addr, api_prefix = %config.api_prefix, "Listening");

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(attendance.clone())
            .app_data(shifts.clone())
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
