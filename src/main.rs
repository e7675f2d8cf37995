use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;

use attendance::attendance::{AttendanceService, DailyJob, DailyReconciler, Scheduler};
use attendance::clock::{Clock, SystemClock};
use attendance::config::Config;
use attendance::db::init_db;
use attendance::docs::ApiDoc;
use attendance::report;
use attendance::routes;
use attendance::store::{MySqlRecordStore, MySqlRoster};

use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(
        course_start = %config.course_window.start,
        course_end = %config.course_window.end,
        utc_offset = %config.utc_offset,
        "Server starting..."
    );

    let pool = init_db(
        &config.database_url,
        config.db_max_connections,
        config.utc_offset,
    )
    .await
    .context("failed to initialise database")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.utc_offset));
    let store = Arc::new(MySqlRecordStore::new(pool.clone()));
    let roster = Arc::new(MySqlRoster::new(pool.clone()));

    let service = AttendanceService::new(
        store.clone(),
        roster.clone(),
        clock.clone(),
        config.course_window,
    );
    let reconciler = DailyReconciler::new(store, roster, clock.clone());

    // Evening jobs: absences first, then the report that includes them
    let job_reconciler = reconciler.clone();
    let report_pool = pool.clone();
    let report_clock = clock.clone();
    let report_dir = config.report_dir.clone();

    let scheduler = Scheduler::new(clock.clone())
        .with_job(DailyJob::new("reconcile_day", config.reconcile_at, move || {
            let reconciler = job_reconciler.clone();
            Box::pin(async move {
                let summary = reconciler.reconcile_day().await?;
                info!(inserted = summary.inserted, "Absences recorded");
                Ok::<_, anyhow::Error>(())
            })
        }))
        .with_job(DailyJob::new("daily_report", config.report_at, move || {
            let pool = report_pool.clone();
            let dir = report_dir.clone();
            let today = report_clock.now().date();
            Box::pin(async move {
                report::export_daily(&pool, &dir, today)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Daily report failed");
                        e
                    })?;
                Ok::<_, anyhow::Error>(())
            })
        }));

    actix_web::rt::spawn(scheduler.run());

    // Clone values for the closure (avoid move issues)
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();
    let service = Data::new(service);
    let reconciler = Data::new(reconciler);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(service.clone())
            .app_data(reconciler.clone())
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
