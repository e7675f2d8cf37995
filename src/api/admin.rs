use crate::attendance::{AttendanceService, DailyReconciler, ReconcileSummary};
use crate::auth::auth::AuthUser;
use crate::model::attendance::AttendanceStatus;
use crate::report::{self, ReportFilter, ReportPage};
use actix_web::{HttpResponse, Responder, http::header, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
pub struct AdminListQuery {
    pub student_id: Option<String>,
    /// Substring match on the student's name
    pub student_name: Option<String>,
    #[param(value_type = Option<String>)]
    pub status: Option<AttendanceStatus>,
    #[param(value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReconcileReq {
    /// Defaults to today; future dates are rejected
    #[schema(example = "2026-01-01", format = "date", value_type = String, nullable = true)]
    pub date: Option<NaiveDate>,
}

/// List attendance records (admin)
#[utoipa::path(
    get,
    path = "/api/admin/attendance",
    params(AdminListQuery),
    responses(
        (status = 200, description = "Paginated attendance records", body = ReportPage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AdminListQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let query = query.into_inner();
    let filter = ReportFilter {
        student_id: query.student_id,
        student_name: query.student_name,
        status: query.status,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let page = report::fetch_page(pool.get_ref(), &filter, query.page, query.per_page)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to list attendance records");
            e
        })?;

    Ok(HttpResponse::Ok().json(page))
}

/// Export attendance records as CSV (admin)
#[utoipa::path(
    post,
    path = "/api/admin/attendance/export",
    request_body = ReportFilter,
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv"),
        (status = 400, description = "No data to export"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Export failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn export_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    service: web::Data<AttendanceService>,
    filter: web::Json<ReportFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let csv = report::export_filtered(pool.get_ref(), &filter)
        .await
        .map_err(|e| {
            error!(error = %e, "Export failed");
            e
        })?;

    let filename = format!("attendance_{}.csv", service.now().format("%Y%m%d%H%M"));
    info!(%filename, bytes = csv.len(), "Attendance exported");

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(csv))
}

/// Run absence reconciliation for a day (admin)
#[utoipa::path(
    post,
    path = "/api/admin/attendance/reconcile",
    request_body = ReconcileReq,
    responses(
        (status = 200, description = "Reconciliation summary", body = ReconcileSummary),
        (status = 400, description = "Date is in the future"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn reconcile(
    auth: AuthUser,
    reconciler: web::Data<DailyReconciler>,
    payload: web::Json<ReconcileReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let result = match payload.date {
        Some(date) => reconciler.reconcile(date).await,
        None => reconciler.reconcile_day().await,
    };

    let summary = result.map_err(|e| {
        error!(error = %e, "Manual reconciliation failed");
        e
    })?;

    Ok(HttpResponse::Ok().json(summary))
}
