use crate::attendance::{AttendanceService, CheckInOutcome, CheckOutOutcome, TodayView};
use crate::auth::auth::AuthUser;
use crate::model::attendance::AttendanceStatus;
use crate::report::{self, ReportFilter, ReportPage};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CheckInReq {
    /// Optional for students: defaults to the student on the token
    #[schema(example = "20250001")]
    pub student_id: Option<String>,
    #[schema(example = "CS101")]
    pub course_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckOutReq {
    #[schema(example = "20250001")]
    pub student_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CheckInResponse {
    #[schema(example = true)]
    pub success: bool,
    #[serde(flatten)]
    pub outcome: CheckInOutcome,
}

#[derive(Serialize, ToSchema)]
pub struct CheckOutResponse {
    #[schema(example = true)]
    pub success: bool,
    #[serde(flatten)]
    pub outcome: CheckOutOutcome,
}

#[derive(Deserialize, IntoParams)]
pub struct StudentQuery {
    /// Required for admins; students default to themselves
    pub student_id: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct SearchQuery {
    pub student_id: Option<String>,
    /// Status label, e.g. `Late` or `Late + Early`
    #[param(value_type = Option<String>)]
    pub status: Option<AttendanceStatus>,
    #[param(value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = CheckInReq,
    responses(
        (status = 200, description = "Checked in successfully", body = CheckInResponse),
        (status = 400, description = "Already checked in today, or the course has ended", body = Object, example = json!({
            "error": "Check-in already completed today",
            "first_checkin": "09:10:00"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student or course not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<CheckInReq>,
) -> actix_web::Result<impl Responder> {
    let student_id = auth.resolve_student(payload.student_id.as_deref())?;
    let now = service.now();

    let outcome = service
        .check_in(&student_id, &payload.course_id, now)
        .await?;

    Ok(HttpResponse::Ok().json(CheckInResponse {
        success: true,
        outcome,
    }))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = CheckOutReq,
    responses(
        (status = 200, description = "Checked out successfully", body = CheckOutResponse),
        (status = 400, description = "No check-in today, or already checked out", body = Object, example = json!({
            "error": "Check-in required before check-out"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<CheckOutReq>,
) -> actix_web::Result<impl Responder> {
    let student_id = auth.resolve_student(payload.student_id.as_deref())?;
    let now = service.now();

    let outcome = service.check_out(&student_id, now).await?;

    Ok(HttpResponse::Ok().json(CheckOutResponse {
        success: true,
        outcome,
    }))
}

/// Today's attendance for one student
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    params(StudentQuery),
    responses(
        (status = 200, description = "Today's record and the course window", body = TodayView),
        (status = 400, description = "Missing student_id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<StudentQuery>,
) -> actix_web::Result<impl Responder> {
    let student_id = auth.resolve_student(query.student_id.as_deref())?;
    let view = service.today(&student_id, service.now()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Attendance history of one student
#[utoipa::path(
    get,
    path = "/api/attendance/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Paginated attendance history", body = ReportPage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn search(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SearchQuery>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();
    let student_id = auth.resolve_student(query.student_id.as_deref())?;

    let filter = ReportFilter {
        student_id: Some(student_id),
        status: query.status,
        start_date: query.start_date,
        end_date: query.end_date,
        ..ReportFilter::default()
    };

    let page = report::fetch_page(pool.get_ref(), &filter, query.page, query.per_page)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Attendance search failed");
            e
        })?;

    Ok(HttpResponse::Ok().json(page))
}
