use crate::api::admin::ReconcileReq;
use crate::api::attendance::{CheckInReq, CheckInResponse, CheckOutReq, CheckOutResponse};
use crate::attendance::{CheckInOutcome, CheckOutOutcome, ReconcileSummary, TodayView};
use crate::auth::handlers::LoginResponse;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, CourseTimeWindow};
use crate::model::role::Role;
use crate::models::LoginReqDto;
use crate::report::{ReportFilter, ReportPage, ReportRow};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

pub struct BearerAuth;

impl Modify for BearerAuth {
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

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = r#"
## Student Attendance

Daily check-in and check-out for enrolled students against a fixed course window.

### Status rules
- Check-in more than **15 minutes** after course start is `Late`
- Check-out more than **15 minutes** before course end is `Early`
- Both together is `Late + Early`
- Enrolled students with no record by the evening job are marked `Absent`

### Security
Every `/api` endpoint needs a **JWT Bearer** token from `/auth/login`.
Students act only for themselves; `/api/admin` endpoints are admin only.
"#,
    ),
    paths(
        crate::auth::handlers::login,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::search,

        crate::api::admin::list_attendance,
        crate::api::admin::export_attendance,
        crate::api::admin::reconcile
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            Role,
            AttendanceStatus,
            AttendanceRecord,
            CourseTimeWindow,
            CheckInReq,
            CheckOutReq,
            CheckInOutcome,
            CheckOutOutcome,
            CheckInResponse,
            CheckOutResponse,
            TodayView,
            ReportFilter,
            ReportRow,
            ReportPage,
            ReconcileReq,
            ReconcileSummary
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Login"),
        (name = "Attendance", description = "Check-in, check-out and history"),
        (name = "Admin", description = "Listings, exports and manual reconciliation"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/api/attendance/check-in",
            "/api/attendance/check-out",
            "/api/attendance/today",
            "/api/attendance/search",
            "/api/admin/attendance",
            "/api/admin/attendance/export",
            "/api/admin/attendance/reconcile",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
