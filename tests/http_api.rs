use actix_web::middleware::from_fn;
use actix_web::{App, http::StatusCode, test, web};
use attendance::attendance::{AttendanceService, DailyReconciler};
use attendance::auth::{jwt::generate_access_token, middleware::auth_middleware};
use attendance::clock::FixedClock;
use attendance::config::Config;
use attendance::model::attendance::CourseTimeWindow;
use attendance::model::role::Role;
use attendance::routes;
use attendance::store::{MemoryRecordStore, MemoryRoster};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Value, json};
use std::sync::Arc;

const SECRET: &str = "test-secret";

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 2)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn window() -> CourseTimeWindow {
    CourseTimeWindow::new(
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(23, 50, 0).unwrap(),
    )
    .unwrap()
}

fn token(role: Role, student_id: Option<&str>) -> String {
    let token = generate_access_token(
        "u1",
        "tester",
        role,
        student_id.map(str::to_string),
        SECRET,
        3600,
    )
    .unwrap();
    format!("Bearer {token}")
}

struct Fixture {
    clock: Arc<FixedClock>,
    store: Arc<MemoryRecordStore>,
    service: AttendanceService,
    reconciler: DailyReconciler,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryRecordStore::new());
    let roster = Arc::new(MemoryRoster::new());
    roster.enroll("s1", "CS101");
    roster.enroll("s2", "CS101");
    let clock = Arc::new(FixedClock::new(at(9, 10)));
    let service = AttendanceService::new(store.clone(), roster.clone(), clock.clone(), window());
    let reconciler = DailyReconciler::new(store.clone(), roster, clock.clone());
    Fixture {
        clock,
        store,
        service,
        reconciler,
    }
}

macro_rules! app {
    ($fx:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_window(window(), SECRET)))
                .app_data(web::Data::new($fx.service.clone()))
                .app_data(web::Data::new($fx.reconciler.clone()))
                .service(
                    web::scope("/api")
                        .wrap(from_fn(auth_middleware))
                        .configure(routes::attendance_routes),
                ),
        )
        .await
    };
}

#[actix_web::test]
async fn check_in_and_out_over_http() {
    let fx = fixture();
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(("Authorization", token(Role::Student, Some("s1"))))
        .set_json(json!({ "course_id": "CS101" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "Normal");
    assert_eq!(body["time"], "09:10:00");

    fx.clock.set(at(22, 0));
    let req = test::TestRequest::post()
        .uri("/api/attendance/check-out")
        .insert_header(("Authorization", token(Role::Student, Some("s1"))))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "Early");
    assert_eq!(body["check_out_time"], "22:00:00");
}

#[actix_web::test]
async fn duplicate_check_in_returns_first_time() {
    let fx = fixture();
    let app = app!(fx);

    for expected in [StatusCode::OK, StatusCode::BAD_REQUEST] {
        let req = test::TestRequest::post()
            .uri("/api/attendance/check-in")
            .insert_header(("Authorization", token(Role::Student, Some("s1"))))
            .set_json(json!({ "course_id": "CS101" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected);
        if expected == StatusCode::BAD_REQUEST {
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["first_checkin"], "09:10:00");
        }
    }
}

#[actix_web::test]
async fn check_in_after_course_end_is_rejected() {
    let fx = fixture();
    fx.clock.set(at(23, 55));
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(("Authorization", token(Role::Student, Some("s1"))))
        .set_json(json!({ "course_id": "CS101" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["course_end_time"], "23:50:00");
    assert_eq!(body["current_time"], "2026-03-02 23:55:00");
    assert_eq!(fx.store.records().len(), 1);
}

#[actix_web::test]
async fn unknown_course_is_not_found() {
    let fx = fixture();
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(("Authorization", token(Role::Student, Some("s1"))))
        .set_json(json!({ "course_id": "NOPE" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn students_cannot_act_for_others() {
    let fx = fixture();
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(("Authorization", token(Role::Student, Some("s1"))))
        .set_json(json!({ "student_id": "s2", "course_id": "CS101" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(fx.store.records().is_empty());
}

#[actix_web::test]
async fn missing_token_is_unauthorized() {
    let fx = fixture();
    let app = app!(fx);

    let req = test::TestRequest::get()
        .uri("/api/attendance/today?student_id=s1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn today_returns_window_and_record() {
    let fx = fixture();
    let app = app!(fx);

    let req = test::TestRequest::get()
        .uri("/api/attendance/today")
        .insert_header(("Authorization", token(Role::Student, Some("s2"))))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["course_schedule"]["start"], "09:00:00");
    assert_eq!(body["course_schedule"]["end"], "23:50:00");
    assert!(body["attendance"].is_null());
}

#[actix_web::test]
async fn reconcile_is_admin_only() {
    let fx = fixture();
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri("/api/admin/attendance/reconcile")
        .insert_header(("Authorization", token(Role::Student, Some("s1"))))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/admin/attendance/reconcile")
        .insert_header(("Authorization", token(Role::Admin, None)))
        .set_json(json!({ "date": "2026-03-02" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["enrolled"], 2);
    assert_eq!(body["inserted"], 2);
    assert_eq!(fx.store.records().len(), 2);
}

#[actix_web::test]
async fn reconcile_refuses_future_dates() {
    let fx = fixture();
    let app = app!(fx);

    let req = test::TestRequest::post()
        .uri("/api/admin/attendance/reconcile")
        .insert_header(("Authorization", token(Role::Admin, None)))
        .set_json(json!({ "date": "2026-03-03" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["today"], "2026-03-02");
    assert!(fx.store.records().is_empty());

    // the day stays open for check-ins
    fx.clock.set(NaiveDate::from_ymd_opt(2026, 3, 3).unwrap().and_hms_opt(9, 5, 0).unwrap());
    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(("Authorization", token(Role::Student, Some("s1"))))
        .set_json(json!({ "course_id": "CS101" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
