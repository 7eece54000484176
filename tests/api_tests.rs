use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::{Duration, Utc};
use inspection_booking::{
    AppState, InMemoryRepository, MockMailer,
    auth::{DEV_USER_HEADER, hash_password},
    config::AppConfig,
    create_router,
    mailer::EmailMessage,
    models::{CreateCenterRequest, CreateTimeSlotRequest, NewUser, Role, User},
    repository::Repository,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

const PASSWORD: &str = "s3cret-pass";

// --- Harness ---

struct TestApp {
    repo: Arc<InMemoryRepository>,
    mailer: Arc<MockMailer>,
    router: Router,
}

fn spawn_app_with(mailer: MockMailer) -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let mailer = Arc::new(mailer);
    let router = create_router(AppState {
        repo: repo.clone(),
        mailer: mailer.clone(),
        config: AppConfig::default(),
    });
    TestApp {
        repo,
        mailer,
        router,
    }
}

fn spawn_app() -> TestApp {
    spawn_app_with(MockMailer::new())
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Reset emails leave from a background task; give it a moment to land.
    async fn wait_for_mail(&self, count: usize) -> Vec<EmailMessage> {
        for _ in 0..100 {
            let sent = self.mailer.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        self.mailer.sent()
    }

    async fn seed_user(&self, email: &str, role: Role) -> User {
        self.repo
            .create_user(NewUser {
                name: "Karim".to_string(),
                email: email.to_string(),
                phone: None,
                password_hash: hash_password(PASSWORD).unwrap(),
                role,
            })
            .await
            .unwrap()
    }

    async fn seed_slot(&self, capacity: i32) -> (Uuid, Uuid) {
        let center = self
            .repo
            .create_center(CreateCenterRequest {
                name: "Centre Maarif".to_string(),
                city: "Casablanca".to_string(),
                address: "5 Rue Jean Jaurès".to_string(),
                phone: None,
                price_cents: Some(30_000),
            })
            .await
            .unwrap();
        let starts_at = Utc::now() + Duration::days(1);
        let slot = self
            .repo
            .create_slot(
                center.id,
                CreateTimeSlotRequest {
                    starts_at,
                    ends_at: starts_at + Duration::minutes(30),
                    capacity,
                },
            )
            .await
            .unwrap();
        (center.id, slot.id)
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_as(uri: &str, user: &User) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(DEV_USER_HEADER, user.id.to_string())
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, user: Option<&User>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header(DEV_USER_HEADER, user.id.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

// --- Locale routing ---

#[tokio::test]
async fn test_root_redirects_to_negotiated_locale() {
    let app = spawn_app();

    let response = app
        .send(
            Request::builder()
                .uri("/")
                .header(header::ACCEPT_LANGUAGE, "de-DE,ar;q=0.8,en;q=0.5")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/ar");

    let default = app.send(get("/")).await;
    assert_eq!(location(&default), "/fr");
}

#[tokio::test]
async fn test_unprefixed_paths_gain_a_locale() {
    let app = spawn_app();

    let response = app.send(get("/cars")).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/fr/cars");

    let with_cookie = app
        .send(
            Request::builder()
                .uri("/centers/nearby?city=Rabat")
                .header(header::COOKIE, "locale=en")
                .header(header::ACCEPT_LANGUAGE, "ar")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(with_cookie.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&with_cookie), "/en/centers/nearby?city=Rabat");
}

#[tokio::test]
async fn test_unknown_locale_and_pages_are_not_found() {
    let app = spawn_app();

    assert_eq!(app.send(get("/de/cars")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.send(get("/de")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.send(get("/fr/nothing")).await.status(), StatusCode::NOT_FOUND);

    let api = app.send(get("/api/nothing")).await;
    assert_eq!(api.status(), StatusCode::NOT_FOUND);
    let body = body_json(api).await;
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_public_pages_carry_locale_and_direction() {
    let app = spawn_app();
    app.seed_slot(1).await;

    let response = app.send(get("/ar")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["locale"], "ar");
    assert_eq!(body["dir"], "rtl");
    assert_eq!(body["user"], Value::Null);
    assert_eq!(body["data"]["active_centers"], 1);

    let signin = app.send(get("/en/auth/signin?callbackUrl=%2Fen%2Fcars")).await;
    assert_eq!(signin.status(), StatusCode::OK);
    let body = body_json(signin).await;
    assert_eq!(body["dir"], "ltr");
    assert_eq!(body["data"]["callbackUrl"], "/en/cars");
}

// --- Page guard ---

#[tokio::test]
async fn test_anonymous_visitor_is_sent_to_signin() {
    let app = spawn_app();

    let response = app.send(get("/fr/cars")).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "/fr/auth/signin?callbackUrl=%2Ffr%2Fcars"
    );

    let admin = app.send(get("/ar/admin/users")).await;
    assert_eq!(
        location(&admin),
        "/ar/auth/signin?callbackUrl=%2Far%2Fadmin%2Fusers"
    );
}

#[tokio::test]
async fn test_user_is_kept_out_of_the_back_office() {
    let app = spawn_app();
    let user = app.seed_user("user@example.com", Role::User).await;

    let response = app.send(get_as("/en/admin", &user)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/en/unauthorized");

    let cars = app.send(get_as("/en/cars", &user)).await;
    assert_eq!(cars.status(), StatusCode::OK);
    let body = body_json(cars).await;
    assert_eq!(body["user"]["email"], "user@example.com");
    assert_eq!(body["user"]["can_access_admin"], false);
}

#[tokio::test]
async fn test_staff_sees_bookings_but_not_users() {
    let app = spawn_app();
    let staff = app.seed_user("staff@example.com", Role::Staff).await;

    let users = app.send(get_as("/fr/admin/users", &staff)).await;
    assert_eq!(location(&users), "/fr/unauthorized");

    let bookings = app.send(get_as("/fr/admin/bookings", &staff)).await;
    assert_eq!(bookings.status(), StatusCode::OK);

    let dashboard = app.send(get_as("/fr/admin", &staff)).await;
    assert_eq!(dashboard.status(), StatusCode::OK);
    let body = body_json(dashboard).await;
    assert_eq!(body["user"]["can_access_admin"], true);
    assert_eq!(body["data"]["total_users"], 1);
}

#[tokio::test]
async fn test_admin_reaches_every_back_office_page() {
    let app = spawn_app();
    let admin = app.seed_user("admin@example.com", Role::Admin).await;

    for page in [
        "/en/admin",
        "/en/admin/users",
        "/en/admin/bookings",
        "/en/admin/centers",
        "/en/admin/payments",
    ] {
        let response = app.send(get_as(page, &admin)).await;
        assert_eq!(response.status(), StatusCode::OK, "{page}");
    }
}

// --- Auth ---

#[tokio::test]
async fn test_register_login_and_session_cookie() {
    let app = spawn_app();

    let register = app
        .send(json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({"name": "Salma", "email": "Salma@Example.com", "password": PASSWORD}),
        ))
        .await;
    assert_eq!(register.status(), StatusCode::CREATED);
    let profile = body_json(register).await;
    assert_eq!(profile["email"], "salma@example.com");
    assert_eq!(profile["role"], "USER");
    assert!(profile.get("password_hash").is_none());

    let duplicate = app
        .send(json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({"name": "Salma", "email": "salma@example.com", "password": PASSWORD}),
        ))
        .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

    let wrong = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": "salma@example.com", "password": "not-the-password"}),
        ))
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let login = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": "salma@example.com", "password": PASSWORD}),
        ))
        .await;
    assert_eq!(login.status(), StatusCode::OK);
    let cookie = login
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));
    let session_cookie = cookie.split(';').next().unwrap().to_string();

    let session = app
        .send(
            Request::builder()
                .uri("/api/auth/session")
                .header(header::COOKIE, session_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(session.status(), StatusCode::OK);
    let body = body_json(session).await;
    assert_eq!(body["user"]["email"], "salma@example.com");
    assert_eq!(body["can_access_admin"], false);
    assert!(
        body["permissions"]
            .as_array()
            .unwrap()
            .contains(&json!("BOOK_INSPECTION"))
    );
}

#[tokio::test]
async fn test_register_validation() {
    let app = spawn_app();

    for payload in [
        json!({"email": "a@example.com", "password": PASSWORD}),
        json!({"name": "A", "email": "not-an-email", "password": PASSWORD}),
        json!({"name": "A", "email": "a@example.com", "password": "short"}),
    ] {
        let response = app
            .send(json_request("POST", "/api/auth/register", None, payload))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let malformed = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_expires_the_cookie() {
    let app = spawn_app();

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_api_requires_a_session() {
    let app = spawn_app();

    for uri in ["/api/cars", "/api/profile", "/api/bookings", "/api/auth/session"] {
        let response = app.send(get(uri)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
    assert_eq!(
        app.send(get("/api/admin/stats")).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

// --- Password reset ---

#[tokio::test]
async fn test_forgot_password_validation_and_privacy() {
    let app = spawn_app();

    let missing = app
        .send(json_request("POST", "/api/auth/forgot-password", None, json!({})))
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(missing).await["message"], "Email is required");

    let malformed = app
        .send(json_request(
            "POST",
            "/api/auth/forgot-password",
            None,
            json!({"email": "nobody"}),
        ))
        .await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let unknown = app
        .send(json_request(
            "POST",
            "/api/auth/forgot-password",
            None,
            json!({"email": "ghost@example.com"}),
        ))
        .await;
    assert_eq!(unknown.status(), StatusCode::OK);
    assert!(app.wait_for_mail(1).await.is_empty());
}

#[tokio::test]
async fn test_password_reset_round_trip() {
    let app = spawn_app();
    app.seed_user("reset@example.com", Role::User).await;

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/forgot-password",
            None,
            json!({"email": "reset@example.com", "locale": "ar"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let sent = app.wait_for_mail(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "reset@example.com");
    let marker = "http://localhost:3000/ar/auth/reset-password?token=";
    let start = sent[0].text.find(marker).unwrap() + marker.len();
    let token = sent[0].text[start..start + 36].to_string();

    let reset = app
        .send(json_request(
            "POST",
            "/api/auth/reset-password",
            None,
            json!({"token": token, "password": "fresh-password"}),
        ))
        .await;
    assert_eq!(reset.status(), StatusCode::OK);

    let reused = app
        .send(json_request(
            "POST",
            "/api/auth/reset-password",
            None,
            json!({"token": token, "password": "another-password"}),
        ))
        .await;
    assert_eq!(reused.status(), StatusCode::BAD_REQUEST);

    let login = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": "reset@example.com", "password": "fresh-password"}),
        ))
        .await;
    assert_eq!(login.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_password_survives_mailer_failure() {
    let app = spawn_app_with(MockMailer::new_failing());
    app.seed_user("unlucky@example.com", Role::User).await;

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/forgot-password",
            None,
            json!({"email": "unlucky@example.com"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_password_does_not_wait_for_the_mail_api() {
    let app = spawn_app_with(MockMailer::with_delay(std::time::Duration::from_secs(30)));
    app.seed_user("patient@example.com", Role::User).await;

    let started = std::time::Instant::now();
    let known = app
        .send(json_request(
            "POST",
            "/api/auth/forgot-password",
            None,
            json!({"email": "patient@example.com"}),
        ))
        .await;
    let unknown = app
        .send(json_request(
            "POST",
            "/api/auth/forgot-password",
            None,
            json!({"email": "stranger@example.com"}),
        ))
        .await;

    assert_eq!(known.status(), StatusCode::OK);
    assert_eq!(unknown.status(), StatusCode::OK);
    assert_eq!(body_json(known).await, body_json(unknown).await);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[tokio::test]
async fn test_reset_with_garbage_token_is_rejected() {
    let app = spawn_app();

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/reset-password",
            None,
            json!({"token": "not-a-uuid", "password": "fresh-password"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "This reset link is invalid or has expired"
    );
}

// --- Cars & bookings ---

#[tokio::test]
async fn test_car_registration_over_http() {
    let app = spawn_app();
    let user = app.seed_user("driver@example.com", Role::User).await;

    let created = app
        .send(json_request(
            "POST",
            "/api/cars",
            Some(&user),
            json!({"plate_number": "123 45 b 6", "brand": "Renault", "model": "Clio", "year": 2021}),
        ))
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let car = body_json(created).await;
    assert_eq!(car["plate_number"], "12345B6");
    assert_eq!(car["fuel_type"], "PETROL");

    let bad_year = app
        .send(json_request(
            "POST",
            "/api/cars",
            Some(&user),
            json!({"plate_number": "9-Z", "brand": "Renault", "model": "4L", "year": 1850}),
        ))
        .await;
    assert_eq!(bad_year.status(), StatusCode::BAD_REQUEST);

    let listed = app.send(get_as("/api/cars", &user)).await;
    assert_eq!(body_json(listed).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_booking_flow_over_http() {
    let app = spawn_app();
    let user = app.seed_user("booker@example.com", Role::User).await;
    let other = app.seed_user("late@example.com", Role::User).await;
    let (center_id, slot_id) = app.seed_slot(1).await;

    let mut car_ids = Vec::new();
    for (owner, plate) in [(&user, "AA-1"), (&other, "BB-2")] {
        let response = app
            .send(json_request(
                "POST",
                "/api/cars",
                Some(owner),
                json!({"plate_number": plate, "brand": "Kia", "model": "Picanto", "year": 2020}),
            ))
            .await;
        car_ids.push(body_json(response).await["id"].as_str().unwrap().to_string());
    }

    let booked = app
        .send(json_request(
            "POST",
            "/api/bookings",
            Some(&user),
            json!({"car_id": car_ids[0], "time_slot_id": slot_id}),
        ))
        .await;
    assert_eq!(booked.status(), StatusCode::CREATED);
    let booking = body_json(booked).await;
    assert_eq!(booking["status"], "PENDING");
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let slots = app
        .send(get(&format!("/api/centers/{center_id}/slots")))
        .await;
    assert!(body_json(slots).await.as_array().unwrap().is_empty());

    let full = app
        .send(json_request(
            "POST",
            "/api/bookings",
            Some(&other),
            json!({"car_id": car_ids[1], "time_slot_id": slot_id}),
        ))
        .await;
    assert_eq!(full.status(), StatusCode::BAD_REQUEST);

    let cancelled = app
        .send(json_request(
            "POST",
            &format!("/api/bookings/{booking_id}/cancel"),
            Some(&user),
            json!({}),
        ))
        .await;
    assert_eq!(cancelled.status(), StatusCode::OK);
    assert_eq!(body_json(cancelled).await["status"], "CANCELLED");

    let rebooked = app
        .send(json_request(
            "POST",
            "/api/bookings",
            Some(&other),
            json!({"car_id": car_ids[1], "time_slot_id": slot_id}),
        ))
        .await;
    assert_eq!(rebooked.status(), StatusCode::CREATED);

    let history = app.send(get_as("/api/bookings", &user)).await;
    let history = body_json(history).await;
    assert_eq!(history[0]["status"], "CANCELLED");
    assert_eq!(history[0]["center_name"], "Centre Maarif");
}

#[tokio::test]
async fn test_malformed_path_and_query_answer_with_json() {
    let app = spawn_app();
    let user = app.seed_user("typo@example.com", Role::User).await;
    let admin = app.seed_user("root@example.com", Role::Admin).await;

    let bad_id = app.send(get_as("/api/bookings/not-a-uuid", &user)).await;
    assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);
    let body = body_json(bad_id).await;
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().unwrap().starts_with("Invalid path parameter"));

    let bad_slot = app
        .send(json_request(
            "POST",
            "/api/admin/centers/12345/slots",
            Some(&admin),
            json!({}),
        ))
        .await;
    assert_eq!(bad_slot.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(bad_slot).await["error"], "bad_request");
}

#[tokio::test]
async fn test_cancelled_booking_payment_stays_out_of_revenue() {
    let app = spawn_app();
    let user = app.seed_user("refund@example.com", Role::User).await;
    let admin = app.seed_user("cashier@example.com", Role::Admin).await;
    let (_, slot_id) = app.seed_slot(1).await;

    let car = app
        .send(json_request(
            "POST",
            "/api/cars",
            Some(&user),
            json!({"plate_number": "CC-3", "brand": "Renault", "model": "Clio", "year": 2018}),
        ))
        .await;
    let car_id = body_json(car).await["id"].as_str().unwrap().to_string();
    let booked = app
        .send(json_request(
            "POST",
            "/api/bookings",
            Some(&user),
            json!({"car_id": car_id, "time_slot_id": slot_id}),
        ))
        .await;
    let booking_id = body_json(booked).await["id"].as_str().unwrap().to_string();
    let cancelled = app
        .send(json_request(
            "POST",
            &format!("/api/bookings/{booking_id}/cancel"),
            Some(&user),
            json!({}),
        ))
        .await;
    assert_eq!(cancelled.status(), StatusCode::OK);

    let payments = body_json(app.send(get_as("/api/payments", &user)).await).await;
    let payment_id = payments[0]["id"].as_str().unwrap().to_string();
    let paid = app
        .send(json_request(
            "PATCH",
            &format!("/api/admin/payments/{payment_id}/status"),
            Some(&admin),
            json!({"status": "PAID"}),
        ))
        .await;
    assert_eq!(paid.status(), StatusCode::BAD_REQUEST);

    let stats = body_json(app.send(get_as("/api/admin/stats", &admin)).await).await;
    assert_eq!(stats["revenue_cents"], 0);
}

// --- Admin API ---

#[tokio::test]
async fn test_admin_api_permissions() {
    let app = spawn_app();
    let user = app.seed_user("plain@example.com", Role::User).await;
    let staff = app.seed_user("desk@example.com", Role::Staff).await;
    let admin = app.seed_user("boss@example.com", Role::Admin).await;

    assert_eq!(
        app.send(get_as("/api/admin/stats", &user)).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.send(get_as("/api/admin/stats", &staff)).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        app.send(get_as("/api/admin/users", &staff)).await.status(),
        StatusCode::FORBIDDEN
    );

    let own_role = app
        .send(json_request(
            "PATCH",
            &format!("/api/admin/users/{}/role", admin.id),
            Some(&admin),
            json!({"role": "USER"}),
        ))
        .await;
    assert_eq!(own_role.status(), StatusCode::BAD_REQUEST);

    let promoted = app
        .send(json_request(
            "PATCH",
            &format!("/api/admin/users/{}/role", user.id),
            Some(&admin),
            json!({"role": "STAFF"}),
        ))
        .await;
    assert_eq!(promoted.status(), StatusCode::OK);

    // The stored role is re-read on the next request.
    assert_eq!(
        app.send(get_as("/api/admin/stats", &user)).await.status(),
        StatusCode::OK
    );

    let bad_filter = app
        .send(get_as("/api/admin/bookings?status=lost", &staff))
        .await;
    assert_eq!(bad_filter.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = spawn_app();

    let health = app.send(get("/health")).await;
    assert_eq!(health.status(), StatusCode::OK);

    let doc = app.send(get("/api-docs/openapi.json")).await;
    assert_eq!(doc.status(), StatusCode::OK);
    let doc = body_json(doc).await;
    assert!(doc["paths"].get("/api/bookings").is_some());
}
