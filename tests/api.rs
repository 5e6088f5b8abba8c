//! Black-box tests against the in-process router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pharmaflow::handlers::{router, AppState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;

fn app(pool: SqlitePool) -> Router {
    router(AppState { pool })
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Registers a user and returns a `session=...` cookie from login.
async fn sign_in(app: &Router) -> String {
    let (status, _) = send(
        app,
        request(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "username": "pharmacist",
                "email": "pharmacist@example.com",
                "password": "correct-horse",
                "password_confirm": "correct-horse",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "pharmacist", "password": "correct-horse" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login sets a session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn add_medicine(app: &Router, cookie: &str, name: &str, stock: i64) -> i64 {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/medicines",
            Some(cookie),
            Some(json!({
                "name": name,
                "category": "analgesic",
                "stock": stock,
                "price": 4.5,
                "expiry_date": "2030-01-01",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

async fn stock_of(app: &Router, cookie: &str, id: i64) -> i64 {
    let (status, body) = send(
        app,
        request("GET", &format!("/medicines/{id}"), Some(cookie), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["stock"].as_i64().unwrap()
}

#[sqlx::test]
async fn unauthenticated_requests_are_rejected(pool: SqlitePool) {
    let app = app(pool);
    for uri in ["/", "/medicines", "/suppliers", "/sales", "/contact"] {
        let (status, _) = send(&app, request("GET", uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "GET {uri}");
    }
}

#[sqlx::test]
async fn register_rejects_mismatched_passwords(pool: SqlitePool) {
    let app = app(pool);
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "username": "pharmacist",
                "email": "pharmacist@example.com",
                "password": "correct-horse",
                "password_confirm": "wrong-horse",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test]
async fn register_rejects_duplicate_username(pool: SqlitePool) {
    let app = app(pool);
    let payload = json!({
        "username": "pharmacist",
        "email": "pharmacist@example.com",
        "password": "correct-horse",
        "password_confirm": "correct-horse",
    });

    let (status, _) = send(&app, request("POST", "/auth/register", None, Some(payload.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, request("POST", "/auth/register", None, Some(payload))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("already taken"));
}

#[sqlx::test]
async fn login_with_wrong_password_fails(pool: SqlitePool) {
    let app = app(pool);
    sign_in(&app).await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "pharmacist", "password": "guessing" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test]
async fn logout_revokes_the_session(pool: SqlitePool) {
    let app = app(pool);
    let cookie = sign_in(&app).await;

    let (status, _) = send(&app, request("GET", "/", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, request("POST", "/auth/logout", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, request("GET", "/", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test]
async fn medicine_crud_and_status(pool: SqlitePool) {
    let app = app(pool);
    let cookie = sign_in(&app).await;

    let id = add_medicine(&app, &cookie, "Aspirin 100mg", 30).await;

    let (status, body) = send(&app, request("GET", "/medicines", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["status"], "ok");

    // Unknown category is a form error.
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/medicines",
            Some(&cookie),
            Some(json!({
                "name": "Mystery Pills",
                "category": "alchemy",
                "price": 1.0,
                "expiry_date": "2030-01-01",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Update cannot touch stock: the payload has no stock field, and the
    // stored value survives the edit.
    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/medicines/{id}"),
            Some(&cookie),
            Some(json!({
                "name": "Aspirin 200mg",
                "category": "analgesic",
                "price": 6.0,
                "expiry_date": "2031-06-30",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Aspirin 200mg");
    assert_eq!(body["stock"].as_i64(), Some(30));

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/medicines/{id}"), Some(&cookie), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        request("GET", &format!("/medicines/{id}"), Some(&cookie), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test]
async fn medicine_list_filters_by_status(pool: SqlitePool) {
    let app = app(pool);
    let cookie = sign_in(&app).await;

    add_medicine(&app, &cookie, "Plenty", 100).await;
    add_medicine(&app, &cookie, "Scarce", 5).await;
    add_medicine(&app, &cookie, "Gone", 0).await;

    let (status, body) = send(
        &app,
        request("GET", "/medicines?status=low", Some(&cookie), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Scarce"]);

    let (_, body) = send(
        &app,
        request("GET", "/medicines?status=out", Some(&cookie), None),
    )
    .await;
    assert_eq!(body[0]["name"], "Gone");

    let (_, body) = send(&app, request("GET", "/medicines?q=scar", Some(&cookie), None)).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[sqlx::test]
async fn purchase_and_sale_flow_through_the_ledger(pool: SqlitePool) {
    let app = app(pool);
    let cookie = sign_in(&app).await;
    let id = add_medicine(&app, &cookie, "Metformin 850mg", 5).await;

    // Oversized sale is refused and leaves stock untouched.
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/sales",
            Some(&cookie),
            Some(json!({ "medicine_id": id, "quantity": 9, "total_price": 70.0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("insufficient stock"));
    assert_eq!(stock_of(&app, &cookie, id).await, 5);

    // A purchase tops the stock up...
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/purchases",
            Some(&cookie),
            Some(json!({ "medicine_id": id, "quantity": 10, "total_price": 40.0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stock_of(&app, &cookie, id).await, 15);

    // ...after which the same sale goes through.
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/sales",
            Some(&cookie),
            Some(json!({ "medicine_id": id, "quantity": 9, "total_price": 70.0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let sale_id = body["id"].as_i64().unwrap();
    assert_eq!(stock_of(&app, &cookie, id).await, 6);

    // Deleting the sale restores its units.
    let (status, _) = send(
        &app,
        request("DELETE", &format!("/sales/{sale_id}"), Some(&cookie), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(stock_of(&app, &cookie, id).await, 15);

    let (_, body) = send(&app, request("GET", "/sales", Some(&cookie), None)).await;
    assert_eq!(body["sales"].as_array().unwrap().len(), 0);
    assert_eq!(body["total"], 0.0);
}

#[sqlx::test]
async fn zero_quantity_purchase_is_a_form_error(pool: SqlitePool) {
    let app = app(pool);
    let cookie = sign_in(&app).await;
    let id = add_medicine(&app, &cookie, "Aspirin", 5).await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/purchases",
            Some(&cookie),
            Some(json!({ "medicine_id": id, "quantity": 0, "total_price": 0.0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(stock_of(&app, &cookie, id).await, 5);
}

#[sqlx::test]
async fn dashboard_reports_counts_and_alerts(pool: SqlitePool) {
    let app = app(pool);
    let cookie = sign_in(&app).await;

    add_medicine(&app, &cookie, "Plenty", 100).await;
    add_medicine(&app, &cookie, "Scarce", 3).await;
    add_medicine(&app, &cookie, "Gone", 0).await;

    let (status, body) = send(&app, request("GET", "/", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_medicines"].as_i64(), Some(3));
    assert_eq!(body["low_stock"].as_array().unwrap().len(), 1);
    assert_eq!(body["out_of_stock"].as_array().unwrap().len(), 1);
    assert_eq!(body["expired"].as_array().unwrap().len(), 0);
}

#[sqlx::test]
async fn contact_form_is_public(pool: SqlitePool) {
    let app = app(pool);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/contact",
            None,
            Some(json!({
                "name": "Walk-in Visitor",
                "email": "visitor@example.com",
                "message": "Do you stock ibuprofen?",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_read"], false);

    // Reading submissions still requires a session.
    let (status, _) = send(&app, request("GET", "/contact", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let cookie = sign_in(&app).await;
    let (status, body) = send(&app, request("GET", "/contact", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[sqlx::test]
async fn supplier_search_and_counts(pool: SqlitePool) {
    let app = app(pool);
    let cookie = sign_in(&app).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/suppliers",
            Some(&cookie),
            Some(json!({ "name": "MediSource", "email": "orders@medisource.example" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let supplier_id = body["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/medicines",
            Some(&cookie),
            Some(json!({
                "name": "Aspirin",
                "category": "analgesic",
                "price": 4.5,
                "expiry_date": "2030-01-01",
                "supplier_id": supplier_id,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(
        &app,
        request("GET", "/suppliers?q=medisource", Some(&cookie), None),
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["medicine_count"].as_i64(), Some(1));

    let (_, body) = send(&app, request("GET", "/suppliers?q=nomatch", Some(&cookie), None)).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}
