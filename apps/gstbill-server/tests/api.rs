//! End-to-end API tests against the memory backend.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use gstbill_core::auth::ApproveUserInput;
use gstbill_core::{Role, Settings};
use gstbill_db::{BillingService, MemoryStore, ServiceOptions};
use gstbill_server::auth::JwtManager;
use gstbill_server::{router, AppState};

const SECRET: &str = "api-test-secret";
const ADMIN: &str = "owner@shop.in";
const STAFF: &str = "counter@shop.in";

struct TestApp {
    app: Router,
    jwt: JwtManager,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_policy(false).await
    }

    async fn with_policy(allow_unapproved: bool) -> Self {
        let service = BillingService::new(Arc::new(MemoryStore::new()), ServiceOptions::default());
        service
            .initialize(&Settings::new("27", "Maharashtra", Utc::now()))
            .await
            .unwrap();
        for (email, role) in [(ADMIN, Role::Admin), (STAFF, Role::Staff)] {
            service
                .add_approved_user(ApproveUserInput {
                    email: email.to_string(),
                    role,
                })
                .await
                .unwrap();
        }

        let state = AppState::new(service, JwtManager::new(SECRET), allow_unapproved);
        TestApp {
            app: router(state),
            jwt: JwtManager::new(SECRET),
        }
    }

    fn token(&self, email: &str, role: Option<Role>) -> String {
        self.jwt
            .issue("user-1", email, role, Duration::minutes(10))
            .unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str, email: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(email) = email {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(email, None)));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn call(&self, method: Method, uri: &str, email: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(email, None)))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn create_product(&self, name: &str, price_paise: i64, gst_bps: u32, stock: i64) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/products",
                ADMIN,
                json!({
                    "name": name,
                    "hsn_code": "8415",
                    "gst_rate": gst_bps,
                    "selling_price": price_paise,
                    "stock": stock,
                    "low_stock_alert": 2
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], true);
}

#[tokio::test]
async fn identity_reports_anonymous_instead_of_failing() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/identity", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_authenticated"], false);
    assert_eq!(body["role"], Value::Null);

    let (_, body) = app.get("/api/identity", Some("stranger@example.com")).await;
    assert_eq!(body["is_authenticated"], false);

    let request = Request::builder()
        .uri("/api/identity")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_authenticated"], false);

    let (_, body) = app.get("/api/identity", Some(ADMIN)).await;
    assert_eq!(body["is_authenticated"], true);
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn allowlist_role_overrides_token_claim() {
    let app = TestApp::new().await;
    let token = app.token(STAFF, Some(Role::Admin));
    let request = Request::builder()
        .uri("/api/identity")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (_, body) = app.send(request).await;
    assert_eq!(body["role"], "staff");
}

#[tokio::test]
async fn api_requires_approved_identity() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/products", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, body) = app.get("/api/products", Some("stranger@example.com")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    // email comparison is case-insensitive
    let (status, _) = app.get("/api/products", Some("  Owner@Shop.IN")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unapproved_tokens_pass_when_configured() {
    let app = TestApp::with_policy(true).await;
    let (status, _) = app.get("/api/products", Some("stranger@example.com")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/users", Some("stranger@example.com")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invoice_lifecycle_over_http() {
    let app = TestApp::new().await;
    let product_id = app.create_product("Split AC 1.5T", 100_000, 1800, 10).await;

    // preview stores nothing
    let draft = json!({
        "customer": { "kind": "walk_in" },
        "items": [{ "product_id": product_id, "quantity": 1 }],
        "payment_mode": "credit"
    });
    let (status, preview) = app
        .call(Method::POST, "/api/invoices/preview", STAFF, draft.clone())
        .await;
    assert_eq!(status, StatusCode::OK, "{preview}");
    assert_eq!(preview["totals"]["grand_total"], 118_000);

    let (status, invoice) = app.call(Method::POST, "/api/invoices", STAFF, draft).await;
    assert_eq!(status, StatusCode::CREATED, "{invoice}");
    assert_eq!(invoice["invoice_number"], "INV-00001");
    assert_eq!(invoice["total_cgst"], 9_000);
    assert_eq!(invoice["total_sgst"], 9_000);
    assert_eq!(invoice["total_igst"], 0);
    assert_eq!(invoice["grand_total"], 118_000);
    assert_eq!(invoice["paid_amount"], 0);
    assert_eq!(invoice["due_amount"], 118_000);
    assert_eq!(invoice["status"], "unpaid");
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    let payments_uri = format!("/api/invoices/{invoice_id}/payments");
    let (status, body) = app
        .call(
            Method::POST,
            &payments_uri,
            STAFF,
            json!({ "amount": 50_000, "payment_mode": "upi" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["invoice"]["status"], "partial");
    assert_eq!(body["invoice"]["due_amount"], 68_000);

    let (_, body) = app
        .call(
            Method::POST,
            &payments_uri,
            STAFF,
            json!({ "amount": 68_000, "payment_mode": "cash" }),
        )
        .await;
    assert_eq!(body["invoice"]["status"], "paid");
    assert_eq!(body["invoice"]["due_amount"], 0);

    let (status, detail) = app.get(&format!("/api/invoices/{invoice_id}"), Some(STAFF)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["invoice_number"], "INV-00001");
    assert_eq!(detail["payments"].as_array().unwrap().len(), 2);

    let (_, payments) = app.get(&payments_uri, Some(STAFF)).await;
    assert_eq!(payments.as_array().unwrap().len(), 2);

    let (_, product) = app.get(&format!("/api/products/{product_id}"), Some(STAFF)).await;
    assert_eq!(product["stock"].as_f64(), Some(9.0));

    let (_, recent) = app.get("/api/invoices", Some(STAFF)).await;
    assert_eq!(recent.as_array().unwrap().len(), 1);

    let (_, settings) = app.get("/api/settings", Some(STAFF)).await;
    assert_eq!(settings["next_invoice_number"], 2);
}

#[tokio::test]
async fn invoice_errors_map_to_codes() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(Method::POST, "/api/invoices", STAFF, json!({ "items": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .call(Method::POST, "/api/invoices", STAFF, json!({ "items": "nope" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/invoices",
            STAFF,
            json!({ "items": [{ "product_id": "missing", "quantity": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = app.get("/api/invoices/does-not-exist", Some(STAFF)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/invoices/does-not-exist/payments",
            STAFF,
            json!({ "amount": 100, "payment_mode": "cash" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/invoices?from=2024-01-01", Some(STAFF)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/invoices?from=2024-02-01&to=2024-01-01", Some(STAFF)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn settings_update_is_admin_only() {
    let app = TestApp::new().await;
    let update = json!({
        "shop_name": "Sharma General Store",
        "state_code": "27",
        "state_name": "Maharashtra",
        "invoice_prefix": "SGS",
        "gstin": "27AAPFU0939F1ZV"
    });

    let (status, body) = app.call(Method::PUT, "/api/settings", STAFF, update.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, body) = app.call(Method::PUT, "/api/settings", ADMIN, update).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["shop_name"], "Sharma General Store");
    assert_eq!(body["invoice_prefix"], "SGS");
    assert_eq!(body["next_invoice_number"], 1);
}

#[tokio::test]
async fn settings_cannot_rewind_invoice_numbers() {
    let app = TestApp::new().await;
    let product_id = app.create_product("Pressure Cooker 5L", 240_000, 1200, 5).await;
    let draft = json!({
        "customer": { "kind": "walk_in" },
        "items": [{ "product_id": product_id, "quantity": 1 }],
        "payment_mode": "cash"
    });
    let (status, _) = app.call(Method::POST, "/api/invoices", STAFF, draft.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let mut update = json!({
        "shop_name": "Sharma General Store",
        "state_code": "27",
        "state_name": "Maharashtra",
        "invoice_prefix": "INV",
        "next_invoice_number": 1
    });
    let (status, body) = app.call(Method::PUT, "/api/settings", ADMIN, update.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["code"], "VALIDATION_ERROR");

    update["next_invoice_number"] = json!(50);
    let (status, body) = app.call(Method::PUT, "/api/settings", ADMIN, update).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["next_invoice_number"], 50);

    let (_, invoice) = app.call(Method::POST, "/api/invoices", STAFF, draft).await;
    assert_eq!(invoice["invoice_number"], "INV-00050");
}

#[tokio::test]
async fn catalog_crud_and_low_stock() {
    let app = TestApp::new().await;
    let fan = app.create_product("Ceiling Fan", 225_000, 1800, 1).await;
    app.create_product("LED Bulb 9W", 9_900, 1200, 100).await;

    let (status, low) = app.get("/api/products/low-stock", Some(STAFF)).await;
    assert_eq!(status, StatusCode::OK);
    let low = low.as_array().unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["id"], fan.as_str());

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/products/{fan}"),
            ADMIN,
            json!({ "name": "Ceiling Fan 1200mm", "selling_price": 240_000, "gst_rate": 1800, "stock": 8 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Ceiling Fan 1200mm");

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/products/{fan}"), ADMIN, Value::Null)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/api/products/{fan}"), Some(STAFF)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, customer) = app
        .call(
            Method::POST,
            "/api/customers",
            STAFF,
            json!({ "name": "Deccan Traders", "gstin": "29AABCD1234E1Z5" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{customer}");
    let customer_id = customer["id"].as_str().unwrap().to_string();

    let (_, customers) = app.get("/api/customers", Some(STAFF)).await;
    assert_eq!(customers.as_array().unwrap().len(), 1);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/customers/{customer_id}"), STAFF, Value::Null)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn inter_state_customer_gets_igst() {
    let app = TestApp::new().await;
    let product_id = app.create_product("Split AC 1.5T", 100_000, 1800, 5).await;
    let (_, customer) = app
        .call(
            Method::POST,
            "/api/customers",
            STAFF,
            json!({ "name": "Deccan Traders", "gstin": "29AABCD1234E1Z5" }),
        )
        .await;

    let (status, invoice) = app
        .call(
            Method::POST,
            "/api/invoices",
            STAFF,
            json!({
                "customer": { "kind": "existing", "customer_id": customer["id"] },
                "items": [{ "product_id": product_id, "quantity": 1 }],
                "payment_mode": "cash"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{invoice}");
    assert_eq!(invoice["total_cgst"], 0);
    assert_eq!(invoice["total_sgst"], 0);
    assert_eq!(invoice["total_igst"], 18_000);
    assert_eq!(invoice["status"], "paid");
}

#[tokio::test]
async fn reports_over_http() {
    let app = TestApp::new().await;
    let product_id = app.create_product("Toothpaste 200g", 11_500, 1800, 50).await;
    app.call(
        Method::POST,
        "/api/invoices",
        STAFF,
        json!({ "items": [{ "product_id": product_id, "quantity": 2 }], "payment_mode": "cash" }),
    )
    .await;

    let (status, dashboard) = app.get("/api/reports/dashboard", Some(STAFF)).await;
    assert_eq!(status, StatusCode::OK, "{dashboard}");

    let (status, report) = app.get("/api/reports/sales", Some(STAFF)).await;
    assert_eq!(status, StatusCode::OK, "{report}");

    let (status, _) = app.get("/api/reports/sales?from=01-01-2024", Some(STAFF)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pos_feed_is_public_with_its_own_envelope() {
    let app = TestApp::new().await;
    let product_id = app.create_product("Cement 50kg", 42_000, 2800, 30).await;
    let (_, invoice) = app
        .call(
            Method::POST,
            "/api/invoices",
            STAFF,
            json!({ "items": [{ "product_id": product_id, "quantity": 1 }], "payment_mode": "card" }),
        )
        .await;
    let date = invoice["invoice_date"].as_str().unwrap().to_string();

    let (status, body) = app.get("/pos/transactions", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing required parameters: from_date and to_date");

    let (status, body) = app
        .get("/pos/transactions?from_date=2024/01/01&to_date=2024-01-31", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid date format. Use YYYY-MM-DD");

    let (status, body) = app
        .get(&format!("/pos/transactions?from_date={date}&to_date={date}"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["summary"]["total_transactions"], 1);
    assert_eq!(body["summary"]["total_sales"], 1);
    let txn = &body["transactions"][0];
    assert_eq!(txn["RCPT_NUM"], "INV-00001");
    assert_eq!(txn["PAYMENT_MODE"], "CC");
    assert_eq!(txn["TRAN_STATUS"], "SALES");
    assert_eq!(txn["CUSTOMER_NAME"], "Walk-in");
    assert_eq!(txn["RCPT_TM"].as_str().unwrap().len(), 6);
    assert_eq!(txn["items"][0]["ITEM_NO"], 1);
    assert_eq!(txn["payments"][0]["PAYMENT_NAME"], "CC");
    assert_eq!(txn["CUSTOMER_PHONE"], "");
}

#[tokio::test]
async fn allowlist_management() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/api/users", Some(STAFF)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = app.get("/api/users", Some(ADMIN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);

    let (status, body) = app
        .call(Method::POST, "/api/users", ADMIN, json!({ "email": " New.Hire@Shop.in " }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["email"], "new.hire@shop.in");
    assert_eq!(body["role"], "staff");

    let (status, body) = app
        .call(Method::POST, "/api/users", ADMIN, json!({ "email": "new.hire@shop.in" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = app
        .get("/api/users/check?email=NEW.HIRE@shop.in", Some(STAFF))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approved"], true);
    assert_eq!(body["role"], "staff");

    let (status, _) = app
        .call(Method::DELETE, "/api/users/new.hire@shop.in", STAFF, Value::Null)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::DELETE, "/api/users/new.hire@shop.in", ADMIN, Value::Null)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .call(Method::DELETE, "/api/users/new.hire@shop.in", ADMIN, Value::Null)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/users/check?email=new.hire@shop.in", Some(STAFF)).await;
    assert_eq!(body["approved"], false);
}
