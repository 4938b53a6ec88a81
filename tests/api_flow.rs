//! End-to-end HTTP flow against an in-process server backed by the in-memory store:
//! registration and login, the route access matrix, admin catalogue management,
//! order ownership and the most-popular-tag aggregation.

use chrono::{Duration, Utc};
use giftcert_marketplace::domain::auth::TokenKind;
use giftcert_marketplace::domain::model::Role;
use giftcert_marketplace::transport::http::{create_router, AppState};
use giftcert_marketplace::{JwtHandler, MarketplaceStore, MemoryStore, PasswordHasher, Services};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::error::Error;
use std::sync::Arc;

type TestResult<T = ()> = Result<T, Box<dyn Error>>;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-pass";

struct TestApp {
    base_url: String,
    client: reqwest::Client,
    state: AppState,
}

impl TestApp {
    async fn spawn() -> TestResult<Self> {
        let store: Arc<dyn MarketplaceStore> = Arc::new(MemoryStore::new());
        let jwt = JwtHandler::new(
            b"integration-secret",
            Duration::minutes(100),
            Duration::minutes(1440),
        );
        let services = Services::new(store.clone(), jwt, PasswordHasher::new(4));
        services.users.ensure_admin(ADMIN_EMAIL, ADMIN_PASSWORD).await?;
        let state = AppState { store, services };

        let router = create_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: format!("http://{}", addr),
            client,
            state,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, email: &str, password: &str) -> TestResult<i64> {
        let response = self
            .client
            .post(self.url("/users/register"))
            .json(&json!({
                "name": "Test",
                "surname": "User",
                "email": email,
                "password": password
            }))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await?;
        Ok(body["id"].as_i64().ok_or("missing user id")?)
    }

    async fn login(&self, email: &str, password: &str) -> TestResult<Value> {
        let response = self
            .client
            .post(self.url("/users/auth"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(response.json().await?)
    }

    async fn access_token(&self, email: &str, password: &str) -> TestResult<String> {
        let body = self.login(email, password).await?;
        Ok(body["access_token"]
            .as_str()
            .ok_or("missing access token")?
            .to_string())
    }

    async fn admin_token(&self) -> TestResult<String> {
        self.access_token(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    async fn create_certificate(&self, token: &str, body: Value) -> TestResult<Value> {
        let response = self
            .client
            .post(self.url("/certificates"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        Ok(response.json().await?)
    }

    async fn place_order(&self, token: &str, user_id: i64, certificate_id: i64) -> TestResult<Value> {
        let response = self
            .client
            .post(self.url("/orders"))
            .bearer_auth(token)
            .json(&json!({ "user_id": user_id, "certificate_id": certificate_id }))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        Ok(response.json().await?)
    }
}

fn names(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn health_and_unknown_routes() -> TestResult {
    let app = TestApp::spawn().await?;

    let health = app.client.get(app.url("/health")).send().await?;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.json::<Value>().await?["status"], "ok");

    let missing = app.client.get(app.url("/nope")).send().await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn register_login_and_refresh() -> TestResult {
    let app = TestApp::spawn().await?;
    let user_id = app.register("Jane@Example.com", "password1").await?;

    let login = app.login("jane@example.com", "password1").await?;
    assert_eq!(login["email"], "jane@example.com");
    let access = login["access_token"].as_str().ok_or("no access token")?;
    let refresh = login["refresh_token"].as_str().ok_or("no refresh token")?;

    let me = app
        .client
        .get(app.url(&format!("/users/{}", user_id)))
        .bearer_auth(access)
        .send()
        .await?;
    assert_eq!(me.status(), StatusCode::OK);
    let me: Value = me.json().await?;
    assert_eq!(me["role"], "USER");
    assert!(me.get("password").is_none());
    assert!(me.get("password_hash").is_none());

    let refreshed = app
        .client
        .get(app.url("/users/token/refresh"))
        .bearer_auth(refresh)
        .send()
        .await?;
    assert_eq!(refreshed.status(), StatusCode::OK);
    let refreshed: Value = refreshed.json().await?;
    assert_eq!(refreshed["refresh_token"], refresh);
    let new_access = refreshed["access_token"].as_str().ok_or("no access token")?;

    let tags = app
        .client
        .get(app.url("/tags"))
        .bearer_auth(new_access)
        .send()
        .await?;
    assert_eq!(tags.status(), StatusCode::OK);

    let duplicate = app
        .client
        .post(app.url("/users/register"))
        .json(&json!({
            "name": "Jane",
            "surname": "Again",
            "email": "jane@example.com",
            "password": "password1"
        }))
        .send()
        .await?;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let bad_password = app
        .client
        .post(app.url("/users/auth"))
        .json(&json!({ "email": "jane@example.com", "password": "wrong" }))
        .send()
        .await?;
    assert_eq!(bad_password.status(), StatusCode::UNAUTHORIZED);
    let body: Value = bad_password.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Bad credentials");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn access_matrix_is_enforced() -> TestResult {
    let app = TestApp::spawn().await?;
    app.register("jane@example.com", "password1").await?;
    let login = app.login("jane@example.com", "password1").await?;
    let user_token = login["access_token"].as_str().ok_or("no access token")?;
    let refresh_token = login["refresh_token"].as_str().ok_or("no refresh token")?;

    // Public catalogue needs no token.
    let catalogue = app.client.get(app.url("/certificates")).send().await?;
    assert_eq!(catalogue.status(), StatusCode::OK);

    // Protected routes need one.
    let anonymous = app.client.get(app.url("/tags")).send().await?;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.json::<Value>().await?["error"], "You must be logged in");

    // Admin-only routes reject plain users.
    let forbidden = app
        .client
        .post(app.url("/tags"))
        .bearer_auth(user_token)
        .json(&json!({ "name": "spa" }))
        .send()
        .await?;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        forbidden.json::<Value>().await?["error"],
        "You don't have permission to do that"
    );

    // Garbage and wrong-kind tokens are invalid.
    let garbage = app
        .client
        .get(app.url("/tags"))
        .bearer_auth("not.a.token")
        .send()
        .await?;
    assert_eq!(garbage.status(), StatusCode::FORBIDDEN);

    let refresh_as_access = app
        .client
        .get(app.url("/tags"))
        .bearer_auth(refresh_token)
        .send()
        .await?;
    assert_eq!(refresh_as_access.status(), StatusCode::FORBIDDEN);

    let access_as_refresh = app
        .client
        .get(app.url("/users/token/refresh"))
        .bearer_auth(user_token)
        .send()
        .await?;
    assert_eq!(access_as_refresh.status(), StatusCode::UNAUTHORIZED);

    let garbage_refresh = app
        .client
        .get(app.url("/users/token/refresh"))
        .bearer_auth("not.a.token")
        .send()
        .await?;
    assert_eq!(garbage_refresh.status(), StatusCode::UNAUTHORIZED);

    // Expired tokens get a bearer challenge.
    let stale = app.state.services.auth.jwt().issue_at(
        "jane@example.com",
        vec![Role::User.authority()],
        TokenKind::Access,
        Utc::now() - Duration::minutes(500),
    )?;
    let expired = app
        .client
        .get(app.url("/tags"))
        .bearer_auth(&stale)
        .send()
        .await?;
    assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
    let challenge = expired
        .headers()
        .get("www-authenticate")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(challenge.contains("error=\"invalid_token\""));
    assert!(challenge.contains("The access token expired"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn admin_manages_catalogue() -> TestResult {
    let app = TestApp::spawn().await?;
    let admin = app.admin_token().await?;

    // Tags
    let created = app
        .client
        .post(app.url("/tags"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "spa" }))
        .send()
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let spa: Value = created.json().await?;

    let duplicate = app
        .client
        .post(app.url("/tags"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "spa" }))
        .send()
        .await?;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    // Certificates; "wellness" and "sport" are created on the fly.
    let spa_day = app
        .create_certificate(
            &admin,
            json!({
                "name": "Spa day",
                "description": "Relax at the spa",
                "price": 5000,
                "duration": 30,
                "tags": ["spa", "wellness"]
            }),
        )
        .await?;
    assert_eq!(spa_day["tags"].as_array().map(Vec::len), Some(2));
    app.create_certificate(
        &admin,
        json!({
            "name": "Anti-stress massage",
            "description": "Full body SPA massage",
            "price": 3000,
            "duration": 14,
            "tags": ["spa"]
        }),
    )
    .await?;
    app.create_certificate(
        &admin,
        json!({
            "name": "Diving",
            "description": "Scuba lesson",
            "price": 9000,
            "duration": 60,
            "tags": ["sport"]
        }),
    )
    .await?;

    let both_tags: Value = app
        .client
        .get(app.url("/certificates?tags=spa,wellness"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(names(&both_tags), vec!["Spa day"]);

    let by_text: Value = app
        .client
        .get(app.url("/certificates?search=spa&sort_by=name&order=desc"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(names(&by_text), vec!["Spa day", "Anti-stress massage"]);

    let paged: Value = app
        .client
        .get(app.url("/certificates?sort_by=name&page=2&size=2"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(paged["page"], 2);
    assert_eq!(paged["size"], 2);
    assert_eq!(names(&paged), vec!["Spa day"]);

    // Partial update leaves other fields alone.
    let id = spa_day["id"].as_i64().ok_or("missing id")?;
    let patched = app
        .client
        .patch(app.url(&format!("/certificates/{}", id)))
        .bearer_auth(&admin)
        .json(&json!({ "price": 5500 }))
        .send()
        .await?;
    assert_eq!(patched.status(), StatusCode::OK);
    let patched: Value = patched.json().await?;
    assert_eq!(patched["price"], 5500);
    assert_eq!(patched["name"], "Spa day");
    assert_eq!(patched["create_date"], spa_day["create_date"]);

    let invalid = app
        .client
        .patch(app.url(&format!("/certificates/{}", id)))
        .bearer_auth(&admin)
        .json(&json!({ "price": -1 }))
        .send()
        .await?;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let malformed = app
        .client
        .post(app.url("/certificates"))
        .bearer_auth(&admin)
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await?;
    assert_eq!(malformed.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Deleting a tag detaches it from certificates.
    let spa_id = spa["id"].as_i64().ok_or("missing tag id")?;
    let deleted = app
        .client
        .delete(app.url(&format!("/tags/{}", spa_id)))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    let after: Value = app
        .client
        .get(app.url(&format!("/certificates/{}", id)))
        .send()
        .await?
        .json()
        .await?;
    let tag_names: Vec<&str> = after["tags"]
        .as_array()
        .map(|tags| tags.iter().filter_map(|t| t["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(tag_names, vec!["wellness"]);

    let removed = app
        .client
        .delete(app.url(&format!("/certificates/{}", id)))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);
    let gone = app
        .client
        .get(app.url(&format!("/certificates/{}", id)))
        .send()
        .await?;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn orders_belong_to_their_user() -> TestResult {
    let app = TestApp::spawn().await?;
    let admin = app.admin_token().await?;
    let jane_id = app.register("jane@example.com", "password1").await?;
    let john_id = app.register("john@example.com", "password2").await?;
    let jane = app.access_token("jane@example.com", "password1").await?;
    let john = app.access_token("john@example.com", "password2").await?;

    let certificate = app
        .create_certificate(
            &admin,
            json!({
                "name": "Spa day",
                "description": "Relax",
                "price": 5000,
                "duration": 30,
                "tags": ["spa"]
            }),
        )
        .await?;
    let certificate_id = certificate["id"].as_i64().ok_or("missing id")?;

    let order = app.place_order(&jane, jane_id, certificate_id).await?;
    assert_eq!(order["cost"], 5000);
    assert_eq!(order["user"]["id"], jane_id);
    assert_eq!(order["certificate"]["id"], certificate_id);
    let order_id = order["id"].as_i64().ok_or("missing order id")?;

    // Ordering for someone else is refused.
    let on_behalf = app
        .client
        .post(app.url("/orders"))
        .bearer_auth(&john)
        .json(&json!({ "user_id": jane_id, "certificate_id": certificate_id }))
        .send()
        .await?;
    assert_eq!(on_behalf.status(), StatusCode::FORBIDDEN);

    let missing_certificate = app
        .client
        .post(app.url("/orders"))
        .bearer_auth(&jane)
        .json(&json!({ "user_id": jane_id, "certificate_id": 999 }))
        .send()
        .await?;
    assert_eq!(missing_certificate.status(), StatusCode::NOT_FOUND);

    // Reads: owner and admin only.
    for (token, expected) in [
        (&jane, StatusCode::OK),
        (&admin, StatusCode::OK),
        (&john, StatusCode::FORBIDDEN),
    ] {
        let response = app
            .client
            .get(app.url(&format!("/orders/{}", order_id)))
            .bearer_auth(token)
            .send()
            .await?;
        assert_eq!(response.status(), expected);
    }

    let johns_view = app
        .client
        .get(app.url(&format!("/orders/users/{}", jane_id)))
        .bearer_auth(&john)
        .send()
        .await?;
    assert_eq!(johns_view.status(), StatusCode::FORBIDDEN);

    let janes_orders: Value = app
        .client
        .get(app.url(&format!("/orders/users/{}", jane_id)))
        .bearer_auth(&jane)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(janes_orders["items"].as_array().map(Vec::len), Some(1));

    let johns_orders: Value = app
        .client
        .get(app.url(&format!("/orders/users/{}", john_id)))
        .bearer_auth(&admin)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(johns_orders["items"].as_array().map(Vec::len), Some(0));

    // Ordered certificates cannot be deleted.
    let conflict = app
        .client
        .delete(app.url(&format!("/certificates/{}", certificate_id)))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(conflict.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn most_popular_tag_of_top_customer() -> TestResult {
    let app = TestApp::spawn().await?;
    let admin = app.admin_token().await?;

    let none_yet = app
        .client
        .get(app.url("/tags/most-popular-tag"))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(none_yet.status(), StatusCode::NOT_FOUND);

    let cheap = app
        .create_certificate(
            &admin,
            json!({
                "name": "Cinema",
                "description": "Two tickets",
                "price": 1000,
                "duration": 30,
                "tags": ["fun", "evening"]
            }),
        )
        .await?;
    let pricey = app
        .create_certificate(
            &admin,
            json!({
                "name": "Flight",
                "description": "Balloon flight",
                "price": 20000,
                "duration": 90,
                "tags": ["adventure", "fun"]
            }),
        )
        .await?;
    let skydive = app
        .create_certificate(
            &admin,
            json!({
                "name": "Skydive",
                "description": "Tandem jump",
                "price": 15000,
                "duration": 90,
                "tags": ["adventure"]
            }),
        )
        .await?;

    let small_id = app.register("small@example.com", "password1").await?;
    let big_id = app.register("big@example.com", "password2").await?;
    let small = app.access_token("small@example.com", "password1").await?;
    let big = app.access_token("big@example.com", "password2").await?;

    let id = |v: &Value| v["id"].as_i64().unwrap_or_default();

    // small: 3 x cinema = 3000; big: flight + skydive = 35000.
    for _ in 0..3 {
        app.place_order(&small, small_id, id(&cheap)).await?;
    }
    app.place_order(&big, big_id, id(&pricey)).await?;
    app.place_order(&big, big_id, id(&skydive)).await?;

    let response = app
        .client
        .get(app.url("/tags/most-popular-tag"))
        .bearer_auth(&small)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let tag: Value = response.json().await?;
    assert_eq!(tag["name"], "adventure");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn invalid_pagination_is_rejected() -> TestResult {
    let app = TestApp::spawn().await?;
    let admin = app.admin_token().await?;

    for query in ["?page=0", "?size=0", "?size=101", "?page=abc"] {
        let response = app
            .client
            .get(app.url(&format!("/users{}", query)))
            .bearer_auth(&admin)
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "query {}", query);
        assert_eq!(response.json::<Value>().await?["success"], false);
    }

    // Offsets that would overflow are rejected, not wrapped.
    let overflowing = app
        .client
        .get(app.url(&format!("/certificates?page={}&size=5", i64::MAX)))
        .send()
        .await?;
    assert_eq!(overflowing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(overflowing.json::<Value>().await?["success"], false);

    let users: Value = app
        .client
        .get(app.url("/users"))
        .bearer_auth(&admin)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(users["page"], 1);
    assert_eq!(users["size"], 5);
    assert_eq!(users["items"][0]["email"], ADMIN_EMAIL);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_registrations_conflict() -> TestResult {
    let app = TestApp::spawn().await?;
    let body = json!({
        "name": "Race",
        "surname": "Condition",
        "email": "race@example.com",
        "password": "secret-pass"
    });

    let (first, second) = tokio::join!(
        app.client.post(app.url("/users/register")).json(&body).send(),
        app.client.post(app.url("/users/register")).json(&body).send(),
    );
    let mut statuses = vec![first?.status(), second?.status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);
    Ok(())
}
