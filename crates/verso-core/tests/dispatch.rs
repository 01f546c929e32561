//! End-to-end dispatch tests over the in-process test client.

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use verso_core::testing::TestClient;
use verso_core::{
    ApiError, BoxFuture, ErrorKind, ErrorPolicy, FieldKind, Json, Method, Middleware, Next,
    ObjectValidator, Request, Response, Router, ValidatedInput, VersionExtractor, VersionHistory,
};

async fn user_v1(_req: Request, input: ValidatedInput) -> Result<Json<Value>, ApiError> {
    let id: i64 = input.param("userId")?;
    Ok(Json(json!({ "id": id, "email": format!("user{id}@example.com") })))
}

async fn user_v2(_req: Request, input: ValidatedInput) -> Result<Json<Value>, ApiError> {
    let id: i64 = input.param("userId")?;
    Ok(Json(json!({
        "id": id,
        "email": format!("user{id}@example.com"),
        "tags": ["active"],
    })))
}

fn dated_router() -> Router {
    let history = VersionHistory::dated(["2024-01-01", "2024-02-01", "2024-03-01"]).unwrap();
    let router = Router::new(history, VersionExtractor::date_header("x-api-version"));

    router
        .get("/users/:userId")
        .version("2024-01-01")
        .validator(ObjectValidator::new().param("userId", FieldKind::Integer))
        .summary("Fetch a user")
        .handle(user_v1)
        .unwrap();
    router
        .get("/users/:userId")
        .version("2024-02-01")
        .validator(ObjectValidator::new().param("userId", FieldKind::Integer))
        .summary("Fetch a user with tags")
        .handle(user_v2)
        .unwrap();
    router
}

fn dated_client() -> TestClient {
    TestClient::new(dated_router().finish())
}

#[tokio::test]
async fn missing_version_defaults_to_newest_release() {
    let client = dated_client();
    let response = client.get("/users/7").send().await;

    assert_eq!(response.status(), 200);
    // Newest release is 2024-03-01; the route's newest revision below it is
    // 2024-02-01.
    assert_eq!(response.header("api-version"), Some("2024-02-01"));
    let body: Value = response.json();
    assert_eq!(body["id"], json!(7));
    assert_eq!(body["tags"], json!(["active"]));
}

#[tokio::test]
async fn newer_version_clamps_to_newest_revision() {
    let client = dated_client();
    let response = client
        .get("/users/7")
        .header("x-api-version", "2024-03-01")
        .send()
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.header("api-version"), Some("2024-02-01"));
}

#[tokio::test]
async fn exact_version_selects_its_revision() {
    let client = dated_client();
    let response = client
        .get("/users/7")
        .header("x-api-version", "2024-01-01")
        .send()
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.header("api-version"), Some("2024-01-01"));
    let body: Value = response.json();
    assert!(body.get("tags").is_none());
}

#[tokio::test]
async fn date_between_releases_snaps_to_nearest_lower() {
    let client = dated_client();
    let response = client
        .get("/users/7")
        .header("x-api-version", "2024-01-15")
        .send()
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.header("api-version"), Some("2024-01-01"));
}

#[tokio::test]
async fn date_before_every_release_is_rejected() {
    let client = dated_client();
    let response = client
        .get("/users/7")
        .header("x-api-version", "2023-06-01")
        .send()
        .await;

    assert_eq!(response.status(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"]["type"], json!("version_not_resolved"));
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("2023-06-01"));
}

#[tokio::test]
async fn validation_failure_carries_field_issues() {
    let client = dated_client();
    let response = client.get("/users/abc").send().await;

    assert_eq!(response.status(), 422);
    let body: Value = response.json();
    assert_eq!(body["error"]["type"], json!("validation_failed"));
    assert_eq!(body["error"]["issues"][0]["path"], json!("params.userId"));
}

#[tokio::test]
async fn unknown_path_is_route_not_found() {
    let client = dated_client();
    let response = client.get("/nope").send().await;

    assert_eq!(response.status(), 404);
    let body: Value = response.json();
    assert_eq!(body["error"]["type"], json!("route_not_found"));
}

#[tokio::test]
async fn unknown_method_lists_allowed_methods() {
    let client = dated_client();
    let response = client.patch("/users/7").send().await;

    assert_eq!(response.status(), 405);
    assert_eq!(response.header("allow"), Some("GET"));
    let body: Value = response.json();
    assert_eq!(body["error"]["type"], json!("method_not_allowed"));
}

#[tokio::test]
async fn one_transport_entry_serves_every_revision() {
    let app = dated_router().finish();
    assert_eq!(app.transport_registrations().len(), 1);
    assert_eq!(
        app.transport_registrations()[0],
        (Method::Get, "/users/:userId".to_string())
    );

    // Both revisions dispatch through that single entry.
    let client = TestClient::new(app);
    for (header, resolved) in [("2024-01-01", "2024-01-01"), ("2024-03-01", "2024-02-01")] {
        let response = client
            .get("/users/1")
            .header("x-api-version", header)
            .send()
            .await;
        assert_eq!(response.header("api-version"), Some(resolved));
    }
}

#[tokio::test]
async fn static_segment_wins_over_placeholder() {
    let router = Router::unversioned();
    router
        .get("/users/me")
        .handle(|_req: Request, _input: ValidatedInput| async move {
            Ok::<_, ApiError>(Json(json!({ "me": true })))
        })
        .unwrap();
    router
        .get("/users/:userId")
        .validator(ObjectValidator::new().param("userId", FieldKind::Integer))
        .handle(|_req: Request, input: ValidatedInput| async move {
            let id: i64 = input.param("userId")?;
            Ok::<_, ApiError>(Json(json!({ "id": id })))
        })
        .unwrap();

    let client = TestClient::new(router.finish());

    let response = client.get("/users/me").send().await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>()["me"], json!(true));
    // No version context on an unversioned bag.
    assert_eq!(response.header("api-version"), None);

    let response = client.get("/users/1").send().await;
    assert_eq!(response.status(), 200);
    // The placeholder route matched and coerced the id to an integer.
    assert_eq!(response.json::<Value>()["id"], json!(1));
}

struct Tag {
    name: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Middleware for Tag {
    fn call(&self, req: Request, next: Next) -> BoxFuture<Response> {
        let name = self.name;
        let log = self.log.clone();
        Box::pin(async move {
            log.lock().unwrap().push(name);
            next(req).await
        })
    }
}

#[tokio::test]
async fn middleware_runs_in_registration_order_before_handler() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let handler_log = log.clone();

    let router = Router::unversioned()
        .middleware(Tag {
            name: "A",
            log: log.clone(),
        })
        .middleware(Tag {
            name: "B",
            log: log.clone(),
        })
        .middleware(Tag {
            name: "C",
            log: log.clone(),
        });
    router
        .get("/ordered")
        .handle(move |_req: Request, _input: ValidatedInput| {
            let log = handler_log.clone();
            async move {
                log.lock().unwrap().push("handler");
                Ok::<_, ApiError>(http::StatusCode::OK)
            }
        })
        .unwrap();

    let client = TestClient::new(router.finish());
    let response = client.get("/ordered").send().await;
    assert_eq!(response.status(), 200);
    assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C", "handler"]);
}

#[tokio::test]
async fn branch_middleware_is_invisible_to_siblings() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let router = Router::unversioned();
    let guarded = router.branch("/admin").middleware(Tag {
        name: "admin-gate",
        log: log.clone(),
    });
    guarded
        .get("/panel")
        .handle(|_req: Request, _input: ValidatedInput| async move {
            Ok::<_, ApiError>(http::StatusCode::OK)
        })
        .unwrap();
    router
        .get("/public")
        .handle(|_req: Request, _input: ValidatedInput| async move {
            Ok::<_, ApiError>(http::StatusCode::OK)
        })
        .unwrap();

    let client = TestClient::new(router.finish());

    client.get("/public").send().await;
    assert!(log.lock().unwrap().is_empty());

    client.get("/admin/panel").send().await;
    assert_eq!(*log.lock().unwrap(), vec!["admin-gate"]);
}

#[tokio::test]
async fn handler_errors_map_through_the_policy() {
    let router = Router::unversioned()
        .error_policy(ErrorPolicy::new().map(ErrorKind::Handler, http::StatusCode::BAD_REQUEST));
    router
        .get("/broken")
        .handle(|_req: Request, _input: ValidatedInput| async move {
            Err::<(), ApiError>(ApiError::handler("exploded"))
        })
        .unwrap();

    let client = TestClient::new(router.finish());
    let response = client.get("/broken").send().await;

    assert_eq!(response.status(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"]["type"], json!("handler_error"));
    assert_eq!(body["error"]["message"], json!("exploded"));
}

#[tokio::test]
async fn post_body_is_validated() {
    let router = Router::unversioned();
    router
        .post("/users")
        .validator(ObjectValidator::new().body_field("email", FieldKind::String))
        .handle(|_req: Request, input: ValidatedInput| async move {
            let email: String = input.body_as::<Value>()?["email"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            Ok::<_, ApiError>(verso_core::Created(json!({ "email": email })))
        })
        .unwrap();

    let client = TestClient::new(router.finish());

    let response = client.post("/users").send().await;
    assert_eq!(response.status(), 422);
    let body: Value = response.json();
    assert_eq!(body["error"]["issues"][0]["path"], json!("body"));

    let response = client
        .post("/users")
        .json(&json!({ "email": "a@b.c" }))
        .send()
        .await;
    assert_eq!(response.status(), 201);
    assert_eq!(response.json::<Value>()["email"], json!("a@b.c"));
}

#[tokio::test]
async fn malformed_json_body_is_a_validation_failure() {
    let router = Router::unversioned();
    router
        .post("/echo")
        .handle(|_req: Request, input: ValidatedInput| async move {
            Ok::<_, ApiError>(Json(input.body().clone()))
        })
        .unwrap();

    let client = TestClient::new(router.finish());
    let response = client
        .post("/echo")
        .header("content-type", "application/json")
        .send()
        .await;
    // Empty body is fine (no body at all).
    assert_eq!(response.status(), 200);

    let router = Router::unversioned();
    router
        .post("/echo2")
        .handle(|_req: Request, input: ValidatedInput| async move {
            Ok::<_, ApiError>(Json(input.body().clone()))
        })
        .unwrap();
    let client = TestClient::new(router.finish());
    let mut bad = client.post("/echo2").header("content-type", "application/json");
    bad = bad.body_bytes(b"{not json");
    let response = bad.send().await;
    assert_eq!(response.status(), 422);
    assert_eq!(
        response.json::<Value>()["error"]["issues"][0]["path"],
        json!("body")
    );
}

#[tokio::test]
async fn get_requests_never_see_a_body() {
    let router = Router::unversioned();
    router
        .get("/peek")
        .handle(|_req: Request, input: ValidatedInput| async move {
            Ok::<_, ApiError>(Json(json!({ "body_is_null": input.body().is_null() })))
        })
        .unwrap();

    let client = TestClient::new(router.finish());
    let response = client
        .get("/peek")
        .json(&json!({ "smuggled": true }))
        .send()
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>()["body_is_null"], json!(true));
}

#[tokio::test]
async fn version_query_extractor_works_end_to_end() {
    let history = VersionHistory::semver(["v1", "v2"]).unwrap();
    let router = Router::new(history, VersionExtractor::query("api-version"));
    router
        .get("/things")
        .version("v1")
        .handle(|_req: Request, _input: ValidatedInput| async move {
            Ok::<_, ApiError>(Json(json!({ "rev": 1 })))
        })
        .unwrap();
    router
        .get("/things")
        .version("v2")
        .handle(|_req: Request, _input: ValidatedInput| async move {
            Ok::<_, ApiError>(Json(json!({ "rev": 2 })))
        })
        .unwrap();

    let client = TestClient::new(router.finish());

    let response = client.get("/things?api-version=v1").send().await;
    assert_eq!(response.json::<Value>()["rev"], json!(1));
    assert_eq!(response.header("api-version"), Some("v1"));

    let response = client.get("/things").send().await;
    assert_eq!(response.json::<Value>()["rev"], json!(2));
}
