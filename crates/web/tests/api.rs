//! HTTP-level tests for the REST API, driven through the router with
//! `tower::ServiceExt::oneshot` against an in-memory database.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use elog_core::db::Database;
use elog_core::directory::static_file::{GroupEntry, PersonEntry, StaticDirectoryData};
use elog_core::directory::{Directory, StaticDirectory};
use elog_core::token::{IdentityClaims, TokenIssuer};
use elog_web::{router, AppState};

struct Harness {
    app: Router,
    tokens: TokenIssuer,
}

impl Harness {
    fn new() -> Self {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();

        let tokens = TokenIssuer::new(b"test-key", 3600);
        let state = Arc::new(AppState {
            db,
            tokens: tokens.clone(),
            directory: test_directory(),
        });
        Self {
            app: router(state),
            tokens,
        }
    }

    fn token_for(&self, email: &str) -> String {
        self.tokens.issue(&IdentityClaims::email(email)).unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn get(&self, uri: &str, email: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(email) = email {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token_for(email)));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_import(&self, body: Value, email: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/import")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token_for(email)))
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }
}

fn test_directory() -> Directory {
    let mut people = BTreeMap::new();
    people.insert(
        "jdoe".to_string(),
        PersonEntry {
            common_name: "Jane Doe".into(),
            mail: Some("jane@example.com".into()),
            given_name: Some("Jane".into()),
            surname: Some("Doe".into()),
        },
    );
    people.insert(
        "jsmith".to_string(),
        PersonEntry {
            common_name: "John Smith".into(),
            mail: Some("john@example.com".into()),
            given_name: Some("John".into()),
            surname: Some("Smith".into()),
        },
    );
    let mut groups = BTreeMap::new();
    groups.insert(
        "operators".to_string(),
        GroupEntry {
            members: vec!["jdoe".into()],
        },
    );
    Directory::from_backend(StaticDirectory::from_data(StaticDirectoryData { people, groups }))
}

fn sample_import(origin_id: &str, readers: &[&str]) -> Value {
    json!({
        "readerUserIds": readers,
        "entry": {
            "logbooks": ["operations"],
            "title": "Beam lost",
            "text": "Beam dumped at 03:12.",
            "userName": "fname",
            "firstName": "firstName",
            "lastName": "lastName",
            "originId": origin_id
        }
    })
}

#[tokio::test]
async fn health_does_not_require_a_token() {
    let h = Harness::new();
    let (status, body) = h.get("/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let h = Harness::new();
    let (status, body) = h.get("/api/v1/entries", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/entries")
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = h.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn import_returns_created_view_with_author() {
    let h = Harness::new();
    let (status, body) = h
        .post_import(sample_import("legacy-1", &["a@example.com"]), "importer@example.com")
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["author"], "firstName lastName");
    assert_eq!(body["userName"], "fname");
    assert_eq!(body["logbooks"], json!(["operations"]));
    assert!(body["id"].is_string());
}

#[tokio::test]
async fn import_without_entry_is_bad_request() {
    let h = Harness::new();
    let (status, body) = h
        .post_import(json!({ "readerUserIds": null, "entry": null }), "importer@example.com")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_import_bodies_are_bad_requests() {
    let h = Harness::new();
    let bodies = [
        json!({ "entry": "oops" }),
        json!({ "entry": { "logbooks": ["operations"], "title": 5, "userName": "fname" } }),
        json!({ "readerUserIds": "a", "entry": null }),
    ];
    for body in bodies {
        let (status, response) = h.post_import(body.clone(), "importer@example.com").await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
        assert!(response["error"].is_string(), "body {}", body);
    }

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/import")
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", h.token_for("importer@example.com")),
        )
        .body(Body::from("{not json"))
        .unwrap();
    let (status, response) = h.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].is_string());
}

#[tokio::test]
async fn import_with_blank_title_is_bad_request() {
    let h = Harness::new();
    let mut body = sample_import("legacy-2", &[]);
    body["entry"]["title"] = json!("   ");
    let (status, _) = h.post_import(body, "importer@example.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_origin_id_conflicts() {
    let h = Harness::new();
    let (first, _) = h.post_import(sample_import("legacy-3", &[]), "importer@example.com").await;
    assert_eq!(first, StatusCode::CREATED);

    let (second, body) = h.post_import(sample_import("legacy-3", &[]), "importer@example.com").await;
    assert_eq!(second, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("legacy-3"));
}

#[tokio::test]
async fn only_granted_readers_can_fetch_an_entry() {
    let h = Harness::new();
    let (_, created) = h
        .post_import(sample_import("legacy-4", &["reader@example.com"]), "importer@example.com")
        .await;
    let id = created["id"].as_str().unwrap();
    let uri = format!("/api/v1/entries/{}", id);

    let (status, body) = h.get(&uri, Some("reader@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["author"], "firstName lastName");

    let (status, _) = h.get(&uri, Some("stranger@example.com")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = h.get("/api/v1/entries/does-not-exist", Some("reader@example.com")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_returns_only_readable_entries() {
    let h = Harness::new();
    h.post_import(sample_import("legacy-5", &["reader@example.com"]), "importer@example.com")
        .await;

    let (status, body) = h.get("/api/v1/entries", Some("reader@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body) = h.get("/api/v1/entries", Some("stranger@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (status, _) = h
        .get("/api/v1/entries?logbook=operations", Some("stranger@example.com"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = h
        .get("/api/v1/entries?logbook=operations", Some("reader@example.com"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"][0]["title"], "Beam lost");
}

#[tokio::test]
async fn people_lookup_by_prefix_and_email() {
    let h = Harness::new();

    let (status, body) = h.get("/api/v1/people?search=j", Some("a@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["commonName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Jane Doe", "John Smith"]);

    let (status, body) = h
        .get("/api/v1/people/by-email/john@example.com", Some("a@example.com"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["uid"], "jsmith");

    let (status, _) = h
        .get("/api/v1/people/by-email/nobody@example.com", Some("a@example.com"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = h.get("/api/v1/people?search=", Some("a@example.com")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn group_lookup_by_prefix() {
    let h = Harness::new();
    let (status, body) = h.get("/api/v1/groups?search=oper", Some("a@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["commonName"], "operators");
    assert_eq!(body[0]["members"], json!(["jdoe"]));
}
