//! HTTP API tests against a live server on an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use facility_registry::config::Config;
use facility_registry::repo::Repository;
use facility_registry::server::{self, AppState};
use facility_registry::{db, migrate};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

// ─── Helpers ────────────────────────────────────────────────────────

struct TestServer {
    _tmp: TempDir,
    base_url: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let tmp = TempDir::new().unwrap();
        let config = Config::for_database(tmp.path().join("registry.sqlite"));
        let pool = db::connect(&config).await.unwrap();
        migrate::apply(&pool).await.unwrap();
        let repo = Repository::new(pool, config.codes.clone());
        let state = AppState::new(Arc::new(config), repo);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(server::serve(listener, state));

        let server = Self {
            _tmp: tmp,
            base_url,
            client: reqwest::Client::new(),
        };
        server.wait_until_ready().await;
        server
    }

    async fn wait_until_ready(&self) {
        for _ in 0..50 {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("server did not become ready at {}", self.base_url);
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn create(&self, path: &str, body: Value) -> Value {
        let (status, created) = self.post(path, body).await;
        assert_eq!(status, 201, "create {} failed: {}", path, created);
        created
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_list_shape_and_pagination_links() {
    let server = TestServer::start().await;
    for name in ["Nairobi", "Mombasa", "Kisumu"] {
        server
            .create("/api/common/counties", json!({ "name": name }))
            .await;
    }

    let (status, body) = server.get("/api/common/counties?page_size=2").await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 3);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["results"][0]["name"], "Kisumu");
    assert!(body["previous"].is_null());
    let next = body["next"].as_str().unwrap();
    assert!(next.contains("page=2"), "next link: {}", next);
    assert!(next.contains("page_size=2"), "next link: {}", next);

    let (_, second) = server.get("/api/common/counties?page_size=2&page=2").await;
    assert_eq!(second["results"].as_array().unwrap().len(), 1);
    assert!(second["next"].is_null());
    assert!(second["previous"].as_str().unwrap().contains("page=1"));
}

#[tokio::test]
async fn test_is_active_filter() {
    let server = TestServer::start().await;
    server
        .create("/api/common/counties", json!({ "name": "Active", "active": true }))
        .await;
    server
        .create("/api/common/counties", json!({ "name": "Dormant", "active": false }))
        .await;

    let (_, body) = server.get("/api/common/counties?is_active=True").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["name"], "Active");

    let (_, body) = server.get("/api/common/counties?is_active=False").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["name"], "Dormant");
}

#[tokio::test]
async fn test_create_get_patch_delete() {
    let server = TestServer::start().await;
    let owner = server
        .create("/api/facilities/owners", json!({ "name": "Ministry of Health" }))
        .await;
    assert_eq!(owner["code"], "OWNER1");
    assert_eq!(owner["active"], true);
    let id = owner["id"].as_str().unwrap().to_string();
    let item = format!("/api/facilities/owners/{}", id);

    let (status, fetched) = server.get(&item).await;
    assert_eq!(status, 200);
    assert_eq!(fetched["name"], "Ministry of Health");

    let resp = server
        .client
        .patch(server.url(&item))
        .json(&json!({ "description": "Government owned" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let patched: Value = resp.json().await.unwrap();
    assert_eq!(patched["description"], "Government owned");
    assert_eq!(patched["name"], "Ministry of Health");
    assert_eq!(patched["code"], "OWNER1");

    let resp = server.client.delete(server.url(&item)).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let (status, body) = server.get(&item).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");

    let (_, deleted) = server.get("/api/facilities/owners?is_deleted=true").await;
    assert_eq!(deleted["count"], 1);
    assert_eq!(deleted["results"][0]["id"], id.as_str());
}

#[tokio::test]
async fn test_put_requires_complete_record() {
    let server = TestServer::start().await;
    let county = server
        .create("/api/common/counties", json!({ "name": "Nakuru" }))
        .await;
    let item = format!("/api/common/counties/{}", county["id"].as_str().unwrap());

    let resp = server
        .client
        .put(server.url(&item))
        .json(&json!({ "code": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = server
        .client
        .put(server.url(&item))
        .json(&json!({ "name": "Nakuru County", "code": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let replaced: Value = resp.json().await.unwrap();
    assert_eq!(replaced["name"], "Nakuru County");
    assert_eq!(replaced["code"], 7);
}

#[tokio::test]
async fn test_validation_error_is_bad_request() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post("/api/common/counties", json!({ "name": "   " }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("name:"));
}

#[tokio::test]
async fn test_duplicate_is_conflict() {
    let server = TestServer::start().await;
    server
        .create("/api/common/counties", json!({ "name": "Machakos" }))
        .await;
    let (status, body) = server
        .post("/api/common/counties", json!({ "name": "Machakos" }))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let server = TestServer::start().await;
    let resp = server
        .client
        .post(server.url("/api/common/counties"))
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_bad_filter_value_is_bad_request() {
    let server = TestServer::start().await;

    let (status, body) = server.get("/api/common/counties?is_active=maybe").await;
    assert_eq!(status, 400);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("is_active"));

    let (status, _) = server
        .get("/api/common/counties?last_one_week=yesterday")
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_time_window_query() {
    let server = TestServer::start().await;
    server
        .create(
            "/api/common/counties",
            json!({ "name": "Recent", "created": "2015-04-14T10:00:00Z" }),
        )
        .await;
    server
        .create(
            "/api/common/counties",
            json!({ "name": "Old", "created": "2015-02-01T10:00:00Z" }),
        )
        .await;

    let (status, body) = server
        .get("/api/common/counties?last_one_week=2015-4-16T00:00:00Z")
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["name"], "Recent");

    let (_, body) = server
        .get("/api/common/counties?last_one_quarter=2015-4-16T00:00:00Z")
        .await;
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_nested_resources() {
    let server = TestServer::start().await;
    let county = server
        .create("/api/common/counties", json!({ "name": "Kiambu" }))
        .await;
    let sub_county = server
        .create(
            "/api/common/sub_counties",
            json!({ "name": "Thika", "county": county["id"] }),
        )
        .await;
    assert_eq!(sub_county["code"], 1);

    let (status, body) = server
        .post(
            "/api/common/sub_counties",
            json!({ "name": "Ruiru", "county": "missing" }),
        )
        .await;
    assert_eq!(status, 400, "{}", body);
}

#[tokio::test]
async fn test_index_settings_endpoint() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/api/search/settings").await;
    assert_eq!(status, 200);
    let ngram = &body["settings"]["analysis"]["filter"]["ngram"];
    assert_eq!(ngram["min_gram"], 4);
    assert_eq!(ngram["max_gram"], 15);
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/api/chul/community_health_units/nope").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");
}
