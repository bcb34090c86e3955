//! Mock Metabase tests for the request engine and resource APIs.
//!
//! These tests use wiremock to simulate a Metabase server and check
//! authentication, classification and session refresh end to end.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metabase_client::{
    ApiRequest, Auth, CardFilter, Cards, CollectionId, Collections, Dashboards, Databases, Engine,
    ItemsQuery, Search, SearchQuery,
};
use metabase_core::{BaseUrl, Credential, Error, Result, Secret, SessionStore};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Session store that records every persisted token.
#[derive(Default)]
struct RecordingStore {
    persisted: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingStore {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.persisted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn load(&self, _profile: &str) -> Result<Option<Credential>> {
        Ok(None)
    }

    async fn persist_session_token(&self, token: &str, profile: &str) -> Result<()> {
        self.persisted
            .lock()
            .unwrap()
            .push((token.to_string(), profile.to_string()));
        if self.fail {
            return Err(Error::Io(std::io::Error::other("disk full")));
        }
        Ok(())
    }
}

fn base_url(server: &MockServer) -> BaseUrl {
    BaseUrl::new(server.uri()).unwrap()
}

fn api_key_engine(server: &MockServer) -> Engine {
    let cred = Credential::api_key(base_url(server), "mb_key");
    Engine::new(cred, Arc::new(RecordingStore::default()))
}

// ============================================================================
// Authentication headers
// ============================================================================

#[tokio::test]
async fn test_empty_api_key_fails_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cred = Credential::api_key(base_url(&server), "");
    let mut engine = Engine::new(cred, Arc::new(RecordingStore::default()));

    let err = engine.get("/user/current", &[]).await.unwrap_err();
    assert!(err.is_authentication());
}

#[tokio::test]
async fn test_empty_session_token_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cred = Credential::session_token(base_url(&server), "");
    let mut engine = Engine::new(cred, Arc::new(RecordingStore::default()));
    assert!(engine.get("/user/current", &[]).await.unwrap_err().is_authentication());

    let cred = Credential::credentials(base_url(&server), "alice", "pw");
    let mut engine = Engine::new(cred, Arc::new(RecordingStore::default()));
    assert!(engine.get("/user/current", &[]).await.unwrap_err().is_authentication());
}

#[tokio::test]
async fn test_api_key_header_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/current"))
        .and(header("x-api-key", "mb_key"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = api_key_engine(&server);
    let user = Auth::new(&mut engine).current_user().await.unwrap();
    assert_eq!(user["id"], 1);
}

// ============================================================================
// Response classification
// ============================================================================

#[tokio::test]
async fn test_not_found_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/card/999"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not found"})))
        .mount(&server)
        .await;

    let mut engine = api_key_engine(&server);
    let err = Cards::new(&mut engine).get(999).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.detail(), Some(&json!({"message": "Not found"})));
}

#[tokio::test]
async fn test_empty_success_body_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/card/5"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut engine = api_key_engine(&server);
    assert_eq!(engine.delete("/card/5").await.unwrap(), None);
    assert_eq!(engine.get("/empty", &[]).await.unwrap(), None);
}

#[tokio::test]
async fn test_generic_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/card"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Card name is required"})),
        )
        .mount(&server)
        .await;

    let mut engine = api_key_engine(&server);
    let err = Cards::new(&mut engine).create(json!({})).await.unwrap_err();
    assert!(matches!(err, Error::Api(_)));
    assert_eq!(err.failure().unwrap().message, "Card name is required");
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    let server = MockServer::start().await;
    let base = base_url(&server);
    drop(server);

    let mut engine = Engine::new(
        Credential::api_key(base, "k"),
        Arc::new(RecordingStore::default()),
    );
    let err = engine.get("/user/current", &[]).await.unwrap_err();
    assert_eq!(err.code(), "TRANSPORT_ERROR");
}

// ============================================================================
// Session refresh
// ============================================================================

#[tokio::test]
async fn test_refresh_on_401_then_replay() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/card/7"))
        .and(header("x-metabase-session", "old-token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthenticated"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .and(body_json(json!({"username": "alice", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "new-token"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/card/7"))
        .and(header("x-metabase-session", "new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "Revenue"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let cred = Credential::credentials(base_url(&server), "alice", "pw")
        .with_session_token("old-token")
        .with_profile("work");
    let mut engine = Engine::new(cred, store.clone());

    let card = Cards::new(&mut engine).get(7).await.unwrap();
    assert_eq!(card["name"], "Revenue");
    assert_eq!(
        engine.credential().session_token_secret().unwrap().expose(),
        "new-token"
    );
    assert_eq!(
        store.calls(),
        vec![("new-token".to_string(), "work".to_string())]
    );
}

#[tokio::test]
async fn test_replay_resends_identical_request() {
    let server = MockServer::start().await;
    let body = json!({"name": "Ops", "parent_id": 3});

    Mock::given(method("POST"))
        .and(path("/api/collection"))
        .and(header("x-metabase-session", "stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "fresh"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/collection"))
        .and(header("x-metabase-session", "fresh"))
        .and(body_json(body.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 11, "name": "Ops"})))
        .expect(1)
        .mount(&server)
        .await;

    let cred = Credential::credentials(base_url(&server), "alice", "pw").with_session_token("stale");
    let mut engine = Engine::new(cred, Arc::new(RecordingStore::default()));

    let created = Collections::new(&mut engine)
        .create("Ops", None, Some(3))
        .await
        .unwrap();
    assert_eq!(created["id"], 11);
}

#[tokio::test]
async fn test_api_key_401_does_not_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/current"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let cred = Credential::api_key(base_url(&server), "mb_key");
    let mut engine = Engine::new(cred, store.clone());

    let err = engine.get("/user/current", &[]).await.unwrap_err();
    assert!(err.is_authentication());
    assert_eq!(err.status(), Some(401));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_failed_refresh_returns_original_401() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/current"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let cred = Credential::credentials(base_url(&server), "alice", "wrong").with_session_token("old");
    let mut engine = Engine::new(cred, store.clone());

    let err = engine.get("/user/current", &[]).await.unwrap_err();
    assert!(err.is_authentication());
    assert_eq!(err.detail(), Some(&json!({"message": "expired"})));
    assert_eq!(
        engine.credential().session_token_secret().unwrap().expose(),
        "old"
    );
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_second_401_after_refresh_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/current"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "new"})))
        .expect(1)
        .mount(&server)
        .await;

    let cred = Credential::credentials(base_url(&server), "alice", "pw").with_session_token("old");
    let mut engine = Engine::new(cred, Arc::new(RecordingStore::default()));

    let err = engine.get("/user/current", &[]).await.unwrap_err();
    assert!(err.is_authentication());
}

#[tokio::test]
async fn test_persist_failure_still_refreshes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/current"))
        .and(header("x-metabase-session", "old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "new"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user/current"))
        .and(header("x-metabase-session", "new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::failing());
    let cred = Credential::credentials(base_url(&server), "alice", "pw").with_session_token("old");
    let mut engine = Engine::new(cred, store.clone());

    let user = engine.get("/user/current", &[]).await.unwrap().unwrap();
    assert_eq!(user["id"], 1);
    assert_eq!(store.calls().len(), 1);
}

#[tokio::test]
async fn test_refresh_from_no_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "first"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let cred = Credential::credentials(base_url(&server), "alice", "pw");
    let mut engine = Engine::new(cred, store.clone());

    assert!(engine.refresh_session().await);
    assert_eq!(
        engine.credential().session_token_secret().unwrap().expose(),
        "first"
    );
    assert_eq!(store.calls().len(), 1);
}

// ============================================================================
// Resource APIs
// ============================================================================

#[tokio::test]
async fn test_auth_login_and_logout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "s1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/session"))
        .and(header("x-metabase-session", "s1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = Engine::new(
        Credential::new(base_url(&server), metabase_core::AuthMethod::Credentials),
        Arc::new(RecordingStore::default()),
    );
    let auth = Auth::new(&mut engine);
    let session = auth.login("alice", &Secret::new("pw")).await.unwrap();
    assert_eq!(session["id"], "s1");
    auth.logout(&Secret::new("s1")).await.unwrap();
}

#[tokio::test]
async fn test_validate_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/session/properties"))
        .and(header("x-api-key", "mb_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": {"tag": "v0.50"}})))
        .mount(&server)
        .await;

    let mut engine = api_key_engine(&server);
    assert!(Auth::new(&mut engine).validate_session().await);

    let mut engine = Engine::new(
        Credential::api_key(base_url(&server), "wrong"),
        Arc::new(RecordingStore::default()),
    );
    assert!(!Auth::new(&mut engine).validate_session().await);
}

#[tokio::test]
async fn test_cards_list_and_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/card"))
        .and(query_param("f", "database"))
        .and(query_param("database_id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/card/1/query"))
        .and(body_json(json!({"limit": 10})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "data": {"cols": [{"name": "n"}], "rows": [[1]]}
        })))
        .mount(&server)
        .await;

    let mut engine = api_key_engine(&server);
    let mut cards = Cards::new(&mut engine);

    let filter = CardFilter {
        f: Some("database".into()),
        database_id: Some(2),
        ..CardFilter::default()
    };
    assert_eq!(cards.list(&filter).await.unwrap().len(), 2);

    let result = cards.run(1, Some(json!({})), Some(10)).await.unwrap();
    assert_eq!(result["data"]["rows"], json!([[1]]));
}

#[tokio::test]
async fn test_run_without_parameters_sends_no_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/card/3/query"))
        .respond_with(|req: &Request| {
            if req.body.is_empty() {
                ResponseTemplate::new(200).set_body_json(json!({"data": {"rows": []}}))
            } else {
                ResponseTemplate::new(400)
            }
        })
        .mount(&server)
        .await;

    let mut engine = api_key_engine(&server);
    let result = Cards::new(&mut engine).run(3, None, None).await.unwrap();
    assert_eq!(result["data"]["rows"], json!([]));
}

#[tokio::test]
async fn test_collection_items_repeat_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/collection/root/items"))
        .respond_with(|req: &Request| {
            let models: Vec<String> = req
                .url
                .query_pairs()
                .filter(|(k, _)| k == "models")
                .map(|(_, v)| v.to_string())
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({
                "data": models.iter().map(|m| json!({"model": m})).collect::<Vec<_>>(),
                "total": models.len()
            }))
        })
        .mount(&server)
        .await;

    let mut engine = api_key_engine(&server);
    let query = ItemsQuery {
        models: vec!["card".into(), "dashboard".into()],
        ..ItemsQuery::default()
    };
    let items = Collections::new(&mut engine)
        .items(CollectionId::Root, &query)
        .await
        .unwrap();
    assert_eq!(items, vec![json!({"model": "card"}), json!({"model": "dashboard"})]);
}

#[tokio::test]
async fn test_collection_tree_excludes_archived() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/collection/tree"))
        .and(query_param("exclude-archived", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Sales", "children": []}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = api_key_engine(&server);
    let tree = Collections::new(&mut engine).tree(true).await.unwrap();
    assert_eq!(tree[0]["name"], "Sales");
}

#[tokio::test]
async fn test_dashboards_list_uses_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("models", "dashboard"))
        .and(query_param("collection_id", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 9, "model": "dashboard"}],
            "total": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dashboard/9/revert"))
        .and(body_json(json!({"revision_id": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 9})))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = api_key_engine(&server);
    let mut dashboards = Dashboards::new(&mut engine);
    let list = dashboards.list(Some(4)).await.unwrap();
    assert_eq!(list[0]["id"], 9);
    dashboards.revert(9, 3).await.unwrap();
}

#[tokio::test]
async fn test_database_get_include_fields_wins() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/database/2"))
        .and(query_param("include", "tables.fields"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2, "tables": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/database/2/schemas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["public", "analytics"])))
        .mount(&server)
        .await;

    let mut engine = api_key_engine(&server);
    let mut databases = Databases::new(&mut engine);
    let db = databases.get(2, true, true).await.unwrap();
    assert_eq!(db["id"], 2);
    assert_eq!(databases.schemas(2).await.unwrap(), vec!["public", "analytics"]);
}

#[tokio::test]
async fn test_search_wraps_bare_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("q", "revenue"))
        .and(query_param("limit", "50"))
        .and(query_param("table_db_id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .mount(&server)
        .await;

    let mut engine = api_key_engine(&server);
    let mut query = SearchQuery::new("revenue");
    query.table_db_id = Some(1);

    let result = Search::new(&mut engine).search(&query).await.unwrap();
    assert_eq!(result, json!({"data": [{"id": 1}], "total": 0}));
}

#[tokio::test]
async fn test_execute_with_query_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/card/4"))
        .and(query_param("delete_old_dashcards", "true"))
        .and(body_json(json!({"archived": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 4, "archived": true})))
        .mount(&server)
        .await;

    let mut engine = api_key_engine(&server);
    let request = ApiRequest::put("/card/4")
        .query("delete_old_dashcards", true)
        .body(json!({"archived": true}));
    let result = engine.execute(&request).await.unwrap().unwrap();
    assert_eq!(result["archived"], true);
    engine.close();
    assert!(!engine.has_transport());
}
