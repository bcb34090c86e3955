//! Integration tests for the `metabase` binary against a mock server.

mod common;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{Sandbox, parse_json};

#[tokio::test]
async fn cards_get_prints_json_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/card/7"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "name": "Revenue",
            "display": "line",
            "collection_id": 3,
            "collection": {"id": 3, "name": "Finance", "effective_ancestors": [{"name": "Company"}]},
            "dataset_query": {"type": "native", "native": {"query": "select 1"}},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_api_key(&server.uri(), "test-key");
    let stdout = sandbox.run_success(&["cards", "get", "7", "--json"]).await;
    let out = parse_json(stdout.as_bytes());

    assert_eq!(out["success"], true);
    assert_eq!(out["data"]["name"], "Revenue");
    assert_eq!(out["data"]["collection"]["path"], json!(["Company", "Finance"]));
    assert_eq!(out["data"]["dataset_query"]["type"], "native");
    assert!(out["meta"]["timestamp"].is_string());
}

#[tokio::test]
async fn questions_alias_runs_cards() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/card/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "Revenue"})))
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_api_key(&server.uri(), "test-key");
    let stdout = sandbox.run_success(&["questions", "get", "7", "--json"]).await;
    assert_eq!(parse_json(stdout.as_bytes())["data"]["id"], 7);
}

#[tokio::test]
async fn missing_configuration_is_reported() {
    let sandbox = Sandbox::new();
    let out = sandbox.run_failure_json(&["cards", "get", "7", "--json"]).await;

    assert_eq!(out["success"], false);
    assert_eq!(out["error"]["code"], "CONFIG_ERROR");
    assert!(
        out["error"]["message"]
            .as_str()
            .unwrap()
            .contains("metabase auth login")
    );
}

#[tokio::test]
async fn not_found_carries_status_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/card/404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found."))
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_api_key(&server.uri(), "test-key");
    let out = sandbox.run_failure_json(&["cards", "get", "404", "--json"]).await;

    assert_eq!(out["error"]["code"], "NOT_FOUND");
    assert_eq!(out["error"]["details"]["status_code"], 404);
}

#[tokio::test]
async fn human_errors_go_to_stderr() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/card/1"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthenticated"))
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_api_key(&server.uri(), "bad-key");
    let output = sandbox.run(&["cards", "get", "1"]).await;

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("authentication failed"), "stderr: {}", stderr);
}

#[tokio::test]
async fn resolve_rejects_unknown_urls() {
    let sandbox = Sandbox::new();
    let out = sandbox
        .run_failure_json(&["resolve", "https://mb.example.com/model/12", "--json"])
        .await;

    assert_eq!(out["error"]["code"], "INVALID_URL");
    assert_eq!(out["error"]["details"]["url"], "https://mb.example.com/model/12");
    assert!(
        out["error"]["message"]
            .as_str()
            .unwrap()
            .contains("/question/<id>")
    );
}

#[tokio::test]
async fn resolve_fetches_dashboard_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/45"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 45,
            "name": "Sales Overview",
            "collection": null,
            "dashcards": [{"id": 1, "card_id": 2}, {"id": 2, "card_id": 3}],
            "parameters": [{"name": "Date", "slug": "date"}],
        })))
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_api_key(&server.uri(), "test-key");
    let url = format!("{}/dashboard/45-sales-overview", server.uri());
    let stdout = sandbox.run_success(&["resolve", &url, "--json"]).await;
    let out = parse_json(stdout.as_bytes());

    assert_eq!(out["data"]["entity_type"], "dashboard");
    assert_eq!(out["data"]["entity_id"], 45);
    assert_eq!(out["data"]["entity"]["dashcard_count"], 2);
    assert!(out["data"]["entity"]["collection"].is_null());
}

#[tokio::test]
async fn auth_token_prints_secret() {
    let sandbox = Sandbox::with_api_key("https://mb.example.com", "mb_secret");
    let stdout = sandbox.run_success(&["auth", "token"]).await;
    assert_eq!(stdout.trim(), "mb_secret");
}

#[tokio::test]
async fn run_rejects_invalid_parameters() {
    let sandbox = Sandbox::with_api_key("https://mb.example.com", "key");
    let out = sandbox
        .run_failure_json(&["cards", "run", "5", "--parameters", "{oops", "--json"])
        .await;
    assert_eq!(out["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn run_writes_json_and_csv_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/card/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5, "name": "Orders"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/card/5/query"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "data": {
                "cols": [{"display_name": "ID", "name": "id"}, {"name": "total"}],
                "rows": [[1, 10.5], [2, null]],
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_api_key(&server.uri(), "key");
    let out_dir = sandbox.path().join("exports");
    std::fs::create_dir_all(&out_dir).unwrap();
    let stdout = sandbox
        .run_success(&[
            "cards",
            "run",
            "5",
            "--output-dir",
            out_dir.to_str().unwrap(),
            "--json",
        ])
        .await;
    let out = parse_json(stdout.as_bytes());

    assert_eq!(out["data"]["card_name"], "Orders");
    assert_eq!(out["data"]["row_count"], 2);
    let csv_path = out["data"]["files"]["csv"].as_str().unwrap();
    assert!(csv_path.ends_with("card-5-results.csv"));
    assert_eq!(std::fs::read_to_string(csv_path).unwrap(), "ID,total\n1,10.5\n2,\n");
    let json_path = out["data"]["files"]["json"].as_str().unwrap();
    assert!(std::path::Path::new(json_path).exists());
}

#[tokio::test]
async fn search_reports_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": 1, "model": "card", "name": "Revenue", "collection": {"id": 2, "name": "Finance"}},
                {"id": 9, "model": "dashboard", "name": "Revenue board"},
            ],
            "total": 2,
        })))
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_api_key(&server.uri(), "key");
    let stdout = sandbox.run_success(&["search", "revenue", "--json"]).await;
    let out = parse_json(stdout.as_bytes());

    assert_eq!(out["data"]["query"], "revenue");
    assert_eq!(out["data"]["total_results"], 2);
    assert_eq!(out["data"]["results"][0]["collection"]["path"], json!(["Finance"]));

    let stdout = sandbox.run_success(&["search", "revenue"]).await;
    let dashboards = stdout.find("DASHBOARDS (1)").unwrap();
    let cards = stdout.find("CARDS (1)").unwrap();
    assert!(dashboards < cards);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn expired_session_is_refreshed_and_saved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/card/7"))
        .and(header("x-metabase-session", "old-session"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthenticated"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .and(body_json(json!({"username": "ada@example.com", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "new-session"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/card/7"))
        .and(header("x-metabase-session", "new-session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "Revenue"})))
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = Sandbox::new();
    sandbox.write_config(&format!(
        "[default]\nurl = \"{}\"\nauth_method = \"credentials\"\nsession_id = \"old-session\"\nusername = \"ada@example.com\"\npassword = \"hunter2\"\n",
        server.uri()
    ));

    let stdout = sandbox.run_success(&["cards", "get", "7", "--json"]).await;
    assert_eq!(parse_json(stdout.as_bytes())["data"]["name"], "Revenue");

    let config = std::fs::read_to_string(sandbox.config_path()).unwrap();
    assert!(config.contains("new-session"), "config: {}", config);
    assert!(config.contains("hunter2"));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn login_with_api_key_saves_profile_and_logout_removes_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/session/properties"))
        .and(header("x-api-key", "mb_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": {"tag": "v0.50"}})))
        .mount(&server)
        .await;

    let sandbox = Sandbox::new();
    let stdout = sandbox
        .run_success(&[
            "auth",
            "login",
            "--url",
            &format!("{}/", server.uri()),
            "--method",
            "api_key",
            "--api-key",
            "mb_key",
            "-p",
            "work",
            "--json",
        ])
        .await;
    let out = parse_json(stdout.as_bytes());
    assert_eq!(out["data"]["profile"], "work");
    assert_eq!(out["data"]["url"], server.uri());

    let config = std::fs::read_to_string(sandbox.config_path()).unwrap();
    assert!(config.contains("[work]"));
    assert!(config.contains("mb_key"));

    let token = sandbox.run_success(&["auth", "token", "-p", "work"]).await;
    assert_eq!(token.trim(), "mb_key");

    sandbox.run_success(&["auth", "logout", "-p", "work"]).await;
    assert!(!sandbox.config_path().exists());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn login_with_credentials_stores_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "fresh-session"})))
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = Sandbox::new();
    sandbox
        .run_success(&[
            "auth",
            "login",
            "--url",
            &server.uri(),
            "--method",
            "credentials",
            "--username",
            "ada@example.com",
            "--password",
            "hunter2",
        ])
        .await;

    let config = std::fs::read_to_string(sandbox.config_path()).unwrap();
    assert!(config.contains("fresh-session"));
    assert!(config.contains("credentials"));
}

#[tokio::test]
async fn status_exits_non_zero_when_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/session/properties"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_api_key(&server.uri(), "expired");
    let output = sandbox.run(&["auth", "status", "--json"]).await;

    assert!(!output.status.success());
    let out = parse_json(&output.stdout);
    assert_eq!(out["data"]["authenticated"], false);
    assert_eq!(out["data"]["auth_method"], "api_key");
}
