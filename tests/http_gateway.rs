use lakeconn::blueprint::{BlueprintFilter, BlueprintQuery, CronPreset};
use lakeconn::connection::ConnectionId;
use lakeconn::gateway::{ConnectionGateway, GatewayConfig, HttpGateway};
use lakeconn::provider::{get_provider, Payload};
use lakeconn::Error;
use mockito::{Matcher, Server};
use serde_json::json;

fn gateway(url: &str) -> HttpGateway {
    HttpGateway::new(GatewayConfig::new(url)).unwrap()
}

fn payload(value: serde_json::Value) -> Payload {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn list_normalizes_either_key_casing() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/plugins/jira/connections")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[
                {"id": 1, "name": "cloud", "endpoint": "https://jira.example.test/rest/", "username": "bot"},
                {"ID": 2, "Name": "onprem", "Endpoint": "https://jira.internal.test/rest/", "rateLimit": 100}
            ]"#,
        )
        .create_async()
        .await;

    let jira = get_provider("jira").unwrap();
    let connections = gateway(&server.url()).list(jira).await.unwrap();

    mock.assert_async().await;
    assert_eq!(connections.len(), 2);
    assert_eq!(connections[0].username.as_deref(), Some("bot"));
    assert_eq!(connections[1].id, Some(ConnectionId::Number(2)));
    assert_eq!(connections[1].name, "onprem");
    assert_eq!(connections[1].extra["rateLimit"], json!(100));
    assert!(connections.iter().all(|c| c.provider == "jira"));
}

#[tokio::test]
async fn non_array_listing_is_empty() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/plugins/gitlab/connections")
        .with_status(200)
        .with_body("null")
        .create_async()
        .await;

    let gitlab = get_provider("gitlab").unwrap();
    assert!(gateway(&server.url()).list(gitlab).await.unwrap().is_empty());
}

#[tokio::test]
async fn get_reads_one_connection() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/plugins/github/connections/5")
        .with_status(200)
        .with_body(r#"{"ID": 5, "Name": "gh", "Endpoint": "https://api.github.com/", "auth": "a,b"}"#)
        .create_async()
        .await;

    let github = get_provider("github").unwrap();
    let conn = gateway(&server.url())
        .get(github, &ConnectionId::Number(5))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(conn.name, "gh");
    assert_eq!(conn.token.as_deref(), Some("a,b"));
}

#[tokio::test]
async fn create_accepts_201() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/plugins/gitlab/connections")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "name": "gl",
            "token": "glpat",
            "auth": "glpat"
        })))
        .with_status(201)
        .with_body(r#"{"id": 11, "name": "gl", "endpoint": "https://gitlab.example.test/api/v4/"}"#)
        .create_async()
        .await;

    let gitlab = get_provider("gitlab").unwrap();
    let saved = gateway(&server.url())
        .create(
            gitlab,
            &payload(json!({ "name": "gl", "token": "glpat", "auth": "glpat" })),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(saved.id, Some(ConnectionId::Number(11)));
}

#[tokio::test]
async fn save_rejects_other_success_codes() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("PATCH", "/plugins/jira/connections/3")
        .with_status(204)
        .create_async()
        .await;

    let jira = get_provider("jira").unwrap();
    let err = gateway(&server.url())
        .update(jira, &ConnectionId::Number(3), &Payload::new())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(204));
}

#[tokio::test]
async fn update_patches_the_connection() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PATCH", "/plugins/jenkins/connections/1")
        .match_body(Matcher::Json(json!({ "username": "ci", "password": "pw" })))
        .with_status(200)
        .with_body(r#"{"id": 1, "name": "jenkins", "username": "ci"}"#)
        .create_async()
        .await;

    let jenkins = get_provider("jenkins").unwrap();
    let saved = gateway(&server.url())
        .update(
            jenkins,
            &ConnectionId::Number(1),
            &payload(json!({ "username": "ci", "password": "pw" })),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(saved.username.as_deref(), Some("ci"));
}

#[tokio::test]
async fn delete_returns_the_body_and_errors_carry_status() {
    let mut server = Server::new_async().await;
    let ok = server
        .mock("DELETE", "/plugins/github/connections/1")
        .with_status(200)
        .with_body(r#"{"id": 1}"#)
        .create_async()
        .await;
    let missing = server
        .mock("DELETE", "/plugins/github/connections/2")
        .with_status(404)
        .with_body(r#"{"message": "record not found"}"#)
        .create_async()
        .await;

    let github = get_provider("github").unwrap();
    let gw = gateway(&server.url());

    let body = gw.delete(github, &ConnectionId::Number(1)).await.unwrap();
    assert_eq!(body, json!({ "id": 1 }));

    let err = gw.delete(github, &ConnectionId::Number(2)).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(
        err.to_string(),
        "Request failed with status code 404: record not found"
    );
    assert!(!err.is_offline());

    ok.assert_async().await;
    missing.assert_async().await;
}

#[tokio::test]
async fn test_reports_success_only_when_the_body_says_so() {
    let mut server = Server::new_async().await;
    let _passing = server
        .mock("POST", "/plugins/github/test")
        .match_body(Matcher::PartialJson(json!({ "token": "good" })))
        .with_status(200)
        .with_body(r#"{"success": true, "message": "success"}"#)
        .create_async()
        .await;
    let _failing = server
        .mock("POST", "/plugins/github/test")
        .match_body(Matcher::PartialJson(json!({ "token": "bad" })))
        .with_status(200)
        .with_body(r#"{"success": false, "message": "Bad credentials"}"#)
        .create_async()
        .await;

    let github = get_provider("github").unwrap();
    let gw = gateway(&server.url());

    let ok = gw
        .test(github, &payload(json!({ "token": "good" })))
        .await
        .unwrap();
    assert!(ok.success);

    let failed = gw
        .test(github, &payload(json!({ "token": "bad" })))
        .await
        .unwrap();
    assert!(!failed.success);
    assert_eq!(failed.message, "Bad credentials");
}

#[tokio::test]
async fn gateway_errors_count_as_offline() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/plugins/jira/connections")
        .with_status(503)
        .create_async()
        .await;

    let jira = get_provider("jira").unwrap();
    let err = gateway(&server.url()).list(jira).await.unwrap_err();

    assert!(matches!(err, Error::Network { status: Some(503), .. }));
    assert!(err.is_offline());
}

#[tokio::test]
async fn unreachable_backend_has_no_status() {
    let jira = get_provider("jira").unwrap();
    let err = gateway("http://127.0.0.1:1").list(jira).await.unwrap_err();

    assert_eq!(err.status(), None);
    assert!(err.is_offline());
}

#[tokio::test]
async fn repos_and_version() {
    let mut server = Server::new_async().await;
    let _repos = server
        .mock("GET", "/domainlayer/repos")
        .with_status(200)
        .with_body(
            r#"{"repos": [{"id": "github:GithubRepo:1:384111310", "name": "apache/incubator-devlake", "language": "Go", "forkedFrom": ""}], "count": 1}"#,
        )
        .create_async()
        .await;
    let _version = server
        .mock("GET", "/version")
        .with_status(200)
        .with_body(r#"{"version": "v0.12.0@abc1234"}"#)
        .create_async()
        .await;

    let gw = gateway(&server.url());

    let repos = gw.domain_repositories().await.unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].language.as_deref(), Some("Go"));
    assert!(repos[0].extra.contains_key("forkedFrom"));

    assert_eq!(gw.version().await.unwrap().version, "v0.12.0@abc1234");
}

#[tokio::test]
async fn blueprints_list_and_toggle() {
    let mut server = Server::new_async().await;
    let list = server
        .mock("GET", "/blueprints")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("enable".into(), "true".into()),
            Matcher::UrlEncoded("pageSize".into(), "20".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"blueprints": [
                {"id": 1, "name": "nightly", "enable": true, "cronConfig": "0 0 * * *"},
                {"id": 2, "name": "quarter-hour", "enable": true, "cronConfig": "*/15 * * * *"}
            ], "count": 2}"#,
        )
        .create_async()
        .await;
    let toggle = server
        .mock("PATCH", "/blueprints/2")
        .match_body(Matcher::Json(json!({ "enable": false })))
        .with_status(200)
        .with_body(r#"{"id": 2, "name": "quarter-hour", "enable": false, "cronConfig": "*/15 * * * *"}"#)
        .create_async()
        .await;

    let gw = gateway(&server.url());
    let page = gw
        .list_blueprints(&BlueprintQuery {
            enable: Some(true),
            page: None,
            page_size: Some(20),
        })
        .await
        .unwrap();

    assert_eq!(page.count, 2);
    assert_eq!(page.blueprints[0].preset(), Some(CronPreset::Daily));
    assert!(BlueprintFilter::Custom.matches(&page.blueprints[1]));

    let bp = gw.set_blueprint_enabled(2, false).await.unwrap();
    assert!(!bp.enable);

    list.assert_async().await;
    toggle.assert_async().await;
}
