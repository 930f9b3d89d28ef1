//! Everything HTTP client tests
//!
//! A local axum server stands in for the Everything HTTP server.

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;

use everything_mcp_server::config::Config;
use everything_mcp_server::error::{EverythingMcpError, SearchError};
use everything_mcp_server::everything::client::{EverythingClient, Searcher};

/// `user:secret` in HTTP Basic form
const BASIC_USER_SECRET: &str = "Basic dXNlcjpzZWNyZXQ=";

async fn search_handler(
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    let search = params.get("search").cloned().unwrap_or_default();

    if search == "private" {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == BASIC_USER_SECRET)
            .unwrap_or(false);
        if !authorized {
            return (StatusCode::UNAUTHORIZED, "Unauthorized".to_string());
        }
    }

    match search.as_str() {
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "index not ready".to_string()),
        "plain" => (StatusCode::OK, "C:\\one.txt\r\nC:\\two.txt\r\n".to_string()),
        _ => {
            let count = params.get("count").cloned().unwrap_or_default();
            let body = serde_json::json!({
                "totalResults": 1,
                "results": [{
                    "type": "file",
                    "name": format!("{}.txt", search),
                    "path": "C:\\data",
                    "size": "4096",
                    "date_modified": count,
                }]
            });
            (StatusCode::OK, body.to_string())
        }
    }
}

/// Start the fake server and return a config pointing at it
async fn start_server(username: &str, password: &str) -> Config {
    let app = Router::new().route("/", get(search_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Config {
        base_url: "http://127.0.0.1".to_string(),
        port,
        username: username.to_string(),
        password: password.to_string(),
        request_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_json_search() {
    let config = start_server("", "").await;
    let client = EverythingClient::new(&config).unwrap();

    let results = client.search("notes", 7).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path, "C:\\data\\notes.txt");
    assert_eq!(results[0].size, 4096);
    assert_eq!(results[0].kind, "file");
    // The fake server echoes `count` back as the date
    assert_eq!(results[0].date, "7");
}

#[tokio::test]
async fn test_plain_text_fallback() {
    let config = start_server("", "").await;
    let client = EverythingClient::new(&config).unwrap();

    let results = client.search("plain", 0).await.unwrap();

    let paths: Vec<&str> = results.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, ["C:\\one.txt", "C:\\two.txt"]);
}

#[tokio::test]
async fn test_unauthorized_without_credentials() {
    let config = start_server("", "").await;
    let client = EverythingClient::new(&config).unwrap();

    let err = client.search("private", 10).await.unwrap_err();
    assert!(matches!(
        err,
        EverythingMcpError::Search(SearchError::CredentialsRequired)
    ));
}

#[tokio::test]
async fn test_wrong_credentials() {
    let config = start_server("user", "wrong").await;
    let client = EverythingClient::new(&config).unwrap();

    let err = client.search("private", 10).await.unwrap_err();
    match err {
        EverythingMcpError::Search(SearchError::AuthenticationFailed { username }) => {
            assert_eq!(username, "user")
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_basic_auth_accepted() {
    let config = start_server("user", "secret").await;
    let client = EverythingClient::new(&config).unwrap();

    let results = client.search("private", 10).await.unwrap();
    assert_eq!(results[0].path, "C:\\data\\private.txt");
}

#[tokio::test]
async fn test_server_error_carries_status_and_body() {
    let config = start_server("", "").await;
    let client = EverythingClient::new(&config).unwrap();

    let err = client.search("broken", 10).await.unwrap_err();
    match err {
        EverythingMcpError::Search(SearchError::RequestFailed { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "index not ready");
        }
        other => panic!("unexpected error: {}", other),
    }
}
