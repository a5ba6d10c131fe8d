//! Wire-protocol tests for the WebDriver session client against a mocked
//! remote end.

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bondsheet::api::{FetchError, WebDriverSession};
use bondsheet::models::Config;

fn test_config(endpoint: &str, timeout_secs: u64) -> Config {
    Config {
        sheet_path: PathBuf::from("bonds.csv"),
        webdriver_url: endpoint.to_string(),
        page_timeout_secs: timeout_secs,
        fetch_attempts: 5,
        stabilize_rounds: 8,
        nav_delay_ms: 0,
    }
}

async fn mock_session_create(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": { "sessionId": "abc", "capabilities": {} }
        })))
        .mount(server)
        .await;
}

#[test_log::test(tokio::test)]
async fn test_navigate_and_read_rendered_texts() {
    let server = MockServer::start().await;
    mock_session_create(&server).await;

    Mock::given(method("POST"))
        .and(path("/session/abc/url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/abc/elements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                { "element-6066-11e4-a52e-4f735466cecc": "e1" },
                { "element-6066-11e4-a52e-4f735466cecc": "e2" }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/session/abc/element/e1/text"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": " 0.55% " })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/session/abc/element/e2/text"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "3.25%" })))
        .mount(&server)
        .await;

    let session = WebDriverSession::connect(&test_config(&server.uri(), 2))
        .await
        .unwrap();
    session.navigate("http://example.com/quote").await.unwrap();

    let texts = session.wait_for_texts("td > span").await.unwrap();
    assert_eq!(texts, vec!["0.55%".to_string(), "3.25%".to_string()]);
}

#[test_log::test(tokio::test)]
async fn test_wait_times_out_when_nothing_renders() {
    let server = MockServer::start().await;
    mock_session_create(&server).await;

    // The selector never matches anything.
    Mock::given(method("POST"))
        .and(path("/session/abc/elements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .mount(&server)
        .await;

    let session = WebDriverSession::connect(&test_config(&server.uri(), 1))
        .await
        .unwrap();

    let err = session.wait_for_texts("td.missing").await.unwrap_err();
    match err {
        FetchError::LoadFailure(cause) => assert!(cause.contains("td.missing")),
        other => panic!("expected LoadFailure, got {:?}", other),
    }
}

#[test_log::test(tokio::test)]
async fn test_failed_command_surfaces_driver_message() {
    let server = MockServer::start().await;
    mock_session_create(&server).await;

    Mock::given(method("POST"))
        .and(path("/session/abc/url"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "value": { "error": "no such window", "message": "window was closed" }
        })))
        .mount(&server)
        .await;

    let session = WebDriverSession::connect(&test_config(&server.uri(), 1))
        .await
        .unwrap();

    let err = session.navigate("http://example.com").await.unwrap_err();
    match err {
        FetchError::LoadFailure(cause) => assert!(cause.contains("window was closed")),
        other => panic!("expected LoadFailure, got {:?}", other),
    }
}

#[test_log::test(tokio::test)]
async fn test_click_targets_first_match() {
    let server = MockServer::start().await;
    mock_session_create(&server).await;

    Mock::given(method("POST"))
        .and(path("/session/abc/elements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "element-6066-11e4-a52e-4f735466cecc": "tab1" }, { "element-6066-11e4-a52e-4f735466cecc": "tab2" }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/abc/element/tab1/click"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .expect(1)
        .mount(&server)
        .await;

    let session = WebDriverSession::connect(&test_config(&server.uri(), 2))
        .await
        .unwrap();
    session.click("a[tabname]").await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_quit_deletes_the_session() {
    let server = MockServer::start().await;
    mock_session_create(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/session/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .expect(1)
        .mount(&server)
        .await;

    let session = WebDriverSession::connect(&test_config(&server.uri(), 1))
        .await
        .unwrap();
    session.quit().await.unwrap();
}
