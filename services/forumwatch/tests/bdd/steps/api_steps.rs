//! BDD step definitions for the HTTP control API

use std::time::Duration;

use cucumber::gherkin::Step;
use cucumber::{given, then, when};

use crate::world::ForumWatchWorld;

async fn send(world: &mut ForumWatchWorld, method: reqwest::Method, path: &str, body: Option<String>) {
    let base = world.api_base.as_ref().expect("API is not being served");
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    let mut request = client.request(method, format!("{}{}", base, path));
    if let Some(body) = body {
        request = request
            .header("content-type", "application/json")
            .body(body);
    }

    let response = request.send().await.expect("request should reach the API");
    world.response_status = Some(response.status().as_u16());
    let text = response.text().await.unwrap_or_default();
    world.response_body = Some(serde_json::from_str(&text).unwrap_or(serde_json::Value::Null));
}

// --- Given steps ---

#[given("the API is being served")]
async fn api_served(world: &mut ForumWatchWorld) {
    let store = world.store.clone().expect("service has not been configured");
    let service = world.builder(store).build().await.unwrap();
    let bound = service.bind().await.unwrap();
    world.api_base = Some(format!("http://{}", bound.listen_addr()));
    world.controller = Some(bound.controller().clone());
    tokio::spawn(bound.run());
}

// --- When steps ---

#[when(expr = "I GET {string}")]
async fn get_path(world: &mut ForumWatchWorld, path: String) {
    send(world, reqwest::Method::GET, &path, None).await;
}

#[when(expr = "I POST {string}")]
async fn post_path(world: &mut ForumWatchWorld, path: String) {
    send(world, reqwest::Method::POST, &path, None).await;
}

#[when(expr = "I POST {string} with body:")]
async fn post_path_with_body(world: &mut ForumWatchWorld, path: String, step: &Step) {
    let body = step.docstring.clone().expect("step needs a doc string body");
    send(world, reqwest::Method::POST, &path, Some(body)).await;
}

// --- Then steps ---

#[then(expr = "the response status should be {int}")]
fn response_status(world: &mut ForumWatchWorld, expected: u16) {
    assert_eq!(
        world.response_status,
        Some(expected),
        "body: {:?}",
        world.response_body
    );
}

#[then(expr = "the response field {string} should be {string}")]
fn response_field(world: &mut ForumWatchWorld, field: String, expected: String) {
    let body = world.response_body.as_ref().expect("no response body");
    let pointer = format!("/{}", field.replace('.', "/"));
    let value = body
        .pointer(&pointer)
        .unwrap_or_else(|| panic!("field '{}' missing from {}", field, body));
    let actual = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    assert_eq!(actual, expected, "field '{}'", field);
}

#[then(expr = "the response should list {int} notification(s)")]
fn response_lists(world: &mut ForumWatchWorld, expected: usize) {
    let body = world.response_body.as_ref().expect("no response body");
    let entries = body.as_array().expect("expected a JSON array");
    assert_eq!(entries.len(), expected);
}
