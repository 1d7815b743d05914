//! Shared setup and assertions: fake endpoints, service construction, records

use std::sync::Arc;

use cucumber::{given, then};

use forumwatch::records::RunStatus;
use forumwatch::store::{JsonStore, RecordStore};

use crate::world::{forum_page, ForumWatchWorld};

// --- Given steps ---

#[given(expr = "a forum whose first discussion is {string}")]
fn forum_with_first_discussion(world: &mut ForumWatchWorld, title: String) {
    let mut state = world.http.state.lock().unwrap();
    state.page_status = 200;
    state.page_body = forum_page(&title);
}

#[given("a Telegram API that accepts messages")]
fn telegram_accepts(world: &mut ForumWatchWorld) {
    world.http.state.lock().unwrap().telegram_accepts = true;
}

#[given("a Telegram API that rejects messages")]
fn telegram_rejects(world: &mut ForumWatchWorld) {
    world.http.state.lock().unwrap().telegram_accepts = false;
}

#[given(expr = "a configured service checking every {int} minutes")]
async fn configured_service(world: &mut ForumWatchWorld, interval: u32) {
    let store = JsonStore::in_memory(500);
    store
        .initialize(&ForumWatchWorld::seed(interval), chrono::Utc::now())
        .await
        .unwrap();
    world.build_with_store(Arc::new(store)).await;
}

#[given("a service with no saved configuration")]
async fn unconfigured_service(world: &mut ForumWatchWorld) {
    world
        .build_with_store(Arc::new(JsonStore::in_memory(500)))
        .await;
}

// --- Then steps ---

#[then("the last operation should succeed")]
fn last_operation_succeeded(world: &mut ForumWatchWorld) {
    assert!(
        world.last_error.is_none(),
        "Expected success, got error: {:?}",
        world.last_error
    );
}

#[then(expr = "the last operation should fail with {string}")]
fn last_operation_failed_with(world: &mut ForumWatchWorld, expected: String) {
    let error = world
        .last_error
        .as_ref()
        .expect("expected the last operation to fail");
    assert!(
        error.contains(&expected),
        "Expected error containing '{}', got '{}'",
        expected,
        error
    );
}

#[then(expr = "the notification log should contain {string}")]
async fn notification_log_contains(world: &mut ForumWatchWorld, expected: String) {
    let log = world.controller().notifications(500).await.unwrap();
    assert!(
        log.iter().any(|r| r.message.contains(&expected)),
        "Expected a notification containing '{}', log: {:?}",
        expected,
        log.iter().map(|r| &r.message).collect::<Vec<_>>()
    );
}

#[then(expr = "the notification log should contain {string} exactly {int} time(s)")]
async fn notification_log_contains_times(
    world: &mut ForumWatchWorld,
    expected: String,
    times: usize,
) {
    let log = world.controller().notifications(500).await.unwrap();
    let count = log.iter().filter(|r| r.message.contains(&expected)).count();
    assert_eq!(
        count, times,
        "Expected '{}' {} time(s) in the notification log",
        expected, times
    );
}

#[then(expr = "a Telegram message containing {string} should have been sent")]
fn telegram_message_sent(world: &mut ForumWatchWorld, expected: String) {
    let sent = world.http.sent_texts();
    assert!(
        sent.iter().any(|t| t.contains(&expected)),
        "Expected a Telegram message containing '{}', sent: {:?}",
        expected,
        sent
    );
}

#[then(expr = "no Telegram message containing {string} should have been sent")]
fn telegram_message_not_sent(world: &mut ForumWatchWorld, unexpected: String) {
    let sent = world.http.sent_texts();
    assert!(
        !sent.iter().any(|t| t.contains(&unexpected)),
        "Did not expect a Telegram message containing '{}', sent: {:?}",
        unexpected,
        sent
    );
}

#[then(expr = "the total notifications sent should be {int}")]
async fn total_notifications_sent(world: &mut ForumWatchWorld, expected: u64) {
    let status: RunStatus = world.store().status().await.unwrap();
    assert_eq!(status.total_notifications_sent, expected);
}
