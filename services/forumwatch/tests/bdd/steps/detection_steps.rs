//! BDD step definitions for change detection

use cucumber::{given, then, when};

use forumwatch::store::RecordStore;

use crate::world::{forum_page, ForumWatchWorld};

#[given(expr = "the forum now shows {string}")]
fn forum_now_shows(world: &mut ForumWatchWorld, title: String) {
    world.http.state.lock().unwrap().page_body = forum_page(&title);
}

#[given("the forum page has no discussion rows")]
fn forum_without_discussions(world: &mut ForumWatchWorld) {
    world.http.state.lock().unwrap().page_body =
        "<html><body><p>Nothing to see</p></body></html>".to_string();
}

#[given(expr = "the forum page responds with status {int}")]
fn forum_status(world: &mut ForumWatchWorld, status: u16) {
    world.http.state.lock().unwrap().page_status = status;
}

#[given("a manual check runs")]
#[when("a manual check runs")]
async fn manual_check(world: &mut ForumWatchWorld) {
    let result = world.controller().manual_check().await;
    world.last_outcome = world.record(result);
}

#[then("the check should succeed without a new post")]
fn check_succeeded_quietly(world: &mut ForumWatchWorld) {
    let outcome = world.last_outcome.as_ref().expect("no check outcome");
    assert!(outcome.success, "check failed: {:?}", outcome.error);
    assert!(!outcome.new_post);
    assert_eq!(outcome.summary(), "No new posts found");
}

#[then("the check should report a new post")]
fn check_found_new_post(world: &mut ForumWatchWorld) {
    let outcome = world.last_outcome.as_ref().expect("no check outcome");
    assert!(outcome.success);
    assert!(outcome.new_post);
    assert_eq!(outcome.summary(), "New post detected!");
}

#[then("the check should fail")]
fn check_failed(world: &mut ForumWatchWorld) {
    let outcome = world.last_outcome.as_ref().expect("no check outcome");
    assert!(!outcome.success);
    assert_eq!(outcome.summary(), "Check failed");
}

#[then(expr = "the stored last post title should be {string}")]
async fn stored_title(world: &mut ForumWatchWorld, expected: String) {
    let config = world.store().config().await.unwrap().expect("config saved");
    assert_eq!(config.last_post_title.as_deref(), Some(expected.as_str()));
}

#[then(expr = "the run status last error should contain {string}")]
async fn last_error_contains(world: &mut ForumWatchWorld, expected: String) {
    let status = world.store().status().await.unwrap();
    let error = status.last_error.expect("no last error recorded");
    assert!(
        error.contains(&expected),
        "Expected last error containing '{}', got '{}'",
        expected,
        error
    );
}

#[then("the run status should have a successful check")]
async fn successful_check_recorded(world: &mut ForumWatchWorld) {
    let status = world.store().status().await.unwrap();
    assert!(status.last_check_at.is_some());
    assert!(status.last_successful_check_at.is_some());
    assert!(status.last_error.is_none());
}
