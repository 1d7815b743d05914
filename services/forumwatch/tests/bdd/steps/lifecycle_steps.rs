//! BDD step definitions for the service lifecycle and restart recovery

use std::sync::Arc;

use cucumber::{given, then, when};

use forumwatch::controller::RunState;
use forumwatch::records::{RunStatus, UpdateConfig};
use forumwatch::store::{JsonStore, RecordStore};

use crate::world::{ForumWatchWorld, FORUM_URL};

// --- Given / When steps ---

#[given("the service is started")]
#[when("the service is started")]
async fn service_started(world: &mut ForumWatchWorld) {
    let result = world.controller().start().await;
    world.record(result);
}

#[given("the service is stopped")]
#[when("the service is stopped")]
async fn service_stopped(world: &mut ForumWatchWorld) {
    let result = world.controller().stop().await;
    world.record(result);
}

#[when("the service is restarted")]
async fn service_restarted(world: &mut ForumWatchWorld) {
    let result = world.controller().restart().await;
    world.record(result);
}

#[when(expr = "the configuration is updated to check every {int} minutes")]
async fn configuration_updated(world: &mut ForumWatchWorld, interval: u32) {
    let update = UpdateConfig {
        telegram_bot_token: "123:abc".to_string(),
        telegram_chat_id: "-100".to_string(),
        forum_url: FORUM_URL.to_string(),
        check_interval: interval,
    };
    let result = world.controller().update_config(&update).await;
    world.record(result);
}

#[given("a store file left behind by a running service")]
async fn store_left_running(world: &mut ForumWatchWorld) {
    let path = world.store_path();
    let store = JsonStore::open(&path, 500).await.unwrap();
    let now = chrono::Utc::now();
    store
        .initialize(&ForumWatchWorld::seed(30), now)
        .await
        .unwrap();
    store
        .update_status(Box::new(move |s| s.mark_started(now)), now)
        .await
        .unwrap();
}

#[given("resuming on boot is disabled")]
fn resume_disabled(world: &mut ForumWatchWorld) {
    world.resume_on_boot = Some(false);
}

#[when("the service boots from that store")]
async fn service_boots(world: &mut ForumWatchWorld) {
    let path = world.store_path();
    let store = JsonStore::open(&path, 500).await.unwrap();
    world.build_with_store(Arc::new(store)).await;

    let resume = world.config().monitor.resume_on_boot;
    let result = world.controller().resume(resume).await;
    world.record(result);
}

// --- Then steps ---

#[then("the service should be running")]
async fn service_should_be_running(world: &mut ForumWatchWorld) {
    assert_eq!(world.controller().state().await, RunState::Running);
    let status: RunStatus = world.store().status().await.unwrap();
    assert!(status.is_running, "persisted status should say running");
}

#[then("the service should not be running")]
async fn service_should_not_be_running(world: &mut ForumWatchWorld) {
    assert_eq!(world.controller().state().await, RunState::Stopped);
    let status: RunStatus = world.store().status().await.unwrap();
    assert!(!status.is_running, "persisted status should say stopped");
}

#[then("the run status should record a start time")]
async fn status_has_start_time(world: &mut ForumWatchWorld) {
    let status = world.store().status().await.unwrap();
    assert!(status.service_started_at.is_some());
}

#[then("the run status should have no start time")]
async fn status_has_no_start_time(world: &mut ForumWatchWorld) {
    let status = world.store().status().await.unwrap();
    assert!(status.service_started_at.is_none());
}

#[then(expr = "the active schedule should be {string}")]
async fn active_schedule(world: &mut ForumWatchWorld, expected: String) {
    let schedule = world
        .controller()
        .schedule()
        .await
        .expect("service should be running");
    assert_eq!(schedule.to_string(), expected);
}

#[then(expr = "the saved check interval should be {int} minutes")]
async fn saved_interval(world: &mut ForumWatchWorld, expected: u32) {
    let config = world.store().config().await.unwrap().expect("config saved");
    assert_eq!(config.check_interval, expected);
}
