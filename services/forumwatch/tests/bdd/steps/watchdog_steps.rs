//! BDD step definitions for the stall watchdog

use cucumber::{given, then, when};

use forumwatch::controller::WatchdogVerdict;
use forumwatch::store::RecordStore;

use crate::world::ForumWatchWorld;

#[given(expr = "the last check happened {int} minutes ago")]
async fn last_check_ago(world: &mut ForumWatchWorld, minutes: i64) {
    let now = chrono::Utc::now();
    let at = now - chrono::Duration::minutes(minutes);
    world
        .store()
        .update_status(Box::new(move |s| s.last_check_at = Some(at)), now)
        .await
        .unwrap();
}

#[given(expr = "the service started {int} minutes ago")]
async fn started_ago(world: &mut ForumWatchWorld, minutes: i64) {
    let now = chrono::Utc::now();
    let at = now - chrono::Duration::minutes(minutes);
    world
        .store()
        .update_status(Box::new(move |s| s.service_started_at = Some(at)), now)
        .await
        .unwrap();
}

#[when("the watchdog evaluates the service")]
async fn watchdog_evaluates(world: &mut ForumWatchWorld) {
    let result = world.controller().watchdog_pass().await;
    world.last_verdict = world.record(result);
}

#[then("the watchdog should report a recovery")]
fn watchdog_recovered(world: &mut ForumWatchWorld) {
    assert_eq!(world.last_verdict, Some(WatchdogVerdict::Recovered));
}

#[then("the watchdog should report a healthy service")]
fn watchdog_healthy(world: &mut ForumWatchWorld) {
    assert_eq!(world.last_verdict, Some(WatchdogVerdict::Healthy));
}

#[then("the watchdog should report an idle service")]
fn watchdog_idle(world: &mut ForumWatchWorld) {
    assert_eq!(world.last_verdict, Some(WatchdogVerdict::Idle));
}
