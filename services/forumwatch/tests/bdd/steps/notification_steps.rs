//! BDD step definitions for operator notifications

use cucumber::when;

use crate::world::ForumWatchWorld;

#[when("a test message is sent")]
async fn test_message_sent(world: &mut ForumWatchWorld) {
    let result = world.controller().test_notify().await;
    world.record(result);
}

#[when("a health check is requested")]
async fn health_check_requested(world: &mut ForumWatchWorld) {
    let result = world.controller().health_check().await;
    world.record(result);
}
