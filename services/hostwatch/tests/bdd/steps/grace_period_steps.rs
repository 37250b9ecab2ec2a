//! BDD step definitions for container grace period feature

use cucumber::{given, then, when};

use crate::world::HostwatchWorld;

#[given(expr = "container {string} is monitored with a grace period of {int} seconds")]
fn container_is_monitored(world: &mut HostwatchWorld, name: String, grace: u64) {
    let config = world.config();
    config.docker.containers.push(name);
    config.docker.grace_period_seconds = grace;
}

fn set_container_state(world: &mut HostwatchWorld, name: String, state: String) {
    world
        .runtime
        .containers
        .lock()
        .unwrap()
        .insert(name, state);
}

#[given(expr = "container {string} has state {word}")]
fn container_has_state(world: &mut HostwatchWorld, name: String, state: String) {
    set_container_state(world, name, state);
}

#[when(expr = "container {string} changes to {word}")]
fn container_changes_to(world: &mut HostwatchWorld, name: String, state: String) {
    set_container_state(world, name, state);
}

#[when(expr = "container {string} disappears")]
fn container_disappears(world: &mut HostwatchWorld, name: String) {
    world.runtime.containers.lock().unwrap().remove(&name);
}

#[when("the checks run")]
async fn checks_run(world: &mut HostwatchWorld) {
    let summary = world.hostwatch().tick().await;
    world.last_summary = Some(summary);
}

#[when(expr = "the checks run every {int} seconds for {int} seconds")]
async fn checks_run_repeatedly(world: &mut HostwatchWorld, every: i64, total: i64) {
    let mut elapsed = 0;
    while elapsed <= total {
        let summary = world.hostwatch().tick().await;
        world.last_summary = Some(summary);
        world.advance(chrono::TimeDelta::seconds(every));
        elapsed += every;
    }
}

#[then(expr = "check {string} should be within its grace period")]
fn within_grace_period(world: &mut HostwatchWorld, check_id: String) {
    let summary = world.last_summary.clone().expect("checks have not run");
    assert!(summary.pending_grace >= 1, "summary: {:?}", summary);
    assert!(world
        .hostwatch()
        .engine()
        .downtime()
        .down_since(&check_id)
        .is_some());
}

#[then(expr = "check {string} should not be tracked as down")]
fn not_tracked_as_down(world: &mut HostwatchWorld, check_id: String) {
    assert!(world
        .hostwatch()
        .engine()
        .downtime()
        .down_since(&check_id)
        .is_none());
}

#[then(expr = "the last delivered alert should be titled {string}")]
fn last_alert_titled(world: &mut HostwatchWorld, title: String) {
    let sent = world.notifier().sent();
    let last = sent.last().expect("no alert was delivered");
    assert_eq!(last.title, title);
}

#[then(expr = "the last delivered alert should mention {string}")]
fn last_alert_mentions(world: &mut HostwatchWorld, text: String) {
    let sent = world.notifier().sent();
    let last = sent.last().expect("no alert was delivered");
    assert!(last.body.contains(&text), "body: {}", last.body);
}
