//! BDD step definitions for state persistence feature

use std::sync::Arc;

use chrono::TimeDelta;
use cucumber::{given, then, when};

use hostwatch::clock::Clock;
use hostwatch::state_store::{AlertState, StateStore};

use crate::world::{HostwatchWorld, RecordingNotifier};

#[given(expr = "a state file recording an alert for {string} {int} minutes ago")]
fn state_file_with_alert(world: &mut HostwatchWorld, check_id: String, minutes: i64) {
    let at = (world.clock().now() - TimeDelta::minutes(minutes)).naive_utc();
    let mut state = AlertState::new();
    state.record(&check_id, at);
    StateStore::new(world.state_path()).save(&state).unwrap();
}

#[given("a corrupt state file")]
fn corrupt_state_file(world: &mut HostwatchWorld) {
    std::fs::write(world.state_path(), "{\"sys_disk\": not-a-timestamp").unwrap();
}

#[when("the service restarts")]
fn service_restarts(world: &mut HostwatchWorld) {
    world.alerter = None;
    world.hostwatch = None;
    world.notifier = Some(Arc::new(RecordingNotifier::default()));
}

#[then(expr = "an alert for {string} should be allowed")]
fn alert_allowed(world: &mut HostwatchWorld, check_id: String) {
    assert!(world.alerter().should_alert(Some(&check_id)));
}

#[then(expr = "an alert for {string} should be held back")]
fn alert_held_back(world: &mut HostwatchWorld, check_id: String) {
    assert!(!world.alerter().should_alert(Some(&check_id)));
}

#[then(expr = "the state file should hold {int} check(s)")]
fn state_file_holds(world: &mut HostwatchWorld, count: usize) {
    let state = StateStore::new(world.state_path()).load();
    assert_eq!(state.len(), count, "state: {:?}", state);
}
