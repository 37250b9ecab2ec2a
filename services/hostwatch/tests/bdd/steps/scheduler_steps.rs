//! BDD step definitions for check scheduler feature

use std::sync::atomic::Ordering;

use cucumber::{given, then};

use hostwatch::config::TcpCheckConfig;

use crate::world::HostwatchWorld;

#[given("the docker runtime is unavailable")]
fn docker_unavailable(world: &mut HostwatchWorld) {
    world.runtime.unavailable.store(true, Ordering::SeqCst);
}

#[given(expr = "disk usage is at {float} percent")]
fn disk_usage_at(world: &mut HostwatchWorld, percent: f64) {
    *world.sampler.disk.lock().unwrap() = percent;
}

#[given(expr = "memory usage is at {float} percent")]
fn memory_usage_at(world: &mut HostwatchWorld, percent: f64) {
    *world.sampler.memory.lock().unwrap() = percent;
}

#[given(expr = "a TCP check {string} on {word} port {int}")]
fn tcp_check(world: &mut HostwatchWorld, name: String, host: String, port: u16) {
    world.config().functional.tcp_checks.push(TcpCheckConfig { name, host, port });
}

#[given(expr = "port {int} refuses connections")]
fn port_refuses(world: &mut HostwatchWorld, port: u16) {
    world.tcp.refused.lock().unwrap().insert(port);
}

#[then(expr = "the monitors should have run in order {string}")]
fn monitors_in_order(world: &mut HostwatchWorld, order: String) {
    let expected: Vec<&str> = order.split(',').map(str::trim).collect();
    assert_eq!(world.hostwatch().engine().monitor_names(), expected);
    let summary = world.last_summary.clone().expect("checks have not run");
    assert_eq!(summary.monitors_run, expected.len());
}

#[then(expr = "monitor {string} should have failed")]
fn monitor_failed(world: &mut HostwatchWorld, name: String) {
    let summary = world.last_summary.clone().expect("checks have not run");
    assert!(
        summary.failed_monitors.contains(&name),
        "failed monitors: {:?}",
        summary.failed_monitors
    );
}

#[then("no monitor should have failed")]
fn no_monitor_failed(world: &mut HostwatchWorld) {
    let summary = world.last_summary.clone().expect("checks have not run");
    assert!(summary.failed_monitors.is_empty(), "{:?}", summary);
}

#[then(expr = "an alert titled {string} should have been delivered")]
fn alert_titled_delivered(world: &mut HostwatchWorld, title: String) {
    let titles: Vec<String> = world
        .notifier()
        .sent()
        .into_iter()
        .map(|a| a.title)
        .collect();
    assert!(titles.contains(&title), "delivered titles: {:?}", titles);
}
