//! Discovery loop behaviour with scripted probes.
//!
//! Tokio time is paused, so the loop ticks deterministically; backoff windows
//! are driven separately through the filter's manual clock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use instance_discovery::lifecycle::{startup, DiscoveryTask};
use instance_discovery::{DiscoveryScheduler, InstanceKey};

mod common;

use common::{backoff, discovery_config, manual_filter, Behaviour, SharedProber};

const TICK: Duration = Duration::from_secs(5);

#[tokio::test(start_paused = true)]
async fn dead_instance_is_skipped_until_its_window_elapses() {
    let healthy = InstanceKey::new("healthy", 3306);
    let dead = InstanceKey::new("dead", 3306);
    let config = discovery_config(&[healthy.clone(), dead.clone()]);

    let (filter, metrics, clock) = manual_filter(backoff(5, 1.0, 300));
    let prober = SharedProber::default();
    prober.0.set(&healthy, Behaviour::Up);
    prober.0.set(&dead, Behaviour::Down);

    let scheduler = Arc::new(DiscoveryScheduler::new(config, filter.clone(), prober.clone()));
    let task = DiscoveryTask::spawn(Arc::clone(&scheduler));

    // First tick fires immediately.
    sleep(Duration::from_millis(10)).await;
    assert_eq!(prober.0.probes(&healthy), 1);
    assert_eq!(prober.0.probes(&dead), 1);
    assert_eq!(filter.instance_recheck_needed(&dead), (true, false));
    assert_eq!(metrics.live(), 1);

    // Backoff window has not elapsed on the filter clock: dead is throttled.
    sleep(TICK).await;
    assert_eq!(prober.0.probes(&healthy), 2);
    assert_eq!(prober.0.probes(&dead), 1);

    clock.advance(TICK);
    sleep(TICK).await;
    assert_eq!(prober.0.probes(&healthy), 3);
    assert_eq!(prober.0.probes(&dead), 2);
    assert_eq!(filter.record(&dead).unwrap().try_count, 2);

    // Recovery removes it from the filter.
    prober.0.set(&dead, Behaviour::Up);
    clock.advance(TICK);
    sleep(TICK).await;
    assert_eq!(prober.0.probes(&dead), 3);
    assert_eq!(filter.instance_recheck_needed(&dead), (false, false));
    assert_eq!(metrics.live(), 0);

    task.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn hung_recheck_on_dedicated_pool_does_not_block_healthy_instances() {
    let healthy = InstanceKey::new("healthy", 3306);
    let dead = InstanceKey::new("dead", 3306);
    let mut config = discovery_config(&[dead.clone(), healthy.clone()]);
    config.polling.max_concurrency = 1;
    config.dead_instances.discovery_max_concurrency = 1;

    let (filter, _, clock) = manual_filter(backoff(5, 1.0, 300));
    let prober = SharedProber::default();
    prober.0.set(&healthy, Behaviour::Up);
    prober.0.set(&dead, Behaviour::Down);

    let scheduler = Arc::new(DiscoveryScheduler::new(config, filter, prober.clone()));
    assert!(scheduler.has_dedicated_dead_pool());
    let task = DiscoveryTask::spawn(Arc::clone(&scheduler));

    sleep(Duration::from_millis(10)).await;
    assert_eq!(prober.0.probes(&dead), 1);

    // The recheck now hangs forever on the dead pool.
    prober.0.set(&dead, Behaviour::Hang);
    clock.advance(TICK);
    sleep(TICK).await;
    assert_eq!(prober.0.probes(&dead), 2);
    assert_eq!(scheduler.in_flight(), 1);

    for _ in 0..3 {
        sleep(TICK).await;
    }
    assert_eq!(prober.0.probes(&healthy), 5);
    // Never queued twice while its probe is still pending.
    assert_eq!(prober.0.probes(&dead), 2);

    task.stop().await.unwrap();
    assert_eq!(scheduler.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn run_until_applies_reloads_and_stops() {
    let a = InstanceKey::new("a", 1);
    let b = InstanceKey::new("b", 2);
    let config = discovery_config(&[a.clone()]);

    let (filter, _, _) = manual_filter(backoff(5, 1.0, 300));
    let prober = SharedProber::default();
    prober.0.set(&a, Behaviour::Up);
    prober.0.set(&b, Behaviour::Up);

    let scheduler = Arc::new(DiscoveryScheduler::new(config, filter, prober.clone()));
    let (tx, rx) = mpsc::unbounded_channel();

    let mut reloaded = discovery_config(&[a.clone(), b.clone()]);
    reloaded.dead_instances.poll_secs_multiply_factor = 2.0;
    tx.send(reloaded).unwrap();

    startup::run_until(Arc::clone(&scheduler), rx, sleep(Duration::from_secs(12))).await;

    assert_eq!(scheduler.config().polling.instances, vec![a.clone(), b.clone()]);
    assert_eq!(scheduler.filter().settings().multiply_factor, 2.0);
    assert!(prober.0.probes(&a) >= 2);
    assert!(prober.0.probes(&b) >= 2);
}

#[tokio::test(start_paused = true)]
async fn failure_finishing_after_removal_does_not_track_instance() {
    let a = InstanceKey::new("a", 1);
    let b = InstanceKey::new("b", 2);
    let config = discovery_config(&[a.clone(), b.clone()]);

    let (filter, metrics, _) = manual_filter(backoff(5, 1.0, 300));
    let prober = SharedProber::default();
    prober.0.set(&a, Behaviour::SlowDown(Duration::from_secs(1)));
    prober.0.set(&b, Behaviour::SlowDown(Duration::from_secs(1)));

    let scheduler = Arc::new(DiscoveryScheduler::new(config, filter.clone(), prober.clone()));
    let task = DiscoveryTask::spawn(Arc::clone(&scheduler));

    // Both probes are still running when `b` is removed.
    sleep(Duration::from_millis(500)).await;
    assert_eq!(scheduler.in_flight(), 2);
    scheduler.apply_config(discovery_config(&[a.clone()]));

    sleep(Duration::from_secs(2)).await;
    assert_eq!(filter.instance_recheck_needed(&a), (true, false));
    assert_eq!(filter.instance_recheck_needed(&b), (false, false));
    assert_eq!(filter.len(), 1);
    assert_eq!(metrics.live(), 1);

    task.stop().await.unwrap();
}
