//! The running pipeline: poller, generator, versioner, channel and cache together.

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{RecordingCache, SwitchableResolver, NODE_ID};
use subset_xds::prelude::*;
use subset_xds::types::endpoint::ClusterLoadAssignment;

const TICK: Duration = Duration::from_millis(100);

fn config() -> ControlPlaneConfig {
    ControlPlaneConfig {
        node_id: NODE_ID.to_string(),
        poller: PollerConfig {
            interval: TICK,
            ..PollerConfig::default()
        },
        ..ControlPlaneConfig::default()
    }
}

fn served_addresses(cache: &dyn Cache, node: NodeHash) -> Vec<String> {
    let Some(snapshot) = cache.get_snapshot(node) else {
        return Vec::new();
    };
    snapshot
        .get_resources(TypeUrl::ENDPOINT)
        .and_then(|c| c.get("service1"))
        .and_then(|r| r.downcast_ref::<ClusterLoadAssignment>())
        .map(|cla| {
            cla.lb_endpoints()
                .map(|lb| lb.endpoint.address.socket_address.address.clone())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test(start_paused = true)]
async fn every_snapshot_is_applied_in_order() {
    let cache = Arc::new(RecordingCache::new());
    let resolver = Arc::new(SwitchableResolver::new(["10.0.0.1", "10.0.0.2"]));

    let running = ControlPlane::new(config(), resolver, cache.clone()).start().await.unwrap();
    assert_eq!(cache.applied(), ["0.0"]);

    for _ in 0..50 {
        if cache.applied().len() >= 6 {
            break;
        }
        tokio::time::sleep(TICK).await;
    }
    running.stop(Duration::from_secs(1)).await.unwrap();

    let applied = cache.applied();
    assert!(applied.len() >= 6, "{applied:?}");
    let expected: Vec<String> = (0..applied.len()).map(|i| format!("{i}.0")).collect();
    assert_eq!(applied, expected);
    assert_eq!(cache.inner().stats().snapshots_rejected(), 0);
}

#[tokio::test(start_paused = true)]
async fn registry_changes_reach_the_cache() {
    let cache = Arc::new(ShardedCache::new());
    let resolver = SwitchableResolver::new(["10.0.0.1"]);

    let running = ControlPlane::new(config(), Arc::new(resolver.clone()), cache.clone())
        .start()
        .await
        .unwrap();
    let node = running.node();
    assert_eq!(served_addresses(&*cache, node), ["10.0.0.1"]);

    resolver.set(["10.0.0.5", "10.0.0.6"]);
    for _ in 0..20 {
        if served_addresses(&*cache, node) == ["10.0.0.5", "10.0.0.6"] {
            break;
        }
        tokio::time::sleep(TICK).await;
    }
    assert_eq!(served_addresses(&*cache, node), ["10.0.0.5", "10.0.0.6"]);

    running.stop(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn start_waits_out_resolution_failures() {
    let cache = Arc::new(ShardedCache::new());
    let resolver = SwitchableResolver::default();

    let start = ControlPlane::new(config(), Arc::new(resolver.clone()), cache.clone()).start();
    let recover = async {
        tokio::time::sleep(TICK * 3 + TICK / 2).await;
        assert_eq!(cache.snapshot_count(), 0);
        resolver.set(["10.0.0.1"]);
    };
    let (running, ()) = tokio::join!(start, recover);
    let running = running.unwrap();

    // Failed polls never reach the versioner.
    assert_eq!(cache.get_snapshot(running.node()).unwrap().version(), "0.0");
    running.stop(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn transient_failures_after_start_keep_the_last_snapshot() {
    let cache = Arc::new(RecordingCache::new());
    let resolver = SwitchableResolver::new(["10.0.0.1"]);

    let running = ControlPlane::new(config(), Arc::new(resolver.clone()), cache.clone())
        .start()
        .await
        .unwrap();
    let node = running.node();

    resolver.clear();
    let before = cache.applied().len();
    tokio::time::sleep(TICK * 5).await;
    // At most the snapshot already in flight lands.
    assert!(cache.applied().len() <= before + 1);
    assert_eq!(served_addresses(&*cache, node), ["10.0.0.1"]);

    resolver.set(["10.0.0.2"]);
    for _ in 0..20 {
        if served_addresses(&*cache, node) == ["10.0.0.2"] {
            break;
        }
        tokio::time::sleep(TICK).await;
    }
    assert_eq!(served_addresses(&*cache, node), ["10.0.0.2"]);

    running.stop(Duration::from_secs(1)).await.unwrap();
    let applied = cache.applied();
    let expected: Vec<String> = (0..applied.len()).map(|i| format!("{i}.0")).collect();
    assert_eq!(applied, expected);
}

#[tokio::test(start_paused = true)]
async fn rejected_snapshot_stops_the_pipeline() {
    let cache = Arc::new(RecordingCache::rejecting_from(2));
    let resolver = Arc::new(SwitchableResolver::new(["10.0.0.1"]));

    let running = ControlPlane::new(config(), resolver, cache.clone()).start().await.unwrap();
    let err = running.wait().await.unwrap_err();

    assert!(
        matches!(err, XdsError::SnapshotRejected { ref version, .. } if version == "2.0"),
        "{err}"
    );
    assert_eq!(cache.applied(), ["0.0", "1.0"]);
    assert_eq!(cache.get_snapshot(NodeHash::from_id(NODE_ID)).unwrap().version(), "1.0");
}

#[tokio::test(start_paused = true)]
async fn rejected_first_snapshot_fails_start() {
    let cache = Arc::new(RecordingCache::rejecting_from(0));
    let resolver = Arc::new(SwitchableResolver::new(["10.0.0.1"]));

    let err = ControlPlane::new(config(), resolver, cache.clone()).start().await.unwrap_err();

    assert!(matches!(err, XdsError::SnapshotRejected { .. }), "{err}");
    assert_eq!(cache.snapshot_count(), 0);
}

#[tokio::test]
async fn channel_holds_one_snapshot_and_keeps_order() {
    let set = ResourceGenerator::default()
        .generate(&integration_tests::service1_model())
        .unwrap();
    let mut versioner = SnapshotVersioner::new();
    let (sender, mut receiver) = snapshot_channel();

    sender.publish(versioner.next_snapshot(&set).unwrap()).await.unwrap();

    let second = versioner.next_snapshot(&set).unwrap();
    match sender.try_publish(second.clone()) {
        Err(XdsError::ChannelFull { pending }) => assert_eq!(pending, "1.0"),
        other => panic!("expected a full channel, got {other:?}"),
    }

    // The blocked publish completes once the consumer takes the pending snapshot.
    let producer = {
        let sender = sender.clone();
        tokio::spawn(async move { sender.publish(second).await })
    };
    tokio::task::yield_now().await;
    assert!(!producer.is_finished());

    assert_eq!(receiver.consume().await.unwrap().version(), "0.0");
    producer.await.unwrap().unwrap();
    assert_eq!(receiver.consume().await.unwrap().version(), "1.0");

    drop(receiver);
    let third = versioner.next_snapshot(&set).unwrap();
    assert!(matches!(sender.publish(third).await, Err(XdsError::ChannelClosed)));
}

#[tokio::test]
async fn poller_labels_resolved_addresses() {
    let resolver =
        Arc::new(StaticResolver::new().with("target", ["10.0.0.3", "10.0.0.1", "10.0.0.2"]));
    let poller = RegistryPoller::new(resolver, PollerConfig::default()).unwrap();

    let model = poller.poll_once().await.unwrap();
    let service = model.get("service1").unwrap();
    assert_eq!(service.port(), 8000);

    let labels: Vec<_> = service
        .endpoints()
        .iter()
        .map(|e| {
            (
                e.address().to_string(),
                e.metadata()["host"].clone(),
                e.metadata()["group"].clone(),
            )
        })
        .collect();
    assert_eq!(
        labels,
        [
            ("10.0.0.1".to_string(), "target-1".to_string(), "a".to_string()),
            ("10.0.0.2".to_string(), "target-2".to_string(), "b".to_string()),
            ("10.0.0.3".to_string(), "target-3".to_string(), "a".to_string()),
        ]
    );
}
