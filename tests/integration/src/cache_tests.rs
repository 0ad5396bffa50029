//! Serving cache behaviour with generated snapshots.

use std::sync::Arc;

use integration_tests::{model_with_services, service1_model, NODE_ID};
use subset_xds::pipeline::version;
use subset_xds::prelude::*;

fn snapshot(model: &ServiceModel, sequence: u64) -> Snapshot {
    let set = ResourceGenerator::default().generate(model).unwrap();
    version(&set, sequence).unwrap()
}

#[test]
fn generated_snapshot_is_served() {
    let cache = ShardedCache::new();
    let node = NodeHash::from_id(NODE_ID);

    cache.set_snapshot(node, snapshot(&service1_model(), 0)).unwrap();

    let served = cache.get_snapshot(node).unwrap();
    assert_eq!(served.version(), "0.0");
    assert!(served.get_resources(TypeUrl::CLUSTER).unwrap().contains("service1"));
    assert_eq!(cache.stats().snapshots_set(), 1);
    assert_eq!(cache.stats().snapshot_hits(), 1);
}

#[test]
fn later_snapshot_replaces_earlier_one() {
    let cache = ShardedCache::new();
    let node = NodeHash::from_id(NODE_ID);

    cache.set_snapshot(node, snapshot(&service1_model(), 0)).unwrap();
    cache.set_snapshot(node, snapshot(&model_with_services(3), 1)).unwrap();

    let served = cache.get_snapshot(node).unwrap();
    assert_eq!(served.version(), "1.0");
    assert_eq!(served.get_resources(TypeUrl::CLUSTER).unwrap().len(), 3);
    assert_eq!(cache.snapshot_count(), 1);
}

#[test]
fn stale_snapshot_is_rejected_and_old_one_kept() {
    let cache = ShardedCache::new();
    let node = NodeHash::from_id(NODE_ID);

    cache.set_snapshot(node, snapshot(&model_with_services(2), 5)).unwrap();
    let err = cache.set_snapshot(node, snapshot(&service1_model(), 4)).unwrap_err();

    assert!(matches!(err, XdsError::SnapshotRejected { .. }), "{err}");
    assert_eq!(cache.get_snapshot(node).unwrap().version(), "5.0");
    assert_eq!(cache.stats().snapshots_rejected(), 1);
}

#[test]
fn incomplete_snapshot_is_rejected() {
    let cache = ShardedCache::new();
    let node = NodeHash::from_id(NODE_ID);
    let set = ResourceGenerator::default().generate(&service1_model()).unwrap();

    let [endpoints, clusters, routes, _listeners] = set.to_resources();
    let partial = Snapshot::builder()
        .version("0.0")
        .resources(endpoints.0, endpoints.1)
        .resources(clusters.0, clusters.1)
        .resources(routes.0, routes.1)
        .build();

    match cache.set_snapshot(node, partial).unwrap_err() {
        XdsError::SnapshotRejected { reason, .. } => {
            assert!(reason.contains("Listener"), "{reason}")
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(!cache.has_snapshot(node));
}

#[test]
fn nodes_are_kept_apart() {
    let cache = ShardedCache::new();
    let edge = NodeHash::from_id("edge");
    let internal = NodeHash::from_id("internal");

    cache.set_snapshot(edge, snapshot(&service1_model(), 0)).unwrap();
    cache.set_snapshot(internal, snapshot(&model_with_services(4), 0)).unwrap();

    assert_eq!(cache.get_snapshot(edge).unwrap().total_resources(), 4);
    assert_eq!(cache.get_snapshot(internal).unwrap().total_resources(), 10);

    cache.clear_snapshot(edge);
    assert!(cache.get_snapshot(edge).is_none());
    assert_eq!(cache.nodes(), vec![internal]);
}

#[tokio::test]
async fn subscribers_see_the_latest_version() {
    let cache = Arc::new(ShardedCache::new());
    let node = NodeHash::from_id(NODE_ID);
    let mut updates = cache.subscribe();
    assert!(updates.borrow().is_none());

    let writer = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            for sequence in 0..3 {
                cache.set_snapshot(node, snapshot(&service1_model(), sequence)).unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let update = updates
        .wait_for(|u| u.as_ref().is_some_and(|u| u.version.as_str() == "2.0"))
        .await
        .unwrap()
        .clone()
        .unwrap();
    assert_eq!(update.node, node);
    writer.await.unwrap();
}

#[tokio::test]
async fn concurrent_readers_during_updates() {
    let cache = Arc::new(ShardedCache::new());
    let node = NodeHash::from_id(NODE_ID);
    cache.set_snapshot(node, snapshot(&service1_model(), 0)).unwrap();

    let mut readers = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        readers.push(tokio::spawn(async move {
            for _ in 0..100 {
                let served = cache.get_snapshot(node).unwrap();
                served.consistent().unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }

    for sequence in 1..=20 {
        let services = (sequence % 4) as usize + 1;
        cache.set_snapshot(node, snapshot(&model_with_services(services), sequence)).unwrap();
        tokio::task::yield_now().await;
    }

    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(cache.get_snapshot(node).unwrap().version(), "20.0");
}
