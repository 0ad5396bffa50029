//! Load tests for the serving cache with 1000 nodes.
//!
//! Every snapshot here is generated and versioned the way the pipeline does
//! it, so the cache's validation runs on each set:
//! - 1000 nodes served from one cache
//! - Parallel snapshot updates across tasks
//! - Readers racing writers on the same nodes
//!
//! Run with: `cargo test --package integration-tests --test load_tests -- --nocapture`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use integration_tests::model_with_services;
use subset_xds::pipeline::version;
use subset_xds::prelude::*;
use tokio::sync::Barrier;

fn generated_set(services: usize) -> GeneratedResourceSet {
    ResourceGenerator::default()
        .generate(&model_with_services(services))
        .expect("generate")
}

fn node(i: usize) -> NodeHash {
    NodeHash::from_id(&format!("envoy-sidecar-{i}"))
}

/// Test that the cache can serve 1000 nodes.
#[tokio::test]
async fn test_1000_nodes() {
    let cache = Arc::new(ShardedCache::new());
    let num_nodes = 1000;
    let set = generated_set(10);
    let nodes: Vec<NodeHash> = (0..num_nodes).map(node).collect();

    let start = Instant::now();
    for node in &nodes {
        cache.set_snapshot(*node, version(&set, 0).unwrap()).unwrap();
    }
    let set_duration = start.elapsed();
    println!(
        "Set {} snapshots in {:?} ({:.2} µs/op)",
        num_nodes,
        set_duration,
        set_duration.as_micros() as f64 / num_nodes as f64
    );

    let start = Instant::now();
    for node in &nodes {
        assert_eq!(cache.get_snapshot(*node).unwrap().total_resources(), 22);
    }
    let get_duration = start.elapsed();
    println!(
        "Get {} snapshots in {:?} ({:.2} µs/op)",
        num_nodes,
        get_duration,
        get_duration.as_micros() as f64 / num_nodes as f64
    );

    let stats = cache.stats();
    assert_eq!(cache.snapshot_count(), num_nodes);
    assert_eq!(stats.snapshots_set(), num_nodes as u64);
    assert_eq!(stats.snapshot_hits(), num_nodes as u64);
    assert_eq!(stats.hit_rate(), 1.0);
}

/// Test concurrent updates with 1000 nodes across multiple tasks.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_1000_nodes() {
    let cache = Arc::new(ShardedCache::new());
    let num_nodes = 1000;
    let num_tasks = 10;
    let nodes_per_task = num_nodes / num_tasks;
    let set = Arc::new(generated_set(3));

    let barrier = Arc::new(Barrier::new(num_tasks));
    let total_ops = Arc::new(AtomicU64::new(0));
    let start = Instant::now();

    let mut handles = Vec::new();
    for task_id in 0..num_tasks {
        let cache = Arc::clone(&cache);
        let barrier = Arc::clone(&barrier);
        let total_ops = Arc::clone(&total_ops);
        let set = Arc::clone(&set);

        handles.push(tokio::spawn(async move {
            barrier.wait().await;

            // Two rounds per node, so every node sees a version advance.
            for sequence in 0..2 {
                for i in task_id * nodes_per_task..(task_id + 1) * nodes_per_task {
                    cache.set_snapshot(node(i), version(&set, sequence).unwrap()).unwrap();
                    total_ops.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    for handle in handles {
        handle.await.expect("Task panicked");
    }

    let duration = start.elapsed();
    let ops = total_ops.load(Ordering::Relaxed);
    println!(
        "Concurrent set: {} ops in {:?} ({:.2} µs/op, {:.0} ops/sec)",
        ops,
        duration,
        duration.as_micros() as f64 / ops as f64,
        ops as f64 / duration.as_secs_f64()
    );

    assert_eq!(ops, 2 * num_nodes as u64);
    assert_eq!(cache.snapshot_count(), num_nodes);
    assert_eq!(cache.stats().snapshots_rejected(), 0);
    for i in 0..num_nodes {
        assert_eq!(cache.get_snapshot(node(i)).unwrap().version(), "1.0");
    }
}

/// Test readers racing writers with 1000 nodes.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_workload_1000_nodes() {
    let cache = Arc::new(ShardedCache::new());
    let num_nodes = 1000;
    let rounds = 5u64;
    let sets: Arc<Vec<GeneratedResourceSet>> = Arc::new((1..=3).map(generated_set).collect());

    for i in 0..num_nodes {
        cache.set_snapshot(node(i), version(&sets[0], 0).unwrap()).unwrap();
    }

    let writer = {
        let cache = Arc::clone(&cache);
        let sets = Arc::clone(&sets);
        tokio::spawn(async move {
            for sequence in 1..=rounds {
                let set = &sets[sequence as usize % sets.len()];
                for i in 0..num_nodes {
                    cache.set_snapshot(node(i), version(set, sequence).unwrap()).unwrap();
                }
                tokio::task::yield_now().await;
            }
        })
    };

    let mut readers = Vec::new();
    for reader in 0..4 {
        let cache = Arc::clone(&cache);
        readers.push(tokio::spawn(async move {
            let mut reads = 0u64;
            for round in 0..rounds as usize {
                for i in (reader..num_nodes).step_by(4) {
                    let served = cache.get_snapshot(node(i)).expect("node was seeded");
                    // Whatever version is served must be whole.
                    served.consistent().unwrap();
                    reads += 1;
                }
                if round % 2 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            reads
        }));
    }

    writer.await.expect("writer panicked");
    let mut reads = 0;
    for reader in readers {
        reads += reader.await.expect("reader panicked");
    }

    println!("Mixed workload: {reads} reads alongside {} writes", rounds as usize * num_nodes);
    assert_eq!(reads, rounds * num_nodes as u64);
    assert_eq!(cache.stats().snapshots_rejected(), 0);
    for i in 0..num_nodes {
        assert_eq!(cache.get_snapshot(node(i)).unwrap().version(), format!("{rounds}.0"));
    }
}
