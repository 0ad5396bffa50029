//! Generated snapshots, end to end from a service model to encoded resources.

use integration_tests::{endpoint, model_with_services, service1_model};
use subset_xds::pipeline::version;
use subset_xds::prelude::*;
use subset_xds::types::cluster::Cluster;
use subset_xds::types::endpoint::ClusterLoadAssignment;
use subset_xds::types::route::RouteConfiguration;

fn decode(resource: &BoxResource) -> serde_json::Value {
    let any = resource.encode().unwrap();
    assert_eq!(any.type_url, resource.type_url());
    serde_json::from_slice(&any.value).unwrap()
}

fn generate(model: &ServiceModel) -> Snapshot {
    let set = ResourceGenerator::default().generate(model).unwrap();
    version(&set, 0).unwrap()
}

#[test]
fn generated_snapshot_is_consistent() {
    let snapshot = generate(&model_with_services(5));

    snapshot.consistent().unwrap();
    assert_eq!(snapshot.get_resources(TypeUrl::ENDPOINT).unwrap().len(), 5);
    assert_eq!(snapshot.get_resources(TypeUrl::CLUSTER).unwrap().len(), 5);
    assert_eq!(snapshot.get_resources(TypeUrl::ROUTE).unwrap().len(), 1);
    assert_eq!(snapshot.get_resources(TypeUrl::LISTENER).unwrap().len(), 1);
    assert_eq!(snapshot.total_resources(), 12);
}

#[test]
fn every_collection_carries_the_snapshot_version() {
    let set = ResourceGenerator::default().generate(&service1_model()).unwrap();
    let snapshot = version(&set, 7).unwrap();

    assert_eq!(snapshot.version(), "7.0");
    for type_url in TypeUrl::CORE {
        assert_eq!(snapshot.get_version(type_url), Some("7.0"));
    }
}

#[test]
fn versioner_labels_count_up() {
    let set = ResourceGenerator::default().generate(&service1_model()).unwrap();
    let mut versioner = SnapshotVersioner::new();

    let labels: Vec<String> = (0..3)
        .map(|_| versioner.next_snapshot(&set).unwrap().version().to_string())
        .collect();
    assert_eq!(labels, ["0.0", "1.0", "2.0"]);
}

#[test]
fn cluster_encoding_enables_subset_routing() {
    let snapshot = generate(&service1_model());
    let cluster = snapshot
        .get_resources(TypeUrl::CLUSTER)
        .and_then(|c| c.get("service1"))
        .unwrap();

    let body = decode(cluster);
    assert_eq!(body["name"], "service1");
    assert_eq!(body["type"], "EDS");
    assert_eq!(body["connect_timeout"], "5s");
    assert_eq!(body["lb_subset_config"]["fallback_policy"], "NO_FALLBACK");
    assert_eq!(
        body["lb_subset_config"]["subset_selectors"][0]["keys"],
        serde_json::json!(["slice"])
    );
}

#[test]
fn endpoint_metadata_lands_in_the_subset_namespace() {
    let snapshot = generate(&service1_model());
    let assignment = snapshot
        .get_resources(TypeUrl::ENDPOINT)
        .and_then(|c| c.get("service1"))
        .and_then(|r| r.downcast_ref::<ClusterLoadAssignment>())
        .unwrap();

    let groups: Vec<_> = assignment
        .lb_endpoints()
        .map(|lb| lb.metadata.get("envoy.lb", "group").unwrap())
        .collect();
    assert_eq!(groups, ["a", "b"]);

    for lb in assignment.lb_endpoints() {
        assert_eq!(lb.endpoint.address.socket_address.port_value, 8000);
    }
}

#[test]
fn listener_copies_the_slice_header_before_routing() {
    let snapshot = generate(&service1_model());
    let listener = snapshot
        .get_resources(TypeUrl::LISTENER)
        .and_then(|c| c.get("listener_0"))
        .unwrap();

    let body = decode(listener);
    let manager = &body["filter_chains"][0]["filters"][0]["typed_config"];
    assert_eq!(manager["rds"]["route_config_name"], "service_route");

    let filters = manager["http_filters"].as_array().unwrap();
    let names: Vec<_> = filters.iter().map(|f| f["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        ["envoy.filters.http.header_to_metadata", "envoy.filters.http.router"]
    );

    let rule = &filters[0]["typed_config"]["header_to_metadata"]["request_rules"][0];
    assert_eq!(rule["header"], "x-slice");
    assert_eq!(rule["on_header_present"]["key"], "slice");
    assert_eq!(rule["on_header_present"]["metadata_namespace"], "envoy.lb");
}

#[test]
fn default_route_targets_the_first_service_by_name() {
    let model = ServiceModel::new([
        Service::new("zeta", 8000, [endpoint("10.0.0.9", "target-1", "a")]).unwrap(),
        Service::new("alpha", 8000, [endpoint("10.0.0.1", "target-1", "a")]).unwrap(),
    ])
    .unwrap();
    let snapshot = generate(&model);

    let route = snapshot
        .get_resources(TypeUrl::ROUTE)
        .and_then(|c| c.get("service_route"))
        .and_then(|r| r.downcast_ref::<RouteConfiguration>())
        .unwrap();
    assert_eq!(route.clusters().collect::<Vec<_>>(), ["alpha"]);
}

#[test]
fn configured_default_service_wins() {
    let generator = ResourceGenerator::new(GeneratorConfig {
        default_service: Some("service3".to_string()),
        ..GeneratorConfig::default()
    });
    let set = generator.generate(&model_with_services(3)).unwrap();
    let snapshot = version(&set, 0).unwrap();

    let route = snapshot
        .get_resources(TypeUrl::ROUTE)
        .and_then(|c| c.get("service_route"))
        .and_then(|r| r.downcast_ref::<RouteConfiguration>())
        .unwrap();
    assert_eq!(route.clusters().collect::<Vec<_>>(), ["service3"]);
}

#[test]
fn empty_model_produces_no_snapshot() {
    let err = ResourceGenerator::default().generate(&ServiceModel::default()).unwrap_err();
    assert!(matches!(err, XdsError::EmptyModel));
    assert!(!err.is_transient());
}

#[test]
fn dropping_a_cluster_breaks_consistency() {
    let mut set = ResourceGenerator::default().generate(&model_with_services(2)).unwrap();
    let removed: Cluster = set.clusters.remove(0);

    let err = version(&set, 3).unwrap_err();
    match err {
        XdsError::InconsistentSnapshot { version, detail } => {
            assert_eq!(version, "3.0");
            assert!(detail.contains(&removed.name), "{detail}");
        }
        other => panic!("expected inconsistency, got {other:?}"),
    }
}

#[test]
fn failed_version_does_not_consume_a_sequence() {
    let mut versioner = SnapshotVersioner::new();
    let good = ResourceGenerator::default().generate(&service1_model()).unwrap();
    let mut broken = good.clone();
    broken.listeners[0].filter_chains[0].filters[0]
        .typed_config
        .rds
        .route_config_name = "nowhere".to_string();

    assert!(versioner.next_snapshot(&broken).is_err());
    assert_eq!(versioner.next_snapshot(&good).unwrap().version(), "0.0");
}
