#![expect(clippy::expect_used, reason = "tests require contextual panics")]
//! End-to-end assembly scenarios over in-memory inventories.

mod common;

use common::{assemble, endpoint_pair};
use rstest::rstest;
use serde_json::Value;
use topoanon_core::{
    Aggregation, DeviceId, RecordSet, TenantId, TopologyOptionsBuilder, Urn,
};
use topoanon_test_support::netbox::{
    DeviceFixture, cable, circuit, circuit_end, circuit_termination, interface, site,
};

fn options(aggregation: Aggregation) -> TopologyOptionsBuilder {
    TopologyOptionsBuilder::new().with_aggregation(aggregation)
}

#[test]
fn devices_of_one_owner_collapse_and_their_cable_is_dropped() {
    let records = RecordSet {
        devices: vec![
            DeviceFixture::node(1).with_tenant(7, "Campus").build(),
            DeviceFixture::node(2).with_tenant(7, "Campus").build(),
        ],
        cables: vec![cable(10, interface(100, 1), interface(200, 2))],
        ..RecordSet::default()
    };

    let assembled = assemble(
        &records,
        options(Aggregation::Owner).build().expect("options valid"),
    );

    let topology = &assembled.topology;
    assert_eq!(topology.nodes.len(), 1);
    let node = &topology.nodes[0];
    assert_eq!(node.id, Urn::tenant(TenantId::new(7)));
    assert_eq!(node.name, "Campus");
    assert_eq!(node.owners, vec![Urn::generic_owner(), Urn::tenant(TenantId::new(7))]);
    assert!(topology.links.is_empty());
    assert_eq!(assembled.stats.links.self_pairs, 1);
}

#[test]
fn direct_cable_between_two_tenants_links_their_device_nodes() {
    let records = RecordSet {
        devices: vec![
            DeviceFixture::node(1).with_tenant(11, "T1").build(),
            DeviceFixture::node(2).with_tenant(12, "T2").build(),
        ],
        cables: vec![cable(10, interface(100, 1), interface(200, 2))],
        ..RecordSet::default()
    };

    let assembled = assemble(
        &records,
        options(Aggregation::PerDevice).build().expect("options valid"),
    );

    let topology = &assembled.topology;
    let ids: Vec<&str> = topology.nodes.iter().map(|node| node.id.as_str()).collect();
    assert_eq!(ids, ["urn:netbox:device:1", "urn:netbox:device:2"]);
    assert_eq!(topology.links.len(), 1);
    let link = &topology.links[0];
    assert_eq!(link.id.as_str(), "urn:netbox:cable:10");
    assert_eq!(link.name, "#10");
    assert_eq!(
        link.owners,
        vec![
            Urn::generic_owner(),
            Urn::tenant(TenantId::new(11)),
            Urn::tenant(TenantId::new(12)),
        ]
    );
    let institutions: Vec<&str> = topology
        .institutions
        .iter()
        .map(|institution| institution.name.as_str())
        .collect();
    assert_eq!(institutions, ["generic-owner", "T1", "T2"]);
}

#[rstest]
#[case::kept(false, 3)]
#[case::removed(true, 2)]
fn unlinked_nodes_follow_the_removal_toggle(#[case] remove: bool, #[case] expected: usize) {
    let records = RecordSet {
        devices: vec![
            DeviceFixture::node(1).build(),
            DeviceFixture::node(2).build(),
            DeviceFixture::node(3).build(),
        ],
        cables: vec![cable(10, interface(100, 1), interface(200, 2))],
        ..RecordSet::default()
    };

    let assembled = assemble(
        &records,
        TopologyOptionsBuilder::new()
            .with_remove_unlinked_nodes(remove)
            .build()
            .expect("options valid"),
    );

    let topology = &assembled.topology;
    assert_eq!(topology.nodes.len(), expected);
    assert_eq!(assembled.stats.candidate_nodes, 3);
    let isolated = Urn::device(DeviceId::new(3));
    assert_eq!(topology.node(&isolated).is_some(), !remove);
    assert!(topology.links.iter().all(|link| !link.touches(&isolated)));
}

fn half_resolved_circuit() -> RecordSet {
    RecordSet {
        devices: vec![
            DeviceFixture::node(1).with_tenant(11, "T1").with_site(1, "North").build(),
            DeviceFixture::node(2).with_tenant(12, "T2").with_site(2, "South").build(),
        ],
        cables: vec![cable(10, interface(100, 1), circuit_termination(500))],
        circuits: vec![circuit(
            40,
            "LEASE-40",
            circuit_end(500, Some(1)),
            circuit_end(501, Some(2)),
        )],
        sites: vec![site(1, "North"), site(2, "South")],
    }
}

#[rstest]
#[case::per_device(Aggregation::PerDevice, 0)]
#[case::owner(Aggregation::Owner, 1)]
#[case::site(Aggregation::Site, 1)]
fn half_resolved_circuit_links_only_through_aggregated_sites(
    #[case] aggregation: Aggregation,
    #[case] expected: usize,
) {
    let assembled = assemble(
        &half_resolved_circuit(),
        options(aggregation).build().expect("options valid"),
    );

    let links = &assembled.topology.links;
    assert_eq!(links.len(), expected);
    assert_eq!(assembled.stats.links.site_fallback_links, expected);
    if let Some(link) = links.first() {
        assert_eq!(link.id.as_str(), "urn:netbox:circuit:40");
        assert_eq!(link.name, "LEASE-40");
        let names: Vec<&str> = link.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["termination_a", "termination_z"]);
    }
}

#[test]
fn circuit_cabled_at_both_ends_is_consumed_as_a_device_link() {
    let mut records = half_resolved_circuit();
    records
        .cables
        .push(cable(11, circuit_termination(501), interface(201, 2)));

    let assembled = assemble(
        &records,
        options(Aggregation::PerDevice).build().expect("options valid"),
    );

    let links = &assembled.topology.links;
    assert_eq!(links.len(), 1);
    assert_eq!(
        endpoint_pair(&links[0]),
        ("urn:netbox:device:1".to_owned(), "urn:netbox:device:2".to_owned())
    );
    assert_eq!(assembled.stats.links.resolved_circuit_links, 1);
}

#[test]
fn cable_on_ineligible_representative_still_links_its_owner_node() {
    let records = RecordSet {
        devices: vec![
            DeviceFixture::plain(1)
                .with_tenant(7, "Campus")
                .with_attribute("serial", Value::from("SPARE-1"))
                .build(),
            DeviceFixture::node(2).with_tenant(7, "Campus").build(),
            DeviceFixture::node(3).with_tenant(8, "Backbone").build(),
            DeviceFixture::node(4).with_tenant(9, "Isolated").build(),
        ],
        cables: vec![cable(10, interface(100, 1), interface(300, 3))],
        ..RecordSet::default()
    };

    let assembled = assemble(
        &records,
        options(Aggregation::Owner)
            .with_remove_unlinked_nodes(true)
            .build()
            .expect("options valid"),
    );

    let topology = &assembled.topology;
    let campus = topology
        .node(&Urn::tenant(TenantId::new(7)))
        .expect("owner node linked through its representative");
    assert!(
        campus
            .properties
            .iter()
            .any(|property| property.name == "serial" && property.value == "SPARE-1")
    );
    assert!(topology.node(&Urn::tenant(TenantId::new(9))).is_none());
    assert_eq!(topology.links.len(), 1);
}

#[test]
fn anonymization_rewrites_addresses_fields_and_interfaces() {
    let records = RecordSet {
        devices: vec![
            DeviceFixture::node(1)
                .with_primary_ip4("62.40.96.17/31")
                .with_attribute("serial", Value::from("ABC"))
                .build(),
            DeviceFixture::node(2).with_primary_ip4("62.40.96.18/31").build(),
        ],
        cables: vec![cable(10, interface(100, 1), interface(200, 2))],
        ..RecordSet::default()
    };

    let assembled = assemble(
        &records,
        TopologyOptionsBuilder::new()
            .with_anonymize_ips(true)
            .with_anonymize_fields(true)
            .with_field_exceptions(["status", "primary_ip4"])
            .with_anonymize_interfaces(true)
            .build()
            .expect("options valid"),
    );

    let topology = &assembled.topology;
    let addresses: Vec<&str> = topology
        .nodes
        .iter()
        .flat_map(|node| node.properties.iter())
        .filter(|property| property.name == "primary_ip4")
        .map(|property| property.value.as_str())
        .collect();
    assert_eq!(
        addresses,
        [
            "{\"family\":4,\"address\":\"192.168.1.1/31\"}",
            "{\"family\":4,\"address\":\"192.168.1.2/31\"}",
        ]
    );
    assert!(
        topology
            .nodes
            .iter()
            .flat_map(|node| node.properties.iter())
            .all(|property| property.name != "serial" && property.name != "role")
    );
    let a_side: Value = serde_json::from_str(&topology.links[0].properties[0].value)
        .expect("termination property holds JSON");
    assert_eq!(a_side[0]["object"]["name"], "if-1");
    assert_eq!(a_side[0]["object"]["display"], "if-1");
    assert_eq!(a_side[0]["object"]["description"], "");
}

#[test]
fn unknown_locations_fall_back_to_the_origin() {
    let records = RecordSet {
        devices: vec![
            DeviceFixture::node(1).with_site(5, "Nowhere").build(),
            DeviceFixture::node(2)
                .with_coordinates(52.0, 4.5)
                .with_site(6, "Delft")
                .build(),
        ],
        ..RecordSet::default()
    };

    let assembled = assemble(
        &records,
        TopologyOptionsBuilder::new().build().expect("options valid"),
    );

    let nodes = &assembled.topology.nodes;
    assert_eq!((nodes[0].latitude, nodes[0].longitude), (0.0, 0.0));
    assert_eq!(nodes[0].address, None);
    assert_eq!((nodes[1].latitude, nodes[1].longitude), (52.0, 4.5));
    assert_eq!(nodes[1].address.as_deref(), Some("Delft"));
}
