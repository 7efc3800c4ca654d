#![expect(clippy::expect_used, reason = "tests require contextual panics")]
//! Graph invariants over generated inventories.

mod common;

use std::collections::HashSet;

use common::{assemble, endpoint_pair};
use proptest::prelude::*;
use topoanon_core::{Aggregation, RecordSet, TopologyOptionsBuilder};
use topoanon_test_support::netbox::{DeviceFixture, cable, interface};

fn aggregation() -> impl Strategy<Value = Aggregation> {
    prop_oneof![
        Just(Aggregation::PerDevice),
        Just(Aggregation::Owner),
        Just(Aggregation::Site),
    ]
}

prop_compose! {
    fn inventory()(
        devices in prop::collection::vec((0_u64..3, 0_u64..3, any::<bool>()), 1..12),
        wiring in prop::collection::vec((0_usize..12, 0_usize..12), 0..24),
    ) -> RecordSet {
        let device_count = devices.len();
        let devices = devices
            .into_iter()
            .zip(1_u64..)
            .map(|((tenant, site, eligible), id)| {
                let fixture = if eligible {
                    DeviceFixture::node(id)
                } else {
                    DeviceFixture::plain(id)
                };
                fixture
                    .with_tenant(tenant + 1, &format!("T{tenant}"))
                    .with_site(site + 1, &format!("S{site}"))
                    .build()
            })
            .collect();
        let cables = wiring
            .into_iter()
            .zip(1_u64..)
            .map(|((a, b), id)| {
                let a_device = (a % device_count) as u64 + 1;
                let b_device = (b % device_count) as u64 + 1;
                cable(id, interface(id * 2, a_device), interface(id * 2 + 1, b_device))
            })
            .collect();
        RecordSet { devices, cables, ..RecordSet::default() }
    }
}

proptest! {
    #[test]
    fn links_never_loop_or_repeat_a_pair(
        records in inventory(),
        mode in aggregation(),
        remove_unlinked in any::<bool>(),
    ) {
        let options = TopologyOptionsBuilder::new()
            .with_aggregation(mode)
            .with_remove_unlinked_nodes(remove_unlinked)
            .build()
            .expect("options valid");
        let topology = assemble(&records, options).topology;

        let node_ids: HashSet<_> = topology.nodes.iter().map(|node| node.id.clone()).collect();
        prop_assert_eq!(node_ids.len(), topology.nodes.len());

        let mut pairs = HashSet::new();
        for link in &topology.links {
            let [a, b] = &link.endpoints;
            prop_assert_ne!(a, b);
            prop_assert!(node_ids.contains(a) && node_ids.contains(b));
            prop_assert!(pairs.insert(endpoint_pair(link)));
            prop_assert!(!link.owners.is_empty());
        }

        if remove_unlinked {
            for node in &topology.nodes {
                prop_assert!(topology.links.iter().any(|link| link.touches(&node.id)));
            }
        }
        for node in &topology.nodes {
            prop_assert_eq!(node.owners.first(), Some(&topology.primary_owner));
        }
    }

    #[test]
    fn per_device_nodes_are_keyed_by_device(records in inventory()) {
        let options = TopologyOptionsBuilder::new().build().expect("options valid");
        let topology = assemble(&records, options).topology;

        let eligible: Vec<String> = records
            .devices
            .iter()
            .filter(|device| device["role"]["slug"] == "gp4l-node")
            .map(|device| format!("urn:netbox:device:{}", device["id"]))
            .collect();
        let ids: Vec<String> = topology.nodes.iter().map(|node| node.id.to_string()).collect();
        prop_assert_eq!(ids, eligible);
    }
}
