//! Topology assembly: nodes, links, pruning.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{Span, info, instrument};

use crate::{
    aggregation::{Aggregation, AggregationPlan},
    anonymize::populate_properties,
    builder::TopologyOptions,
    context::ResolutionContext,
    geocode::Geocoder,
    ids::{SiteId, Urn},
    inventory::{Device, Inventory},
    links::{LinkResolver, LinkStats},
    location::resolve_location,
    topology::{GENERIC_OWNER_NAME, Institution, Node, Topology},
};

/// Counters describing one assembly run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct BuildStats {
    /// Nodes built before pruning.
    pub candidate_nodes: usize,
    /// Nodes in the finished topology.
    pub emitted_nodes: usize,
    /// Nodes left out because no link touches them.
    pub removed_unlinked_nodes: usize,
    /// Inventory records that could not be parsed.
    pub skipped_records: usize,
    /// Lookups that reached the geocoding provider.
    pub geocoder_calls: usize,
    /// Link discovery counters.
    pub links: LinkStats,
}

/// A finished topology with its run counters.
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledTopology {
    /// The output graph.
    pub topology: Topology,
    /// Run counters.
    pub stats: BuildStats,
}

/// Builds a [`Topology`] from an [`Inventory`].
///
/// # Examples
/// ```
/// use serde_json::json;
/// use topoanon_core::{
///     DisabledGeocoder, Inventory, RecordSet, ResolutionContext, TopologyAssembler,
///     TopologyOptionsBuilder,
/// };
///
/// let records = RecordSet {
///     devices: vec![json!({
///         "id": 1,
///         "name": "core-1",
///         "role": {"slug": "gp4l-node"},
///         "status": {"value": "active"},
///     })],
///     ..RecordSet::default()
/// };
/// let inventory = Inventory::collect(&records);
/// let options = TopologyOptionsBuilder::new().build()?;
/// let mut context = ResolutionContext::new(DisabledGeocoder, &options);
///
/// let assembled = TopologyAssembler::new(options).build(&inventory, &mut context);
/// assert_eq!(assembled.topology.nodes.len(), 1);
/// assert_eq!(assembled.topology.nodes[0].name, "core-1");
/// # Ok::<(), topoanon_core::TopologyError>(())
/// ```
#[derive(Clone, Debug)]
pub struct TopologyAssembler {
    options: TopologyOptions,
}

impl TopologyAssembler {
    /// Creates an assembler for validated options.
    #[must_use]
    pub fn new(options: TopologyOptions) -> Self {
        Self { options }
    }

    /// Returns the options the assembler runs with.
    #[must_use]
    pub fn options(&self) -> &TopologyOptions {
        &self.options
    }

    /// Runs one conversion.
    ///
    /// Nodes are created in device input order, one per aggregation key the
    /// first time an eligible device carries it. Links are discovered against
    /// that candidate set; with unlinked-node removal enabled, candidates no
    /// link touches are dropped afterwards, which never invalidates a link.
    #[instrument(
        name = "core.assemble_topology",
        skip_all,
        fields(
            aggregation = ?self.options.aggregation(),
            devices = inventory.devices().len(),
            nodes = tracing::field::Empty,
            links = tracing::field::Empty,
        )
    )]
    pub fn build<G: Geocoder>(
        &self,
        inventory: &Inventory,
        context: &mut ResolutionContext<G>,
    ) -> AssembledTopology {
        let options = &self.options;
        let plan = AggregationPlan::build(options.aggregation(), inventory.devices());
        let institutions = institutions(inventory);
        let tenant_names: HashMap<Urn, &str> = institutions
            .iter()
            .map(|institution| (institution.id.clone(), institution.name.as_str()))
            .collect();

        let mut site_owners: HashMap<SiteId, Urn> = HashMap::new();
        let mut created: HashSet<Urn> = HashSet::new();
        let mut nodes = Vec::new();
        for device in inventory
            .devices()
            .iter()
            .filter(|device| device.is_eligible(options.node_role()))
        {
            let Some(key) = plan.key_for(device.id()) else {
                continue;
            };
            if options.aggregation() == Aggregation::Owner
                && let Some(site) = device.site()
            {
                site_owners.insert(site.id, key.clone());
            }
            if created.contains(key) {
                continue;
            }
            let Some(representative) = plan.representative(key) else {
                continue;
            };
            let name = match options.aggregation() {
                Aggregation::Owner => tenant_names
                    .get(key)
                    .map_or_else(|| GENERIC_OWNER_NAME.to_owned(), |name| (*name).to_owned()),
                Aggregation::Site => device
                    .site()
                    .and_then(|site| inventory.site(site.id))
                    .and_then(|site| site.name.clone())
                    .unwrap_or_else(|| device.display_name()),
                Aggregation::PerDevice => device.display_name(),
            };
            let node = self.node(key.clone(), name, device, representative, inventory, context);
            created.insert(key.clone());
            nodes.push(node);
        }
        let candidate_nodes = nodes.len();

        let aliases = options
            .anonymize_interfaces()
            .then_some(&mut context.interfaces);
        let resolved = LinkResolver::new(inventory, &plan, &nodes, &site_owners).resolve(aliases);

        if options.remove_unlinked_nodes() {
            let linked: HashSet<&Urn> = resolved
                .links
                .iter()
                .flat_map(|link| link.endpoints.iter())
                .collect();
            nodes.retain(|node| linked.contains(&node.id));
        }

        let stats = BuildStats {
            candidate_nodes,
            emitted_nodes: nodes.len(),
            removed_unlinked_nodes: candidate_nodes - nodes.len(),
            skipped_records: inventory.skipped_records(),
            geocoder_calls: context.geocoding.provider_calls(),
            links: resolved.stats,
        };
        let span = Span::current();
        span.record("nodes", stats.emitted_nodes);
        span.record("links", resolved.links.len());
        info!(
            candidates = stats.candidate_nodes,
            removed = stats.removed_unlinked_nodes,
            self_pairs = stats.links.self_pairs,
            duplicates = stats.links.duplicates,
            "topology assembled"
        );

        AssembledTopology {
            topology: Topology {
                name: options.topology_name().to_owned(),
                primary_owner: Urn::generic_owner(),
                institutions,
                nodes,
                links: resolved.links,
            },
            stats,
        }
    }

    /// Builds one node: `trigger` is the eligible device that caused its
    /// creation and decides its owners, `representative` supplies location
    /// and properties.
    fn node<G: Geocoder>(
        &self,
        id: Urn,
        name: String,
        trigger: &Device,
        representative: &Device,
        inventory: &Inventory,
        context: &mut ResolutionContext<G>,
    ) -> Node {
        let options = &self.options;
        let mut owners = vec![Urn::generic_owner()];
        if let Some(tenant) = trigger.tenant() {
            owners.push(Urn::tenant(tenant.id));
        }
        let location = resolve_location(
            representative,
            inventory,
            options.anonymize_location(),
            &mut context.geocoding,
        );
        let properties = populate_properties(representative, options, &mut context.addresses);
        Node {
            id,
            short_name: name.clone(),
            name,
            latitude: location.coordinates.latitude,
            longitude: location.coordinates.longitude,
            address: location.address,
            owners,
            properties,
        }
    }
}

fn institutions(inventory: &Inventory) -> Vec<Institution> {
    let mut institutions = vec![Institution::generic_owner()];
    institutions.extend(inventory.tenants().into_iter().map(|tenant| Institution {
        id: Urn::tenant(tenant.id),
        name: tenant.name,
    }));
    institutions
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::{
        builder::TopologyOptionsBuilder, geocode::DisabledGeocoder, inventory::RecordSet,
    };

    fn eligible(id: u64, extra: serde_json::Value) -> serde_json::Value {
        let mut raw = json!({
            "id": id,
            "name": format!("dev-{id}"),
            "role": {"slug": "gp4l-node"},
            "status": {"value": "active"},
        });
        if let (Some(base), Some(more)) = (raw.as_object_mut(), extra.as_object()) {
            base.extend(more.clone());
        }
        raw
    }

    fn assemble(records: &RecordSet, options: TopologyOptions) -> AssembledTopology {
        let inventory = Inventory::collect(records);
        let mut context = ResolutionContext::new(DisabledGeocoder, &options);
        TopologyAssembler::new(options).build(&inventory, &mut context)
    }

    #[test]
    fn owner_nodes_are_named_after_institutions() {
        let records = RecordSet {
            devices: vec![
                eligible(1, json!({"tenant": {"id": 3, "name": "Campus"}})),
                eligible(2, json!({})),
            ],
            ..RecordSet::default()
        };
        let options = TopologyOptionsBuilder::new()
            .with_aggregation(Aggregation::Owner)
            .build()
            .expect("options valid");

        let assembled = assemble(&records, options);

        let names: Vec<&str> = assembled
            .topology
            .nodes
            .iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(names, ["Campus", GENERIC_OWNER_NAME]);
        assert_eq!(assembled.topology.nodes[1].owners, vec![Urn::generic_owner()]);
        assert_eq!(assembled.topology.institutions.len(), 2);
    }

    #[test]
    fn site_nodes_use_site_name_and_first_device_key() {
        let records = RecordSet {
            devices: vec![
                json!({"id": 7, "name": "spare", "site": {"id": 1}}),
                eligible(8, json!({"site": {"id": 1}, "tenant": {"id": 4, "name": "T4"}})),
            ],
            sites: vec![json!({"id": 1, "name": "Lisbon"})],
            ..RecordSet::default()
        };
        let options = TopologyOptionsBuilder::new()
            .with_aggregation(Aggregation::Site)
            .build()
            .expect("options valid");

        let assembled = assemble(&records, options);

        let node = &assembled.topology.nodes[0];
        assert_eq!(node.id.as_str(), "urn:netbox:device:7");
        assert_eq!(node.name, "Lisbon");
        assert_eq!(node.owners.len(), 2);
    }

    #[test]
    fn ineligible_devices_never_create_nodes() {
        let records = RecordSet {
            devices: vec![json!({"id": 1, "name": "planned", "status": {"value": "planned"}})],
            ..RecordSet::default()
        };
        let options = TopologyOptionsBuilder::new().build().expect("options valid");

        let assembled = assemble(&records, options);

        assert!(assembled.topology.nodes.is_empty());
        assert_eq!(assembled.stats.candidate_nodes, 0);
    }
}
