//! Link discovery over cables and circuits.
//!
//! Links are discovered in three passes, in this order: direct cables
//! between two interfaces, circuits whose both ends are cabled to devices in
//! the inventory, and (when aggregating) the remaining circuits paired
//! through the sites they terminate at. Every candidate is reduced to a pair
//! of node keys; self-pairs, pairs touching a key with no node, and pairs
//! already linked are dropped.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::{
    aggregation::{Aggregation, AggregationPlan},
    anonymize::InterfaceAliases,
    error::RecordError,
    ids::{CircuitTerminationId, DeviceId, SiteId, Urn},
    inventory::{Cable, Circuit, CircuitEnd, Inventory, Termination, TerminationEndpoint},
    topology::{Link, Node, Property},
};

/// Which pass produced a link.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkSource {
    /// A cable joining two device interfaces.
    Cable,
    /// A circuit whose ends are both cabled to known devices.
    ResolvedCircuit,
    /// A circuit paired through the nodes owning its termination sites.
    SiteFallback,
}

/// Counters describing one link discovery run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct LinkStats {
    /// Links created from direct cables.
    pub cable_links: usize,
    /// Links created from circuits resolved to devices.
    pub resolved_circuit_links: usize,
    /// Links created from circuits paired through sites.
    pub site_fallback_links: usize,
    /// Candidates dropped because both ends collapse into one node.
    pub self_pairs: usize,
    /// Candidates dropped because the node pair was already linked.
    pub duplicates: usize,
    /// Candidates dropped because an end has no node.
    pub dangling: usize,
    /// Cables and circuits skipped because they could not be followed.
    pub malformed_records: usize,
}

impl LinkStats {
    fn record_created(&mut self, source: LinkSource) {
        match source {
            LinkSource::Cable => self.cable_links += 1,
            LinkSource::ResolvedCircuit => self.resolved_circuit_links += 1,
            LinkSource::SiteFallback => self.site_fallback_links += 1,
        }
    }

    /// Total number of links created.
    #[must_use]
    pub fn total(&self) -> usize {
        self.cable_links + self.resolved_circuit_links + self.site_fallback_links
    }
}

/// Links and counters produced by [`LinkResolver::resolve`].
#[derive(Clone, Debug, Default)]
pub struct ResolvedLinks {
    /// Links in discovery order.
    pub links: Vec<Link>,
    /// Discovery counters.
    pub stats: LinkStats,
}

/// Derives links between an already built set of candidate nodes.
#[derive(Debug)]
pub struct LinkResolver<'r, 'a> {
    inventory: &'r Inventory,
    plan: &'r AggregationPlan<'a>,
    nodes: HashMap<&'r Urn, &'r Node>,
    site_owners: &'r HashMap<SiteId, Urn>,
}

struct Candidate<'c> {
    id: Urn,
    name: String,
    ends: (Option<&'c Urn>, Option<&'c Urn>),
    source: LinkSource,
}

impl<'r, 'a> LinkResolver<'r, 'a> {
    /// Creates a resolver linking `nodes`.
    ///
    /// `site_owners` maps a site to the owner node its eligible devices
    /// belong to and is only consulted under [`Aggregation::Owner`].
    #[must_use]
    pub fn new(
        inventory: &'r Inventory,
        plan: &'r AggregationPlan<'a>,
        nodes: &'r [Node],
        site_owners: &'r HashMap<SiteId, Urn>,
    ) -> Self {
        Self {
            inventory,
            plan,
            nodes: nodes.iter().map(|node| (&node.id, node)).collect(),
            site_owners,
        }
    }

    /// Runs the three discovery passes.
    ///
    /// With `aliases` set, interface names in cable termination properties
    /// are replaced by their aliases; aliases are assigned in link creation
    /// order.
    #[instrument(
        name = "core.resolve_links",
        skip(self, aliases),
        fields(
            cables = self.inventory.cables().len(),
            circuits = self.inventory.circuits().len(),
            anonymize_interfaces = aliases.is_some(),
        )
    )]
    pub fn resolve(&self, mut aliases: Option<&mut InterfaceAliases>) -> ResolvedLinks {
        let mut run = LinkRun::default();
        let mut attachments: HashMap<CircuitTerminationId, DeviceId> = HashMap::new();

        for cable in self.inventory.cables() {
            let (a, b) = match cable_endpoints(cable) {
                Ok(endpoints) => endpoints,
                Err(error) => {
                    run.skip_malformed(&error);
                    continue;
                }
            };
            match (a, b) {
                (
                    TerminationEndpoint::Interface { device: left, .. },
                    TerminationEndpoint::Interface { device: right, .. },
                ) => {
                    let candidate = Candidate {
                        id: Urn::cable(cable.id),
                        name: cable.label(),
                        ends: (self.plan.key_for(left), self.plan.key_for(right)),
                        source: LinkSource::Cable,
                    };
                    run.offer(self, candidate, || {
                        cable_properties(cable, aliases.as_deref_mut())
                    });
                }
                (
                    TerminationEndpoint::Interface { device, .. },
                    TerminationEndpoint::CircuitTermination(termination),
                )
                | (
                    TerminationEndpoint::CircuitTermination(termination),
                    TerminationEndpoint::Interface { device, .. },
                ) => {
                    attachments.insert(termination, device);
                }
                _ => {}
            }
        }

        let aggregated = self.plan.mode().is_aggregated();
        let mut unresolved = Vec::new();
        for circuit in self.inventory.circuits() {
            let (a, z) = match circuit.termination_ids() {
                Ok(ends) => ends,
                // Site anchors may still place the circuit when aggregating.
                Err(_) if aggregated => {
                    unresolved.push(circuit);
                    continue;
                }
                Err(error) => {
                    run.skip_malformed(&error);
                    continue;
                }
            };
            let Some((&left, &right)) = attachments.get(&a).zip(attachments.get(&z)) else {
                unresolved.push(circuit);
                continue;
            };
            let candidate = Candidate {
                id: Urn::circuit(circuit.id),
                name: circuit.label(),
                ends: (self.plan.key_for(left), self.plan.key_for(right)),
                source: LinkSource::ResolvedCircuit,
            };
            run.offer(self, candidate, || circuit_properties(circuit));
        }

        if aggregated {
            for circuit in unresolved {
                let (site_a, site_z) = match circuit.termination_sites() {
                    Ok(sites) => sites,
                    Err(error) => {
                        run.skip_malformed(&error);
                        continue;
                    }
                };
                let candidate = Candidate {
                    id: Urn::circuit(circuit.id),
                    name: circuit.label(),
                    ends: (self.site_node(site_a), self.site_node(site_z)),
                    source: LinkSource::SiteFallback,
                };
                run.offer(self, candidate, || circuit_properties(circuit));
            }
        } else if !unresolved.is_empty() {
            debug!(
                circuits = unresolved.len(),
                "ignoring circuits without devices at both ends"
            );
        }

        ResolvedLinks {
            links: run.links,
            stats: run.stats,
        }
    }

    fn site_node(&self, site: SiteId) -> Option<&'r Urn> {
        match self.plan.mode() {
            Aggregation::Owner => self.site_owners.get(&site),
            Aggregation::Site => self.plan.site_key(site),
            Aggregation::PerDevice => None,
        }
    }
}

#[derive(Default)]
struct LinkRun {
    linked_pairs: HashSet<(Urn, Urn)>,
    links: Vec<Link>,
    stats: LinkStats,
}

impl LinkRun {
    fn offer(
        &mut self,
        resolver: &LinkResolver<'_, '_>,
        candidate: Candidate<'_>,
        properties: impl FnOnce() -> Vec<Property>,
    ) {
        let (Some(left), Some(right)) = (
            candidate.ends.0.and_then(|key| resolver.nodes.get(key)),
            candidate.ends.1.and_then(|key| resolver.nodes.get(key)),
        ) else {
            self.stats.dangling += 1;
            return;
        };
        if left.id == right.id {
            self.stats.self_pairs += 1;
            return;
        }
        let pair = if left.id < right.id {
            (left.id.clone(), right.id.clone())
        } else {
            (right.id.clone(), left.id.clone())
        };
        if !self.linked_pairs.insert(pair) {
            self.stats.duplicates += 1;
            debug!(link = %candidate.id, "node pair already linked");
            return;
        }
        let mut owners = left.owners.clone();
        for owner in &right.owners {
            if !owners.contains(owner) {
                owners.push(owner.clone());
            }
        }
        self.links.push(Link {
            id: candidate.id,
            name: candidate.name,
            endpoints: [left.id.clone(), right.id.clone()],
            owners,
            properties: properties(),
        });
        self.stats.record_created(candidate.source);
    }

    fn skip_malformed(&mut self, error: &RecordError) {
        self.stats.malformed_records += 1;
        warn!(code = %error.code(), error = %error, "skipping record during link discovery");
    }
}

fn cable_endpoints(
    cable: &Cable,
) -> Result<(TerminationEndpoint, TerminationEndpoint), RecordError> {
    let (a, b) = cable.first_terminations()?;
    Ok((a.endpoint(cable.id)?, b.endpoint(cable.id)?))
}

fn cable_properties(cable: &Cable, aliases: Option<&mut InterfaceAliases>) -> Vec<Property> {
    let (a_side, b_side) = match aliases {
        Some(aliases) => (
            aliases.anonymize_terminations(&cable.a_terminations),
            aliases.anonymize_terminations(&cable.b_terminations),
        ),
        None => (cable.a_terminations.clone(), cable.b_terminations.clone()),
    };
    let mut properties = Vec::new();
    push_terminations(&mut properties, "a_terminations", &a_side);
    push_terminations(&mut properties, "b_terminations", &b_side);
    properties
}

fn push_terminations(properties: &mut Vec<Property>, name: &str, side: &[Termination]) {
    if side.is_empty() {
        return;
    }
    push_json(properties, name, side);
}

fn circuit_properties(circuit: &Circuit) -> Vec<Property> {
    let mut properties = Vec::new();
    let ends: [(&str, &Option<CircuitEnd>); 2] = [
        ("termination_a", &circuit.termination_a),
        ("termination_z", &circuit.termination_z),
    ];
    for (name, end) in ends {
        if let Some(end) = end {
            push_json(&mut properties, name, end);
        }
    }
    properties
}

fn push_json<T: Serialize + ?Sized>(properties: &mut Vec<Property>, name: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(text) => properties.push(Property::new(name, text)),
        Err(error) => warn!(property = name, error = %error, "dropping unserializable property"),
    }
}
