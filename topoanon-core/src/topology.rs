//! Output graph model handed to a [`crate::TopologyExporter`].

use serde::Serialize;

use crate::ids::Urn;

/// Name of the synthetic owner attached to every node and link.
pub const GENERIC_OWNER_NAME: &str = "generic-owner";

/// A named text property attached to a node or link.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Property value rendered as text.
    pub value: String,
}

impl Property {
    /// Creates a property.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An organization owning nodes and links.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Institution {
    /// Institution URN.
    pub id: Urn,
    /// Display name.
    pub name: String,
}

impl Institution {
    /// The synthetic owner every node and link belongs to.
    #[must_use]
    pub fn generic_owner() -> Self {
        Self {
            id: Urn::generic_owner(),
            name: GENERIC_OWNER_NAME.to_owned(),
        }
    }
}

/// A topology node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    /// Node URN; equal to the aggregation key the node stands for.
    pub id: Urn,
    /// Display name.
    pub name: String,
    /// Short display name.
    pub short_name: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Address text, possibly generalized.
    pub address: Option<String>,
    /// Owning institutions; never empty and always led by the generic owner.
    pub owners: Vec<Urn>,
    /// Attribute-derived properties.
    pub properties: Vec<Property>,
}

/// A topology link between two distinct nodes.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Link {
    /// Link URN derived from the cable or circuit that produced it.
    pub id: Urn,
    /// Display name.
    pub name: String,
    /// The two endpoint node URNs.
    pub endpoints: [Urn; 2],
    /// Union of both endpoints' owners, in first-seen order.
    pub owners: Vec<Urn>,
    /// Serialized termination metadata.
    pub properties: Vec<Property>,
}

impl Link {
    /// Whether this link touches `node`.
    #[must_use]
    pub fn touches(&self, node: &Urn) -> bool {
        self.endpoints.contains(node)
    }
}

/// The finished graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Topology {
    /// Topology name.
    pub name: String,
    /// URN of the institution the topology is published under.
    pub primary_owner: Urn,
    /// Every institution referenced by the topology.
    pub institutions: Vec<Institution>,
    /// Nodes in creation order.
    pub nodes: Vec<Node>,
    /// Links in discovery order.
    pub links: Vec<Link>,
}

impl Topology {
    /// Looks up a node by URN.
    #[must_use]
    pub fn node(&self, id: &Urn) -> Option<&Node> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// Looks up a link by URN.
    #[must_use]
    pub fn link(&self, id: &Urn) -> Option<&Link> {
        self.links.iter().find(|link| &link.id == id)
    }
}
