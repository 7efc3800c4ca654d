//! Run configuration for the topology assembler.
//!
//! [`TopologyOptionsBuilder`] collects the toggles a run is started with and
//! validates them into an immutable [`TopologyOptions`].

use std::collections::BTreeSet;

use crate::{Result, aggregation::Aggregation, error::TopologyError};

/// Role slug a device needs to become a node unless configured otherwise.
pub const DEFAULT_NODE_ROLE: &str = "gp4l-node";

/// Prefix of generated interface aliases unless configured otherwise.
pub const DEFAULT_INTERFACE_PREFIX: &str = "if-";

/// Name given to the output topology unless configured otherwise.
pub const DEFAULT_TOPOLOGY_NAME: &str = "NetBox Topology";

/// Fields kept when field anonymization is on, unless configured otherwise.
pub const DEFAULT_FIELD_EXCEPTIONS: [&str; 2] = ["status", "tags"];

/// Device attributes consumed by node construction and never copied into
/// properties.
pub const HANDLED_KEYS: [&str; 10] = [
    "id",
    "name",
    "tenant",
    "site",
    "location",
    "latitude",
    "longitude",
    "url",
    "display_url",
    "display",
];

/// Validated, immutable options for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopologyOptions {
    aggregation: Aggregation,
    remove_unlinked_nodes: bool,
    anonymize_location: bool,
    anonymize_fields: bool,
    field_exceptions: BTreeSet<String>,
    anonymize_interfaces: bool,
    interface_prefix: String,
    anonymize_ips: bool,
    node_role: String,
    topology_name: String,
    handled_keys: BTreeSet<String>,
}

impl Default for TopologyOptions {
    fn default() -> Self {
        Self {
            aggregation: Aggregation::default(),
            remove_unlinked_nodes: false,
            anonymize_location: false,
            anonymize_fields: false,
            field_exceptions: to_set(DEFAULT_FIELD_EXCEPTIONS),
            anonymize_interfaces: false,
            interface_prefix: DEFAULT_INTERFACE_PREFIX.to_owned(),
            anonymize_ips: false,
            node_role: DEFAULT_NODE_ROLE.to_owned(),
            topology_name: DEFAULT_TOPOLOGY_NAME.to_owned(),
            handled_keys: to_set(HANDLED_KEYS),
        }
    }
}

fn to_set<const N: usize>(items: [&str; N]) -> BTreeSet<String> {
    items.into_iter().map(str::to_owned).collect()
}

impl TopologyOptions {
    /// Returns the aggregation mode.
    #[must_use]
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// Whether nodes without any link are left out of the output.
    #[must_use]
    pub fn remove_unlinked_nodes(&self) -> bool {
        self.remove_unlinked_nodes
    }

    /// Whether node locations are generalized.
    #[must_use]
    pub fn anonymize_location(&self) -> bool {
        self.anonymize_location
    }

    /// Whether unhandled device attributes are dropped.
    #[must_use]
    pub fn anonymize_fields(&self) -> bool {
        self.anonymize_fields
    }

    /// Attributes that survive field anonymization.
    #[must_use]
    pub fn field_exceptions(&self) -> &BTreeSet<String> {
        &self.field_exceptions
    }

    /// Whether interface names in link properties are replaced by aliases.
    #[must_use]
    pub fn anonymize_interfaces(&self) -> bool {
        self.anonymize_interfaces
    }

    /// Prefix of generated interface aliases.
    #[must_use]
    pub fn interface_prefix(&self) -> &str {
        &self.interface_prefix
    }

    /// Whether primary addresses are replaced by synthetic ones.
    #[must_use]
    pub fn anonymize_ips(&self) -> bool {
        self.anonymize_ips
    }

    /// Role slug that makes a device eligible to create a node.
    #[must_use]
    pub fn node_role(&self) -> &str {
        &self.node_role
    }

    /// Name of the output topology.
    #[must_use]
    pub fn topology_name(&self) -> &str {
        &self.topology_name
    }

    /// Attributes never copied into node properties.
    #[must_use]
    pub fn handled_keys(&self) -> &BTreeSet<String> {
        &self.handled_keys
    }
}

/// Configures and validates [`TopologyOptions`].
///
/// # Examples
/// ```
/// use topoanon_core::{Aggregation, TopologyOptionsBuilder};
///
/// let options = TopologyOptionsBuilder::new()
///     .with_aggregation(Aggregation::Owner)
///     .with_anonymize_interfaces(true)
///     .build()?;
/// assert_eq!(options.aggregation(), Aggregation::Owner);
/// assert_eq!(options.interface_prefix(), "if-");
/// # Ok::<(), topoanon_core::TopologyError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct TopologyOptionsBuilder {
    options: TopologyOptions,
}

impl TopologyOptionsBuilder {
    /// Creates a builder populated with the defaults: one node per device,
    /// nothing anonymized, unlinked nodes kept.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the aggregation mode.
    #[must_use]
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.options.aggregation = aggregation;
        self
    }

    /// Leaves nodes without links out of the output.
    #[must_use]
    pub fn with_remove_unlinked_nodes(mut self, enabled: bool) -> Self {
        self.options.remove_unlinked_nodes = enabled;
        self
    }

    /// Generalizes node locations through reverse geocoding.
    #[must_use]
    pub fn with_anonymize_location(mut self, enabled: bool) -> Self {
        self.options.anonymize_location = enabled;
        self
    }

    /// Drops unhandled device attributes except the configured exceptions.
    #[must_use]
    pub fn with_anonymize_fields(mut self, enabled: bool) -> Self {
        self.options.anonymize_fields = enabled;
        self
    }

    /// Replaces the set of attributes that survive field anonymization.
    ///
    /// # Examples
    /// ```
    /// use topoanon_core::TopologyOptionsBuilder;
    ///
    /// let options = TopologyOptionsBuilder::new()
    ///     .with_field_exceptions(["platform"])
    ///     .build()?;
    /// assert!(options.field_exceptions().contains("platform"));
    /// assert!(!options.field_exceptions().contains("status"));
    /// # Ok::<(), topoanon_core::TopologyError>(())
    /// ```
    #[must_use]
    pub fn with_field_exceptions<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.field_exceptions = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces interface names in link properties with aliases.
    #[must_use]
    pub fn with_anonymize_interfaces(mut self, enabled: bool) -> Self {
        self.options.anonymize_interfaces = enabled;
        self
    }

    /// Overrides the alias prefix.
    #[must_use]
    pub fn with_interface_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.interface_prefix = prefix.into();
        self
    }

    /// Replaces primary addresses with synthetic ones.
    #[must_use]
    pub fn with_anonymize_ips(mut self, enabled: bool) -> Self {
        self.options.anonymize_ips = enabled;
        self
    }

    /// Overrides the role slug that makes a device eligible.
    #[must_use]
    pub fn with_node_role(mut self, role: impl Into<String>) -> Self {
        self.options.node_role = role.into();
        self
    }

    /// Overrides the output topology name.
    #[must_use]
    pub fn with_topology_name(mut self, name: impl Into<String>) -> Self {
        self.options.topology_name = name.into();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns [`TopologyError::EmptyNodeRole`] for a blank node role and
    /// [`TopologyError::EmptyInterfacePrefix`] when interface anonymization is
    /// requested with a blank prefix.
    ///
    /// # Examples
    /// ```
    /// use topoanon_core::{TopologyError, TopologyOptionsBuilder};
    ///
    /// let err = TopologyOptionsBuilder::new()
    ///     .with_anonymize_interfaces(true)
    ///     .with_interface_prefix("")
    ///     .build()
    ///     .unwrap_err();
    /// assert_eq!(err, TopologyError::EmptyInterfacePrefix);
    /// ```
    pub fn build(self) -> Result<TopologyOptions> {
        let options = self.options;
        if options.node_role.trim().is_empty() {
            return Err(TopologyError::EmptyNodeRole);
        }
        if options.anonymize_interfaces && options.interface_prefix.is_empty() {
            return Err(TopologyError::EmptyInterfacePrefix);
        }
        Ok(options)
    }
}
