//! Inventory snapshot abstractions.
//!
//! An [`InventorySource`] hands over the four raw record categories; an
//! [`Inventory`] is the parsed, read-only snapshot the engine works on.

mod records;

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use serde_json::Value;
use tracing::{info, instrument, warn};

pub use records::{
    ACTIVE_STATUS, CIRCUIT_TERMINATION_OBJECT_TYPE, Cable, Circuit, CircuitEnd, Device,
    INTERFACE_OBJECT_TYPE, ObjectRef, PRIMARY_IP_KEYS, Site, Tenant, Termination,
    TerminationEndpoint, is_populated,
};

use crate::{
    error::{InventorySourceError, RecordError},
    ids::{SiteId, TenantId},
};

/// The record categories an inventory is made of.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RecordKind {
    /// Devices.
    Device,
    /// Physical cables.
    Cable,
    /// Sites.
    Site,
    /// Leased circuits.
    Circuit,
}

impl RecordKind {
    /// Every category, in fetch order.
    pub const ALL: [Self; 4] = [Self::Device, Self::Cable, Self::Site, Self::Circuit];

    /// Plural category name used in endpoints, file names and logs.
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Self::Device => "devices",
            Self::Cable => "cables",
            Self::Site => "sites",
            Self::Circuit => "circuits",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Device => "device",
            Self::Cable => "cable",
            Self::Site => "site",
            Self::Circuit => "circuit",
        };
        f.write_str(label)
    }
}

/// Supplier of raw inventory records.
///
/// # Examples
/// ```
/// use serde_json::{Value, json};
/// use topoanon_core::{Inventory, InventorySource, InventorySourceError, RecordKind};
///
/// struct OneDevice;
///
/// impl InventorySource for OneDevice {
///     fn name(&self) -> &str { "one-device" }
///     fn fetch(&self, kind: RecordKind) -> Result<Vec<Value>, InventorySourceError> {
///         Ok(match kind {
///             RecordKind::Device => vec![json!({"id": 1, "name": "core"})],
///             _ => Vec::new(),
///         })
///     }
/// }
///
/// let inventory = Inventory::collect(&OneDevice);
/// assert_eq!(inventory.devices().len(), 1);
/// ```
pub trait InventorySource {
    /// Returns a human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// Fetches every record of one category.
    ///
    /// # Errors
    /// Returns [`InventorySourceError`] when the category cannot be retrieved.
    fn fetch(&self, kind: RecordKind) -> Result<Vec<Value>, InventorySourceError>;
}

/// An in-memory [`InventorySource`] holding raw records per category.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordSet {
    /// Raw device records.
    pub devices: Vec<Value>,
    /// Raw cable records.
    pub cables: Vec<Value>,
    /// Raw site records.
    pub sites: Vec<Value>,
    /// Raw circuit records.
    pub circuits: Vec<Value>,
}

impl InventorySource for RecordSet {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn fetch(&self, kind: RecordKind) -> Result<Vec<Value>, InventorySourceError> {
        let records = match kind {
            RecordKind::Device => &self.devices,
            RecordKind::Cable => &self.cables,
            RecordKind::Site => &self.sites,
            RecordKind::Circuit => &self.circuits,
        };
        Ok(records.clone())
    }
}

/// A parsed inventory snapshot.
///
/// Input order is preserved for every category; representative selection
/// depends on it.
#[derive(Clone, Debug, Default)]
pub struct Inventory {
    devices: Vec<Device>,
    cables: Vec<Cable>,
    sites: HashMap<SiteId, Site>,
    circuits: Vec<Circuit>,
    skipped_records: usize,
    failed_categories: Vec<RecordKind>,
}

impl Inventory {
    /// Builds an inventory from already parsed records.
    #[must_use]
    pub fn new(
        devices: Vec<Device>,
        cables: Vec<Cable>,
        sites: Vec<Site>,
        circuits: Vec<Circuit>,
    ) -> Self {
        Self {
            devices,
            cables,
            sites: sites.into_iter().map(|site| (site.id, site)).collect(),
            circuits,
            skipped_records: 0,
            failed_categories: Vec::new(),
        }
    }

    /// Fetches and parses every category from `source`.
    ///
    /// A category that cannot be fetched degrades to empty and a record that
    /// cannot be parsed is skipped; both are logged, neither aborts.
    #[instrument(name = "core.collect_inventory", skip(source), fields(source = %source.name()))]
    pub fn collect<S: InventorySource + ?Sized>(source: &S) -> Self {
        let mut inventory = Self::default();
        let mut sites = Vec::new();
        for kind in RecordKind::ALL {
            let raw = match source.fetch(kind) {
                Ok(raw) => raw,
                Err(error) => {
                    warn!(
                        category = kind.category(),
                        code = %error.code(),
                        error = %error,
                        "inventory category unavailable, continuing without it"
                    );
                    inventory.failed_categories.push(kind);
                    continue;
                }
            };
            let fetched = raw.len();
            for value in raw {
                let parsed = match kind {
                    RecordKind::Device => {
                        Device::from_value(value).map(|device| inventory.devices.push(device))
                    }
                    RecordKind::Cable => {
                        Cable::from_value(&value).map(|cable| inventory.cables.push(cable))
                    }
                    RecordKind::Site => Site::from_value(&value).map(|site| sites.push(site)),
                    RecordKind::Circuit => Circuit::from_value(&value)
                        .map(|circuit| inventory.circuits.push(circuit)),
                };
                if let Err(error) = parsed {
                    inventory.record_skipped(&error);
                }
            }
            info!(category = kind.category(), fetched, "inventory category loaded");
        }
        inventory.sites = sites.into_iter().map(|site| (site.id, site)).collect();
        inventory
    }

    fn record_skipped(&mut self, error: &RecordError) {
        self.skipped_records += 1;
        warn!(code = %error.code(), error = %error, "skipping unparseable record");
    }

    /// Returns devices in input order.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Returns cables in input order.
    #[must_use]
    pub fn cables(&self) -> &[Cable] {
        &self.cables
    }

    /// Returns circuits in input order.
    #[must_use]
    pub fn circuits(&self) -> &[Circuit] {
        &self.circuits
    }

    /// Looks up a site by id.
    #[must_use]
    pub fn site(&self, id: SiteId) -> Option<&Site> {
        self.sites.get(&id)
    }

    /// Returns the number of sites.
    #[must_use]
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Returns the number of records dropped because they could not be parsed.
    #[must_use]
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    /// Returns the categories that could not be fetched at all.
    #[must_use]
    pub fn failed_categories(&self) -> &[RecordKind] {
        &self.failed_categories
    }

    /// Returns every tenant referenced by a device, in order of first
    /// appearance. A tenant without an embedded name is named after its id.
    #[must_use]
    pub fn tenants(&self) -> Vec<Tenant> {
        let mut seen: HashSet<TenantId> = HashSet::new();
        let mut tenants = Vec::new();
        for tenant in self.devices.iter().filter_map(Device::tenant) {
            if !seen.insert(tenant.id) {
                continue;
            }
            tenants.push(Tenant {
                id: tenant.id,
                name: tenant
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Tenant {}", tenant.id)),
            });
        }
        tenants
    }
}
