//! Aggregation policy: which topology node each device belongs to.
//!
//! Representative selection is first-occurrence-wins over the full device
//! list in input order, eligible or not. Reordering the input can change
//! which device sources a node's attributes; it never changes which node a
//! device maps to.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    ids::{DeviceId, SiteId, Urn},
    inventory::Device,
};

/// How devices are grouped into topology nodes.
///
/// # Examples
/// ```
/// use topoanon_core::Aggregation;
///
/// assert_eq!(Aggregation::from_flags(true, true), Aggregation::Owner);
/// assert_eq!(Aggregation::from_flags(false, true), Aggregation::Site);
/// assert_eq!(Aggregation::from_flags(false, false), Aggregation::PerDevice);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Aggregation {
    /// One node per tenant; devices without a tenant share the generic owner node.
    Owner,
    /// One node per site, keyed by the first device found at that site.
    Site,
    /// One node per device.
    #[default]
    PerDevice,
}

impl Aggregation {
    /// Maps the two boolean toggles to a mode; owner aggregation wins when
    /// both are set.
    #[must_use]
    pub const fn from_flags(by_owner: bool, by_site: bool) -> Self {
        if by_owner {
            Self::Owner
        } else if by_site {
            Self::Site
        } else {
            Self::PerDevice
        }
    }

    /// Whether several devices can collapse into one node.
    #[must_use]
    pub const fn is_aggregated(self) -> bool {
        !matches!(self, Self::PerDevice)
    }
}

/// Device-to-key and key-to-representative maps for one run.
#[derive(Debug)]
pub struct AggregationPlan<'a> {
    mode: Aggregation,
    device_keys: HashMap<DeviceId, Urn>,
    representatives: HashMap<Urn, &'a Device>,
    site_keys: HashMap<SiteId, Urn>,
}

impl<'a> AggregationPlan<'a> {
    /// Assigns every device in `devices` to its aggregation key.
    ///
    /// Under [`Aggregation::Site`] a device without a site gets no key.
    #[must_use]
    pub fn build(mode: Aggregation, devices: &'a [Device]) -> Self {
        let mut plan = Self {
            mode,
            device_keys: HashMap::with_capacity(devices.len()),
            representatives: HashMap::new(),
            site_keys: HashMap::new(),
        };
        for device in devices {
            let key = match mode {
                Aggregation::Owner => device
                    .tenant()
                    .map_or_else(Urn::generic_owner, |tenant| Urn::tenant(tenant.id)),
                Aggregation::Site => {
                    let Some(site) = device.site() else {
                        continue;
                    };
                    plan.site_keys
                        .entry(site.id)
                        .or_insert_with(|| Urn::device(device.id()))
                        .clone()
                }
                Aggregation::PerDevice => Urn::device(device.id()),
            };
            plan.representatives.entry(key.clone()).or_insert(device);
            plan.device_keys.insert(device.id(), key);
        }
        plan
    }

    /// Returns the active mode.
    #[must_use]
    pub fn mode(&self) -> Aggregation {
        self.mode
    }

    /// Returns the key a device aggregates into.
    #[must_use]
    pub fn key_for(&self, device: DeviceId) -> Option<&Urn> {
        self.device_keys.get(&device)
    }

    /// Returns the device whose attributes populate the node for `key`.
    #[must_use]
    pub fn representative(&self, key: &Urn) -> Option<&'a Device> {
        self.representatives.get(key).copied()
    }

    /// Returns the key of the site node under [`Aggregation::Site`].
    #[must_use]
    pub fn site_key(&self, site: SiteId) -> Option<&Urn> {
        self.site_keys.get(&site)
    }
}
