//! Field stripping and pseudonymous identifiers.
//!
//! Aliases and synthetic addresses are handed out sequentially from state
//! owned by the run's [`crate::ResolutionContext`], so the same interface
//! always gets the same alias and no two interfaces or devices collide.

use std::collections::HashMap;

use serde_json::{Value, json};
use tracing::warn;

use crate::{
    builder::TopologyOptions,
    error::AnonymizeError,
    ids::InterfaceId,
    inventory::{Device, PRIMARY_IP_KEYS, Termination, is_populated},
    topology::Property,
};

/// Sequential allocator of synthetic addresses in `192.168.0.0/16`.
///
/// The fourth octet runs from 1 to 254 before the third octet advances; the
/// first address handed out is `192.168.1.1`.
///
/// # Examples
/// ```
/// use topoanon_core::IpAllocator;
///
/// let mut ips = IpAllocator::new();
/// assert_eq!(ips.allocate(Some("24"))?, "192.168.1.1/24");
/// assert_eq!(ips.allocate(None)?, "192.168.1.2");
/// # Ok::<(), topoanon_core::AnonymizeError>(())
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IpAllocator {
    third: u16,
    fourth: u16,
}

impl Default for IpAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IpAllocator {
    const LAST_HOST: u16 = 254;
    const LAST_SUBNET: u16 = 255;

    /// Starts the allocator at `192.168.1.1`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            third: 1,
            fourth: 1,
        }
    }

    /// Hands out the next address, appending `/mask` when one is given.
    ///
    /// # Errors
    /// Returns [`AnonymizeError::AddressPoolExhausted`] after
    /// `192.168.255.254` has been handed out.
    pub fn allocate(&mut self, mask: Option<&str>) -> Result<String, AnonymizeError> {
        if self.third > Self::LAST_SUBNET {
            return Err(AnonymizeError::AddressPoolExhausted);
        }
        let address = format!("192.168.{}.{}", self.third, self.fourth);
        self.fourth += 1;
        if self.fourth > Self::LAST_HOST {
            self.fourth = 1;
            self.third += 1;
        }
        Ok(match mask {
            Some(mask) => format!("{address}/{mask}"),
            None => address,
        })
    }
}

/// Stable interface pseudonyms for one run.
///
/// # Examples
/// ```
/// use topoanon_core::{InterfaceAliases, InterfaceId};
///
/// let mut aliases = InterfaceAliases::new("if-");
/// assert_eq!(aliases.alias_for(InterfaceId::new(40)), "if-1");
/// assert_eq!(aliases.alias_for(InterfaceId::new(7)), "if-2");
/// assert_eq!(aliases.alias_for(InterfaceId::new(40)), "if-1");
/// ```
#[derive(Clone, Debug)]
pub struct InterfaceAliases {
    prefix: String,
    next: u64,
    aliases: HashMap<InterfaceId, String>,
}

impl InterfaceAliases {
    /// Creates an empty alias table; aliases are `prefix` followed by a
    /// counter starting at 1.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
            aliases: HashMap::new(),
        }
    }

    /// Returns the alias of `interface`, assigning the next one on first use.
    pub fn alias_for(&mut self, interface: InterfaceId) -> &str {
        let Self {
            prefix,
            next,
            aliases,
        } = self;
        aliases.entry(interface).or_insert_with(|| {
            let alias = format!("{prefix}{next}");
            *next += 1;
            alias
        })
    }

    /// Returns how many interfaces have been aliased so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Whether no interface has been aliased yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Returns copies of `terminations` in which every interface is renamed
    /// to its alias and its description blanked. Other terminations are
    /// copied unchanged; the input is never modified.
    #[must_use]
    pub fn anonymize_terminations(&mut self, terminations: &[Termination]) -> Vec<Termination> {
        terminations
            .iter()
            .map(|termination| {
                let mut copy = termination.clone();
                if let Some(interface) = termination.interface_id() {
                    let alias = self.alias_for(interface).to_owned();
                    copy.object
                        .insert("name".to_owned(), Value::String(alias.clone()));
                    copy.object
                        .insert("display".to_owned(), Value::String(alias));
                    copy.object
                        .insert("description".to_owned(), Value::String(String::new()));
                }
                copy
            })
            .collect()
    }
}

/// Turns a device's unhandled attributes into node properties.
///
/// Handled keys and empty values are skipped. With IP anonymization on, a
/// device carrying a primary address gets the next synthetic address (with
/// its original prefix length) in place of both primary address attributes.
/// With field anonymization on, only the configured exception fields survive.
/// Structured values are serialized as JSON text, scalars as plain text.
pub fn populate_properties(
    device: &Device,
    options: &TopologyOptions,
    ips: &mut IpAllocator,
) -> Vec<Property> {
    let synthetic_ip = if options.anonymize_ips() && device.has_primary_ip() {
        match ips.allocate(device.primary_ip_mask()) {
            Ok(address) => Some(address),
            Err(error) => {
                warn!(
                    device = %device.id(),
                    code = %error.code(),
                    error = %error,
                    "dropping primary address"
                );
                None
            }
        }
    } else {
        None
    };
    let ip_exhausted = options.anonymize_ips() && device.has_primary_ip() && synthetic_ip.is_none();

    let mut properties = Vec::new();
    for (key, value) in device.attributes() {
        if options.handled_keys().contains(key) || !is_populated(value) {
            continue;
        }
        let is_primary_ip = PRIMARY_IP_KEYS.contains(&key.as_str());
        if is_primary_ip && ip_exhausted {
            continue;
        }
        if options.anonymize_fields() && !options.field_exceptions().contains(key) {
            continue;
        }
        let value = match (&synthetic_ip, is_primary_ip) {
            (Some(address), true) => json!({"family": 4, "address": address}),
            _ => value.clone(),
        };
        properties.push(Property::new(key.clone(), property_text(&value)));
    }
    properties
}

/// Renders a value the way properties carry it: JSON text for objects and
/// lists, the bare string for strings, plain text for other scalars.
#[must_use]
pub fn property_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
