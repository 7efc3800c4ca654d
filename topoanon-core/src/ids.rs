//! Strongly typed inventory identifiers and the URNs derived from them.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize, Serializer};

/// Source segment used for every URN minted from inventory records.
pub const URN_SOURCE: &str = "netbox";

/// Identifier of the synthetic owner attached to every node and link.
pub const GENERIC_OWNER_URN: &str = "urn:org:generic-owner1";

macro_rules! define_ids {
    ($( $(#[$meta:meta])* $name:ident ),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(
                Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
            )]
            #[serde(transparent)]
            pub struct $name(u64);

            impl $name {
                /// Wraps a raw inventory identifier.
                #[rustfmt::skip]
                #[must_use]
                pub const fn new(raw: u64) -> Self { Self(raw) }

                /// Returns the raw inventory identifier.
                #[rustfmt::skip]
                #[must_use]
                pub const fn get(self) -> u64 { self.0 }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

define_ids! {
    /// Identifier of a device record.
    DeviceId,
    /// Identifier of a site record.
    SiteId,
    /// Identifier of a tenant (owner).
    TenantId,
    /// Identifier of a device interface.
    InterfaceId,
    /// Identifier of a cable record.
    CableId,
    /// Identifier of a circuit record.
    CircuitId,
    /// Identifier of one end of a circuit.
    CircuitTerminationId,
}

/// A synthetic identifier of the form `urn:<source>:<category>:<id>`.
///
/// URNs key institutions, nodes and links in the output graph. Cloning is
/// cheap because the text is shared.
///
/// # Examples
/// ```
/// use topoanon_core::{DeviceId, Urn};
///
/// let urn = Urn::device(DeviceId::new(7));
/// assert_eq!(urn.as_str(), "urn:netbox:device:7");
/// ```
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Urn(Arc<str>);

impl Urn {
    fn minted(category: &str, id: impl fmt::Display) -> Self {
        Self(Arc::from(format!("urn:{URN_SOURCE}:{category}:{id}")))
    }

    /// URN of the node standing for a single device.
    #[must_use]
    pub fn device(id: DeviceId) -> Self {
        Self::minted("device", id)
    }

    /// URN of a tenant institution and of the node aggregating its devices.
    #[must_use]
    pub fn tenant(id: TenantId) -> Self {
        Self::minted("tenant", id)
    }

    /// URN of a link derived from a cable.
    #[must_use]
    pub fn cable(id: CableId) -> Self {
        Self::minted("cable", id)
    }

    /// URN of a link derived from a circuit.
    #[must_use]
    pub fn circuit(id: CircuitId) -> Self {
        Self::minted("circuit", id)
    }

    /// URN of the generic owner institution.
    #[must_use]
    pub fn generic_owner() -> Self {
        Self(Arc::from(GENERIC_OWNER_URN))
    }

    /// Returns the URN text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for Urn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
