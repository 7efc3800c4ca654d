//! Per-run mutable state threaded through every resolver.

use crate::{
    anonymize::{InterfaceAliases, IpAllocator},
    builder::TopologyOptions,
    geocode::{GeocodeResolver, Geocoder},
};

/// Caches and counters that live for exactly one run.
///
/// One context is created per run and passed by mutable reference to the
/// assembler; nothing in the engine keeps process-wide state.
///
/// # Examples
/// ```
/// use topoanon_core::{DisabledGeocoder, ResolutionContext, TopologyOptionsBuilder};
///
/// let options = TopologyOptionsBuilder::new().build()?;
/// let context = ResolutionContext::new(DisabledGeocoder, &options);
/// assert!(context.interfaces.is_empty());
/// # Ok::<(), topoanon_core::TopologyError>(())
/// ```
#[derive(Debug)]
pub struct ResolutionContext<G> {
    /// Memoizing geocoder front.
    pub geocoding: GeocodeResolver<G>,
    /// Interface alias table.
    pub interfaces: InterfaceAliases,
    /// Synthetic address allocator.
    pub addresses: IpAllocator,
}

impl<G: Geocoder> ResolutionContext<G> {
    /// Creates fresh state for a run configured by `options`.
    #[must_use]
    pub fn new(geocoder: G, options: &TopologyOptions) -> Self {
        Self {
            geocoding: GeocodeResolver::new(geocoder),
            interfaces: InterfaceAliases::new(options.interface_prefix()),
            addresses: IpAllocator::new(),
        }
    }
}
