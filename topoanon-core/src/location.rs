//! Per-device location resolution.

use serde::Serialize;
use tracing::debug;

use crate::{
    geocode::{Coordinates, GeocodeResolver, Geocoder},
    inventory::{Device, Inventory},
};

/// Coordinates and address text chosen for a node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedLocation {
    /// Coordinates to publish.
    pub coordinates: Coordinates,
    /// Address text to publish, if any.
    pub address: Option<String>,
}

impl ResolvedLocation {
    const UNKNOWN: Self = Self {
        coordinates: Coordinates::ORIGIN,
        address: None,
    };
}

/// Resolves where `device` is.
///
/// Coordinates come from the first source that has them: the device itself,
/// its parent site, then a forward lookup of the site's address, physical
/// address, description and name in that order. A device nothing resolves
/// for sits at the origin with no address.
///
/// With `anonymize` set the resolved coordinates are reverse geocoded to a
/// generalized place and that place is geocoded again, which deliberately
/// lands on a less precise point. When the second lookup fails the original
/// coordinates are kept with the generalized text; when the reverse lookup
/// fails the original coordinates are kept without an address.
///
/// Without `anonymize` the address is the device location name and site name,
/// comma-joined.
pub fn resolve_location<G: Geocoder>(
    device: &Device,
    inventory: &Inventory,
    anonymize: bool,
    geocoding: &mut GeocodeResolver<G>,
) -> ResolvedLocation {
    let Some(coordinates) = precise_coordinates(device, inventory, geocoding) else {
        debug!(device = %device.id(), "no coordinates resolved, using origin");
        return ResolvedLocation::UNKNOWN;
    };

    if !anonymize {
        return ResolvedLocation {
            coordinates,
            address: plain_address(device),
        };
    }

    let Some(generalized) = geocoding.reverse_geocode(coordinates) else {
        return ResolvedLocation {
            coordinates,
            address: None,
        };
    };
    let coarse = geocoding
        .geocode_text(&generalized)
        .map_or(coordinates, |place| place.coordinates);
    ResolvedLocation {
        coordinates: coarse,
        address: Some(generalized),
    }
}

fn precise_coordinates<G: Geocoder>(
    device: &Device,
    inventory: &Inventory,
    geocoding: &mut GeocodeResolver<G>,
) -> Option<Coordinates> {
    if let Some(own) = device.coordinates() {
        return Some(own);
    }
    let site = inventory.site(device.site()?.id)?;
    if let Some(site_coordinates) = site.coordinates() {
        return Some(site_coordinates);
    }
    site.geocoding_queries()
        .find_map(|query| geocoding.geocode_text(query))
        .map(|place| place.coordinates)
}

fn plain_address(device: &Device) -> Option<String> {
    let parts: Vec<&str> = [
        device.location_name(),
        device.site().and_then(|site| site.name.as_deref()),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}
