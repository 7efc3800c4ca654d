//! Topoanon core library.
//!
//! Turns a network inventory snapshot into an aggregated, optionally
//! anonymized topology graph of institutions, nodes and links.

mod aggregation;
mod anonymize;
mod assembler;
mod builder;
mod context;
mod error;
mod export;
mod geocode;
mod ids;
mod inventory;
mod links;
mod location;
mod topology;

pub use crate::{
    aggregation::{Aggregation, AggregationPlan},
    anonymize::{InterfaceAliases, IpAllocator, populate_properties, property_text},
    assembler::{AssembledTopology, BuildStats, TopologyAssembler},
    builder::{
        DEFAULT_FIELD_EXCEPTIONS, DEFAULT_INTERFACE_PREFIX, DEFAULT_NODE_ROLE,
        DEFAULT_TOPOLOGY_NAME, HANDLED_KEYS, TopologyOptions, TopologyOptionsBuilder,
    },
    context::ResolutionContext,
    error::{
        AnonymizeError, AnonymizeErrorCode, GeocodeError, GeocodeErrorCode, InventorySourceError,
        InventorySourceErrorCode, RecordError, RecordErrorCode, Result, TopologyError,
        TopologyErrorCode,
    },
    export::{JsonExporter, TopologyExporter},
    geocode::{
        Coordinates, DisabledGeocoder, GeocodeResolver, GeocodedPlace, Geocoder, PlaceComponents,
    },
    ids::{
        CableId, CircuitId, CircuitTerminationId, DeviceId, GENERIC_OWNER_URN, InterfaceId,
        SiteId, TenantId, URN_SOURCE, Urn,
    },
    inventory::{
        ACTIVE_STATUS, CIRCUIT_TERMINATION_OBJECT_TYPE, Cable, Circuit, CircuitEnd, Device,
        INTERFACE_OBJECT_TYPE, Inventory, InventorySource, ObjectRef, PRIMARY_IP_KEYS, RecordKind,
        RecordSet, Site, Tenant, Termination, TerminationEndpoint, is_populated,
    },
    links::{LinkResolver, LinkSource, LinkStats, ResolvedLinks},
    location::{ResolvedLocation, resolve_location},
    topology::{GENERIC_OWNER_NAME, Institution, Link, Node, Property, Topology},
};
