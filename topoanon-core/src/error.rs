//! Error types for the topoanon core library.
//!
//! Every failure the engine can observe is typed so callers can tell
//! "no data available" from "malformed input" from "transient network
//! failure", even though the run-level policy for all three is to log and
//! carry on with whatever data remains.

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::inventory::RecordKind;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// An error produced while fetching a whole record category from an
/// [`crate::InventorySource`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum InventorySourceError {
    /// The request never produced a response.
    #[error("request to `{url}` failed: {message}")]
    Transport {
        /// URL that was being fetched.
        url: String,
        /// Human-readable failure message.
        message: String,
    },
    /// The remote service answered with a non-success status.
    #[error("request to `{url}` returned HTTP {status}")]
    Status {
        /// URL that was being fetched.
        url: String,
        /// HTTP status code returned by the service.
        status: u16,
    },
    /// The payload could not be decoded as a record page.
    #[error("payload from `{origin}` could not be decoded: {message}")]
    Decode {
        /// URL or path that produced the payload.
        origin: String,
        /// Decoder failure message.
        message: String,
    },
    /// Reading a local snapshot failed.
    #[error("failed to read `{path}`: {message}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Operating system failure message.
        message: String,
    },
}

define_error_codes! {
    /// Stable codes describing [`InventorySourceError`] variants.
    enum InventorySourceErrorCode for InventorySourceError {
        /// The request never produced a response.
        Transport => Transport { .. } => "INVENTORY_TRANSPORT",
        /// The remote service answered with a non-success status.
        Status => Status { .. } => "INVENTORY_HTTP_STATUS",
        /// The payload could not be decoded as a record page.
        Decode => Decode { .. } => "INVENTORY_DECODE",
        /// Reading a local snapshot failed.
        Io => Io { .. } => "INVENTORY_IO",
    }
}

/// An error describing a single record that cannot take part in a derivation
/// step. The record is skipped and processing continues.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RecordError {
    /// The record was not a JSON object.
    #[error("{kind} record is not an object")]
    NotAnObject {
        /// Category of the offending record.
        kind: RecordKind,
    },
    /// The record did not match the expected shape.
    #[error("{kind} record {shown} is malformed: {message}", shown = display_id(.id))]
    Malformed {
        /// Category of the offending record.
        kind: RecordKind,
        /// Identifier of the record when one could be read.
        id: Option<u64>,
        /// Decoder failure message.
        message: String,
    },
    /// A field required by the current derivation step is absent.
    #[error("{kind} record {id} lacks `{field}`")]
    MissingField {
        /// Category of the offending record.
        kind: RecordKind,
        /// Identifier of the record.
        id: u64,
        /// Name of the missing field.
        field: &'static str,
    },
}

define_error_codes! {
    /// Stable codes describing [`RecordError`] variants.
    enum RecordErrorCode for RecordError {
        /// The record was not a JSON object.
        NotAnObject => NotAnObject { .. } => "RECORD_NOT_AN_OBJECT",
        /// The record did not match the expected shape.
        Malformed => Malformed { .. } => "RECORD_MALFORMED",
        /// A field required by the current derivation step is absent.
        MissingField => MissingField { .. } => "RECORD_MISSING_FIELD",
    }
}

struct DisplayId(Option<u64>);

fn display_id(id: &Option<u64>) -> DisplayId {
    DisplayId(*id)
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{id}"),
            None => f.write_str("<unknown>"),
        }
    }
}

/// A failure reported by a [`crate::Geocoder`]. The resolver treats every
/// variant as "no result".
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum GeocodeError {
    /// The lookup never produced a response.
    #[error("geocoding request failed: {message}")]
    Transport {
        /// Human-readable failure message.
        message: String,
    },
    /// The provider answered with a non-success status.
    #[error("geocoding provider returned HTTP {status}")]
    Status {
        /// HTTP status code returned by the provider.
        status: u16,
    },
    /// The provider answer could not be decoded.
    #[error("geocoding response could not be decoded: {message}")]
    Decode {
        /// Decoder failure message.
        message: String,
    },
}

define_error_codes! {
    /// Stable codes describing [`GeocodeError`] variants.
    enum GeocodeErrorCode for GeocodeError {
        /// The lookup never produced a response.
        Transport => Transport { .. } => "GEOCODE_TRANSPORT",
        /// The provider answered with a non-success status.
        Status => Status { .. } => "GEOCODE_HTTP_STATUS",
        /// The provider answer could not be decoded.
        Decode => Decode { .. } => "GEOCODE_DECODE",
    }
}

/// Failure while handing out a pseudonym.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum AnonymizeError {
    /// Every address of the synthetic range has been handed out.
    #[error("synthetic address range 192.168.0.0/16 is exhausted")]
    AddressPoolExhausted,
}

define_error_codes! {
    /// Stable codes describing [`AnonymizeError`] variants.
    enum AnonymizeErrorCode for AnonymizeError {
        /// Every address of the synthetic range has been handed out.
        AddressPoolExhausted => AddressPoolExhausted => "ANONYMIZE_ADDRESS_POOL_EXHAUSTED",
    }
}

/// Error type produced when configuring the assembler or exporting its output.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TopologyError {
    /// The eligible node role must be a non-empty slug.
    #[error("node role must not be empty")]
    EmptyNodeRole,
    /// Interface anonymization needs a prefix for generated aliases.
    #[error("interface alias prefix must not be empty when interface anonymization is enabled")]
    EmptyInterfacePrefix,
    /// The exporter could not persist the topology.
    #[error("failed to export topology: {message}")]
    Export {
        /// Underlying failure message.
        message: Arc<str>,
    },
}

define_error_codes! {
    /// Stable codes describing [`TopologyError`] variants.
    enum TopologyErrorCode for TopologyError {
        /// The eligible node role must be a non-empty slug.
        EmptyNodeRole => EmptyNodeRole => "TOPOLOGY_EMPTY_NODE_ROLE",
        /// Interface anonymization needs a prefix for generated aliases.
        EmptyInterfacePrefix => EmptyInterfacePrefix => "TOPOLOGY_EMPTY_INTERFACE_PREFIX",
        /// The exporter could not persist the topology.
        Export => Export { .. } => "TOPOLOGY_EXPORT_FAILED",
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, TopologyError>;
