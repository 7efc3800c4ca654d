//! Typed views over raw inventory records.
//!
//! Records keep their raw attribute maps so that everything the engine does
//! not interpret can still flow into node and link properties untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::RecordError,
    geocode::Coordinates,
    ids::{
        CableId, CircuitId, CircuitTerminationId, DeviceId, InterfaceId, SiteId, TenantId,
    },
    inventory::RecordKind,
};

/// `object_type` of a termination attached to a device interface.
pub const INTERFACE_OBJECT_TYPE: &str = "dcim.interface";

/// `object_type` of a termination attached to one end of a circuit.
pub const CIRCUIT_TERMINATION_OBJECT_TYPE: &str = "circuits.circuittermination";

/// Status value a device must carry to become a topology node.
pub const ACTIVE_STATUS: &str = "active";

/// A nested reference to another record, as embedded in device and circuit
/// payloads.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ObjectRef<Id> {
    /// Identifier of the referenced record.
    pub id: Id,
    /// Display name of the referenced record, when embedded.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct Slugged {
    slug: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    value: Option<String>,
}

#[derive(Deserialize)]
struct DeviceFields {
    id: DeviceId,
    name: Option<String>,
    role: Option<Slugged>,
    status: Option<Choice>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    site: Option<ObjectRef<SiteId>>,
    tenant: Option<ObjectRef<TenantId>>,
    location: Option<ObjectRef<u64>>,
}

/// A device record.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use topoanon_core::{Device, DeviceId};
///
/// let device = Device::from_value(json!({
///     "id": 3,
///     "name": "edge-1",
///     "role": {"slug": "gp4l-node"},
///     "status": {"value": "active"},
/// }))?;
/// assert_eq!(device.id(), DeviceId::new(3));
/// assert!(device.is_eligible("gp4l-node"));
/// # Ok::<(), topoanon_core::RecordError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Device {
    id: DeviceId,
    name: Option<String>,
    role: Option<String>,
    status: Option<String>,
    coordinates: Option<Coordinates>,
    site: Option<ObjectRef<SiteId>>,
    tenant: Option<ObjectRef<TenantId>>,
    location_name: Option<String>,
    attributes: Map<String, Value>,
}

impl Device {
    /// Parses a raw device record, keeping every attribute in record order.
    ///
    /// # Errors
    /// Returns [`RecordError`] when the record is not an object or lacks a
    /// numeric `id`.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let fields: DeviceFields = parse_fields(RecordKind::Device, &value)?;
        let Value::Object(attributes) = value else {
            return Err(RecordError::NotAnObject {
                kind: RecordKind::Device,
            });
        };
        Ok(Self {
            id: fields.id,
            name: fields.name,
            role: fields.role.and_then(|role| role.slug),
            status: fields.status.and_then(|status| status.value),
            coordinates: Coordinates::from_parts(fields.latitude, fields.longitude),
            site: fields.site,
            tenant: fields.tenant,
            location_name: fields.location.and_then(|location| location.name),
            attributes,
        })
    }

    /// Returns the device identifier.
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Returns the device name, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the device name or a placeholder derived from its id.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Device {}", self.id))
    }

    /// Returns the role slug.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Returns the operational status value.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Returns the device's own coordinates when both are recorded.
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    /// Returns the parent site reference.
    #[must_use]
    pub fn site(&self) -> Option<&ObjectRef<SiteId>> {
        self.site.as_ref()
    }

    /// Returns the owning tenant reference.
    #[must_use]
    pub fn tenant(&self) -> Option<&ObjectRef<TenantId>> {
        self.tenant.as_ref()
    }

    /// Returns the name of the device's location sub-object.
    #[must_use]
    pub fn location_name(&self) -> Option<&str> {
        self.location_name.as_deref()
    }

    /// Returns every attribute of the raw record in record order.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Whether the device triggers node creation: its role must equal
    /// `node_role` and its status must be active.
    #[must_use]
    pub fn is_eligible(&self, node_role: &str) -> bool {
        self.role() == Some(node_role) && self.status() == Some(ACTIVE_STATUS)
    }

    /// Whether either primary address attribute is populated.
    #[must_use]
    pub fn has_primary_ip(&self) -> bool {
        PRIMARY_IP_KEYS
            .iter()
            .any(|key| self.attributes.get(*key).is_some_and(is_populated))
    }

    /// Returns the prefix length of the first primary address that has one,
    /// preferring `primary_ip4`.
    #[must_use]
    pub fn primary_ip_mask(&self) -> Option<&str> {
        PRIMARY_IP_KEYS.iter().find_map(|key| {
            let address = self.attributes.get(*key)?.get("address")?.as_str()?;
            address.split_once('/').map(|(_, mask)| mask)
        })
    }
}

/// Attribute names carrying primary address assignments, in lookup order.
pub const PRIMARY_IP_KEYS: [&str; 2] = ["primary_ip4", "primary_ip"];

/// Whether an attribute value carries data: nulls, empty objects and empty
/// lists do not.
#[must_use]
pub fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// A tenant (owner) as referenced by devices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tenant {
    /// Tenant identifier.
    pub id: TenantId,
    /// Tenant display name.
    pub name: String,
}

/// A site record.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Site {
    /// Site identifier.
    pub id: SiteId,
    /// Site name.
    #[serde(default)]
    pub name: Option<String>,
    /// Latitude, when recorded.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude, when recorded.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Street address.
    #[serde(default)]
    pub address: Option<String>,
    /// Physical address.
    #[serde(default)]
    pub physical_address: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

impl Site {
    /// Parses a raw site record.
    ///
    /// # Errors
    /// Returns [`RecordError`] when the record does not match the site shape.
    pub fn from_value(value: &Value) -> Result<Self, RecordError> {
        parse_fields(RecordKind::Site, value)
    }

    /// Returns the site coordinates when both are recorded.
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }

    /// Free-text fields worth geocoding, in fallback order: street address,
    /// physical address, description, name. Empty strings are skipped.
    pub fn geocoding_queries(&self) -> impl Iterator<Item = &str> {
        [
            &self.address,
            &self.physical_address,
            &self.description,
            &self.name,
        ]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .filter(|text| !text.trim().is_empty())
    }
}

/// One endpoint descriptor of a cable.
///
/// The raw `object` is kept intact so the termination can be serialized into
/// link properties after anonymization.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Termination {
    /// Kind of object the cable lands on.
    pub object_type: String,
    /// Raw description of the object the cable lands on.
    #[serde(default)]
    pub object: Map<String, Value>,
    /// Remaining termination attributes.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What a termination is attached to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TerminationEndpoint {
    /// A device interface.
    Interface {
        /// Interface identifier.
        interface: InterfaceId,
        /// Device owning the interface.
        device: DeviceId,
    },
    /// One end of a leased circuit.
    CircuitTermination(CircuitTerminationId),
    /// Anything else (power feeds, front ports, ...).
    Other,
}

impl Termination {
    /// Resolves what this termination is attached to.
    ///
    /// # Errors
    /// Returns [`RecordError::MissingField`] when an interface or circuit
    /// termination lacks the identifiers needed to follow it. `cable` is the
    /// owning cable's id and only used for the report.
    pub fn endpoint(&self, cable: CableId) -> Result<TerminationEndpoint, RecordError> {
        let missing = |field| RecordError::MissingField {
            kind: RecordKind::Cable,
            id: cable.get(),
            field,
        };
        match self.object_type.as_str() {
            INTERFACE_OBJECT_TYPE => {
                let interface = self.interface_id().ok_or_else(|| missing("object.id"))?;
                let device = self
                    .object
                    .get("device")
                    .and_then(|device| device.get("id"))
                    .and_then(Value::as_u64)
                    .ok_or_else(|| missing("object.device.id"))?;
                Ok(TerminationEndpoint::Interface {
                    interface,
                    device: DeviceId::new(device),
                })
            }
            CIRCUIT_TERMINATION_OBJECT_TYPE => {
                let id = self
                    .object
                    .get("id")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| missing("object.id"))?;
                Ok(TerminationEndpoint::CircuitTermination(
                    CircuitTerminationId::new(id),
                ))
            }
            _ => Ok(TerminationEndpoint::Other),
        }
    }

    /// Returns the interface id when this termination lands on an interface.
    #[must_use]
    pub fn interface_id(&self) -> Option<InterfaceId> {
        if self.object_type != INTERFACE_OBJECT_TYPE {
            return None;
        }
        self.object
            .get("id")
            .and_then(Value::as_u64)
            .map(InterfaceId::new)
    }
}

/// A cable record.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Cable {
    /// Cable identifier.
    pub id: CableId,
    /// Display label.
    #[serde(default)]
    pub display: Option<String>,
    /// Terminations on the A side.
    #[serde(default)]
    pub a_terminations: Vec<Termination>,
    /// Terminations on the B side.
    #[serde(default)]
    pub b_terminations: Vec<Termination>,
}

impl Cable {
    /// Parses a raw cable record.
    ///
    /// # Errors
    /// Returns [`RecordError`] when the record does not match the cable shape.
    pub fn from_value(value: &Value) -> Result<Self, RecordError> {
        parse_fields(RecordKind::Cable, value)
    }

    /// Returns the first A-side and first B-side terminations.
    ///
    /// # Errors
    /// Returns [`RecordError::MissingField`] when either side has no
    /// termination.
    pub fn first_terminations(&self) -> Result<(&Termination, &Termination), RecordError> {
        let missing = |field| RecordError::MissingField {
            kind: RecordKind::Cable,
            id: self.id.get(),
            field,
        };
        let a = self
            .a_terminations
            .first()
            .ok_or_else(|| missing("a_terminations"))?;
        let b = self
            .b_terminations
            .first()
            .ok_or_else(|| missing("b_terminations"))?;
        Ok((a, b))
    }

    /// Returns the display label or a placeholder derived from the id.
    #[must_use]
    pub fn label(&self) -> String {
        self.display
            .clone()
            .filter(|display| !display.is_empty())
            .unwrap_or_else(|| format!("Cable {}", self.id))
    }
}

/// One end of a circuit, kept raw for link properties.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CircuitEnd(pub Map<String, Value>);

impl CircuitEnd {
    /// Returns the circuit termination identifier.
    #[must_use]
    pub fn id(&self) -> Option<CircuitTerminationId> {
        self.0
            .get("id")
            .and_then(Value::as_u64)
            .map(CircuitTerminationId::new)
    }

    /// Returns the site the circuit end is anchored to.
    #[must_use]
    pub fn site(&self) -> Option<SiteId> {
        self.0
            .get("site")
            .and_then(|site| site.get("id"))
            .and_then(Value::as_u64)
            .map(SiteId::new)
    }
}

/// A circuit record.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Circuit {
    /// Circuit identifier.
    pub id: CircuitId,
    /// Provider circuit id.
    #[serde(default)]
    pub cid: Option<String>,
    /// Owning tenant.
    #[serde(default)]
    pub tenant: Option<ObjectRef<TenantId>>,
    /// A-side termination.
    #[serde(default)]
    pub termination_a: Option<CircuitEnd>,
    /// Z-side termination.
    #[serde(default)]
    pub termination_z: Option<CircuitEnd>,
}

impl Circuit {
    /// Parses a raw circuit record.
    ///
    /// # Errors
    /// Returns [`RecordError`] when the record does not match the circuit shape.
    pub fn from_value(value: &Value) -> Result<Self, RecordError> {
        parse_fields(RecordKind::Circuit, value)
    }

    /// Returns the termination ids of both ends.
    ///
    /// # Errors
    /// Returns [`RecordError::MissingField`] when either end or its id is absent.
    pub fn termination_ids(
        &self,
    ) -> Result<(CircuitTerminationId, CircuitTerminationId), RecordError> {
        let a = self
            .termination_a
            .as_ref()
            .and_then(CircuitEnd::id)
            .ok_or_else(|| self.missing("termination_a.id"))?;
        let z = self
            .termination_z
            .as_ref()
            .and_then(CircuitEnd::id)
            .ok_or_else(|| self.missing("termination_z.id"))?;
        Ok((a, z))
    }

    /// Returns the sites both ends are anchored to.
    ///
    /// # Errors
    /// Returns [`RecordError::MissingField`] when either end or its site is absent.
    pub fn termination_sites(&self) -> Result<(SiteId, SiteId), RecordError> {
        let a = self
            .termination_a
            .as_ref()
            .and_then(CircuitEnd::site)
            .ok_or_else(|| self.missing("termination_a.site.id"))?;
        let z = self
            .termination_z
            .as_ref()
            .and_then(CircuitEnd::site)
            .ok_or_else(|| self.missing("termination_z.site.id"))?;
        Ok((a, z))
    }

    /// Returns the provider circuit id or a placeholder derived from the id.
    #[must_use]
    pub fn label(&self) -> String {
        self.cid
            .clone()
            .filter(|cid| !cid.is_empty())
            .unwrap_or_else(|| format!("Link {}", self.id))
    }

    fn missing(&self, field: &'static str) -> RecordError {
        RecordError::MissingField {
            kind: RecordKind::Circuit,
            id: self.id.get(),
            field,
        }
    }
}

fn parse_fields<'de, T: Deserialize<'de>>(
    kind: RecordKind,
    value: &'de Value,
) -> Result<T, RecordError> {
    if !value.is_object() {
        return Err(RecordError::NotAnObject { kind });
    }
    T::deserialize(value).map_err(|error| RecordError::Malformed {
        kind,
        id: value.get("id").and_then(Value::as_u64),
        message: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn interface(id: u64, device: u64) -> Termination {
        serde_json::from_value(json!({
            "object_type": INTERFACE_OBJECT_TYPE,
            "object_id": id,
            "object": {"id": id, "name": "xe-0/0/0", "device": {"id": device}},
        }))
        .expect("termination fixture must parse")
    }

    #[test]
    fn device_keeps_raw_attributes_in_record_order() {
        let device = Device::from_value(json!({
            "id": 1,
            "zeta": 1,
            "name": "core",
            "alpha": 2,
        }))
        .expect("device must parse");
        let keys: Vec<&str> = device.attributes().keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "zeta", "name", "alpha"]);
    }

    #[rstest]
    #[case(json!("device"), "RECORD_NOT_AN_OBJECT")]
    #[case(json!({"name": "no id"}), "RECORD_MALFORMED")]
    #[case(json!({"id": "seven"}), "RECORD_MALFORMED")]
    fn device_rejects_malformed_records(#[case] raw: Value, #[case] code: &str) {
        let err = Device::from_value(raw).expect_err("record must be rejected");
        assert_eq!(err.code().as_str(), code);
    }

    #[rstest]
    #[case(Some("gp4l-node"), Some("active"), true)]
    #[case(Some("gp4l-node"), Some("planned"), false)]
    #[case(Some("router"), Some("active"), false)]
    #[case(None, Some("active"), false)]
    fn eligibility_requires_role_and_active_status(
        #[case] role: Option<&str>,
        #[case] status: Option<&str>,
        #[case] expected: bool,
    ) {
        let device = Device::from_value(json!({
            "id": 9,
            "role": role.map(|slug| json!({"slug": slug})),
            "status": status.map(|value| json!({"value": value})),
        }))
        .expect("device must parse");
        assert_eq!(device.is_eligible("gp4l-node"), expected);
    }

    #[test]
    fn primary_ip_mask_prefers_ipv4_assignment() {
        let device = Device::from_value(json!({
            "id": 2,
            "primary_ip": {"address": "2001:db8::1/64"},
            "primary_ip4": {"address": "10.0.0.1/24"},
        }))
        .expect("device must parse");
        assert!(device.has_primary_ip());
        assert_eq!(device.primary_ip_mask(), Some("24"));
    }

    #[test]
    fn empty_primary_ip_objects_do_not_count() {
        let device = Device::from_value(json!({"id": 2, "primary_ip": {}, "primary_ip4": null}))
            .expect("device must parse");
        assert!(!device.has_primary_ip());
        assert_eq!(device.primary_ip_mask(), None);
    }

    #[test]
    fn site_queries_follow_fallback_order_and_skip_blanks() {
        let site = Site::from_value(&json!({
            "id": 4,
            "name": "Amsterdam POP",
            "address": "  ",
            "physical_address": "Science Park 140",
            "description": null,
        }))
        .expect("site must parse");
        let queries: Vec<&str> = site.geocoding_queries().collect();
        assert_eq!(queries, ["Science Park 140", "Amsterdam POP"]);
    }

    #[test]
    fn termination_endpoint_follows_interfaces_and_circuits() {
        let cable = CableId::new(1);
        assert_eq!(
            interface(10, 20).endpoint(cable),
            Ok(TerminationEndpoint::Interface {
                interface: InterfaceId::new(10),
                device: DeviceId::new(20),
            })
        );
        let circuit: Termination = serde_json::from_value(json!({
            "object_type": CIRCUIT_TERMINATION_OBJECT_TYPE,
            "object": {"id": 77},
        }))
        .expect("termination must parse");
        assert_eq!(
            circuit.endpoint(cable),
            Ok(TerminationEndpoint::CircuitTermination(
                CircuitTerminationId::new(77)
            ))
        );
    }

    #[test]
    fn interface_termination_without_device_is_reported() {
        let orphan: Termination = serde_json::from_value(json!({
            "object_type": INTERFACE_OBJECT_TYPE,
            "object": {"id": 5},
        }))
        .expect("termination must parse");
        let err = orphan
            .endpoint(CableId::new(8))
            .expect_err("missing device must be reported");
        assert!(matches!(
            err,
            RecordError::MissingField {
                field: "object.device.id",
                id: 8,
                ..
            }
        ));
    }

    #[test]
    fn termination_round_trips_unknown_fields() {
        let raw = json!({
            "object_type": INTERFACE_OBJECT_TYPE,
            "object_id": 3,
            "object": {"id": 3, "device": {"id": 1}},
        });
        let termination: Termination =
            serde_json::from_value(raw.clone()).expect("termination must parse");
        assert_eq!(
            serde_json::to_value(&termination).expect("termination must serialize"),
            raw
        );
    }

    #[test]
    fn cable_without_b_side_is_reported() {
        let cable = Cable::from_value(&json!({
            "id": 3,
            "a_terminations": [{"object_type": INTERFACE_OBJECT_TYPE, "object": {"id": 1}}],
            "b_terminations": [],
        }))
        .expect("cable must parse");
        let err = cable
            .first_terminations()
            .expect_err("empty side must be reported");
        assert_eq!(err.code().as_str(), "RECORD_MISSING_FIELD");
    }

    #[test]
    fn circuit_ends_expose_ids_and_sites() {
        let circuit = Circuit::from_value(&json!({
            "id": 12,
            "cid": "",
            "termination_a": {"id": 100, "site": {"id": 1}},
            "termination_z": {"id": 101},
        }))
        .expect("circuit must parse");
        assert_eq!(
            circuit.termination_ids(),
            Ok((CircuitTerminationId::new(100), CircuitTerminationId::new(101)))
        );
        assert!(circuit.termination_sites().is_err());
        assert_eq!(circuit.label(), "Link 12");
    }
}
