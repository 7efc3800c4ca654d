//! Builders for NetBox-shaped JSON records.
//!
//! Fixtures are plain [`serde_json::Value`]s so any crate can feed them to
//! its own parsers.

use serde_json::{Map, Value, json};

/// Role slug carried by devices built with [`DeviceFixture::node`].
pub const NODE_ROLE: &str = "gp4l-node";

/// Builder for a device record.
///
/// # Examples
/// ```
/// use topoanon_test_support::netbox::DeviceFixture;
///
/// let device = DeviceFixture::node(4).with_tenant(9, "Campus").build();
/// assert_eq!(device["role"]["slug"], "gp4l-node");
/// assert_eq!(device["tenant"]["name"], "Campus");
/// ```
#[derive(Clone, Debug)]
pub struct DeviceFixture {
    record: Map<String, Value>,
}

impl DeviceFixture {
    /// An active device with the node role, named `node-<id>`.
    #[must_use]
    pub fn node(id: u64) -> Self {
        Self::plain(id)
            .with_attribute("role", json!({"slug": NODE_ROLE}))
            .with_status("active")
    }

    /// A device carrying only an id and a name.
    #[must_use]
    pub fn plain(id: u64) -> Self {
        let mut record = Map::new();
        record.insert("id".to_owned(), json!(id));
        record.insert("name".to_owned(), json!(format!("node-{id}")));
        Self { record }
    }

    /// Sets or replaces any attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.record.insert(key.to_owned(), value);
        self
    }

    /// Sets the status value.
    #[must_use]
    pub fn with_status(self, status: &str) -> Self {
        self.with_attribute("status", json!({"value": status}))
    }

    /// Sets the role slug.
    #[must_use]
    pub fn with_role(self, slug: &str) -> Self {
        self.with_attribute("role", json!({"slug": slug}))
    }

    /// Attaches the device to a tenant.
    #[must_use]
    pub fn with_tenant(self, id: u64, name: &str) -> Self {
        self.with_attribute("tenant", json!({"id": id, "name": name}))
    }

    /// Places the device at a site.
    #[must_use]
    pub fn with_site(self, id: u64, name: &str) -> Self {
        self.with_attribute("site", json!({"id": id, "name": name}))
    }

    /// Records the device's own coordinates.
    #[must_use]
    pub fn with_coordinates(self, latitude: f64, longitude: f64) -> Self {
        self.with_attribute("latitude", json!(latitude))
            .with_attribute("longitude", json!(longitude))
    }

    /// Assigns a primary IPv4 address such as `10.0.0.1/24`.
    #[must_use]
    pub fn with_primary_ip4(self, address: &str) -> Self {
        self.with_attribute("primary_ip4", json!({"family": 4, "address": address}))
    }

    /// Returns the record.
    #[must_use]
    pub fn build(self) -> Value {
        Value::Object(self.record)
    }
}

/// A cable termination landing on interface `interface` of device `device`.
#[must_use]
pub fn interface(interface: u64, device: u64) -> Value {
    json!({
        "object_type": "dcim.interface",
        "object_id": interface,
        "object": {
            "id": interface,
            "name": format!("xe-0/0/{interface}"),
            "display": format!("xe-0/0/{interface}"),
            "description": format!("port {interface}"),
            "device": {"id": device},
        },
    })
}

/// A cable termination landing on circuit termination `termination`.
#[must_use]
pub fn circuit_termination(termination: u64) -> Value {
    json!({
        "object_type": "circuits.circuittermination",
        "object_id": termination,
        "object": {"id": termination},
    })
}

/// A cable with one termination on each side.
#[must_use]
pub fn cable(id: u64, a_side: Value, b_side: Value) -> Value {
    json!({
        "id": id,
        "display": format!("#{id}"),
        "a_terminations": [a_side],
        "b_terminations": [b_side],
    })
}

/// One end of a circuit, optionally anchored to a site.
#[must_use]
pub fn circuit_end(termination: u64, site: Option<u64>) -> Value {
    match site {
        Some(site) => json!({"id": termination, "site": {"id": site}}),
        None => json!({"id": termination}),
    }
}

/// A circuit between two ends.
#[must_use]
pub fn circuit(id: u64, cid: &str, a_end: Value, z_end: Value) -> Value {
    json!({
        "id": id,
        "cid": cid,
        "termination_a": a_end,
        "termination_z": z_end,
    })
}

/// A site record without coordinates.
#[must_use]
pub fn site(id: u64, name: &str) -> Value {
    json!({"id": id, "name": name})
}

/// A paginated API response.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use topoanon_test_support::netbox::page;
///
/// let first = page(vec![json!({"id": 1})], Some("http://netbox.test/api/dcim/sites/?offset=1"));
/// assert_eq!(first["count"], 1);
/// assert!(first["next"].is_string());
/// ```
#[must_use]
pub fn page(results: Vec<Value>, next: Option<&str>) -> Value {
    json!({
        "count": results.len(),
        "next": next,
        "previous": null,
        "results": results,
    })
}
