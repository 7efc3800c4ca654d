//! Decoding of NetBox list payloads.

use serde::Deserialize;
use serde_json::Value;
use topoanon_core::InventorySourceError;

/// One page of a NetBox list endpoint.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RecordPage {
    /// Records on this page.
    #[serde(default)]
    pub results: Vec<Value>,
    /// URL of the following page, if any.
    #[serde(default)]
    pub next: Option<String>,
}

/// Decodes a list payload: either a NetBox page object or a bare array of
/// records (the form snapshot files are often saved in).
///
/// # Errors
/// Returns [`InventorySourceError::Decode`] for any other shape. `origin` is
/// the URL or path the payload came from and only used for the report.
///
/// # Examples
/// ```
/// use topoanon_providers_netbox::decode_page;
///
/// let page = decode_page("inline", br#"[{"id": 1}, {"id": 2}]"#)?;
/// assert_eq!(page.results.len(), 2);
/// assert!(page.next.is_none());
/// # Ok::<(), topoanon_core::InventorySourceError>(())
/// ```
pub fn decode_page(origin: &str, payload: &[u8]) -> Result<RecordPage, InventorySourceError> {
    let decode_error = |message: String| InventorySourceError::Decode {
        origin: origin.to_owned(),
        message,
    };
    let value: Value =
        serde_json::from_slice(payload).map_err(|error| decode_error(error.to_string()))?;
    match value {
        Value::Array(results) => Ok(RecordPage {
            results,
            next: None,
        }),
        Value::Object(_) if value.get("results").is_some() => {
            RecordPage::deserialize(value).map_err(|error| decode_error(error.to_string()))
        }
        _ => Err(decode_error(
            "expected a list of records or an object with `results`".to_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn page_objects_carry_the_next_link() {
        let page = decode_page(
            "https://netbox.test/api/dcim/sites/",
            br#"{"count": 3, "next": "https://netbox.test/api/dcim/sites/?offset=2", "results": [{"id": 1}, {"id": 2}]}"#,
        )
        .expect("page must decode");
        assert_eq!(page.results.len(), 2);
        assert_eq!(
            page.next.as_deref(),
            Some("https://netbox.test/api/dcim/sites/?offset=2")
        );
    }

    #[rstest]
    #[case::not_json(b"<html>".as_slice())]
    #[case::scalar(b"42".as_slice())]
    #[case::detail_object(br#"{"detail": "Invalid token."}"#.as_slice())]
    #[case::results_not_a_list(br#"{"results": {"id": 1}}"#.as_slice())]
    fn unexpected_payloads_are_decode_errors(#[case] payload: &[u8]) {
        let err = decode_page("devices.json", payload).expect_err("payload must be rejected");
        assert_eq!(err.code().as_str(), "INVENTORY_DECODE");
        assert!(err.to_string().contains("devices.json"));
    }
}
