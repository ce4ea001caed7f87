//! Inventory parsing.
//!
//! The input is either a bare JSON array of nodes or an object carrying the
//! array under `inventory_nodes`. Each node is `{"name": ..., "attributes": {...}}`.
//! Structural problems are batch-level [`InputError`]s; attribute contents
//! are only interpreted later, per device, by the resolver.

use std::collections::HashSet;
use std::io::Read;

use serde_json::{Map, Value};

use crate::error::InputError;

/// Key wrapping the node array in the object form of the input.
pub const INVENTORY_NODES_KEY: &str = "inventory_nodes";

/// One inventory node.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    /// Unique device name.
    pub name: String,

    /// Raw attributes, interpreted by the resolver.
    pub attributes: Map<String, Value>,
}

impl DeviceDescriptor {
    pub fn new(name: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    /// Get the first attribute present among `keys`, skipping nulls.
    pub fn attribute(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|key| self.attributes.get(*key))
            .find(|value| !value.is_null())
    }
}

/// Read and parse an inventory document.
pub fn read(mut reader: impl Read) -> Result<Vec<DeviceDescriptor>, InputError> {
    let mut input = String::new();
    reader
        .read_to_string(&mut input)
        .map_err(InputError::Read)?;
    parse(&input)
}

/// Parse an inventory document.
pub fn parse(input: &str) -> Result<Vec<DeviceDescriptor>, InputError> {
    if input.trim().is_empty() {
        return Err(InputError::Empty);
    }
    let document: Value = serde_json::from_str(input)?;
    from_value(document)
}

/// Build descriptors from an already decoded document.
pub fn from_value(document: Value) -> Result<Vec<DeviceDescriptor>, InputError> {
    let nodes = match document {
        Value::Array(nodes) => nodes,
        Value::Object(mut object) => match object.remove(INVENTORY_NODES_KEY) {
            Some(Value::Array(nodes)) => nodes,
            Some(_) => {
                return Err(InputError::InvalidParameter {
                    name: INVENTORY_NODES_KEY,
                    reason: "must be a JSON array".into(),
                });
            }
            None => return Err(InputError::InvalidShape),
        },
        _ => return Err(InputError::InvalidShape),
    };

    if nodes.is_empty() {
        return Err(InputError::EmptyInventory);
    }

    let mut seen = HashSet::with_capacity(nodes.len());
    let mut devices = Vec::with_capacity(nodes.len());

    for (index, node) in nodes.into_iter().enumerate() {
        let device = parse_node(index, node)?;
        if !seen.insert(device.name.clone()) {
            return Err(InputError::DuplicateName { name: device.name });
        }
        devices.push(device);
    }

    Ok(devices)
}

fn parse_node(index: usize, node: Value) -> Result<DeviceDescriptor, InputError> {
    let invalid = |reason: &str| InputError::InvalidNode {
        index,
        reason: reason.to_string(),
    };

    let Value::Object(mut node) = node else {
        return Err(invalid("is not a dictionary"));
    };

    let name = match node.remove("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name,
        Some(Value::String(_)) => return Err(invalid("has an empty 'name' field")),
        Some(_) => return Err(invalid("has a non-string 'name' field")),
        None => return Err(invalid("missing 'name' field")),
    };

    let attributes = match node.remove("attributes") {
        Some(Value::Object(attributes)) => attributes,
        Some(_) => return Err(invalid("has a non-object 'attributes' field")),
        None => return Err(invalid("missing 'attributes' field")),
    };

    Ok(DeviceDescriptor { name, attributes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_and_array_forms() {
        let wrapped = parse(
            r#"{"inventory_nodes": [{"name": "r1", "attributes": {"host": "10.0.0.1"}}]}"#,
        )
        .unwrap();
        let bare = parse(r#"[{"name": "r1", "attributes": {"host": "10.0.0.1"}}]"#).unwrap();

        assert_eq!(wrapped, bare);
        assert_eq!(bare[0].name, "r1");
        assert_eq!(bare[0].attributes["host"], "10.0.0.1");
    }

    #[test]
    fn test_preserves_input_order() {
        let devices = from_value(json!([
            {"name": "c", "attributes": {}},
            {"name": "a", "attributes": {}},
            {"name": "b", "attributes": {}},
        ]))
        .unwrap();
        let names: Vec<_> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(parse("  "), Err(InputError::Empty)));
        assert!(matches!(parse("{not json"), Err(InputError::Json(_))));
        assert!(matches!(parse(r#"{"hosts": []}"#), Err(InputError::InvalidShape)));
        assert!(matches!(parse("[]"), Err(InputError::EmptyInventory)));

        let err = parse(r#"[{"name": "r1", "attributes": {}}, {"attributes": {}}]"#).unwrap_err();
        assert_eq!(err.to_string(), "Device at index 1 missing 'name' field");

        let err = parse(r#"[{"name": "r1"}]"#).unwrap_err();
        assert_eq!(err.to_string(), "Device at index 0 missing 'attributes' field");

        let err = parse(r#"["r1"]"#).unwrap_err();
        assert_eq!(err.to_string(), "Device at index 0 is not a dictionary");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = from_value(json!([
            {"name": "r1", "attributes": {}},
            {"name": "r1", "attributes": {}},
        ]))
        .unwrap_err();
        assert!(matches!(err, InputError::DuplicateName { name } if name == "r1"));
    }

    #[test]
    fn test_attribute_lookup_skips_null() {
        let device = DeviceDescriptor::new(
            "r1",
            json!({"host": null, "ip": "192.0.2.1"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert_eq!(device.attribute(&["host", "ip"]), Some(&json!("192.0.2.1")));
        assert_eq!(device.attribute(&["port"]), None);
    }
}
