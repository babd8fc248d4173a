//! Snapshot document format: flat dotted keys <-> nested JSON objects.
//!
//! `{"mint.mint_cap": "0x1", "packageId": "0x2"}` is stored as
//! `{"mint": {"mint_cap": "0x1"}, "packageId": "0x2"}`.

use mizu_core::{Error, Result, Scalar, StoreKey};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub fn to_document(entries: &BTreeMap<StoreKey, Scalar>) -> Value {
    let mut root = Map::new();
    for (key, scalar) in entries {
        let segments: Vec<&str> = key.segments().collect();
        insert_path(&mut root, &segments, scalar_to_json(scalar));
    }
    Value::Object(root)
}

fn insert_path(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [leaf] => {
            map.insert(leaf.to_string(), value);
        }
        [head, rest @ ..] => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            // Stores reject overlapping keys, so a scalar here is never clobbered in practice.
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child_map) = child {
                insert_path(child_map, rest, value);
            }
        }
    }
}

pub fn from_document(document: &Value) -> Result<BTreeMap<StoreKey, Scalar>> {
    let root = document
        .as_object()
        .ok_or_else(|| Error::snapshot("snapshot root must be an object"))?;
    let mut out = BTreeMap::new();
    flatten(root, None, &mut out)?;
    Ok(out)
}

fn flatten(
    map: &Map<String, Value>,
    prefix: Option<&str>,
    out: &mut BTreeMap<StoreKey, Scalar>,
) -> Result<()> {
    for (name, value) in map {
        let path = match prefix {
            Some(p) => format!("{}.{}", p, name),
            None => name.clone(),
        };
        match value {
            Value::Object(child) => flatten(child, Some(&path), out)?,
            Value::String(s) => {
                out.insert(StoreKey::parse(&path)?, Scalar::Text(s.clone()));
            }
            Value::Number(n) => {
                out.insert(StoreKey::parse(&path)?, Scalar::Number(n.clone()));
            }
            other => {
                return Err(Error::snapshot(format!(
                    "unsupported value at '{}': {}",
                    path, other
                )))
            }
        }
    }
    Ok(())
}

fn scalar_to_json(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Text(s) => Value::String(s.clone()),
        Scalar::Number(n) => Value::Number(n.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(s: &str) -> StoreKey {
        StoreKey::parse(s).unwrap()
    }

    #[test]
    fn nests_dotted_keys() {
        let mut entries = BTreeMap::new();
        entries.insert(key("packageId"), Scalar::from("0xp"));
        entries.insert(key("cooler_factory.CoolerFactory"), Scalar::from("0xf"));
        entries.insert(key("cooler_factory.FactoryOwnerCap"), Scalar::from("0xc"));
        entries.insert(key("mint.price"), Scalar::from(100u64));

        let doc = to_document(&entries);
        assert_eq!(
            doc,
            json!({
                "packageId": "0xp",
                "cooler_factory": {"CoolerFactory": "0xf", "FactoryOwnerCap": "0xc"},
                "mint": {"price": 100}
            })
        );
        assert_eq!(from_document(&doc).unwrap(), entries);
    }

    #[test]
    fn reads_deployed_objects_layout() {
        let doc = json!({
            "packageId": "0xp",
            "water_cooler": {"water_cooler_publisher": "", "policy_cap": "0x1", "policy": "0x2"}
        });
        let flat = from_document(&doc).unwrap();
        assert_eq!(flat[&key("water_cooler.policy")], Scalar::from("0x2"));
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn rejects_arrays_and_non_object_roots() {
        assert!(from_document(&json!(["a"])).is_err());
        assert!(from_document(&json!({"a": [1, 2]})).is_err());
        assert!(from_document(&json!({"a": true})).is_err());
    }
}
