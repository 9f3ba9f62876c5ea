//! Typed view of a topology description.
//!
//! The description arrives already deserialized into a generic
//! [`serde_json::Value`]: either a mapping of node name to node entry, or a
//! list of node entries each carrying a `name`.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::dam::StorageRelation;
use crate::error::ConfigurationError;
use crate::ihacres;

/// One node entry of a topology description.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeSpec {
    /// Node name; required in list form, taken from the key in mapping form.
    #[serde(default)]
    pub name: Option<String>,
    /// Gauge identifier; defaults to the node name.
    #[serde(default)]
    pub node_id: Option<String>,
    /// Catchment area [km²].
    #[serde(default)]
    pub area: Option<f64>,
    /// Names of nodes draining into this one.
    #[serde(default, deserialize_with = "name_list")]
    pub inlets: Vec<String>,
    /// Optional explicit downstream node; must agree with the inlet lists.
    #[serde(default, deserialize_with = "name_list")]
    pub outlets: Vec<String>,
    /// Parameter values by name; missing entries take model defaults.
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    #[serde(flatten)]
    pub model: ModelSpec,
}

/// Model-specific part of a node entry, selected by `node_type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "node_type")]
pub enum ModelSpec {
    #[serde(rename = "IHACRES", alias = "IHACRESNode", alias = "ihacres")]
    Ihacres {
        #[serde(default)]
        initial_state: ihacres::State,
    },
    #[serde(rename = "Dam", alias = "DamNode", alias = "dam")]
    Dam {
        /// Storage capacity [ML].
        max_store: f64,
        /// Starting volume [ML]; defaults to full.
        #[serde(default)]
        initial_volume: Option<f64>,
        #[serde(default)]
        level: Option<StorageRelation>,
        #[serde(default)]
        area_relation: Option<StorageRelation>,
    },
}

/// Accept `null`, a single name, or a list of names.
fn name_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(name)) => vec![name],
        Some(OneOrMany::Many(names)) => names,
    })
}

/// Read a topology description into named node specs.
///
/// Lists keep their order; mappings come back sorted by node name.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ConfigurationError::MalformedSpec`] | Not a mapping or list, or an entry fails to deserialize |
/// | [`ConfigurationError::DuplicateIdentifier`] | Two entries share a name |
/// | [`ConfigurationError::EmptyNetwork`] | No entries |
pub fn parse_topology(description: &Value) -> Result<Vec<(String, NodeSpec)>, ConfigurationError> {
    let entries: Vec<(String, NodeSpec)> = match description {
        Value::Object(map) => map
            .iter()
            .map(|(name, entry)| Ok((name.clone(), parse_entry(name, entry)?)))
            .collect::<Result<_, ConfigurationError>>()?,
        Value::Array(list) => list
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let spec = parse_entry(&format!("#{i}"), entry)?;
                let name = spec
                    .name
                    .clone()
                    .ok_or_else(|| ConfigurationError::MalformedSpec {
                        reason: format!("node #{i} has no name"),
                    })?;
                Ok((name, spec))
            })
            .collect::<Result<_, ConfigurationError>>()?,
        other => {
            return Err(ConfigurationError::MalformedSpec {
                reason: format!("expected a mapping or list of nodes, got {other}"),
            })
        }
    };

    if entries.is_empty() {
        return Err(ConfigurationError::EmptyNetwork);
    }

    let mut seen = HashSet::new();
    for (name, _) in &entries {
        if !seen.insert(name.as_str()) {
            return Err(ConfigurationError::DuplicateIdentifier { id: name.clone() });
        }
    }
    Ok(entries)
}

fn parse_entry(label: &str, entry: &Value) -> Result<NodeSpec, ConfigurationError> {
    NodeSpec::deserialize(entry).map_err(|e| ConfigurationError::MalformedSpec {
        reason: format!("node {label}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mapping_form() {
        let topo = json!({
            "A": {"node_type": "IHACRES", "area": 10.0, "inlets": null},
            "B": {"node_type": "Dam", "max_store": 500.0, "inlets": "A"}
        });
        let nodes = parse_topology(&topo).unwrap();
        assert_eq!(nodes.len(), 2);
        let b = nodes.iter().find(|(n, _)| n == "B").unwrap();
        assert_eq!(b.1.inlets, vec!["A".to_string()]);
        assert!(matches!(b.1.model, ModelSpec::Dam { max_store, .. } if max_store == 500.0));
    }

    #[test]
    fn list_form_requires_names() {
        let topo = json!([{"node_type": "IHACRES"}]);
        assert!(matches!(
            parse_topology(&topo),
            Err(ConfigurationError::MalformedSpec { .. })
        ));
    }

    #[test]
    fn list_form_rejects_duplicate_names() {
        let topo = json!([
            {"name": "A", "node_type": "IHACRES"},
            {"name": "A", "node_type": "IHACRES"}
        ]);
        assert_eq!(
            parse_topology(&topo),
            Err(ConfigurationError::DuplicateIdentifier { id: "A".to_string() })
        );
    }

    #[test]
    fn unknown_node_type_is_malformed() {
        let topo = json!({"A": {"node_type": "GR4J"}});
        assert!(matches!(
            parse_topology(&topo),
            Err(ConfigurationError::MalformedSpec { .. })
        ));
    }

    #[test]
    fn empty_network_rejected() {
        assert_eq!(parse_topology(&json!({})), Err(ConfigurationError::EmptyNetwork));
    }

    #[test]
    fn initial_state_and_relations() {
        let topo = json!({
            "A": {"node_type": "IHACRES", "initial_state": {"slow_store": 4.0}},
            "D": {
                "node_type": "Dam", "max_store": 100.0, "initial_volume": 20.0,
                "level": {"kind": "table", "volumes": [0.0, 100.0], "values": [1.0, 5.0]}
            }
        });
        let nodes = parse_topology(&topo).unwrap();
        match &nodes[0].1.model {
            ModelSpec::Ihacres { initial_state } => assert_eq!(initial_state.slow_store, 4.0),
            other => panic!("unexpected {other:?}"),
        }
        match &nodes[1].1.model {
            ModelSpec::Dam { level: Some(StorageRelation::Table { .. }), .. } => {}
            other => panic!("unexpected {other:?}"),
        }
    }
}
