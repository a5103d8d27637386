//! Structural verification of graphs entering the pipeline.
//!
//! Imported or merged graphs are validated before anything downstream
//! consumes them; a graph that fails verification aborts the operation
//! that produced it. Verification never repairs or coerces. The one
//! normalization the pipeline performs (dropping absent links) happens in
//! [`Graph::drop_dangling_links`], not here.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::{error::CorrNetError, graph::Graph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhysicsKind {
    Boolean,
    Number,
}

/// Physics settings keys the renderer understands, with their expected
/// primitive types. Unrecognized keys pass through unchecked.
const PHYSICS_KEYS: &[(&str, PhysicsKind)] = &[
    ("enabled", PhysicsKind::Boolean),
    ("collision", PhysicsKind::Boolean),
    ("charge", PhysicsKind::Number),
    ("gravity", PhysicsKind::Number),
    ("friction", PhysicsKind::Number),
    ("linkDistance", PhysicsKind::Number),
    ("linkStrength", PhysicsKind::Number),
    ("alphaDecay", PhysicsKind::Number),
    ("velocityDecay", PhysicsKind::Number),
];

fn structural(message: impl Into<String>) -> CorrNetError {
    CorrNetError::Structural(message.into())
}

/// Verify the raw JSON shape of a graph payload before deserialization:
/// `nodes`/`links` must be arrays of objects with the required fields, and
/// an embedded `physics` object must type-check.
pub fn verify_value(value: &Value) -> Result<(), CorrNetError> {
    let Some(object) = value.as_object() else {
        return Err(structural("graph payload is not an object"));
    };
    let nodes = object
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or_else(|| structural("graph payload is missing a 'nodes' array"))?;
    let links = object
        .get("links")
        .and_then(Value::as_array)
        .ok_or_else(|| structural("graph payload is missing a 'links' array"))?;

    for (idx, node) in nodes.iter().enumerate() {
        let Some(node) = node.as_object() else {
            return Err(structural(format!("node {idx} is not an object")));
        };
        if !node.get("id").is_some_and(Value::is_string) {
            return Err(structural(format!("node {idx} has no string 'id'")));
        }
        if !node.get("groups").is_some_and(Value::is_array) {
            return Err(structural(format!("node {idx} has no 'groups' array")));
        }
    }
    for (idx, link) in links.iter().enumerate() {
        let Some(link) = link.as_object() else {
            return Err(structural(format!("link {idx} is not an object")));
        };
        for field in ["source", "target"] {
            if !link.get(field).is_some_and(Value::is_string) {
                return Err(structural(format!("link {idx} has no string '{field}'")));
            }
        }
        for field in ["weights", "attribs"] {
            if !link.get(field).is_some_and(Value::is_array) {
                return Err(structural(format!("link {idx} has no '{field}' array")));
            }
        }
    }
    if let Some(physics) = object.get("physics") {
        let Some(physics) = physics.as_object() else {
            return Err(structural("'physics' is not an object"));
        };
        verify_physics(physics)?;
    }
    Ok(())
}

/// Verify a typed graph's invariants: unique node ids, parallel
/// weight/attrib arrays, link endpoints that exist, typed physics.
pub fn verify(graph: &Graph) -> Result<(), CorrNetError> {
    let mut ids = BTreeSet::new();
    for node in &graph.data.nodes {
        if node.id.is_empty() {
            return Err(structural("node with empty id"));
        }
        if !ids.insert(node.id.as_str()) {
            return Err(structural(format!("duplicate node id '{}'", node.id)));
        }
    }
    for link in &graph.data.links {
        if link.weights.len() != link.attribs.len() {
            return Err(structural(format!(
                "link {} / {} carries {} weights but {} attribs",
                link.source,
                link.target,
                link.weights.len(),
                link.attribs.len()
            )));
        }
        for endpoint in [&link.source, &link.target] {
            if !ids.contains(endpoint.as_str()) {
                return Err(structural(format!(
                    "link references missing node '{endpoint}'"
                )));
            }
        }
    }
    if let Some(physics) = &graph.data.physics {
        verify_physics(physics)?;
    }
    Ok(())
}

fn verify_physics(physics: &Map<String, Value>) -> Result<(), CorrNetError> {
    for (key, expected) in PHYSICS_KEYS {
        let Some(value) = physics.get(*key) else {
            continue;
        };
        let ok = match expected {
            PhysicsKind::Boolean => value.is_boolean(),
            PhysicsKind::Number => value.is_number(),
        };
        if !ok {
            return Err(structural(format!(
                "physics setting '{key}' must be a {}",
                match expected {
                    PhysicsKind::Boolean => "boolean",
                    PhysicsKind::Number => "number",
                }
            )));
        }
    }
    Ok(())
}
