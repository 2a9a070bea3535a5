//! In-memory data tree
//!
//! Locations are assigned when the tree is built, so every element has a
//! stable path such as `Patient.name[0].given[1]`.

use crate::{ElementNode, ElementRef, ModelError, ModelResult};
use octofhir_fhirpath_types::Value;
use rust_decimal::Decimal;
use std::sync::Arc;

/// A built, immutable element
#[derive(Debug)]
pub struct MemoryNode {
    name: String,
    type_name: Option<String>,
    value: Option<Value>,
    resource: bool,
    location: String,
    children: Vec<Arc<MemoryNode>>,
}

impl MemoryNode {
    /// Build a tree from a FHIR-style JSON resource
    ///
    /// `resourceType` marks resources, arrays become repeated children,
    /// `null` and `_`-prefixed extension siblings are skipped.
    pub fn from_json(json: &serde_json::Value) -> ModelResult<Arc<MemoryNode>> {
        let resource_type = json
            .get("resourceType")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ModelError::NotAnObject(json.to_string()))?;
        Ok(json_object(resource_type, json)?.build())
    }
}

impl ElementNode for MemoryNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    fn children(&self, name: Option<&str>) -> Vec<ElementRef> {
        self.children
            .iter()
            .filter(|child| name.is_none_or(|n| child.name == n))
            .map(|child| Arc::clone(child) as ElementRef)
            .collect()
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn is_resource(&self) -> bool {
        self.resource
    }
}

/// Builder for [`MemoryNode`] trees
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    name: String,
    type_name: Option<String>,
    value: Option<Value>,
    resource: bool,
    children: Vec<NodeBuilder>,
}

impl NodeBuilder {
    /// A resource root; name and type are both `resource_type`
    pub fn resource(resource_type: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        Self {
            name: resource_type.clone(),
            type_name: Some(resource_type),
            value: None,
            resource: true,
            children: Vec::new(),
        }
    }

    /// A complex element
    pub fn element(name: impl Into<String>, type_name: Option<&str>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.map(str::to_string),
            value: None,
            resource: false,
            children: Vec::new(),
        }
    }

    /// A primitive element typed after its value
    pub fn primitive(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            type_name: Some(primitive_type_name(&value).to_string()),
            value: Some(value),
            resource: false,
            children: Vec::new(),
        }
    }

    /// A primitive slot that carries no value
    pub fn null_primitive(name: impl Into<String>, type_name: &str) -> Self {
        Self::element(name, Some(type_name))
    }

    /// Mark a nested element as a resource (contained resources, bundle entries)
    pub fn as_resource(mut self, resource_type: impl Into<String>) -> Self {
        self.type_name = Some(resource_type.into());
        self.resource = true;
        self
    }

    pub fn child(mut self, child: NodeBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Shorthand for a primitive child
    pub fn with(self, name: &str, value: impl Into<Value>) -> Self {
        self.child(NodeBuilder::primitive(name, value))
    }

    pub fn build(self) -> Arc<MemoryNode> {
        let location = self.name.clone();
        self.build_at(location)
    }

    fn build_at(self, location: String) -> Arc<MemoryNode> {
        let mut seen: Vec<(String, usize)> = Vec::new();
        let children = self
            .children
            .into_iter()
            .map(|child| {
                let ordinal = match seen.iter_mut().find(|(name, _)| *name == child.name) {
                    Some((_, count)) => {
                        *count += 1;
                        *count
                    }
                    None => {
                        seen.push((child.name.clone(), 0));
                        0
                    }
                };
                let child_location = format!("{location}.{}[{ordinal}]", child.name);
                child.build_at(child_location)
            })
            .collect();
        Arc::new(MemoryNode {
            name: self.name,
            type_name: self.type_name,
            value: self.value,
            resource: self.resource,
            location,
            children,
        })
    }
}

fn primitive_type_name(value: &Value) -> &'static str {
    match value {
        Value::Boolean(_) => "boolean",
        Value::String(_) => "string",
        Value::Integer(_) => "integer",
        Value::Long(_) => "integer64",
        Value::Decimal(_) => "decimal",
        Value::Date(_) => "date",
        Value::DateTime(_) => "dateTime",
        Value::Time(_) => "time",
        Value::Code(_) => "code",
        other => other.system_type().name(),
    }
}

fn json_object(name: &str, json: &serde_json::Value) -> ModelResult<NodeBuilder> {
    let object = json
        .as_object()
        .ok_or_else(|| ModelError::NotAnObject(json.to_string()))?;
    let mut builder = match object.get("resourceType").and_then(serde_json::Value::as_str) {
        Some(resource_type) => NodeBuilder::element(name, None).as_resource(resource_type),
        None => NodeBuilder::element(name, None),
    };
    for (key, member) in object {
        if key == "resourceType" || key.starts_with('_') {
            continue;
        }
        match member {
            serde_json::Value::Array(items) => {
                for item in items {
                    if let Some(child) = json_member(key, item)? {
                        builder = builder.child(child);
                    }
                }
            }
            other => {
                if let Some(child) = json_member(key, other)? {
                    builder = builder.child(child);
                }
            }
        }
    }
    Ok(builder)
}

fn json_member(name: &str, json: &serde_json::Value) -> ModelResult<Option<NodeBuilder>> {
    let child = match json {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Bool(b) => NodeBuilder::primitive(name, *b),
        serde_json::Value::String(s) => NodeBuilder::primitive(name, s.as_str()),
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            match n.as_i64().map(i32::try_from) {
                Some(Ok(i)) => NodeBuilder::primitive(name, i),
                _ => {
                    let decimal = Decimal::from_str_exact(&text)
                        .or_else(|_| Decimal::from_scientific(&text))
                        .map_err(|_| ModelError::InvalidNumber(text))?;
                    NodeBuilder::primitive(name, decimal)
                }
            }
        }
        serde_json::Value::Array(_) => return Err(ModelError::NotAnObject(json.to_string())),
        serde_json::Value::Object(_) => json_object(name, json)?,
    };
    Ok(Some(child))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_locations_count_repeated_names() {
        let patient = NodeBuilder::resource("Patient")
            .child(
                NodeBuilder::element("name", Some("HumanName"))
                    .with("given", "Jim")
                    .with("given", "Peter"),
            )
            .build();
        let name = &patient.children(Some("name"))[0];
        let locations: Vec<String> = name
            .children(Some("given"))
            .iter()
            .map(|g| g.location().to_string())
            .collect();
        assert_eq!(
            locations,
            vec!["Patient.name[0].given[0]", "Patient.name[0].given[1]"]
        );
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({
            "resourceType": "Observation",
            "status": "final",
            "valueDecimal": 1.5,
            "component": [{"code": {"text": "a"}}, {"code": {"text": "b"}}],
            "_status": {"extension": []},
            "issued": null,
            "contained": [{"resourceType": "Patient", "active": true}]
        });
        let obs = MemoryNode::from_json(&json).unwrap();
        assert!(obs.is_resource());
        assert_eq!(obs.children(Some("component")).len(), 2);
        assert!(obs.children(Some("issued")).is_empty());
        assert_eq!(
            obs.children(Some("valueDecimal"))[0].value(),
            Some(&Value::Decimal(Decimal::new(15, 1)))
        );
        let contained = &obs.children(Some("contained"))[0];
        assert!(contained.is_resource());
        assert_eq!(contained.type_name(), Some("Patient"));
    }

    #[test]
    fn test_from_json_rejects_non_resources() {
        assert!(MemoryNode::from_json(&serde_json::json!([1, 2])).is_err());
    }
}
