//! Routing definitions and route-node actor resolution
//!
//! A document type's routing definition lists its route nodes and binds
//! responsibilities to roles at each node. [`ActorResolver`] turns those
//! bindings into action requests for the principals holding the roles.

pub mod actors;

pub use actors::{apply_precedence, ActionRequest, ActorResolver, ResolutionResult};

use crate::qualifier::QualifierSet;
use crate::types::{ResponsibilityId, RoleId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Qualifier attribute carrying the document type name
pub const DOCUMENT_TYPE_NAME: &str = "documentTypeName";

/// Qualifier attribute carrying the route node name
pub const ROUTE_NODE_NAME: &str = "routeNodeName";

/// Node of a document type's route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteNode {
    pub name: String,

    #[serde(default)]
    pub next_nodes: Vec<String>,
}

impl RouteNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_nodes: Vec::new(),
        }
    }

    pub fn with_next(mut self, node: impl Into<String>) -> Self {
        self.next_nodes.push(node.into());
        self
    }
}

/// Document being routed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedDocument {
    pub id: String,
    pub document_type: String,

    /// Routing attributes (department, chart, ...)
    #[serde(default)]
    pub attributes: QualifierSet,
}

impl RoutedDocument {
    pub fn new(id: impl Into<String>, document_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            document_type: document_type.into(),
            attributes: QualifierSet::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name, value);
        self
    }
}

/// Responsibility assigned to roles at a route node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsibilityBinding {
    pub route_node: String,
    pub responsibility_id: ResponsibilityId,
    pub role_ids: Vec<RoleId>,
}

impl ResponsibilityBinding {
    pub fn new(
        route_node: impl Into<String>,
        responsibility_id: impl Into<String>,
        role_ids: &[&str],
    ) -> Self {
        Self {
            route_node: route_node.into(),
            responsibility_id: responsibility_id.into(),
            role_ids: role_ids.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Route and responsibility bindings of a document type
///
/// Nodes without bindings inherit those of the parent document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDefinition {
    pub document_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<String>,

    #[serde(default)]
    pub nodes: Vec<RouteNode>,

    #[serde(default)]
    pub bindings: Vec<ResponsibilityBinding>,
}

impl RoutingDefinition {
    pub fn new(document_type: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            parent_type: None,
            nodes: Vec::new(),
            bindings: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent_type: impl Into<String>) -> Self {
        self.parent_type = Some(parent_type.into());
        self
    }

    pub fn with_node(mut self, node: RouteNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_binding(mut self, binding: ResponsibilityBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn node(&self, name: &str) -> Option<&RouteNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Bindings declared on this type for `node_name`
    pub fn bindings_for(&self, node_name: &str) -> Vec<&ResponsibilityBinding> {
        self.bindings.iter().filter(|b| b.route_node == node_name).collect()
    }
}

/// Source of routing definitions by document type name
pub trait RoutingDefinitions: Send + Sync {
    fn definition(&self, document_type: &str) -> Option<RoutingDefinition>;
}

/// In-memory [`RoutingDefinitions`]
#[derive(Default)]
pub struct InMemoryRoutingDefinitions {
    definitions: DashMap<String, RoutingDefinition>,
}

impl InMemoryRoutingDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, definition: RoutingDefinition) {
        debug!(document_type = %definition.document_type, "Adding routing definition");
        self.definitions.insert(definition.document_type.clone(), definition);
    }

    pub fn with(self, definition: RoutingDefinition) -> Self {
        self.add(definition);
        self
    }
}

impl RoutingDefinitions for InMemoryRoutingDefinitions {
    fn definition(&self, document_type: &str) -> Option<RoutingDefinition> {
        self.definitions.get(document_type).map(|d| d.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_for_node() {
        let definition = RoutingDefinition::new("PO")
            .with_node(RouteNode::new("Review").with_next("Approve"))
            .with_node(RouteNode::new("Approve"))
            .with_binding(ResponsibilityBinding::new("Review", "rsp1", &["r1"]))
            .with_binding(ResponsibilityBinding::new("Approve", "rsp2", &["r2", "r3"]));

        assert_eq!(definition.bindings_for("Approve")[0].role_ids, vec!["r2", "r3"]);
        assert!(definition.bindings_for("Missing").is_empty());
        assert_eq!(definition.node("Review").unwrap().next_nodes, vec!["Approve"]);
    }

    #[test]
    fn test_in_memory_definitions() {
        let definitions = InMemoryRoutingDefinitions::new()
            .with(RoutingDefinition::new("PO").with_parent("Base"));

        assert_eq!(definitions.definition("PO").unwrap().parent_type.as_deref(), Some("Base"));
        assert!(definitions.definition("Base").is_none());
    }
}
