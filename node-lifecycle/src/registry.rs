//! Node Registry Module
//!
//! The ordered sequence of nodes belonging to one cluster configuration.
//! Nodes are looked up by name, appended at the end and removed by
//! position; remaining nodes keep their relative order.

use std::collections::HashSet;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, ClusterResult};
use crate::node::Node;

/// Ordered list of cluster nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the first node named `name` together with its position
    pub fn find(&self, name: &str) -> ClusterResult<(&Node, usize)> {
        self.nodes
            .iter()
            .enumerate()
            .find(|(_, node)| node.name == name)
            .map(|(index, node)| (node, index))
            .ok_or_else(|| ClusterError::NodeNotFound(name.to_string()))
    }

    /// Check whether a node named `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.iter().any(|node| node.name == name)
    }

    /// Append a node at the end
    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Remove the node at `index`, shifting later nodes down by one
    pub fn remove(&mut self, index: usize) -> ClusterResult<Node> {
        if index >= self.nodes.len() {
            return Err(ClusterError::NodeNotFound(format!("#{}", index)));
        }
        Ok(self.nodes.remove(index))
    }

    /// Names of all nodes, in order
    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|node| node.name.as_str()).collect()
    }

    /// Fail with the first name that appears more than once
    pub fn check_unique(&self) -> ClusterResult<()> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(ClusterError::DuplicateName(node.name.clone()));
            }
        }
        Ok(())
    }
}

impl Deref for NodeRegistry {
    type Target = [Node];

    fn deref(&self) -> &[Node] {
        &self.nodes
    }
}

impl From<Vec<Node>> for NodeRegistry {
    fn from(nodes: Vec<Node>) -> Self {
        NodeRegistry { nodes }
    }
}

impl FromIterator<Node> for NodeRegistry {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        NodeRegistry { nodes: iter.into_iter().collect() }
    }
}

impl IntoIterator for NodeRegistry {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<'a> IntoIterator for &'a NodeRegistry {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(names: &[&str]) -> NodeRegistry {
        names.iter().map(|name| Node::new(*name)).collect()
    }

    #[test]
    fn test_find_returns_position() {
        let nodes = registry(&["m01", "m02", "m03"]);
        let (node, index) = nodes.find("m02").unwrap();
        assert_eq!(node.name, "m02");
        assert_eq!(index, 1);
    }

    #[test]
    fn test_find_on_empty_registry() {
        let nodes = NodeRegistry::new();
        match nodes.find("m01") {
            Err(ClusterError::NodeNotFound(name)) => assert_eq!(name, "m01"),
            other => panic!("Expected NodeNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_find_returns_first_match() {
        let mut nodes = registry(&["m01", "m02"]);
        nodes.push(Node::new("m01").control_plane(true));
        let (node, index) = nodes.find("m01").unwrap();
        assert_eq!(index, 0);
        assert!(!node.control_plane);
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut nodes = registry(&["m01", "m02", "m03", "m04"]);
        let removed = nodes.remove(1).unwrap();
        assert_eq!(removed.name, "m02");
        assert_eq!(nodes.names(), vec!["m01", "m03", "m04"]);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut nodes = registry(&["m01"]);
        assert!(nodes.remove(1).is_err());
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_check_unique() {
        assert!(registry(&["m01", "m02"]).check_unique().is_ok());
        match registry(&["m01", "m02", "m01"]).check_unique() {
            Err(ClusterError::DuplicateName(name)) => assert_eq!(name, "m01"),
            other => panic!("Expected DuplicateName, got {:?}", other),
        }
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let nodes = registry(&["m01"]);
        let value = serde_json::to_value(&nodes).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["name"], "m01");
    }
}
