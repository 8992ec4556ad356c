use std::fmt::{Debug, Display};

use thiserror::Error;

use super::{EdgeLength, NewickFormat, NodeId};

/// Errors that can occur when manipulating [`Node`] structs.
#[derive(Error, Debug)]
pub enum NodeError {
    /// We are trying to give a third child to a binary node
    #[error("Node {0} already has two children")]
    TooManyChildren(NodeId),
}

#[derive(Clone)]
/// A node of the Tree
pub struct Node {
    /// Index of the node
    pub id: NodeId,
    /// Label of the node, only set on leaves
    pub name: Option<String>,
    /// Sequence attached to the leaf
    pub sequence: Option<String>,
    /// Index of the parent node
    pub parent: Option<NodeId>,
    /// Indices of child nodes (left first, at most two)
    pub children: Vec<NodeId>,
    /// length of branch between parent and node
    pub parent_edge: Option<EdgeLength>,
    // Whether the node is deleted or not
    pub(crate) deleted: bool,
}

impl Node {
    /// Creates a new Node
    pub fn new() -> Self {
        Self {
            id: 0,
            name: None,
            sequence: None,
            parent: None,
            children: Vec::with_capacity(2),
            parent_edge: None,
            deleted: false,
        }
    }

    /// Creates a new named Node
    pub fn new_named(name: &str) -> Self {
        Self {
            name: Some(String::from(name)),
            ..Self::new()
        }
    }

    /// Sets the Node name
    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    /// Attaches a sequence to the node
    pub fn set_sequence(&mut self, sequence: String) {
        self.sequence = Some(sequence);
    }

    /// Set the parent node
    /// See `add_child` for example usage
    pub fn set_parent(&mut self, parent: NodeId, parent_edge: Option<EdgeLength>) {
        self.parent = Some(parent);
        self.parent_edge = parent_edge;
    }

    /// Empties the node and sets it as deleted
    pub(crate) fn delete(&mut self) {
        *self = Self::new();
        self.deleted = true;
    }

    /// Adds a child to the node, in the left slot if it is free and in the right slot otherwise.
    /// ```
    /// use phylonj::tree::Node;
    ///
    /// let mut parent = Node::new();
    /// parent.id = 0;
    /// let mut child = Node::new();
    /// child.id = 1;
    ///
    /// child.set_parent(parent.id, Some(0.1));
    /// parent.add_child(child.id).unwrap();
    ///
    /// assert_eq!(parent.children, vec![1]);
    /// assert!(parent.add_child(2).is_ok());
    /// assert!(parent.add_child(3).is_err());
    /// ```
    pub fn add_child(&mut self, child: NodeId) -> Result<(), NodeError> {
        if self.children.len() >= 2 {
            return Err(NodeError::TooManyChildren(self.id));
        }
        self.children.push(child);
        Ok(())
    }

    /// Check if the node is a tip node
    pub fn is_tip(&self) -> bool {
        self.children.is_empty()
    }

    /// Check if the node is a root node
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    fn format_name(&self) -> String {
        self.name.clone().unwrap_or_default()
    }

    fn format_length(&self) -> String {
        self.parent_edge
            .map(|v| format!(":{}", round_length(v)))
            .unwrap_or_default()
    }

    /// Returns String with node in newick format
    pub fn to_newick(&self, format: NewickFormat) -> String {
        let mut repr = String::new();

        if self.is_tip() {
            repr += &self.format_name()
        }

        if let NewickFormat::AllLengthsLeafNames = format {
            repr += &self.format_length()
        }

        repr
    }
}

/// Rounds a branch length to 4 decimal places for output
pub(crate) fn round_length(length: EdgeLength) -> EdgeLength {
    (length * 10_000.0).round() / 10_000.0
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.name.as_deref().unwrap_or_default();
        match self.parent_edge {
            Some(l) => write!(f, "{name}:{l:.4}"),
            None => write!(f, "{name}"),
        }
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:?}) {:?} Id[{}] Parent[{:?}] Children({:?})",
            self.parent_edge, self.name, self.id, self.parent, self.children,
        )
    }
}
