//! Build, read, compare and root binary phylogenetic trees.
//!
//! This module defines the two essential structs to represent phylogenetic trees:
//!  - The [`Node`] struct that represents a node of a phylogenetic tree.
//!  - The [`Tree`] struct that holds a collection of [`Node`] objects.
//!
//! Trees are built either from Newick strings ([`Tree::from_newick`]) or from
//! a distance matrix with [`Tree::neighbour_joining`], and the resulting unrooted
//! tree can be rooted with [`Tree::midpoint_root`].

mod midpoint;
mod neighbour_joining;
mod node;
mod tree_impl;

pub use self::node::{Node, NodeError};
pub use self::tree_impl::{NewickParseError, Partition, Tree, TreeError};

/// A type that represents Identifiers of [`Node`] objects
/// within phylogenetic [`Tree`] object.
pub type NodeId = usize;

/// A type that represents branch lengths between [`Node`] objects
/// within phylogenetic [`Tree`] object.
pub type EdgeLength = f64;

/// Newick output format
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NewickFormat {
    /// Output leaf names
    OnlyNames,
    /// Output all branch lengths (rounded to 4 decimals) + leaf names
    AllLengthsLeafNames,
}
