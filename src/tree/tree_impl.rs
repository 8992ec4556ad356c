use fixedbitset::FixedBitSet;
use itertools::Itertools;
use ptree::{print_tree, write_tree, TreeBuilder};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::iter::zip;
use std::{fs, path::Path};

use thiserror::Error;
use tracing::debug;

use super::node::{Node, NodeError};
use super::{EdgeLength, NewickFormat, NodeId};

use crate::distance::{DistanceMatrix, MatrixError};

/// Errors that can occur when reading, writing and manipulating [`Tree`] structs.
#[derive(Error, Debug)]
pub enum TreeError {
    /// The tree is not binary and we are trying to do something
    /// only possible on binary trees
    #[error("This tree is not Binary.")]
    IsNotBinary,
    /// The tree is empty and we are trying to do something that require at least one node
    #[error("This tree is empty.")]
    IsEmpty,
    /// No root node was found in the tree and we are trying to do something
    /// that requires a root node
    #[error("No root node found")]
    RootNotFound,
    /// Some of the leaves in the tree have no name
    #[error("All your leaf nodes must be named.")]
    UnnamedLeaves,
    /// Some of the leaves in the tree share the same name
    #[error("Your leaf names must be unique.")]
    DuplicateLeafNames,
    /// Some branches of the tree have no length
    #[error("The tree must have all branch lengths.")]
    MissingBranchLengths,
    /// The trees we want to compare have different tips
    #[error("The trees have different tips indices.")]
    DifferentTipIndices,
    /// The requested node with index [`NodeId`] does not exist in the tree
    #[error("There is no node with index: {0}")]
    NodeNotFound(NodeId),
    /// The two nodes could not be joined under a new parent
    #[error("Cannot join nodes {0} and {1}: both must be distinct subtree roots")]
    JoiningAttachedNodes(NodeId, NodeId),
    /// The operation needs more leaves than the tree (or matrix) has
    #[error("Not enough leaves for this operation: {0}")]
    TooFewLeaves(usize),
    /// A leaf has no sequence attached to it
    #[error("Leaf {0} has no sequence")]
    MissingSequence(String),
    /// The two root edges of a tree built by neighbour joining should have the same length
    #[error("Root edges should both carry the central edge length, found {0} and {1}")]
    AsymmetricRootEdges(EdgeLength, EdgeLength),
    /// The longest path between two leaves has a null length
    #[error("The tree diameter is null, cannot find its midpoint")]
    DegenerateDiameter,
    /// There was a [`std::io::Error`] when writing the tree to a file
    #[error("Error writing tree")]
    IoError(#[from] std::io::Error),
    /// There was a [`NodeError`] when operating on a node
    #[error("Could operate on Node")]
    NodeError(#[from] NodeError),
    /// There was a [`MatrixError`] when reading or filling a distance matrix
    #[error("Could not access distance matrix")]
    MatrixError(#[from] MatrixError),
}

/// Errors that can occur when parsing newick files.
#[derive(Error, Debug)]
pub enum NewickParseError {
    /// The newick string does not start with an opening bracket
    #[error("The tree must start with an opening bracket.")]
    NoOpeningBracket,
    /// There is an unclosed bracket in the newick String
    #[error("Missing a closing bracket.")]
    UnclosedBracket,
    /// There is a closing bracket without a matching opening one
    #[error("Found a closing bracket without a matching opening bracket.")]
    UnopenedBracket,
    /// The newick string is missing a final `);`
    #[error("The tree is missing a closing bracket and semi colon at the end.")]
    NoClosingSemicolon,
    /// We are trying to add a sibling to the root of the tree
    #[error("Parent node of subtree not found")]
    NoSubtreeParent,
    /// A leaf has no label
    #[error("Found a leaf without a label.")]
    MissingLabel,
    /// A label follows a closing bracket, only leaves can be labelled
    #[error("Internal nodes cannot have a label.")]
    InternalLabel,
    /// A node of the tree does not have exactly 0 or 2 children
    #[error("Internal nodes must have exactly two children, found one with {0}.")]
    NotBinary(usize),
    /// A character appears where it is not allowed
    #[error("Unexpected character '{0}'.")]
    UnexpectedCharacter(char),
    /// The newick file does not contain any tree
    #[error("No tree found in file.")]
    EmptyFile,
    /// There was a [`TreeError`] when building a tree from the newick string
    #[error("Problem with building the tree.")]
    TreeError(#[from] TreeError),
    /// There was a [`std::num::ParseFloatError`] when parsing branch lengths
    #[error("Could not parse a branch length")]
    FloatError(#[from] std::num::ParseFloatError),
    /// There was a [`std::io::Error`] when reading a newick file
    #[error("Problem reading file")]
    IoError(#[from] std::io::Error),
}

/// A bipartition of the leaves of a tree, stored as the smaller of the
/// clade bitset and its complement over the sorted leaf names.
pub type Partition = FixedBitSet;
type PartitionSet = HashSet<Partition>;

/// A binary phylogenetic tree
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

/// Base methods to add and get [`Node`] objects to and from the [`Tree`].
///
/// ----
/// ----
impl Tree {
    /// Create a new empty Tree object
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    // ############################
    // # ADDING AND GETTING NODES #
    // ############################

    /// Add a new node to the tree.
    pub fn add(&mut self, node: Node) -> NodeId {
        let idx = self.nodes.len();
        let mut node = node;
        node.id = idx;
        self.nodes.push(node);

        idx
    }

    /// Add a child to one of the tree's nodes. Fails if the parent
    /// does not exist or already has two children.
    ///
    /// # Example
    /// ```
    /// use phylonj::tree::{Tree, Node};
    ///
    /// // Create the tree and add a root node
    /// let mut tree = Tree::new();
    /// let root_id = tree.add(Node::new());
    ///
    /// // Add children to the root
    /// let left = tree.add_child(Node::new_named("A"), root_id, None).unwrap();
    /// let right = tree.add_child(Node::new_named("B"), root_id, Some(0.1)).unwrap();
    ///
    /// assert_eq!(tree.get(&root_id).unwrap().children, vec![left, right]);
    /// assert_eq!(tree.get(&right).unwrap().parent_edge, Some(0.1));
    ///
    /// // A third child is refused
    /// assert!(tree.add_child(Node::new_named("C"), root_id, None).is_err());
    /// ```
    pub fn add_child(
        &mut self,
        node: Node,
        parent: NodeId,
        edge: Option<EdgeLength>,
    ) -> Result<NodeId, TreeError> {
        if self.get(&parent)?.children.len() >= 2 {
            return Err(TreeError::IsNotBinary);
        }

        let mut node = node;
        node.set_parent(parent, edge);

        let id = self.add(node);
        self.get_mut(&parent)?.add_child(id)?;

        Ok(id)
    }

    /// Creates a new parent node for two parentless nodes of the tree,
    /// `child1` becomes the left child and `child2` the right one.
    /// ```
    /// use phylonj::tree::{Tree, Node};
    ///
    /// let mut tree = Tree::new();
    /// let a = tree.add(Node::new_named("A"));
    /// let b = tree.add(Node::new_named("B"));
    /// let parent = tree.join(a, b, Some(0.5), Some(1.5)).unwrap();
    ///
    /// assert_eq!(tree.get_root().unwrap(), parent);
    /// assert_eq!(tree.to_newick().unwrap(), "(A:0.5,B:1.5);");
    /// ```
    pub fn join(
        &mut self,
        child1: NodeId,
        child2: NodeId,
        edge1: Option<EdgeLength>,
        edge2: Option<EdgeLength>,
    ) -> Result<NodeId, TreeError> {
        if child1 == child2 || !self.get(&child1)?.is_root() || !self.get(&child2)?.is_root() {
            return Err(TreeError::JoiningAttachedNodes(child1, child2));
        }

        let parent = self.add(Node::new());

        let p = self.get_mut(&parent)?;
        p.add_child(child1)?;
        p.add_child(child2)?;

        self.get_mut(&child1)?.set_parent(parent, edge1);
        self.get_mut(&child2)?.set_parent(parent, edge2);

        Ok(parent)
    }

    /// Tombstones a node, it will be skipped by every query
    pub(crate) fn delete(&mut self, id: &NodeId) -> Result<(), TreeError> {
        self.get_mut(id)?.delete();
        Ok(())
    }

    /// Get a reference to a specific Node of the tree
    pub fn get(&self, id: &NodeId) -> Result<&Node, TreeError> {
        match self.nodes.get(*id) {
            Some(node) if !node.deleted => Ok(node),
            _ => Err(TreeError::NodeNotFound(*id)),
        }
    }

    /// Get a mutable reference to a specific Node of the tree
    pub fn get_mut(&mut self, id: &NodeId) -> Result<&mut Node, TreeError> {
        match self.nodes.get_mut(*id) {
            Some(node) if !node.deleted => Ok(node),
            _ => Err(TreeError::NodeNotFound(*id)),
        }
    }

    /// Get a reference to a node in the tree by name, searching depth first
    /// from the root (left subtree before right subtree).
    /// ```
    /// use phylonj::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A,B),(C,D));").unwrap();
    /// let c = tree.get_by_name("C").unwrap();
    ///
    /// assert!(c.is_tip());
    /// assert!(tree.get_by_name("E").is_none());
    /// ```
    pub fn get_by_name(&self, name: &str) -> Option<&Node> {
        let root = self.get_root().ok()?;
        self.preorder(&root)
            .ok()?
            .into_iter()
            .filter_map(|id| self.get(&id).ok())
            .find(|node| node.name.as_deref() == Some(name))
    }

    /// Returns the parent of a node, [`None`] for the root.
    pub fn parent_of(&self, id: &NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.get(id)?.parent)
    }

    /// Gets the root node.
    pub fn get_root(&self) -> Result<NodeId, TreeError> {
        self.nodes
            .iter()
            .filter(|&node| !node.deleted && node.parent.is_none())
            .map(|node| node.id)
            .next()
            .ok_or(TreeError::RootNotFound)
    }

    /// Returns a [`Vec`] containing the Node IDs of leaf nodes of the tree,
    /// in post-order.
    /// ```
    /// use phylonj::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A,B),(C,D));").unwrap();
    /// let names: Vec<_> = tree
    ///     .get_leaves()
    ///     .iter()
    ///     .filter_map(|id| tree.get(id).unwrap().name.clone())
    ///     .collect();
    ///
    /// assert_eq!(names, vec!["A", "B", "C", "D"]);
    /// ```
    pub fn get_leaves(&self) -> Vec<NodeId> {
        let Ok(root) = self.get_root() else {
            return vec![];
        };

        self.postorder(&root)
            .unwrap_or_default()
            .into_iter()
            .filter(|id| self.nodes[*id].is_tip())
            .collect()
    }

    /// Returns a [`Vec`] containing the Names of the leaf nodes of the tree
    pub fn get_leaf_names(&self) -> Vec<Option<String>> {
        self.get_leaves()
            .iter()
            .map(|leaf_id| self.nodes[*leaf_id].name.clone())
            .collect()
    }

    /// Returns the set of leaf labels of the tree
    pub fn leaf_labels(&self) -> BTreeSet<String> {
        self.get_leaf_names().into_iter().flatten().collect()
    }

    /// Attaches a sequence to every leaf whose label is a key of `sequences`.
    /// Labels of the leaves that found no sequence are returned, they stay
    /// without sequence and any later operation needing one will fail with
    /// [`TreeError::MissingSequence`].
    /// ```
    /// use std::collections::HashMap;
    /// use phylonj::tree::Tree;
    ///
    /// let mut tree = Tree::from_newick("((A,B),C);").unwrap();
    /// let sequences = HashMap::from([
    ///     ("A".to_string(), "ARN".to_string()),
    ///     ("B".to_string(), "ARD".to_string()),
    /// ]);
    ///
    /// assert_eq!(tree.assign_sequences(&sequences), vec!["C"]);
    /// ```
    pub fn assign_sequences(&mut self, sequences: &HashMap<String, String>) -> Vec<String> {
        let mut missing = vec![];
        for id in self.get_leaves() {
            let leaf = &mut self.nodes[id];
            let Some(name) = leaf.name.clone() else {
                continue;
            };
            match sequences.get(&name) {
                Some(sequence) => leaf.set_sequence(sequence.clone()),
                None => missing.push(name),
            }
        }

        missing
    }

    /// Returns the sequence attached to a leaf
    pub fn sequence_of(&self, id: &NodeId) -> Result<&str, TreeError> {
        let node = self.get(id)?;
        node.sequence
            .as_deref()
            .ok_or_else(|| TreeError::MissingSequence(node.name.clone().unwrap_or_default()))
    }
}

/// Methods to traverse the [`Tree`]
///
/// ----
/// ----
impl Tree {
    // ###################
    // # TREE TRAVERSALS #
    // ###################

    /// Returns a vector containing node ids in the same order as the
    /// [preorder](https://en.wikipedia.org/wiki/Tree_traversal#Pre-order,_NLR) tree traversal
    /// ```
    /// use phylonj::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A,(C,E)),(H,I));").unwrap();
    /// let preorder: Vec<_> = tree.preorder(&tree.get_root().unwrap())
    ///     .unwrap()
    ///     .iter()
    ///     .filter_map(|id| tree.get(id).unwrap().name.clone())
    ///     .collect();
    ///
    /// assert_eq!(preorder, vec!["A", "C", "E", "H", "I"])
    /// ```
    pub fn preorder(&self, root: &NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut indices = vec![];
        let mut stack = vec![*root];
        while let Some(id) = stack.pop() {
            indices.push(id);
            stack.extend(self.get(&id)?.children.iter().rev());
        }

        Ok(indices)
    }

    /// Returns a vector containing node ids in the same order as the
    /// [postorder](https://en.wikipedia.org/wiki/Tree_traversal#Post-order,_LRN ) tree traversal
    pub fn postorder(&self, root: &NodeId) -> Result<Vec<NodeId>, TreeError> {
        // Root-right-left preorder, reversed
        let mut indices = vec![];
        let mut stack = vec![*root];
        while let Some(id) = stack.pop() {
            indices.push(id);
            stack.extend(self.get(&id)?.children.iter());
        }
        indices.reverse();

        Ok(indices)
    }
}

/// Methods that compute characteristics and measures to describe the [`Tree`]
///
/// ----
/// ----
impl Tree {
    // #######################################
    // # GETTING CHARACTERISTICS OF THE TREE #
    // #######################################

    /// Check that every node has either 0 or 2 children
    pub fn is_binary(&self) -> bool {
        self.nodes
            .iter()
            .filter(|node| !node.deleted)
            .all(|node| node.children.is_empty() || node.children.len() == 2)
    }

    /// Returns the number of nodes in the tree
    pub fn size(&self) -> usize {
        self.nodes.iter().filter(|node| !node.deleted).count()
    }

    /// Returns the number of leaves in the tree
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|&node| !node.deleted && node.is_tip())
            .count()
    }

    /// Returns the length of the tree
    /// (i.e. the sum of branch lengths)
    /// ```
    /// use phylonj::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A:0.1,B:0.2):0.5,(C:0.3,D:0.4):0.5);").unwrap();
    /// assert!((tree.length().unwrap() - 2.0).abs() < 1e-12);
    /// ```
    pub fn length(&self) -> Result<EdgeLength, TreeError> {
        self.nodes
            .iter()
            .filter(|n| !(n.deleted || n.is_root()))
            .map(|n| n.parent_edge)
            .sum::<Option<EdgeLength>>()
            .ok_or(TreeError::MissingBranchLengths)
    }
}

/// Methods to compare [`Tree`] topologies through their bipartitions
///
/// ----
/// ----
impl Tree {
    // #########################
    // # GET EDGES IN THE TREE #
    // #########################

    /// Sorted leaf names, used to give every leaf a position in partition bitsets
    fn leaf_index(&self) -> Result<Vec<String>, TreeError> {
        if self.nodes.is_empty() {
            return Err(TreeError::IsEmpty);
        }

        let names: Vec<_> = self
            .get_leaf_names()
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(TreeError::UnnamedLeaves)?
            .into_iter()
            .sorted()
            .collect();

        if names.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(TreeError::DuplicateLeafNames);
        }

        Ok(names)
    }

    /// Helper function to view a partition as its two sets of leaf names
    pub fn partition_to_leaves(
        &self,
        partition: &Partition,
    ) -> Result<(BTreeSet<String>, BTreeSet<String>), TreeError> {
        let index = self.leaf_index()?;

        let (inside, outside): (Vec<_>, Vec<_>) = index
            .into_iter()
            .enumerate()
            .partition(|(i, _)| partition.contains(*i));

        Ok((
            inside.into_iter().map(|(_, name)| name).collect(),
            outside.into_iter().map(|(_, name)| name).collect(),
        ))
    }

    /// Get all non-trivial bipartitions of a tree (i.e. splits with at least 2
    /// leaves on each side). Trees with 3 leaves or fewer have none.
    /// ```
    /// use phylonj::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A,B),(C,D));").unwrap();
    /// let partitions = tree.get_partitions().unwrap();
    /// assert_eq!(partitions.len(), 1);
    ///
    /// let (left, right) = tree
    ///     .partition_to_leaves(partitions.iter().next().unwrap())
    ///     .unwrap();
    /// assert_eq!(left.into_iter().collect::<Vec<_>>(), vec!["A", "B"]);
    /// assert_eq!(right.into_iter().collect::<Vec<_>>(), vec!["C", "D"]);
    /// ```
    pub fn get_partitions(&self) -> Result<PartitionSet, TreeError> {
        let index = self.leaf_index()?;
        let n = index.len();

        let mut partitions = HashSet::new();
        if n <= 3 {
            return Ok(partitions);
        }

        let positions: HashMap<&str, usize> = index
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let mut clades: HashMap<NodeId, FixedBitSet> = HashMap::new();
        for id in self.postorder(&self.get_root()?)? {
            let node = self.get(&id)?;
            let mut clade = FixedBitSet::with_capacity(n);

            if node.is_tip() {
                if let Some(&position) = node.name.as_deref().and_then(|name| positions.get(name)) {
                    clade.insert(position);
                }
            } else {
                for child in node.children.iter() {
                    if let Some(child_clade) = clades.remove(child) {
                        clade.union_with(&child_clade);
                    }
                }

                let size = clade.count_ones(..);
                if !node.is_root() && (2..=n - 2).contains(&size) {
                    let mut toggled = clade.clone();
                    toggled.toggle_range(..);
                    partitions.insert(toggled.min(clade.clone()));
                }
            }

            clades.insert(id, clade);
        }

        Ok(partitions)
    }

    // #################
    // # COMPARE TREES #
    // #################

    /// Computes the [Robinson Foulds distance](https://en.wikipedia.org/wiki/Robinson–Foulds_metric)
    /// [(Robinson & Foulds, 1981)](https://doi.org/10.1016/0025-5564(81)90043-2)
    /// between two trees sharing the same leaf names. The RF distance is the number
    /// of bipartitions found in only one of the trees:
    /// $$
    /// RF = |A\cup B| - |A\cap B|
    /// $$
    /// Where $A$ and $B$ are the sets of bipartitions of the first and second trees.
    /// ```
    /// use phylonj::tree::Tree;
    ///
    /// let t1 = Tree::from_newick("((A,B),(C,(D,E)));").unwrap();
    /// let t2 = Tree::from_newick("((A,C),(B,(D,E)));").unwrap();
    ///
    /// assert_eq!(t1.robinson_foulds(&t2).unwrap(), 2);
    /// assert_eq!(t1.robinson_foulds(&t1).unwrap(), 0);
    /// ```
    pub fn robinson_foulds(&self, other: &Self) -> Result<usize, TreeError> {
        if self.leaf_index()? != other.leaf_index()? {
            return Err(TreeError::DifferentTipIndices);
        }

        let partitions_s = self.get_partitions()?;
        let partitions_o = other.get_partitions()?;

        Ok(partitions_s.symmetric_difference(&partitions_o).count())
    }

    /// Computes the normalized Robinson Foulds distance between two trees,
    /// i.e. the RF distance divided by its maximum $2(n-3)$ for $n$ leaves.
    /// Fails with [`TreeError::TooFewLeaves`] when $n \leq 3$.
    pub fn robinson_foulds_norm(&self, other: &Self) -> Result<f64, TreeError> {
        let n = self.n_leaves();
        if n <= 3 {
            return Err(TreeError::TooFewLeaves(n));
        }

        let rf = self.robinson_foulds(other)?;

        Ok((rf as f64) / (2 * (n - 3)) as f64)
    }
}

impl Tree {
    // ##########################
    // # FIND PATHS IN THE TREE #
    // ##########################

    /// Returns the path from the root to the node
    pub fn get_path_from_root(&self, node: &NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut path = vec![];
        let mut current_node = *node;
        loop {
            path.push(current_node);
            match self.get(&current_node)?.parent {
                Some(parent) => current_node = parent,
                None => break,
            }
        }

        Ok(path.into_iter().rev().collect())
    }

    /// Gets the most recent common ancestor between two tree nodes
    /// ```
    /// use phylonj::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A,(C,E)),(H,I));").unwrap();
    /// let c = tree.get_by_name("C").unwrap().id;
    /// let e = tree.get_by_name("E").unwrap().id;
    /// let ancestor = tree.get_common_ancestor(&c, &e).unwrap();
    ///
    /// assert_eq!(tree.get(&c).unwrap().parent, Some(ancestor));
    /// ```
    pub fn get_common_ancestor(
        &self,
        source: &NodeId,
        target: &NodeId,
    ) -> Result<NodeId, TreeError> {
        if source == target {
            return Ok(*source);
        }
        let root_to_source = self.get_path_from_root(source)?;
        let root_to_target = self.get_path_from_root(target)?;

        let cursor = zip(root_to_source.iter(), root_to_target.iter())
            .position(|(s, t)| s != t)
            .unwrap_or_else(|| {
                // One node is an ancestor of the other
                root_to_source.len().min(root_to_target.len())
            });

        if cursor == 0 {
            // Nodes belong to different subtrees
            return Err(TreeError::RootNotFound);
        }

        Ok(root_to_source[cursor - 1])
    }

    /// Gets the sum of branch lengths on the path between two nodes.
    /// ```
    /// use phylonj::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A:1,B:2):1,(C:3,D:4):1);").unwrap();
    /// let a = tree.get_by_name("A").unwrap().id;
    /// let d = tree.get_by_name("D").unwrap().id;
    ///
    /// assert_eq!(tree.get_distance(&a, &d).unwrap(), 7.0);
    /// ```
    pub fn get_distance(&self, source: &NodeId, target: &NodeId) -> Result<EdgeLength, TreeError> {
        let ancestor = self.get_common_ancestor(source, target)?;

        let mut dist = 0.0;
        for start in [source, target] {
            let mut current = *start;
            while current != ancestor {
                let node = self.get(&current)?;
                dist += node.parent_edge.ok_or(TreeError::MissingBranchLengths)?;
                current = node.parent.ok_or(TreeError::RootNotFound)?;
            }
        }

        Ok(dist)
    }

    /// Builds the matrix of path lengths between all pairs of leaves,
    /// taxa are in leaf post-order.
    pub fn patristic_matrix(&self) -> Result<DistanceMatrix<EdgeLength>, TreeError> {
        let leaves = self.get_leaves();
        let taxa = leaves
            .iter()
            .map(|id| self.get(id)?.name.clone().ok_or(TreeError::UnnamedLeaves))
            .collect::<Result<Vec<_>, _>>()?;

        let mut matrix = DistanceMatrix::new_with_size(taxa.len());
        matrix.set_taxa(taxa)?;

        for pair in (0..leaves.len()).combinations(2) {
            let (i, j) = (pair[0], pair[1]);
            let d = self.get_distance(&leaves[i], &leaves[j])?;
            matrix.set_by_index(i, j, d)?;
        }

        Ok(matrix)
    }
}

/// Methods to read and write [`Tree`] objects to and from files or [`String`] objects.
///
/// ----
/// ----
impl Tree {
    // ########################
    // # READ AND WRITE TREES #
    // ########################

    /// Generate newick representation of the subtree rooted at `root`
    fn to_newick_impl(&self, root: &NodeId, format: NewickFormat) -> Result<String, TreeError> {
        enum Step {
            Open(NodeId),
            Comma,
            Close(NodeId),
        }

        let mut repr = String::new();
        let mut stack = vec![Step::Open(*root)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Open(id) => {
                    let node = self.get(&id)?;
                    match node.children[..] {
                        [] => repr += &node.to_newick(format),
                        // Single children are rendered in place of their parent
                        [child] => stack.push(Step::Open(child)),
                        _ => {
                            repr.push('(');
                            stack.push(Step::Close(id));
                            for (i, child) in node.children.iter().enumerate().rev() {
                                stack.push(Step::Open(*child));
                                if i > 0 {
                                    stack.push(Step::Comma);
                                }
                            }
                        }
                    }
                }
                Step::Comma => repr.push(','),
                Step::Close(id) => {
                    repr.push(')');
                    repr += &self.get(&id)?.to_newick(format);
                }
            }
        }

        Ok(repr)
    }

    /// Writes the tree as a newick formatted string with leaf names and
    /// all branch lengths, rounded to 4 decimal places.
    /// # Example
    /// ```
    /// use phylonj::tree::Tree;
    ///
    /// let newick = "((A:0.1,B:0.2):0.05,(C:0.3,D:0.123456):0.05);";
    /// let tree = Tree::from_newick(newick).unwrap();
    ///
    /// assert_eq!(
    ///     tree.to_newick().unwrap(),
    ///     "((A:0.1,B:0.2):0.05,(C:0.3,D:0.1235):0.05);"
    /// );
    /// ```
    pub fn to_newick(&self) -> Result<String, TreeError> {
        self.to_formatted_newick(NewickFormat::AllLengthsLeafNames)
    }

    /// Writes the tree as a newick formatted string with a specified
    /// output format from [`NewickFormat`].
    /// # Example
    /// ```
    /// use phylonj::tree::{Tree, NewickFormat};
    ///
    /// let newick = "((A:0.1,B:0.2):0.05,(C:0.3,D:0.4):0.05);";
    /// let tree = Tree::from_newick(newick).unwrap();
    ///
    /// assert_eq!(
    ///     tree.to_formatted_newick(NewickFormat::OnlyNames).unwrap(),
    ///     "((A,B),(C,D));"
    /// );
    /// ```
    pub fn to_formatted_newick(&self, format: NewickFormat) -> Result<String, TreeError> {
        let root = self.get_root()?;
        Ok(self.to_newick_impl(&root, format)? + ";")
    }

    /// Adds a node parsed from a newick string to its parent
    fn add_parsed_child(&mut self, node: Node, parent: NodeId) -> Result<NodeId, NewickParseError> {
        match self.add_child(node, parent, None) {
            Err(TreeError::IsNotBinary) => Err(NewickParseError::NotBinary(3)),
            res => Ok(res?),
        }
    }

    /// Read a newick formatted string and build a [`Tree`] struct from it.
    /// Whitespace is ignored, leaves must be labelled, internal nodes must
    /// have exactly two children and cannot be labelled. Branch lengths are
    /// optional, a length given to the root is ignored.
    /// # Example
    /// ```
    /// use phylonj::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A:0.1,B:0.2), (C,D));").unwrap();
    ///
    /// assert_eq!(tree.size(), 7);
    /// assert_eq!(tree.n_leaves(), 4);
    /// assert!(Tree::from_newick("(A,B,(C,D));").is_err());
    /// ```
    pub fn from_newick(newick: &str) -> Result<Self, NewickParseError> {
        #[derive(Debug, PartialEq)]
        enum Field {
            Name,
            Length,
        }

        let newick: String = newick.chars().filter(|c| !c.is_whitespace()).collect();
        if !newick.starts_with('(') {
            return Err(NewickParseError::NoOpeningBracket);
        }
        // The tree closes with `)` or with `):<length>` for the root
        let body = newick
            .strip_suffix(';')
            .filter(|body| {
                body.ends_with(')')
                    || body
                        .rsplit_once("):")
                        .is_some_and(|(_, length)| !length.contains(['(', ')', ',', ':']))
            })
            .ok_or(NewickParseError::NoClosingSemicolon)?;

        let mut tree = Tree::new();

        let mut parsing = Field::Name;
        let mut current_name: Option<String> = None;
        let mut current_length: Option<String> = None;
        let mut current_index: Option<NodeId> = None;
        let mut parent_stack: Vec<NodeId> = Vec::new();

        for c in body.chars() {
            match c {
                '(' => {
                    // Start subtree
                    if current_index.is_some() || current_name.is_some() || parsing == Field::Length
                    {
                        return Err(NewickParseError::UnexpectedCharacter(c));
                    }
                    let node = match parent_stack.last() {
                        None if tree.nodes.is_empty() => tree.add(Node::new()),
                        None => return Err(NewickParseError::NoSubtreeParent),
                        Some(parent) => tree.add_parsed_child(Node::new(), *parent)?,
                    };
                    parent_stack.push(node);
                }
                ':' => {
                    // Start parsing length
                    if parsing == Field::Length
                        || (current_name.is_none() && current_index.is_none())
                    {
                        return Err(NewickParseError::UnexpectedCharacter(c));
                    }
                    parsing = Field::Length;
                    current_length = Some(String::new());
                }
                ',' | ')' => {
                    // Flush the pending leaf or subtree into the current parent
                    let parent = match parent_stack.last() {
                        Some(parent) => *parent,
                        None if c == ',' => return Err(NewickParseError::NoSubtreeParent),
                        None => return Err(NewickParseError::UnopenedBracket),
                    };

                    let node = match (current_index.take(), current_name.take()) {
                        (Some(index), _) => Some(index),
                        (None, Some(name)) => {
                            Some(tree.add_parsed_child(Node::new_named(&name), parent)?)
                        }
                        (None, None) if c == ',' => return Err(NewickParseError::MissingLabel),
                        (None, None) => None,
                    };
                    if let (Some(node), Some(length)) = (node, current_length.take()) {
                        tree.get_mut(&node)?.parent_edge = Some(length.parse()?);
                    }

                    parsing = Field::Name;

                    if c == ')' {
                        // Close subtree
                        parent_stack.pop();
                        let n_children = tree.get(&parent)?.children.len();
                        if n_children != 2 {
                            return Err(NewickParseError::NotBinary(n_children));
                        }
                        current_index = Some(parent);
                    }
                }
                ';' => return Err(NewickParseError::UnexpectedCharacter(c)),
                _ => match parsing {
                    Field::Name => {
                        if current_index.is_some() {
                            return Err(NewickParseError::InternalLabel);
                        }
                        current_name.get_or_insert_with(String::new).push(c)
                    }
                    Field::Length => current_length.get_or_insert_with(String::new).push(c),
                },
            }
        }

        if !parent_stack.is_empty() {
            return Err(NewickParseError::UnclosedBracket);
        }
        if let Some(length) = current_length {
            // Root length is checked but not kept
            length.parse::<EdgeLength>()?;
        }

        Ok(tree)
    }

    /// Writes the tree to a newick file
    pub fn to_file(&self, path: &Path, format: NewickFormat) -> Result<(), TreeError> {
        fs::write(path, self.to_formatted_newick(format)? + "\n")?;
        Ok(())
    }

    /// Reads every non-empty line of a file as a newick tree
    pub fn from_file(path: &Path) -> Result<Vec<Self>, NewickParseError> {
        let content = fs::read_to_string(path)?;
        let trees = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(Self::from_newick)
            .collect::<Result<Vec<_>, _>>()?;

        if trees.is_empty() {
            return Err(NewickParseError::EmptyFile);
        }
        debug!(n_trees = trees.len(), path = %path.display(), "Read newick file");

        Ok(trees)
    }

    /// Builds a printable representation of the tree
    fn printable(&self) -> Result<ptree::item::StringItem, TreeError> {
        enum Step {
            Open(NodeId),
            Close,
        }

        let root = self.get_root()?;
        let mut builder = TreeBuilder::new(format!("{}", self.get(&root)?));
        let mut stack: Vec<_> = self
            .get(&root)?
            .children
            .iter()
            .rev()
            .map(|id| Step::Open(*id))
            .collect();

        while let Some(step) = stack.pop() {
            match step {
                Step::Open(id) => {
                    let node = self.get(&id)?;
                    if node.is_tip() {
                        builder.add_empty_child(format!("{node}"));
                    } else {
                        builder.begin_child(format!("{node}"));
                        stack.push(Step::Close);
                        stack.extend(node.children.iter().rev().map(|id| Step::Open(*id)));
                    }
                }
                Step::Close => {
                    builder.end_child();
                }
            }
        }

        Ok(builder.build())
    }

    /// Draws the tree as ASCII art
    pub fn to_ascii(&self) -> Result<String, TreeError> {
        let mut buffer = Vec::new();
        write_tree(&self.printable()?, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Print the tree to the console
    pub fn print(&self) -> Result<(), TreeError> {
        print_tree(&self.printable()?)?;
        Ok(())
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds ((A:0.1,B:0.2):0.5,(C:0.3,D:0.4):0.6) node by node
    fn build_tree_with_lengths() -> Result<Tree, TreeError> {
        let mut tree = Tree::new();
        tree.add(Node::new()); // 0
        tree.add_child(Node::new(), 0, Some(0.5))?; // 1
        tree.add_child(Node::new(), 0, Some(0.6))?; // 2
        tree.add_child(Node::new_named("A"), 1, Some(0.1))?; // 3
        tree.add_child(Node::new_named("B"), 1, Some(0.2))?; // 4
        tree.add_child(Node::new_named("C"), 2, Some(0.3))?; // 5
        tree.add_child(Node::new_named("D"), 2, Some(0.4))?; // 6

        Ok(tree)
    }

    fn get_values(indices: &[usize], tree: &Tree) -> Vec<String> {
        indices
            .iter()
            .filter_map(|idx| tree.get(idx).unwrap().name.clone())
            .collect()
    }

    fn caterpillar_newick(n_leaves: usize) -> String {
        let mut newick = "(".repeat(n_leaves - 1) + "T0,T1)";
        for i in 2..n_leaves {
            newick += &format!(",T{i})");
        }
        newick + ";"
    }

    #[test]
    fn test_tips() {
        let tree = build_tree_with_lengths().unwrap();
        assert_eq!(tree.get_leaves(), vec![3, 4, 5, 6]);
        assert_eq!(tree.n_leaves(), 4);
        assert_eq!(tree.size(), 7);
        assert!(tree.is_binary());
    }

    #[test]
    fn traversals() {
        let tree = Tree::from_newick("((A,(C,E)),(H,I));").unwrap();
        let root = tree.get_root().unwrap();

        let postorder = tree.postorder(&root).unwrap();
        assert_eq!(postorder.last(), Some(&root));
        assert_eq!(get_values(&postorder, &tree), vec!["A", "C", "E", "H", "I"]);

        let preorder = tree.preorder(&root).unwrap();
        assert_eq!(preorder.first(), Some(&root));
        assert_eq!(preorder.len(), tree.size());
    }

    #[test]
    fn parents() {
        let tree = build_tree_with_lengths().unwrap();
        assert_eq!(tree.parent_of(&0).unwrap(), None);
        assert_eq!(tree.parent_of(&3).unwrap(), Some(1));
        assert_eq!(tree.parent_of(&2).unwrap(), Some(0));
        assert!(tree.parent_of(&42).is_err());
    }

    #[test]
    fn path_and_ancestors() {
        let tree = build_tree_with_lengths().unwrap();
        assert_eq!(tree.get_path_from_root(&6).unwrap(), vec![0, 2, 6]);

        let test_cases = vec![
            ((3, 4), 1), // (A,B) -> AB
            ((3, 6), 0), // (A,D) -> root
            ((3, 3), 3), // (A,A) -> A
            ((1, 4), 1), // (AB,B) -> AB
        ];
        for ((source, target), ancestor) in test_cases {
            assert_eq!(
                ancestor,
                tree.get_common_ancestor(&source, &target).unwrap()
            );
        }
    }

    #[test]
    fn distances() {
        let tree = build_tree_with_lengths().unwrap();
        let test_cases = vec![
            ((3, 4), 0.3),
            ((3, 5), 1.5),
            ((4, 6), 1.7),
            ((1, 2), 1.1),
            ((5, 5), 0.0),
        ];

        for ((source, target), expected) in test_cases {
            let d = tree.get_distance(&source, &target).unwrap();
            assert!((d - expected).abs() < 1e-12, "{d} != {expected}");
        }

        let no_lengths = Tree::from_newick("((A,B),(C,D));").unwrap();
        assert!(matches!(
            no_lengths.get_distance(&2, &3),
            Err(TreeError::MissingBranchLengths)
        ));
    }

    #[test]
    fn patristic_distances() {
        let tree = build_tree_with_lengths().unwrap();
        let matrix = tree.patristic_matrix().unwrap();

        assert_eq!(matrix.taxa, vec!["A", "B", "C", "D"]);
        assert!((matrix.get("A", "D").unwrap() - 1.6).abs() < 1e-12);
        assert!((matrix.get("C", "D").unwrap() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn tree_length() {
        let tree = build_tree_with_lengths().unwrap();
        assert!((tree.length().unwrap() - 2.1).abs() < 1e-12);

        let tree = Tree::from_newick("((A,B):0.5,(C,D));").unwrap();
        assert!(matches!(
            tree.length(),
            Err(TreeError::MissingBranchLengths)
        ));
    }

    #[test]
    fn find_by_name() {
        let tree = build_tree_with_lengths().unwrap();
        assert_eq!(tree.get_by_name("C").unwrap().id, 5);
        assert!(tree.get_by_name("Z").is_none());
    }

    #[test]
    fn sequences() {
        let mut tree = build_tree_with_lengths().unwrap();
        let sequences = HashMap::from([
            ("A".to_string(), "ARN".to_string()),
            ("B".to_string(), "ARD".to_string()),
            ("D".to_string(), "CQE".to_string()),
            ("Z".to_string(), "GHI".to_string()),
        ]);

        assert_eq!(tree.assign_sequences(&sequences), vec!["C"]);
        assert_eq!(tree.sequence_of(&6).unwrap(), "CQE");
        match tree.sequence_of(&5) {
            Err(TreeError::MissingSequence(name)) => assert_eq!(name, "C"),
            other => panic!("Expected a missing sequence error, got {other:?}"),
        }
    }

    #[test]
    fn join_nodes() {
        let mut tree = Tree::new();
        let a = tree.add(Node::new_named("A"));
        let b = tree.add(Node::new_named("B"));
        let c = tree.add(Node::new_named("C"));

        let ab = tree.join(a, b, Some(1.0), Some(2.0)).unwrap();
        assert!(matches!(
            tree.join(a, c, None, None),
            Err(TreeError::JoiningAttachedNodes(_, _))
        ));
        assert!(tree.join(c, c, None, None).is_err());

        tree.join(ab, c, Some(0.5), Some(3.0)).unwrap();
        assert_eq!(tree.to_newick().unwrap(), "((A:1,B:2):0.5,C:3);");
    }

    #[test]
    fn to_newick() {
        let tree = build_tree_with_lengths().unwrap();
        assert_eq!(
            tree.to_newick().unwrap(),
            "((A:0.1,B:0.2):0.5,(C:0.3,D:0.4):0.6);"
        );
        assert_eq!(
            tree.to_formatted_newick(NewickFormat::OnlyNames).unwrap(),
            "((A,B),(C,D));"
        );
    }

    #[test]
    fn read_newick() {
        let newick_strings = vec![
            "((A,B),(C,D));",
            "(A,(B,(C,D)));",
            "(((Tip9,Tip8),Tip7),(Tip0,Tip1));",
            "((A:0.1,B:0.2):0.5,(C:0.3,D:0.4):0.6);",
        ];
        for newick in newick_strings {
            let tree = Tree::from_newick(newick).unwrap();
            assert!(tree.is_binary());
            assert_eq!(newick, tree.to_newick().unwrap());
        }

        let tree = Tree::from_newick("((A:1e-3,B:2.5E1):0.5,C:0.3);").unwrap();
        assert_eq!(tree.to_newick().unwrap(), "((A:0.001,B:25):0.5,C:0.3);");
    }

    #[test]
    fn read_newick_with_whitespace() {
        let tree = Tree::from_newick("  ( (A , B) ,\t(C,\nD) ) ;  ").unwrap();
        assert_eq!(
            tree.to_formatted_newick(NewickFormat::OnlyNames).unwrap(),
            "((A,B),(C,D));"
        );
    }

    #[test]
    fn read_newick_fails() {
        let newick_strings = vec![
            ("A,B;", "NoOpeningBracket"),
            ("(A,B)", "NoClosingSemicolon"),
            ("(A,B;", "NoClosingSemicolon"),
            ("((A,B),C;", "NoClosingSemicolon"),
            ("((A,B),(C,D);", "UnclosedBracket"),
            ("(A,B));", "UnopenedBracket"),
            ("(A,B),C);", "NoSubtreeParent"),
            ("(A,,B);", "MissingLabel"),
            ("(A,(B,C)D);", "InternalLabel"),
            ("(A,B,(C,D));", "NotBinary"),
            ("(A,(B));", "NotBinary"),
            ("();", "NotBinary"),
            ("(A,B:0.1:0.2);", "UnexpectedCharacter"),
            ("(A(B,C));", "UnexpectedCharacter"),
            ("(A;B);", "UnexpectedCharacter"),
            ("(A:abc,B);", "FloatError"),
            ("(A:,B);", "FloatError"),
            ("((A,B):,C);", "FloatError"),
            ("((A,B),C):;", "FloatError"),
            ("((A,B),C):x;", "FloatError"),
            ("((A,B):1,C;", "NoClosingSemicolon"),
            ("(A,B)C;", "NoClosingSemicolon"),
        ];
        for (newick, expected) in newick_strings {
            let error = Tree::from_newick(newick).unwrap_err();
            let found = format!("{error:?}");
            assert!(
                found.starts_with(expected),
                "{newick}: expected {expected}, found {found}"
            );
        }
    }

    #[test]
    // More than two children are refused rather than overwriting the right child
    fn ternary_root_is_rejected() {
        match Tree::from_newick("(A,B,(C,D));") {
            Err(NewickParseError::NotBinary(3)) => {}
            other => panic!("Expected NotBinary(3), got {other:?}"),
        }
        assert!(matches!(
            Tree::from_newick("((A,B,C),D);"),
            Err(NewickParseError::NotBinary(3))
        ));
    }

    #[test]
    fn root_length_is_ignored() {
        let tree = Tree::from_newick("((A:1,B:1):1,C:2):0.5;").unwrap();
        assert_eq!(tree.to_newick().unwrap(), "((A:1,B:1):1,C:2);");
        assert_eq!(tree.size(), 5);

        let root = tree.get_root().unwrap();
        assert_eq!(tree.get(&root).unwrap().parent_edge, None);
        assert_eq!(tree.length().unwrap(), 5.0);

        let spaced = Tree::from_newick("((A:1,B:1):1,C:2) : 1e-3 ;").unwrap();
        assert_eq!(spaced.to_newick().unwrap(), "((A:1,B:1):1,C:2);");
    }

    #[test]
    fn deep_trees() {
        let n = 10_000;
        let tree = Tree::from_newick(&caterpillar_newick(n)).unwrap();
        assert_eq!(tree.n_leaves(), n);
        assert_eq!(
            tree.to_formatted_newick(NewickFormat::OnlyNames).unwrap(),
            caterpillar_newick(n)
        );
        assert_eq!(tree.get_partitions().unwrap().len(), n - 3);
        assert_eq!(tree.robinson_foulds(&tree).unwrap(), 0);
        assert!(tree.get_by_name("T0").is_some());
    }

    #[test]
    fn single_partition() {
        let tree = Tree::from_newick("((A,B),(C,D));").unwrap();
        let partitions = tree.get_partitions().unwrap();
        assert_eq!(partitions.len(), 1);

        let (left, right) = tree
            .partition_to_leaves(partitions.iter().next().unwrap())
            .unwrap();
        let mut sides = vec![left, right];
        sides.sort();
        assert_eq!(
            sides,
            vec![
                BTreeSet::from(["A".to_string(), "B".to_string()]),
                BTreeSet::from(["C".to_string(), "D".to_string()]),
            ]
        );
    }

    #[test]
    fn partitions_of_small_trees() {
        for newick in ["(A,B);", "((A,B),C);", "(A,(B,C));"] {
            let tree = Tree::from_newick(newick).unwrap();
            assert!(tree.get_partitions().unwrap().is_empty());
        }
    }

    #[test]
    fn partitions_of_unnamed_leaves() {
        let mut tree = Tree::new();
        let a = tree.add(Node::new_named("A"));
        let b = tree.add(Node::new());
        tree.join(a, b, None, None).unwrap();
        assert!(matches!(
            tree.get_partitions(),
            Err(TreeError::UnnamedLeaves)
        ));

        let tree = Tree::from_newick("((A,B),(A,D));").unwrap();
        assert!(matches!(
            tree.get_partitions(),
            Err(TreeError::DuplicateLeafNames)
        ));
    }

    #[test]
    fn test_get_partitions() {
        let test_cases = vec![
            (
                "(((((((((Tip9,Tip8),Tip7),Tip6),Tip5),Tip4),Tip3),Tip2),Tip1),Tip0);",
                "(Tip0,((Tip2,(Tip3,(Tip4,(Tip5,(Tip6,((Tip8,Tip9),Tip7)))))),Tip1));",
            ),
            (
                "(((i:0.1,j:0.1):0.1,(a:0.1,b:0.1):0.1):0.1,((c:0.1,d:0.1):0.1,((e:0.1,f:0.1):0.1,(g:0.1,h:0.1):0.1):0.1):0.1);",
                "(((c:0.1,d:0.1):0.1,((g:0.1,h:0.1):0.1,(f:0.1,e:0.1):0.1):0.1):0.1,((i:0.1,j:0.1):0.1,(a:0.1,b:0.1):0.1):0.1);",
            ),
            (
                "(((d:0.3,e:0.3):0.3,((f:0.3,g:0.3):0.3,(h:0.3,(i:0.3,j:0.3):0.3):0.3):0.3):0.3,(a:0.3,(b:0.3,c:0.3):0.3):0.3);",
                "((((g:0.3,f:0.3):0.3,((i:0.3,j:0.3):0.3,h:0.3):0.3):0.3,(d:0.3,e:0.3):0.3):0.3,((b:0.3,c:0.3):0.3,a:0.3):0.3);",
            ),
        ];

        for (newick, rot_newick) in test_cases {
            let tree = Tree::from_newick(newick).unwrap();
            let rota = Tree::from_newick(rot_newick).unwrap();

            let ps_orig = tree.get_partitions().unwrap();
            assert_eq!(ps_orig.len(), tree.n_leaves() - 3);
            assert_eq!(ps_orig, rota.get_partitions().unwrap());
            assert_eq!(tree.robinson_foulds(&rota).unwrap(), 0);
            assert_eq!(rota.robinson_foulds_norm(&tree).unwrap(), 0.0);
        }
    }

    #[test]
    // Robinson foulds distances according to
    // https://evolution.genetics.washington.edu/phylip/doc/treedist.html
    fn robinson_foulds_treedist() {
        let trees = [
            "(A,(B,(H,(D,(J,(((G,E),(F,I)),C))))));",
            "(A,(B,(D,((J,H),(((G,E),(F,I)),C)))));",
            "(A,(B,(D,(H,(J,(((G,E),(F,I)),C))))));",
            "(A,(B,(E,(G,((F,I),((J,(H,D)),C))))));",
            "(A,(B,(E,(G,((F,I),(((J,H),D),C))))));",
            "(A,(B,(E,((F,I),(G,((J,(H,D)),C))))));",
        ];
        let rfs = [
            vec![0, 4, 2, 10, 10, 10],
            vec![4, 0, 2, 10, 8, 10],
            vec![2, 2, 0, 10, 10, 10],
            vec![10, 10, 10, 0, 2, 2],
            vec![10, 8, 10, 2, 0, 4],
            vec![10, 10, 10, 2, 4, 0],
        ];

        for indices in (0..trees.len()).combinations(2) {
            let (i0, i1) = (indices[0], indices[1]);

            let t0 = Tree::from_newick(trees[i0]).unwrap();
            let t1 = Tree::from_newick(trees[i1]).unwrap();

            assert_eq!(t0.robinson_foulds(&t1).unwrap(), rfs[i0][i1]);
            assert_eq!(t1.robinson_foulds(&t0).unwrap(), rfs[i0][i1]);
            assert!(
                (t0.robinson_foulds_norm(&t1).unwrap() - rfs[i0][i1] as f64 / 14.0).abs() < 1e-12
            );
        }
    }

    #[test]
    fn robinson_foulds_errors() {
        let t1 = Tree::from_newick("((A,B),(C,D));").unwrap();
        let t2 = Tree::from_newick("((A,B),(C,E));").unwrap();
        assert!(matches!(
            t1.robinson_foulds(&t2),
            Err(TreeError::DifferentTipIndices)
        ));

        let t3 = Tree::from_newick("((A,B),C);").unwrap();
        assert_eq!(t3.robinson_foulds(&t3).unwrap(), 0);
        assert!(matches!(
            t3.robinson_foulds_norm(&t3),
            Err(TreeError::TooFewLeaves(3))
        ));
    }

    #[test]
    fn deleted_nodes_are_hidden() {
        let mut tree = build_tree_with_lengths().unwrap();
        let extra = tree.add(Node::new_named("X"));
        assert_eq!(tree.n_leaves(), 5);
        tree.delete(&extra).unwrap();

        assert_eq!(tree.n_leaves(), 4);
        assert_eq!(tree.size(), 7);
        assert!(tree.get(&extra).is_err());
        assert_eq!(tree.get_root().unwrap(), 0);
    }

    #[test]
    fn ascii_drawing() {
        let tree = build_tree_with_lengths().unwrap();
        let drawing = tree.to_ascii().unwrap();
        for label in ["A:0.1000", "B:0.2000", "C:0.3000", "D:0.4000"] {
            assert!(drawing.contains(label), "{drawing}");
        }
    }

    #[test]
    fn newick_files() {
        let dir = std::env::temp_dir().join(format!("phylonj-trees-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("trees.nw");

        fs::write(&path, "((A,B),(C,D));\n\n(A,(C,(B,D)));\n").unwrap();
        let trees = Tree::from_file(&path).unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].robinson_foulds(&trees[1]).unwrap(), 2);

        trees[1].to_file(&path, NewickFormat::OnlyNames).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "(A,(C,(B,D)));\n");

        fs::write(&path, "\n  \n").unwrap();
        assert!(matches!(
            Tree::from_file(&path),
            Err(NewickParseError::EmptyFile)
        ));

        fs::remove_dir_all(&dir).unwrap();
    }
}
