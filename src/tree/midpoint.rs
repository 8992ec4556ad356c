use std::collections::HashMap;

use itertools::Itertools;
use tracing::debug;

use super::{EdgeLength, Node, NodeId, Tree, TreeError};

/// Length of the edge between two adjacent nodes of an unrooted path,
/// `across_root` is the length of the edge linking the two children of the root.
fn edge_between(
    tree: &Tree,
    u: NodeId,
    v: NodeId,
    across_root: EdgeLength,
) -> Result<EdgeLength, TreeError> {
    let (node_u, node_v) = (tree.get(&u)?, tree.get(&v)?);
    let length = if node_u.parent == Some(v) {
        node_u.parent_edge
    } else if node_v.parent == Some(u) {
        node_v.parent_edge
    } else {
        Some(across_root)
    };

    length.ok_or(TreeError::MissingBranchLengths)
}

/// Re-roots an unrooted tree at its midpoint.
impl Tree {
    /// Moves the root of a tree built by [`Tree::neighbour_joining`] to the middle of
    /// the longest path between two leaves (the tree diameter).
    ///
    /// The root of the input tree must have two children whose branches both hold the
    /// full length of the central edge. This root is discarded and a new one is inserted
    /// on the edge that contains the midpoint, every other branch length is preserved.
    /// When several leaf pairs share the maximal distance the first one, in leaf order,
    /// is used.
    /// ```
    /// use phylonj::tree::Tree;
    ///
    /// let mut tree = Tree::from_newick("((A:1,B:2):1,(C:3,D:4):1);").unwrap();
    /// tree.midpoint_root().unwrap();
    ///
    /// assert_eq!(tree.to_newick().unwrap(), "((C:3,(A:1,B:2):1):0.5,D:3.5);");
    /// ```
    pub fn midpoint_root(&mut self) -> Result<(), TreeError> {
        let n_leaves = self.n_leaves();
        if n_leaves < 2 {
            return Err(TreeError::TooFewLeaves(n_leaves));
        }

        let root = self.get_root()?;
        let (left, right) = match self.get(&root)?.children[..] {
            [left, right] => (left, right),
            _ => return Err(TreeError::IsNotBinary),
        };
        let left_edge = self.get(&left)?.parent_edge;
        let right_edge = self.get(&right)?.parent_edge;
        let central = match (left_edge, right_edge) {
            (Some(l), Some(r)) if (l - r).abs() <= 1e-9 * l.abs().max(r.abs()).max(1.0) => l,
            (Some(l), Some(r)) => return Err(TreeError::AsymmetricRootEdges(l, r)),
            _ => return Err(TreeError::MissingBranchLengths),
        };

        // Distance from the root to every node, the central edge counted once
        let order = self.preorder(&root)?;
        let mut depths: HashMap<NodeId, EdgeLength> = HashMap::with_capacity(order.len());
        for id in order.iter() {
            let node = self.get(id)?;
            let depth = match node.parent {
                None => 0.0,
                Some(parent) => {
                    depths[&parent] + node.parent_edge.ok_or(TreeError::MissingBranchLengths)?
                }
            };
            depths.insert(*id, depth);
        }

        let paths = order
            .iter()
            .filter(|id| self.get(id).map(Node::is_tip).unwrap_or(false))
            .map(|id| self.get_path_from_root(id))
            .collect::<Result<Vec<_>, _>>()?;

        // Longest leaf to leaf path
        let mut diameter = EdgeLength::NEG_INFINITY;
        let mut ends = (0, 1);
        for (p1, p2) in (0..paths.len()).tuple_combinations() {
            let (path1, path2) = (&paths[p1], &paths[p2]);
            let split = path1
                .iter()
                .zip(path2.iter())
                .position(|(a, b)| a != b)
                .unwrap_or(path1.len().min(path2.len()));
            let ancestor = path1[split - 1];

            let mut length =
                depths[path1.last().unwrap_or(&root)] + depths[path2.last().unwrap_or(&root)]
                    - 2.0 * depths[&ancestor];
            if ancestor == root {
                length -= central;
            }

            if length > diameter {
                diameter = length;
                ends = (p1, p2);
            }
        }

        if diameter <= 0.0 {
            return Err(TreeError::DegenerateDiameter);
        }
        let midpoint = diameter / 2.0;

        // Leaf to leaf path, through the lowest common ancestor, without the old root
        let (path1, path2) = (&paths[ends.0], &paths[ends.1]);
        let split = path1
            .iter()
            .zip(path2.iter())
            .position(|(a, b)| a != b)
            .unwrap_or(path1.len().min(path2.len()));
        let path: Vec<NodeId> = path1[split - 1..]
            .iter()
            .rev()
            .chain(path2[split..].iter())
            .copied()
            .filter(|id| *id != root)
            .collect();

        let mut cumulated = vec![0.0];
        for (u, v) in path.iter().tuple_windows() {
            let edge = edge_between(self, *u, *v, central)?;
            cumulated.push(cumulated[cumulated.len() - 1] + edge);
        }
        let bracket = cumulated
            .iter()
            .position(|&cum| cum >= midpoint)
            .unwrap_or(path.len() - 1)
            .max(1);

        let (current, next) = (path[bracket - 1], path[bracket]);
        let edge = edge_between(self, current, next, central)?;
        let current_dist = midpoint - cumulated[bracket - 1];
        let next_dist = edge - current_dist;

        debug!(
            diameter,
            midpoint, current, next, current_dist, next_dist, "Found tree midpoint"
        );

        // Unrooted adjacency, children first then parent (sibling for the old root children)
        let mut adjacency: HashMap<NodeId, Vec<(NodeId, EdgeLength)>> =
            HashMap::with_capacity(order.len());
        for id in order.iter().filter(|id| **id != root) {
            let node = self.get(id)?;
            let mut neighbours = Vec::with_capacity(3);
            for child in node.children.iter() {
                let length = self
                    .get(child)?
                    .parent_edge
                    .ok_or(TreeError::MissingBranchLengths)?;
                neighbours.push((*child, length));
            }
            match node.parent {
                Some(parent) if parent == root => {
                    let sibling = if *id == left { right } else { left };
                    neighbours.push((sibling, central));
                }
                Some(parent) => {
                    let length = node.parent_edge.ok_or(TreeError::MissingBranchLengths)?;
                    neighbours.push((parent, length));
                }
                None => {}
            }
            adjacency.insert(*id, neighbours);
        }

        let new_root = self.add(Node::new());
        adjacency.insert(
            new_root,
            vec![(current, current_dist), (next, next_dist)],
        );
        for (from, to, length) in [(current, next, current_dist), (next, current, next_dist)] {
            if let Some(neighbours) = adjacency.get_mut(&from) {
                for neighbour in neighbours.iter_mut().filter(|(id, _)| *id == to) {
                    *neighbour = (new_root, length);
                }
            }
        }

        // Orient every edge away from the new root
        let mut stack = vec![(new_root, None)];
        while let Some((id, parent)) = stack.pop() {
            let children: Vec<(NodeId, EdgeLength)> = adjacency
                .remove(&id)
                .unwrap_or_default()
                .into_iter()
                .filter(|(neighbour, _)| Some(*neighbour) != parent)
                .collect();

            let node = self.get_mut(&id)?;
            node.children = children.iter().map(|(child, _)| *child).collect();
            if parent.is_none() {
                node.parent = None;
                node.parent_edge = None;
            }

            for (child, length) in children {
                self.get_mut(&child)?.set_parent(id, Some(length));
                stack.push((child, Some(id)));
            }
        }

        self.delete(&root)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use itertools::Itertools;
    use tracing_test::traced_test;

    use super::*;
    use crate::generate_tree;

    /// Distances from the root to its farthest leaf on each side
    fn farthest_leaves(tree: &Tree) -> (f64, f64) {
        let root = tree.get_root().unwrap();
        let children = tree.get(&root).unwrap().children.clone();
        let farthest = |child: &NodeId| {
            tree.get_leaves()
                .iter()
                .filter(|leaf| tree.get_path_from_root(leaf).unwrap().contains(child))
                .map(|leaf| tree.get_distance(&root, leaf).unwrap())
                .fold(f64::NEG_INFINITY, f64::max)
        };
        (farthest(&children[0]), farthest(&children[1]))
    }

    #[test]
    fn split_edge_below_root_child() {
        let mut tree = Tree::from_newick("((A:1,B:2):1,(C:3,D:4):1);").unwrap();
        tree.midpoint_root().unwrap();

        assert_eq!(tree.to_newick().unwrap(), "((C:3,(A:1,B:2):1):0.5,D:3.5);");
        assert_eq!(tree.n_leaves(), 4);
        assert_eq!(tree.size(), 7);
        assert!(tree.is_binary());
    }

    #[test]
    fn midpoint_on_central_edge() {
        // Diameter A-D = 2 + 1 + 2, midpoint in the middle of the central edge
        let mut tree = Tree::from_newick("((A:2,B:1):1,(C:1,D:2):1);").unwrap();
        tree.midpoint_root().unwrap();

        assert_eq!(tree.to_newick().unwrap(), "((A:2,B:1):0.5,(C:1,D:2):0.5);");
    }

    #[test]
    fn midpoint_on_leaf_of_root() {
        // Output of neighbour joining on a star tree A:1, B:2, C:3
        let mut tree = Tree::from_newick("(C:3,(A:1,B:2):3);").unwrap();
        tree.midpoint_root().unwrap();

        assert_eq!(tree.to_newick().unwrap(), "(C:2.5,(A:1,B:2):0.5);");
        let (l, r) = farthest_leaves(&tree);
        assert_relative_eq!(l, r);
    }

    #[test]
    fn two_leaves() {
        let mut tree = Tree::from_newick("(A:0.4,B:0.4);").unwrap();
        tree.midpoint_root().unwrap();
        assert_eq!(tree.to_newick().unwrap(), "(A:0.2,B:0.2);");
    }

    #[test]
    fn rooting_errors() {
        let mut tree = Tree::from_newick("((A:1,B:2):1,(C:3,D:4):2);").unwrap();
        assert!(matches!(
            tree.midpoint_root(),
            Err(TreeError::AsymmetricRootEdges(_, _))
        ));

        let mut tree = Tree::from_newick("((A,B),(C,D));").unwrap();
        assert!(matches!(
            tree.midpoint_root(),
            Err(TreeError::MissingBranchLengths)
        ));

        let mut tree = Tree::from_newick("((A:0,B:0):0,(C:0,D:0):0);").unwrap();
        assert!(matches!(
            tree.midpoint_root(),
            Err(TreeError::DegenerateDiameter)
        ));

        let mut tree = Tree::new();
        tree.add(Node::new_named("A"));
        assert!(matches!(
            tree.midpoint_root(),
            Err(TreeError::TooFewLeaves(1))
        ));
    }

    #[test]
    fn conserves_lengths_and_distances() {
        for n_leaves in [3, 6, 12, 30] {
            let reference = generate_tree(n_leaves, true).unwrap();
            let matrix = reference.patristic_matrix().unwrap();

            let mut tree = Tree::neighbour_joining(&matrix).unwrap();
            let root = tree.get(&tree.get_root().unwrap()).unwrap();
            let central = tree.get(&root.children[0]).unwrap().parent_edge.unwrap();
            let unrooted_length = tree.length().unwrap() - central;

            tree.midpoint_root().unwrap();

            assert!(tree.is_binary());
            assert_eq!(tree.n_leaves(), n_leaves);
            assert_relative_eq!(tree.length().unwrap(), unrooted_length, epsilon = 1e-9);

            let (l, r) = farthest_leaves(&tree);
            assert_relative_eq!(l, r, epsilon = 1e-9);

            // Rooting does not change leaf to leaf distances
            let rooted = tree.patristic_matrix().unwrap();
            for pair in matrix.taxa.iter().combinations(2) {
                assert_relative_eq!(
                    rooted.get(pair[0], pair[1]).unwrap(),
                    matrix.get(pair[0], pair[1]).unwrap(),
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    #[traced_test]
    fn logs_midpoint() {
        let mut tree = Tree::from_newick("((A:1,B:2):1,(C:3,D:4):1);").unwrap();
        tree.midpoint_root().unwrap();

        assert!(logs_contain("Found tree midpoint"));
    }
}
