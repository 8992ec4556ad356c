use tracing::{debug, trace};

use super::{EdgeLength, Node, NodeId, Tree, TreeError};
use crate::distance::DistanceMatrix;

/// Builds a tree with the [Neighbour Joining](https://doi.org/10.1093/oxfordjournals.molbev.a040454)
/// algorithm (Saitou & Nei, 1987).
impl Tree {
    /// Builds a tree from a distance matrix, leaves are named after the matrix taxa.
    ///
    /// At each step the pair of clusters $(i, j)$ minimizing
    /// $$
    /// Q_{ij} = D_{ij} - r_i - r_j \quad\text{with}\quad r_i = \frac{1}{m-2}\sum_{k \neq i} D_{ik}
    /// $$
    /// is joined under a new node. When several pairs share the minimum, the first one
    /// found scanning rows then columns (in the current cluster order) is chosen.
    ///
    /// The returned tree is unrooted: the last two clusters are joined under
    /// a root node and **both** carry the full length of the edge that connects them.
    /// Use [`Tree::midpoint_root`] to root it.
    /// ```
    /// use phylonj::distance::DistanceMatrix;
    /// use phylonj::tree::Tree;
    ///
    /// let mut matrix = DistanceMatrix::new_with_size(4);
    /// matrix.set_taxa(vec!["A".into(), "B".into(), "C".into(), "D".into()]).unwrap();
    /// for (a, b, d) in [("A", "B", 3.), ("A", "C", 5.), ("A", "D", 6.),
    ///                   ("B", "C", 6.), ("B", "D", 7.), ("C", "D", 7.)] {
    ///     matrix.set(a, b, d).unwrap();
    /// }
    ///
    /// let tree = Tree::neighbour_joining(&matrix).unwrap();
    /// assert_eq!(tree.to_newick().unwrap(), "((A:1,B:2):1,(C:3,D:4):1);");
    /// ```
    pub fn neighbour_joining(matrix: &DistanceMatrix<EdgeLength>) -> Result<Self, TreeError> {
        let n = matrix.size;
        if n < 2 {
            return Err(TreeError::TooFewLeaves(n));
        }

        let mut tree = Tree::new();

        // Cluster slots: one per leaf and one per internal node
        let capacity = 2 * n - 1;
        let mut dist = vec![vec![0.0; capacity]; capacity];
        let mut clusters: Vec<NodeId> = Vec::with_capacity(capacity);

        for (i, taxon) in matrix.taxa.iter().enumerate() {
            clusters.push(tree.add(Node::new_named(taxon)));
            for j in 0..i {
                let d = matrix.get_by_index(i, j)?;
                dist[i][j] = d;
                dist[j][i] = d;
            }
        }

        let mut active: Vec<usize> = (0..n).collect();

        while active.len() > 2 {
            let m = active.len();

            let r: Vec<EdgeLength> = active
                .iter()
                .map(|&i| {
                    active
                        .iter()
                        .filter(|&&k| k != i)
                        .map(|&k| dist[i][k])
                        .sum::<EdgeLength>()
                        / (m - 2) as EdgeLength
                })
                .collect();

            let mut best = (0, 1);
            let mut best_q = EdgeLength::INFINITY;
            for a in 0..m {
                for b in (a + 1)..m {
                    let q = dist[active[a]][active[b]] - r[a] - r[b];
                    if q < best_q {
                        best_q = q;
                        best = (a, b);
                    }
                }
            }

            let (a, b) = best;
            let (i, j) = (active[a], active[b]);
            let d_ij = dist[i][j];
            let len_i = 0.5 * (d_ij + r[a] - r[b]);
            let len_j = d_ij - len_i;

            let k = clusters.len();
            clusters.push(tree.join(clusters[i], clusters[j], Some(len_i), Some(len_j))?);

            active.retain(|&slot| slot != i && slot != j);
            for &slot in active.iter() {
                let d = 0.5 * (dist[i][slot] + dist[j][slot] - d_ij);
                dist[k][slot] = d;
                dist[slot][k] = d;
            }
            active.push(k);

            trace!(i, j, k, q = best_q, len_i, len_j, remaining = active.len(), "Joined clusters");
        }

        let (i, j) = (active[0], active[1]);
        let d = dist[i][j];
        tree.join(clusters[i], clusters[j], Some(d), Some(d))?;

        debug!(n_leaves = n, central_edge = d, "Finished neighbour joining");

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use itertools::Itertools;
    use tracing_test::traced_test;

    use super::*;
    use crate::generate_tree;

    fn build_matrix(taxa: &[&str], dists: &[f64]) -> DistanceMatrix<f64> {
        let mut matrix = DistanceMatrix::new_with_size(taxa.len());
        matrix
            .set_taxa(taxa.iter().map(|t| t.to_string()).collect())
            .unwrap();
        for ((i, j), d) in (0..taxa.len()).tuple_combinations().zip(dists) {
            matrix.set_by_index(i, j, *d).unwrap();
        }
        matrix
    }

    fn edge_of(tree: &Tree, name: &str) -> f64 {
        tree.get_by_name(name).unwrap().parent_edge.unwrap()
    }

    #[test]
    fn two_taxa() {
        let matrix = build_matrix(&["A", "B"], &[0.4]);
        let tree = Tree::neighbour_joining(&matrix).unwrap();

        assert_eq!(tree.to_newick().unwrap(), "(A:0.4,B:0.4);");
        assert!(tree.get(&tree.get_root().unwrap()).unwrap().parent_edge.is_none());
    }

    #[test]
    fn too_few_taxa() {
        let matrix = build_matrix(&["A"], &[]);
        assert!(matches!(
            Tree::neighbour_joining(&matrix),
            Err(TreeError::TooFewLeaves(1))
        ));
    }

    #[test]
    fn three_taxa() {
        // Star tree with branches A:1, B:2, C:3
        let matrix = build_matrix(&["A", "B", "C"], &[3., 4., 5.]);
        let tree = Tree::neighbour_joining(&matrix).unwrap();

        assert_eq!(tree.n_leaves(), 3);
        assert!(tree.is_binary());
        assert_relative_eq!(edge_of(&tree, "A"), 1.0);
        assert_relative_eq!(edge_of(&tree, "B"), 2.0);
        // The central edge holds C's branch, on both sides of the root
        assert_relative_eq!(edge_of(&tree, "C"), 3.0);
    }

    #[test]
    // Wikipedia example: https://en.wikipedia.org/wiki/Neighbor_joining#Example
    fn wikipedia_example() {
        let matrix = build_matrix(
            &["a", "b", "c", "d", "e"],
            &[5., 9., 9., 8., 10., 10., 9., 8., 7., 3.],
        );
        let tree = Tree::neighbour_joining(&matrix).unwrap();

        assert_relative_eq!(edge_of(&tree, "a"), 2.0);
        assert_relative_eq!(edge_of(&tree, "b"), 3.0);
        assert_relative_eq!(edge_of(&tree, "c"), 4.0);
        assert_relative_eq!(edge_of(&tree, "d"), 2.0);
        assert_relative_eq!(edge_of(&tree, "e"), 1.0);

        let expected = Tree::from_newick("(((a,b),c),(d,e));").unwrap();
        assert_eq!(tree.robinson_foulds(&expected).unwrap(), 0);
    }

    #[test]
    fn ties_pick_first_pair() {
        // All pairs are equivalent, the first two taxa are joined first
        let matrix = build_matrix(&["A", "B", "C", "D"], &[2.; 6]);
        let tree = Tree::neighbour_joining(&matrix).unwrap();

        let a = tree.get_by_name("A").unwrap();
        let b = tree.get_by_name("B").unwrap();
        assert_eq!(a.parent, b.parent);
        assert_eq!(
            tree.to_formatted_newick(crate::tree::NewickFormat::OnlyNames)
                .unwrap(),
            "((A,B),(C,D));"
        );
    }

    #[test]
    fn additive_matrices_are_exact() {
        for n_leaves in [4, 5, 8, 16, 40] {
            let reference = generate_tree(n_leaves, true).unwrap();
            let matrix = reference.patristic_matrix().unwrap();
            let tree = Tree::neighbour_joining(&matrix).unwrap();

            assert_eq!(tree.n_leaves(), n_leaves);
            assert!(tree.is_binary());
            assert_eq!(tree.robinson_foulds(&reference).unwrap(), 0);

            // Central edge is counted twice in the unrooted output
            let root = tree.get(&tree.get_root().unwrap()).unwrap();
            let central = tree.get(&root.children[0]).unwrap().parent_edge.unwrap();
            assert_relative_eq!(
                tree.length().unwrap() - central,
                reference.length().unwrap(),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    #[traced_test]
    fn logs_joins() {
        let matrix = build_matrix(&["A", "B", "C", "D"], &[3., 5., 6., 6., 7., 7.]);
        Tree::neighbour_joining(&matrix).unwrap();

        assert!(logs_contain("Finished neighbour joining"));
    }
}
