//! Reconstruct phylogenetic trees from protein alignments with neighbour joining,
//! root them at their midpoint and compare them with the Robinson-Foulds distance.
//!
//! ```
//! use phylonj::{alignment, substitution::SubstitutionMatrix, tree::Tree};
//!
//! let matrix = SubstitutionMatrix::from_text("
//!    A  R  N  D
//! A  4 -1 -2 -2
//! R -1  5  0 -2
//! N -2  0  6  1
//! D -2 -2  1  6
//! ").unwrap();
//!
//! let mut sequences = alignment::parse_fasta(
//!     b">Hs\nAARNDD\n>Pt\nAARNDN\n>Mm\nARRNND\n>Gg\nDRRANN\n"
//! ).unwrap();
//! alignment::validate_symbols(&sequences, &matrix).unwrap();
//! alignment::remove_gap_columns(&mut sequences).unwrap();
//!
//! let mut reference = Tree::from_newick("((Hs,Pt),(Mm,Gg));").unwrap();
//! assert!(reference.assign_sequences(&sequences).is_empty());
//!
//! let (distances, _) = matrix.distance_matrix(&reference).unwrap();
//! let mut tree = Tree::neighbour_joining(&distances).unwrap();
//! tree.midpoint_root().unwrap();
//!
//! assert_eq!(tree.n_leaves(), 4);
//! assert_eq!(tree.robinson_foulds(&reference).unwrap(), 0);
//! ```

use std::collections::VecDeque;

use rand::prelude::*;

use tree::{EdgeLength, Node, Tree, TreeError};

pub mod alignment;
pub mod distance;
pub mod substitution;
pub mod tree;

fn random_length(rng: &mut impl Rng, brlens: bool) -> Option<EdgeLength> {
    brlens.then(|| rng.gen_range(0.1..1.0))
}

/// Generates a random binary tree of a given size, leaves are named `Tip_{i}`.
/// Branch lengths are uniformly distributed in `[0.1, 1)`.
/// ```
/// use phylonj::generate_tree;
///
/// let tree = generate_tree(20, true).unwrap();
/// assert_eq!(tree.n_leaves(), 20);
/// assert!(tree.is_binary());
/// ```
pub fn generate_tree(n_leaves: usize, brlens: bool) -> Result<Tree, TreeError> {
    if n_leaves == 0 {
        return Err(TreeError::TooFewLeaves(n_leaves));
    }

    let mut tree = Tree::new();
    let mut rng = thread_rng();

    let mut next_deq = VecDeque::new();
    next_deq.push_back(tree.add(Node::new()));

    for _ in 0..(n_leaves - 1) {
        let parent_id = if rng.gen_bool(0.5) {
            next_deq.pop_front()
        } else {
            next_deq.pop_back()
        }
        .ok_or(TreeError::IsEmpty)?;

        let l1 = random_length(&mut rng, brlens);
        let l2 = random_length(&mut rng, brlens);
        next_deq.push_back(tree.add_child(Node::new(), parent_id, l1)?);
        next_deq.push_back(tree.add_child(Node::new(), parent_id, l2)?);
    }

    for (i, id) in next_deq.iter().enumerate() {
        tree.get_mut(id)?.set_name(format!("Tip_{i}"));
    }

    Ok(tree)
}

/// Generates a caterpillar tree, where each internal node has a leaf child,
/// by adding children to the last internal node until we reach the desired number of leaves.
pub fn generate_caterpillar(n_leaves: usize, brlens: bool) -> Result<Tree, TreeError> {
    if n_leaves < 2 {
        return Err(TreeError::TooFewLeaves(n_leaves));
    }

    let mut tree = Tree::new();
    let mut rng = thread_rng();

    let mut parent = tree.add(Node::new());
    for i in 1..n_leaves {
        let l1 = random_length(&mut rng, brlens);
        let l2 = random_length(&mut rng, brlens);
        if i == n_leaves - 1 {
            tree.add_child(Node::new_named(&format!("Tip_{i}")), parent, l1)?;
            tree.add_child(Node::new_named(&format!("Tip_{}", i + 1)), parent, l2)?;
        } else {
            tree.add_child(Node::new_named(&format!("Tip_{i}")), parent, l2)?;
            parent = tree.add_child(Node::new(), parent, l1)?;
        }
    }

    Ok(tree)
}
