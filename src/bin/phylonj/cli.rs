use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Build phylogenetic trees from protein alignments with neighbour joining
/// and compare them with the Robinson-Foulds distance
#[derive(Parser, Debug)]
#[command(name = "phylonj", version)]
pub struct Args {
    #[command(subcommand)]
    /// The command to execute
    pub command: Commands,
}

/// The available commands in the `phylonj` tool
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare candidate trees to the neighbour joining tree of an alignment
    ///
    /// For each candidate tree this prints:
    ///  - the candidate tree
    ///  - the neighbour joining tree built from the alignment
    ///  - the normalized Robinson-Foulds distance between both
    /// then the closest candidate and the midpoint rooted neighbour joining tree.
    #[clap(verbatim_doc_comment)]
    Report {
        /// Newick file with one candidate tree per line
        trees: PathBuf,
        /// FASTA alignment of the leaf sequences
        alignment: PathBuf,
        /// Substitution matrix (NCBI format, e.g. BLOSUM62)
        matrix: PathBuf,
        /// Show a progress bar over candidate trees
        #[arg(short, long)]
        progress: bool,
    },
    /// Build the neighbour joining tree of an alignment
    Build {
        /// FASTA alignment
        alignment: PathBuf,
        /// Substitution matrix (NCBI format, e.g. BLOSUM62)
        matrix: PathBuf,
        /// Do not root the tree at its midpoint
        #[arg(short, long)]
        unrooted: bool,
        /// Output branch lengths
        #[arg(short, long)]
        lengths: bool,
        /// Draw the tree in the terminal
        #[arg(short, long)]
        draw: bool,
        /// File to save the tree to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute the Robinson-Foulds distance between trees
    Compare {
        /// Reference tree
        reftree: PathBuf,
        /// Trees to compare to reference
        #[arg(required = true)]
        tocompare: Vec<PathBuf>,
    },
    /// Output the distance matrix between the sequences of an alignment
    Matrix {
        /// FASTA alignment
        alignment: PathBuf,
        /// Substitution matrix (NCBI format, e.g. BLOSUM62)
        matrix: PathBuf,
        /// Output a square matrix instead of a triangular one
        #[arg(short, long)]
        square: bool,
        /// File to save the matrix to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
