#![warn(missing_docs)]
//! The `phylonj` binary is a command line tool, using the `[phylonj]` crate.
//! It builds neighbour joining trees from protein alignments and compares
//! them to candidate trees directly in the terminal.

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use indicatif::{ProgressBar, ProgressIterator};
use phylonj::{
    alignment::{self, Alignment},
    substitution::SubstitutionMatrix,
    tree::{NewickFormat, NewickParseError, Tree},
};
use std::{error::Error, fmt::Display, io, path::Path, process};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// contains the struct representing the command line arguments
/// parsed by [`clap`] and used to execute this binary
pub mod cli;

type Result<T> = std::result::Result<T, Box<dyn Error>>;

fn to_repr<T, E>(res: std::result::Result<T, E>) -> String
where
    T: Display,
{
    res.map_or_else(|_| "-".into(), |v| format!("{v:.4}"))
}

fn read_first_tree(path: &Path) -> Result<Tree> {
    let tree = Tree::from_file(path)?
        .into_iter()
        .next()
        .ok_or(NewickParseError::EmptyFile)?;
    Ok(tree)
}

/// Reads the substitution matrix and the alignment, checks alignment symbols
/// and removes gapped columns.
fn read_sequences(alignment: &Path, matrix: &Path) -> Result<(Alignment, SubstitutionMatrix)> {
    let matrix = SubstitutionMatrix::from_file(matrix)?;
    let mut sequences = alignment::read_fasta(alignment)?;

    alignment::validate_symbols(&sequences, &matrix)?;
    let removed = alignment::remove_gap_columns(&mut sequences)?;
    debug!(removed, n_sequences = sequences.len(), "Prepared alignment");

    Ok((sequences, matrix))
}

fn report(trees: &Path, alignment: &Path, matrix: &Path, progress: bool) -> Result<()> {
    let mut trees = Tree::from_file(trees)?;
    let (sequences, matrix) = read_sequences(alignment, matrix)?;

    for (i, tree) in trees.iter_mut().enumerate() {
        let missing = tree.assign_sequences(&sequences);
        if !missing.is_empty() {
            warn!(tree = i + 1, ?missing, "Leaves without a sequence in the alignment");
        }
    }

    let first = trees.first().ok_or(NewickParseError::EmptyFile)?;
    let (distances, _) = matrix.distance_matrix(first)?;
    let mut nj_tree = Tree::neighbour_joining(&distances)?;
    let nj_newick = nj_tree.to_formatted_newick(NewickFormat::OnlyNames)?;

    let bar = if progress {
        ProgressBar::new(trees.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    let rf_distances = trees
        .iter()
        .progress_with(bar)
        .map(|tree| tree.robinson_foulds_norm(&nj_tree))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut closest: Option<(usize, f64)> = None;
    for (i, (tree, rf)) in trees.iter().zip(rf_distances).enumerate() {
        println!("Tree {}: {}", i + 1, tree.to_formatted_newick(NewickFormat::OnlyNames)?);
        println!("NJ tree: {nj_newick}");
        println!("RF distance: {rf:.4}");
        println!();

        if closest.map_or(true, |(_, best)| rf < best) {
            closest = Some((i, rf));
        }
    }

    if let Some((i, rf)) = closest {
        println!("Closest tree to the NJ tree: Tree {} (RF = {rf:.4})", i + 1);
        println!("{}", trees[i].to_formatted_newick(NewickFormat::OnlyNames)?);
        println!();
    }

    nj_tree.midpoint_root()?;
    println!("Midpoint rooted NJ tree: {}", nj_tree.to_newick()?);

    Ok(())
}

fn run(args: cli::Args) -> Result<()> {
    match args.command {
        cli::Commands::Report {
            trees,
            alignment,
            matrix,
            progress,
        } => report(&trees, &alignment, &matrix, progress)?,
        cli::Commands::Build {
            alignment,
            matrix,
            unrooted,
            lengths,
            draw,
            output,
        } => {
            let (sequences, matrix) = read_sequences(&alignment, &matrix)?;
            let distances = matrix.alignment_distances(&sequences)?;

            let mut tree = Tree::neighbour_joining(&distances)?;
            if !unrooted {
                tree.midpoint_root()?;
            }

            let format = if lengths {
                NewickFormat::AllLengthsLeafNames
            } else {
                NewickFormat::OnlyNames
            };

            if let Some(path) = output {
                tree.to_file(&path, format)?;
            } else {
                println!("{}", tree.to_formatted_newick(format)?);
            }

            if draw {
                tree.print()?;
            }
        }
        cli::Commands::Compare { reftree, tocompare } => {
            let reftree = read_first_tree(&reftree)?;

            println!("tree\tpath\trf\tnorm_rf");
            for (i, cmp_path) in tocompare.into_iter().enumerate() {
                let compare = read_first_tree(&cmp_path)?;
                let rf = reftree.robinson_foulds(&compare)?;

                println!(
                    "{}\t{}\t{rf}\t{}",
                    i + 1,
                    cmp_path.display(),
                    to_repr(reftree.robinson_foulds_norm(&compare))
                );
            }
        }
        cli::Commands::Matrix {
            alignment,
            matrix,
            square,
            output,
        } => {
            let (sequences, matrix) = read_sequences(&alignment, &matrix)?;
            let distances = matrix.alignment_distances(&sequences)?;

            if let Some(path) = output {
                distances.to_file(&path, square)?;
            } else {
                print!("{}", distances.to_phylip(square)?);
            }
        }
        cli::Commands::Completion { shell } => {
            let mut cmd = cli::Args::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_env("PHYLONJ_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(cli::Args::parse()) {
        eprintln!("Error: {e}");
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        process::exit(1);
    }
}
