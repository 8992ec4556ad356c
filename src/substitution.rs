//! Substitution matrices and the pairwise sequence distance used to feed
//! [neighbour joining](crate::tree::Tree::neighbour_joining).
//!
//! Matrices are read from the tabular layout distributed by the NCBI
//! (BLOSUM, PAM...):
//! ```text
//! # Comment lines are skipped
//!    A  R  N  *
//! A  4 -1 -2 -4
//! R -1  5  0 -4
//! N -2  0  6 -4
//! * -4 -4 -4  1
//! ```

use std::{collections::HashMap, fs, path::Path};

use thiserror::Error;
use tracing::debug;

use crate::alignment::Alignment;
use crate::distance::{DistanceMatrix, MatrixError};
use crate::tree::{NodeId, Tree, TreeError};

/// Symbol of the header and rows that is not scored
const STOP_SYMBOL: &str = "*";

/// Errors that can occur when reading a substitution matrix
#[derive(Error, Debug)]
pub enum ParseError {
    /// The matrix text has no header line
    #[error("Substitution matrix is empty.")]
    EmptyMatrixFile,
    /// A header column is not a single character
    #[error("Invalid symbol '{0}' in matrix header.")]
    InvalidSymbol(String),
    /// A symbol appears more than once in the header
    #[error("Symbol {0} appears more than once in matrix header.")]
    DuplicateSymbol(char),
    /// A row is not labelled with the expected symbol
    #[error("Expected row for symbol {expected} but found '{found}'.")]
    RowMismatch {
        /// Symbol at this position in the header
        expected: char,
        /// Label of the row
        found: String,
    },
    /// A row has fewer scores than there are symbols
    #[error("Missing score in row {0}.")]
    MissingScore(char),
    /// A score could not be parsed
    #[error("Could not parse score from matrix.")]
    ScoreParseError(#[from] std::num::ParseFloatError),
    /// The matrix has fewer rows than symbols
    #[error("Matrix has {found} rows for {expected} symbols.")]
    MissingRows {
        /// Number of symbols in the header
        expected: usize,
        /// Number of rows read
        found: usize,
    },
    /// There was a [`std::io::Error`] when reading the matrix file
    #[error("Error reading file")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur when scoring sequences
#[derive(Error, Debug)]
pub enum ScoreError {
    /// Compared sequences must have the same length
    #[error("Sequences have different lengths: {0} and {1}")]
    LengthMismatch(usize, usize),
    /// A sequence contains a symbol absent from the matrix
    #[error("Symbol {0} is not in the substitution matrix")]
    UnknownSymbol(char),
    /// Both sequences have a null score against themselves
    #[error("Sequences have a null self score, distance is undefined")]
    NullSelfScore,
    /// There was a [`TreeError`] when gathering leaf sequences
    #[error("Error getting leaf sequences")]
    TreeError(#[from] TreeError),
    /// There was a [`MatrixError`] when filling the distance matrix
    #[error("Error filling distance matrix")]
    MatrixError(#[from] MatrixError),
}

/// A square table of substitution scores between symbols
#[derive(Debug, Clone)]
pub struct SubstitutionMatrix {
    symbols: Vec<char>,
    index: HashMap<char, usize>,
    scores: Vec<Vec<f64>>,
}

impl SubstitutionMatrix {
    /// Creates a matrix from its symbols and a square table of scores, rows and
    /// columns following the symbol order.
    /// ```
    /// use phylonj::substitution::SubstitutionMatrix;
    ///
    /// let matrix = SubstitutionMatrix::new(vec!['A', 'C'], vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
    /// assert_eq!(matrix.score('A', 'C').unwrap(), 0.0);
    /// assert!(SubstitutionMatrix::new(vec!['A', 'C'], vec![vec![1.0]]).is_err());
    /// ```
    pub fn new(symbols: Vec<char>, scores: Vec<Vec<f64>>) -> Result<Self, ParseError> {
        if scores.len() != symbols.len() {
            return Err(ParseError::MissingRows {
                expected: symbols.len(),
                found: scores.len(),
            });
        }

        let mut index = HashMap::with_capacity(symbols.len());
        for (i, (symbol, row)) in symbols.iter().zip(scores.iter()).enumerate() {
            if index.insert(*symbol, i).is_some() {
                return Err(ParseError::DuplicateSymbol(*symbol));
            }
            if row.len() < symbols.len() {
                return Err(ParseError::MissingScore(*symbol));
            }
        }

        Ok(Self {
            symbols,
            index,
            scores,
        })
    }

    /// Reads a matrix in NCBI tabular format. The `*` column is ignored and a
    /// row labelled `*` ends the matrix, extra columns after the scored symbols
    /// are ignored.
    pub fn from_text(text: &str) -> Result<Self, ParseError> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !(line.is_empty() || line.starts_with('#')));

        let header = lines.next().ok_or(ParseError::EmptyMatrixFile)?;
        let mut symbols = Vec::new();
        let mut columns = Vec::new();
        for (column, token) in header.split_whitespace().enumerate() {
            if token == STOP_SYMBOL {
                continue;
            }
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(symbol), None) if symbol.is_ascii_uppercase() => {
                    symbols.push(symbol);
                    columns.push(column);
                }
                _ => return Err(ParseError::InvalidSymbol(token.to_string())),
            }
        }

        let mut scores = Vec::with_capacity(symbols.len());
        for line in lines {
            let mut tokens = line.split_whitespace();
            let label = tokens.next().unwrap_or_default();
            if label == STOP_SYMBOL {
                break;
            }

            let Some(&expected) = symbols.get(scores.len()) else {
                break;
            };
            if label.len() != 1 || !label.starts_with(expected) {
                return Err(ParseError::RowMismatch {
                    expected,
                    found: label.to_string(),
                });
            }

            let values: Vec<&str> = tokens.collect();
            let row = columns
                .iter()
                .map(|&column| {
                    values
                        .get(column)
                        .ok_or(ParseError::MissingScore(expected))
                        .and_then(|value| Ok(value.parse::<f64>()?))
                })
                .collect::<Result<Vec<_>, _>>()?;
            scores.push(row);
        }

        let matrix = Self::new(symbols, scores)?;
        debug!(n_symbols = matrix.symbols.len(), "Parsed substitution matrix");

        Ok(matrix)
    }

    /// Reads a matrix in NCBI tabular format from a file
    pub fn from_file(path: &Path) -> Result<Self, ParseError> {
        let text = fs::read_to_string(path)?;
        Self::from_text(&text)
    }

    /// Symbols of the matrix, in header order
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    /// Position of a symbol in the matrix
    pub fn index_of(&self, symbol: char) -> Option<usize> {
        self.index.get(&symbol).copied()
    }

    /// Whether a symbol is scored by the matrix
    pub fn contains(&self, symbol: char) -> bool {
        self.index.contains_key(&symbol)
    }

    /// Substitution score between two symbols
    pub fn score(&self, a: char, b: char) -> Result<f64, ScoreError> {
        let i = self.index_of(a).ok_or(ScoreError::UnknownSymbol(a))?;
        let j = self.index_of(b).ok_or(ScoreError::UnknownSymbol(b))?;

        Ok(self.scores[i][j])
    }

    /// Distance between two aligned, gap free, sequences of the same length:
    /// $$
    /// d = 1 - \frac{p}{\max(q_1, q_2)}
    /// $$
    /// where $p$ is the score of the alignment and $q_1$, $q_2$ the scores of each
    /// sequence against itself.
    /// ```
    /// use phylonj::substitution::SubstitutionMatrix;
    ///
    /// let matrix = SubstitutionMatrix::from_text("
    ///    A  R  N
    /// A  4 -1 -2
    /// R -1  5  0
    /// N -2  0  6
    /// ").unwrap();
    ///
    /// assert_eq!(matrix.pairwise_distance("AR", "AR").unwrap(), 0.0);
    /// assert!((matrix.pairwise_distance("AR", "AN").unwrap() - 0.6).abs() < 1e-12);
    /// ```
    pub fn pairwise_distance(&self, seq1: &str, seq2: &str) -> Result<f64, ScoreError> {
        let (len1, len2) = (seq1.chars().count(), seq2.chars().count());
        if len1 != len2 {
            return Err(ScoreError::LengthMismatch(len1, len2));
        }

        let (mut p, mut q1, mut q2) = (0.0, 0.0, 0.0);
        for (a, b) in seq1.chars().zip(seq2.chars()) {
            p += self.score(a, b)?;
            q1 += self.score(a, a)?;
            q2 += self.score(b, b)?;
        }

        let max = f64::max(q1, q2);
        if max == 0.0 {
            return Err(ScoreError::NullSelfScore);
        }

        Ok(1.0 - p / max)
    }

    /// Builds the distance matrix between the sequences attached to the leaves of
    /// a tree. Taxa are the leaf names in post-order, the returned vector maps each
    /// matrix position to its leaf.
    pub fn distance_matrix(
        &self,
        tree: &Tree,
    ) -> Result<(DistanceMatrix<f64>, Vec<NodeId>), ScoreError> {
        let leaves = tree.get_leaves();
        let taxa = leaves
            .iter()
            .map(|id| tree.get(id)?.name.clone().ok_or(TreeError::UnnamedLeaves))
            .collect::<Result<Vec<_>, _>>()?;
        let sequences = leaves
            .iter()
            .map(|id| tree.sequence_of(id))
            .collect::<Result<Vec<_>, _>>()?;

        let matrix = self.fill_matrix(taxa, &sequences)?;

        Ok((matrix, leaves))
    }

    /// Builds the distance matrix between all sequences of an alignment,
    /// taxa are sorted by label.
    /// ```
    /// use std::collections::HashMap;
    /// use phylonj::substitution::SubstitutionMatrix;
    ///
    /// let matrix = SubstitutionMatrix::new(vec!['A', 'C'], vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
    /// let alignment = HashMap::from([
    ///     ("B".to_string(), "AC".to_string()),
    ///     ("A".to_string(), "AA".to_string()),
    /// ]);
    ///
    /// let distances = matrix.alignment_distances(&alignment).unwrap();
    /// assert_eq!(distances.taxa, vec!["A", "B"]);
    /// assert_eq!(distances.get("A", "B").unwrap(), 0.5);
    /// ```
    pub fn alignment_distances(
        &self,
        alignment: &Alignment,
    ) -> Result<DistanceMatrix<f64>, ScoreError> {
        let mut records: Vec<(&String, &String)> = alignment.iter().collect();
        records.sort();

        let taxa = records.iter().map(|(label, _)| label.to_string()).collect();
        let sequences: Vec<&str> = records.iter().map(|(_, seq)| seq.as_str()).collect();

        self.fill_matrix(taxa, &sequences)
    }

    fn fill_matrix(
        &self,
        taxa: Vec<String>,
        sequences: &[&str],
    ) -> Result<DistanceMatrix<f64>, ScoreError> {
        let mut matrix = DistanceMatrix::new_with_size(taxa.len());
        matrix.set_taxa(taxa)?;

        for i in 0..sequences.len() {
            for j in (i + 1)..sequences.len() {
                let dist = self.pairwise_distance(sequences[i], sequences[j])?;
                matrix.set_by_index(i, j, dist)?;
            }
        }

        debug!(n_taxa = sequences.len(), "Built sequence distance matrix");

        Ok(matrix)
    }
}
