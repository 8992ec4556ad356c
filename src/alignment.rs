//! Read aligned sequences from FASTA files and prepare them for distance computation.

use std::{collections::HashMap, io::Cursor, path::Path};

use needletail::{parse_fastx_file, parse_fastx_reader, FastxReader};
use thiserror::Error;
use tracing::debug;

use crate::substitution::SubstitutionMatrix;

/// Character used for alignment gaps
pub const GAP: char = '-';

/// Aligned sequences indexed by label
pub type Alignment = HashMap<String, String>;

/// Errors that can occur when reading and processing alignments
#[derive(Error, Debug)]
pub enum AlignmentError {
    /// There was an error in the FASTA reader
    #[error("Could not read FASTA records")]
    FastaError(#[from] needletail::errors::ParseError),
    /// A record header or sequence is not valid UTF-8
    #[error("FASTA record is not valid UTF-8")]
    Utf8Error(#[from] std::string::FromUtf8Error),
    /// A record has an empty header
    #[error("FASTA record {0} has no label")]
    MissingLabel(usize),
    /// Two records share the same label
    #[error("Label {0} appears more than once in the alignment")]
    DuplicateLabel(String),
    /// Sequences of an alignment must all have the same length
    #[error("Sequence {label} has length {length}, expected {expected}")]
    UnequalLengths {
        /// Label of the offending sequence
        label: String,
        /// Length of the sequence
        length: usize,
        /// Length of the other sequences
        expected: usize,
    },
    /// A sequence contains a symbol that is neither a gap nor scored
    #[error("Sequence {label} contains invalid symbol '{symbol}'")]
    InvalidSymbol {
        /// Label of the offending sequence
        label: String,
        /// Invalid symbol
        symbol: char,
    },
}

fn collect_records(mut reader: Box<dyn FastxReader>) -> Result<Alignment, AlignmentError> {
    let mut alignment = HashMap::new();
    let mut n_records = 0;

    while let Some(record) = reader.next() {
        let record = record?;
        let header = String::from_utf8(record.id().to_vec())?;
        let label = header
            .split_whitespace()
            .next()
            .ok_or(AlignmentError::MissingLabel(n_records))?
            .to_string();
        let sequence = String::from_utf8(record.seq().to_vec())?;

        if alignment.contains_key(&label) {
            return Err(AlignmentError::DuplicateLabel(label));
        }
        alignment.insert(label, sequence);
        n_records += 1;
    }

    debug!(n_records, "Read FASTA alignment");

    Ok(alignment)
}

/// Reads aligned sequences from a FASTA file, the label of a sequence is the
/// first word of its header.
pub fn read_fasta(path: &Path) -> Result<Alignment, AlignmentError> {
    collect_records(parse_fastx_file(path)?)
}

/// Reads aligned sequences from FASTA formatted bytes.
/// ```
/// use phylonj::alignment::parse_fasta;
///
/// let alignment = parse_fasta(b">A first sequence\nAR-N\nD\n>B\nARNDD\n").unwrap();
///
/// assert_eq!(alignment["A"], "AR-ND");
/// assert_eq!(alignment["B"], "ARNDD");
/// ```
pub fn parse_fasta(bytes: &[u8]) -> Result<Alignment, AlignmentError> {
    collect_records(parse_fastx_reader(Cursor::new(bytes.to_vec()))?)
}

/// Removes every alignment column where at least one sequence has a gap,
/// returns the number of removed columns.
/// ```
/// use std::collections::HashMap;
/// use phylonj::alignment::remove_gap_columns;
///
/// let mut alignment = HashMap::from([
///     ("A".to_string(), "A-RN".to_string()),
///     ("B".to_string(), "AD-N".to_string()),
/// ]);
///
/// assert_eq!(remove_gap_columns(&mut alignment).unwrap(), 2);
/// assert_eq!(alignment["A"], "AN");
/// assert_eq!(alignment["B"], "AN");
/// ```
pub fn remove_gap_columns(alignment: &mut Alignment) -> Result<usize, AlignmentError> {
    let mut labels: Vec<&String> = alignment.keys().collect();
    labels.sort();

    let Some(expected) = labels.first().map(|label| alignment[*label].chars().count()) else {
        return Ok(0);
    };

    let mut gapped = vec![false; expected];
    for label in labels {
        let sequence = &alignment[label];
        let length = sequence.chars().count();
        if length != expected {
            return Err(AlignmentError::UnequalLengths {
                label: label.clone(),
                length,
                expected,
            });
        }
        for (column, symbol) in sequence.chars().enumerate() {
            gapped[column] |= symbol == GAP;
        }
    }

    for sequence in alignment.values_mut() {
        *sequence = sequence
            .chars()
            .zip(gapped.iter())
            .filter_map(|(symbol, &gap)| (!gap).then_some(symbol))
            .collect();
    }

    let removed = gapped.iter().filter(|&&gap| gap).count();
    debug!(removed, remaining = expected - removed, "Removed gapped columns");

    Ok(removed)
}

/// Checks that every symbol of the alignment is a gap or is scored by the matrix.
pub fn validate_symbols(
    alignment: &Alignment,
    matrix: &SubstitutionMatrix,
) -> Result<(), AlignmentError> {
    for (label, sequence) in alignment.iter() {
        if let Some(symbol) = sequence
            .chars()
            .find(|&symbol| symbol != GAP && !matrix.contains(symbol))
        {
            return Err(AlignmentError::InvalidSymbol {
                label: label.clone(),
                symbol,
            });
        }
    }

    Ok(())
}
