//! Store, read and write pairwise distance matrices between taxa
//!
//! Distances are kept in a condensed upper triangle, taxa can be addressed
//! by name or by their position in [`DistanceMatrix::taxa`].

use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    fs,
    path::Path,
    str::FromStr,
};

use itertools::Itertools;
use num_traits::{Float, Zero};
use thiserror::Error;

/// Errors that can occur when reading, writing and manipulating [`DistanceMatrix`] structs.
#[derive(Error, Debug)]
pub enum MatrixError {
    /// There was an [`std::io::Error`] when writing the matrix to a phylip file
    #[error("Error writing file")]
    IoError(#[from] std::io::Error),
    /// We are trying to access a taxon that does not exist
    #[error("Missing taxon {0}")]
    MissingTaxon(String),
    /// Two taxa of the matrix have the same name
    #[error("Taxon {0} appears more than once")]
    DuplicateTaxon(String),
    /// We are trying to access a taxon index outside of the matrix
    #[error("Taxon index {index} is out of bounds for a matrix of size {size}")]
    OutOfBounds {
        /// Requested index
        index: usize,
        /// Size of the distance matrix
        size: usize,
    },
    /// We are trying to set a non zero distance for an identical taxa pair
    #[error("Identical taxa cannot have a non zero distance")]
    NonZeroIdenticalDistance,
    /// We are trying to add a different number of taxa than what we alloted
    #[error("Trying to add {n_taxa} taxa to a matrix of size {size}")]
    SizeError {
        /// Size of the distance matrix
        size: usize,
        /// Number of taxa we are trying to add
        n_taxa: usize,
    },
}

/// Errors that can occur when parsing phylip distance matrix files.
#[derive(Error, Debug)]
pub enum ParseError<T>
where
    T: Debug,
{
    /// The phylip file is empty
    #[error("Matrix file is empty.")]
    EmptyMatrixFile,
    /// There was a [`std::num::ParseIntError`] when reading the number of taxa
    #[error("Could not parse size from file.")]
    SizeParseError(#[from] std::num::ParseIntError),
    /// One of the matrix rows is empty
    #[error("Row {0} is empty.")]
    EmptyRow(usize),
    /// There was an error when reading a distance.
    #[error("Could not parse distance from file.")]
    DistParseError,
    /// There is a missing distance from one of the matrix rows
    #[error("Missing distance from matrix row {0}")]
    MissingDistance(usize),
    /// The size of the matrix and the number of rows do not match
    #[error("Size and number of rows do not match: {0} rows for size {1}")]
    SizeAndRowsMismatch(usize, usize),
    /// The square phylip matrix is not symmetric
    #[error("Non symetric matrix: {0:?} and {1:?} are different")]
    NonSymmetric(T, T),
    /// There was a [`MatrixError`] when create the distance matrix object
    #[error("Error creating matrix.")]
    MatrixError(#[from] MatrixError),
    /// There was a [`std::io::Error`] when reading the phylip file
    #[error("Error reading file")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
/// A symmetric matrix of distances between taxa
pub struct DistanceMatrix<T> {
    /// Number of taxa in the matrix
    pub size: usize,
    /// Identifiers of the taxa
    pub taxa: Vec<String>,
    /// Position of each taxon
    index: HashMap<String, usize>,
    /// Distances between taxa
    matrix: Vec<T>,
}

impl<T> DistanceMatrix<T>
where
    T: Display + Debug + Float + Zero + FromStr,
{
    /// Create an empty distance matrix with a given size, all distances are
    /// set to zero until filled.
    pub fn new_with_size(size: usize) -> Self {
        Self {
            size,
            taxa: Vec::with_capacity(size),
            index: HashMap::with_capacity(size),
            matrix: vec![Zero::zero(); size * size.saturating_sub(1) / 2],
        }
    }

    /// Set the taxa of the matrix
    /// ```
    /// use phylonj::distance::DistanceMatrix;
    ///
    /// let mut matrix: DistanceMatrix<f64> = DistanceMatrix::new_with_size(2);
    /// assert!(matrix.set_taxa(vec!["A".into()]).is_err());
    /// assert!(matrix.set_taxa(vec!["A".into(), "A".into()]).is_err());
    /// assert!(matrix.set_taxa(vec!["A".into(), "B".into()]).is_ok());
    /// ```
    pub fn set_taxa(&mut self, taxa: Vec<String>) -> Result<(), MatrixError> {
        if taxa.len() != self.size {
            return Err(MatrixError::SizeError {
                size: self.size,
                n_taxa: taxa.len(),
            });
        }

        let mut index = HashMap::with_capacity(taxa.len());
        for (i, taxon) in taxa.iter().enumerate() {
            if index.insert(taxon.clone(), i).is_some() {
                return Err(MatrixError::DuplicateTaxon(taxon.clone()));
            }
        }

        self.taxa = taxa;
        self.index = index;

        Ok(())
    }

    /// Get the position of a taxon in the matrix
    pub fn index_of(&self, taxon: &str) -> Result<usize, MatrixError> {
        self.index
            .get(taxon)
            .copied()
            .ok_or_else(|| MatrixError::MissingTaxon(taxon.to_string()))
    }

    /// Get the index in the distance vector for 2 different taxa positions
    fn pair_index(&self, i: usize, j: usize) -> Result<usize, MatrixError> {
        for index in [i, j] {
            if index >= self.size {
                return Err(MatrixError::OutOfBounds {
                    index,
                    size: self.size,
                });
            }
        }

        let (i, j) = if i < j { (i, j) } else { (j, i) };

        Ok((2 * self.size - 3 - i) * i / 2 + j - 1)
    }

    /// Get the distance between the taxa at positions `i` and `j`
    pub fn get_by_index(&self, i: usize, j: usize) -> Result<T, MatrixError> {
        if i == j && i < self.size {
            return Ok(Zero::zero());
        }
        Ok(self.matrix[self.pair_index(i, j)?])
    }

    /// Set the distance between the taxa at positions `i` and `j`
    pub fn set_by_index(&mut self, i: usize, j: usize, dist: T) -> Result<(), MatrixError> {
        if i == j && i < self.size {
            return if dist.is_zero() {
                Ok(())
            } else {
                Err(MatrixError::NonZeroIdenticalDistance)
            };
        }
        let idx = self.pair_index(i, j)?;
        self.matrix[idx] = dist;

        Ok(())
    }

    /// Get the distance between two taxa
    /// ```
    /// use phylonj::distance::DistanceMatrix;
    ///
    /// let mut matrix = DistanceMatrix::new_with_size(3);
    /// matrix.set_taxa(vec!["A".into(), "B".into(), "C".into()]).unwrap();
    /// matrix.set("C", "A", 0.5).unwrap();
    ///
    /// assert_eq!(matrix.get("A", "C").unwrap(), 0.5);
    /// assert_eq!(matrix.get("B", "B").unwrap(), 0.0);
    /// assert!(matrix.get("A", "D").is_err());
    /// ```
    pub fn get(&self, taxon1: &str, taxon2: &str) -> Result<T, MatrixError> {
        self.get_by_index(self.index_of(taxon1)?, self.index_of(taxon2)?)
    }

    /// Set the distance between two taxa
    pub fn set(&mut self, taxon1: &str, taxon2: &str, dist: T) -> Result<(), MatrixError> {
        self.set_by_index(self.index_of(taxon1)?, self.index_of(taxon2)?, dist)
    }

    /// Returns a string representing the distance matrix in square format
    fn to_phylip_square(&self) -> Result<String, MatrixError> {
        let mut output = format!("{}\n", self.size);

        for (i, name) in self.taxa.iter().enumerate() {
            let row = (0..self.size)
                .map(|j| self.get_by_index(i, j).map(|d| d.to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            output += &format!("{name}    {}\n", row.join("  "));
        }

        Ok(output)
    }

    /// Returns a string representing the distance matrix in lower triangle format
    fn to_phylip_triangle(&self) -> Result<String, MatrixError> {
        let mut output = format!("{}\n", self.size);

        for (i, name) in self.taxa.iter().enumerate() {
            let row = (0..i)
                .map(|j| self.get_by_index(i, j).map(|d| d.to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            output += format!("{name}    {}", row.join("  ")).trim_end();
            output.push('\n');
        }

        Ok(output)
    }

    /// Outputs the matrix as a phylip formatted string, taxa are written in matrix order
    pub fn to_phylip(&self, square: bool) -> Result<String, MatrixError> {
        if square {
            self.to_phylip_square()
        } else {
            self.to_phylip_triangle()
        }
    }

    /// Writes the matrix to a phylip file
    pub fn to_file(&self, path: &Path, square: bool) -> Result<(), MatrixError> {
        fs::write(path, self.to_phylip(square)?)?;
        Ok(())
    }

    /// Build a distance matrix from a phylip formatted string
    pub fn from_phylip(phylip: &str, square: bool) -> Result<Self, ParseError<T>> {
        let mut lines = phylip.lines().filter(|line| !line.trim().is_empty());
        let size = lines
            .next()
            .ok_or(ParseError::EmptyMatrixFile)?
            .trim()
            .parse()?;

        let mut names = vec![];
        let mut rows = vec![];

        for (i, line) in lines.enumerate() {
            let mut fields = line.split_whitespace();
            let name = fields.next().ok_or(ParseError::EmptyRow(i))?;
            let dists = fields
                .map(|d| d.parse::<T>().map_err(|_| ParseError::DistParseError))
                .collect::<Result<Vec<_>, _>>()?;

            if square && dists.len() != size || !square && dists.len() != i {
                return Err(ParseError::MissingDistance(i + 1));
            }

            names.push(name.to_string());
            rows.push(dists);
        }

        if names.len() != size {
            return Err(ParseError::SizeAndRowsMismatch(names.len(), size));
        }

        let mut matrix = Self::new_with_size(size);
        matrix.set_taxa(names)?;

        for (i, row) in rows.iter().enumerate() {
            for (j, dist) in row.iter().enumerate() {
                if square && j < i && *dist != rows[j][i] {
                    return Err(ParseError::NonSymmetric(*dist, rows[j][i]));
                }
                matrix.set_by_index(i, j, *dist)?;
            }
        }

        Ok(matrix)
    }

    /// Reads the matrix from a phylip file
    pub fn from_file(path: &Path, square: bool) -> Result<Self, ParseError<T>> {
        let phylip = fs::read_to_string(path)?;
        Self::from_phylip(&phylip, square)
    }

    /// Iterates over all pairs of distinct taxa positions with their distance
    pub fn pairs(&self) -> impl Iterator<Item = ((usize, usize), T)> + '_ {
        (0..self.size)
            .tuple_combinations()
            .map(|(i, j)| ((i, j), self.matrix[(2 * self.size - 3 - i) * i / 2 + j - 1]))
    }
}
