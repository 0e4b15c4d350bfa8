use std::io::Read;

use crate::error::DataError;

/// A dense square matrix of travel costs between every pair of points,
/// stored row major. Row and column order is the points order.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    size: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Fails unless every row is as long as there are rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, DataError> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);
        for (row, line) in rows.into_iter().enumerate() {
            if line.len() != size {
                return Err(DataError::NotSquare { row, found: line.len(), expected: size });
            }
            data.extend(line);
        }
        Ok(Matrix { size, data })
    }

    /// Reads a json array of arrays of numbers.
    pub fn read<R: Read>(reader: R) -> Result<Self, DataError> {
        let rows: Vec<Vec<f64>> = serde_json::from_reader(reader)?;
        Self::from_rows(rows)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    /// Number of entries that cannot be a travel cost.
    pub fn negative_entries(&self) -> usize {
        self.data.iter().filter(|x| **x < 0.0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_then_columns() {
        let m = Matrix::read("[[0, 10, 15], [12, 0, 35], [14, 33, 0]]".as_bytes()).unwrap();
        assert_eq!(m.size(), 3);
        assert_eq!(m.get(0, 1), 10.0);
        assert_eq!(m.get(1, 0), 12.0);
        assert_eq!(m.get(2, 1), 33.0);
        assert_eq!(m.negative_entries(), 0);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        match Matrix::read("[[0, 1], [1, 0, 2]]".as_bytes()) {
            Err(DataError::NotSquare { row, found, expected }) => {
                assert_eq!((row, found, expected), (1, 3, 2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_matrix_is_square() {
        let m = Matrix::read("[]".as_bytes()).unwrap();
        assert_eq!(m.size(), 0);
    }

    #[test]
    fn negative_costs_are_counted() {
        let m = Matrix::from_rows(vec![vec![0.0, -1.0], vec![-3.0, 0.0]]).unwrap();
        assert_eq!(m.negative_entries(), 2);
    }
}
