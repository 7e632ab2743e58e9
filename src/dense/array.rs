use crate::dense::DenseVector;
use num::Zero;
use std::ops::{Index, IndexMut};

/// A heap-allocated one-dimensional array, typically indexed by vertex or element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array1D<T> {
    data: Vec<T>,
}

impl<T: Clone> Array1D<T> {
    /// Creates an array of `n` copies of `value`.
    pub fn filled(n: usize, value: T) -> Self {
        Self { data: vec![value; n] }
    }

    pub fn set_values(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Gathers the entries at `idx`.
    pub fn get_values<const N: usize>(&self, idx: &DenseVector<usize, N>) -> DenseVector<T, N> {
        DenseVector::from_array(std::array::from_fn(|i| self.data[idx[i]].clone()))
    }
}

impl<T: Clone + Zero> Array1D<T> {
    pub fn new(n: usize) -> Self {
        Self::filled(n, T::zero())
    }

    pub fn zero(&mut self) {
        self.data.fill(T::zero());
    }
}

impl<T> Array1D<T> {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn get(&self, i: usize) -> &T {
        &self.data[i]
    }

    pub fn set(&mut self, i: usize, value: T) {
        self.data[i] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }
}

impl<T> From<Vec<T>> for Array1D<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T> FromIterator<T> for Array1D<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl<T> Index<usize> for Array1D<T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T> IndexMut<usize> for Array1D<T> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

/// A heap-allocated row-major two-dimensional array.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array2D<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone> Array2D<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn set_values(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T: Clone + Zero> Array2D<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, T::zero())
    }

    pub fn zero(&mut self) {
        self.data.fill(T::zero());
    }
}

impl<T> Array2D<T> {
    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> &T {
        assert!(row < self.rows && col < self.cols);
        &self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }
}

impl<T> Index<(usize, usize)> for Array2D<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        self.get(row, col)
    }
}

impl<T> IndexMut<(usize, usize)> for Array2D<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        assert!(row < self.rows && col < self.cols);
        &mut self.data[row * self.cols + col]
    }
}
