use crate::dense::DenseMatrix;
use galerkin_traits::Real;
use num::Zero;
use std::ops::{AddAssign, Index, IndexMut};

/// A symmetric `N x N` matrix storing only its upper triangle.
///
/// Entries are packed column by column, so the matrix occupies `N * (N + 1) / 2` scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrixSymm<T, const N: usize> {
    data: Vec<T>,
}

impl<T, const N: usize> DenseMatrixSymm<T, N> {
    pub const STORAGE_SIZE: usize = N * (N + 1) / 2;

    /// Position of `(row, col)` in the packed storage. Symmetric in its arguments.
    pub fn idx(row: usize, col: usize) -> usize {
        assert!(row < N && col < N, "index ({row}, {col}) out of bounds for {N}x{N} matrix");
        let (row, col) = if col < row { (col, row) } else { (row, col) };
        row + col * (col + 1) / 2
    }

    pub fn as_packed_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T: Copy, const N: usize> DenseMatrixSymm<T, N> {
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[Self::idx(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[Self::idx(row, col)] = value;
    }
}

impl<T: Copy + Zero, const N: usize> DenseMatrixSymm<T, N> {
    pub fn zero() -> Self {
        Self {
            data: vec![T::zero(); Self::STORAGE_SIZE],
        }
    }

    pub fn set_zero(&mut self) {
        self.data.fill(T::zero());
    }

    pub fn to_full(&self) -> DenseMatrix<T, N, N> {
        DenseMatrix::from_fn(|i, j| self.get(i, j))
    }
}

impl<T: Real, const N: usize> DenseMatrixSymm<T, N> {
    pub fn scale(&mut self, alpha: T) {
        for x in &mut self.data {
            *x *= alpha;
        }
    }
}

impl<T: Copy + Zero, const N: usize> Default for DenseMatrixSymm<T, N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<T, const N: usize> Index<(usize, usize)> for DenseMatrixSymm<T, N> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        &self.data[Self::idx(row, col)]
    }
}

impl<T, const N: usize> IndexMut<(usize, usize)> for DenseMatrixSymm<T, N> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        &mut self.data[Self::idx(row, col)]
    }
}

impl<T: Real, const N: usize> AddAssign<&DenseMatrixSymm<T, N>> for DenseMatrixSymm<T, N> {
    fn add_assign(&mut self, rhs: &DenseMatrixSymm<T, N>) {
        for (a, &b) in self.data.iter_mut().zip(&rhs.data) {
            *a += b;
        }
    }
}
