use crate::dense::{DenseVector, SingularMatrixError};
use galerkin_traits::Real;
use nalgebra::SMatrix;
use num::Zero;
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Sub, SubAssign};

/// An `R x C` matrix stored inline in row-major order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DenseMatrix<T, const R: usize, const C: usize> {
    data: [[T; C]; R],
}

/// Variable-size counterpart of [`DenseMatrix`].
pub type DynDenseMatrix<T> = nalgebra::DMatrix<T>;

impl<T, const R: usize, const C: usize> DenseMatrix<T, R, C> {
    pub const fn from_rows(data: [[T; C]; R]) -> Self {
        Self { data }
    }

    pub const fn num_rows(&self) -> usize {
        R
    }

    pub const fn num_cols(&self) -> usize {
        C
    }
}

impl<T: Copy, const R: usize, const C: usize> DenseMatrix<T, R, C> {
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row][col] = value;
    }

    pub fn from_fn(mut f: impl FnMut(usize, usize) -> T) -> Self {
        Self {
            data: std::array::from_fn(|i| std::array::from_fn(|j| f(i, j))),
        }
    }

    pub fn row(&self, row: usize) -> DenseVector<T, C> {
        DenseVector::from_array(self.data[row])
    }

    pub fn column(&self, col: usize) -> DenseVector<T, R> {
        DenseVector::from_fn(|i| self.data[i][col])
    }

    pub fn set_row(&mut self, row: usize, values: impl Into<DenseVector<T, C>>) {
        self.data[row] = values.into().into_array();
    }

    pub fn set_col(&mut self, col: usize, values: impl Into<DenseVector<T, R>>) {
        let values = values.into();
        for i in 0..R {
            self.data[i][col] = values[i];
        }
    }

    pub fn transpose(&self) -> DenseMatrix<T, C, R> {
        DenseMatrix::from_fn(|i, j| self.data[j][i])
    }

    /// Row-major copy of the entries.
    pub fn to_row_major(&self) -> Vec<T> {
        self.data.iter().flat_map(|row| row.iter().copied()).collect()
    }
}

impl<T: Copy + Zero, const R: usize, const C: usize> DenseMatrix<T, R, C> {
    pub fn zero() -> Self {
        Self {
            data: [[T::zero(); C]; R],
        }
    }

    pub fn set_zero(&mut self) {
        self.data = [[T::zero(); C]; R];
    }
}

impl<T: Real, const N: usize> DenseMatrix<T, N, N> {
    pub fn identity() -> Self {
        Self::from_fn(|i, j| if i == j { T::one() } else { T::zero() })
    }
}

impl<T: Real, const R: usize, const C: usize> DenseMatrix<T, R, C> {
    pub fn scale(&mut self, alpha: T) {
        for row in &mut self.data {
            for x in row {
                *x *= alpha;
            }
        }
    }

    pub fn to_nalgebra(&self) -> SMatrix<T, R, C> {
        SMatrix::from_fn(|i, j| self.data[i][j])
    }
}

/// Closed-form determinant and inverse for small square matrices.
///
/// Implemented for sizes 1, 2 and 3 only.
pub trait SmallSquare: Sized {
    type Scalar;

    fn determinant(&self) -> Self::Scalar;

    /// Fails with [`SingularMatrixError`] if the determinant is exactly zero.
    fn inverse(&self) -> Result<Self, SingularMatrixError>;
}

impl<T: Real> SmallSquare for DenseMatrix<T, 1, 1> {
    type Scalar = T;

    fn determinant(&self) -> T {
        self.data[0][0]
    }

    fn inverse(&self) -> Result<Self, SingularMatrixError> {
        let det = self.determinant();
        if det == T::zero() {
            return Err(SingularMatrixError);
        }
        Ok(Self::from_rows([[T::one() / det]]))
    }
}

impl<T: Real> SmallSquare for DenseMatrix<T, 2, 2> {
    type Scalar = T;

    fn determinant(&self) -> T {
        let m = &self.data;
        m[0][0] * m[1][1] - m[0][1] * m[1][0]
    }

    fn inverse(&self) -> Result<Self, SingularMatrixError> {
        let det = self.determinant();
        if det == T::zero() {
            return Err(SingularMatrixError);
        }
        let m = &self.data;
        let inv_det = T::one() / det;
        Ok(Self::from_rows([
            [m[1][1] * inv_det, -m[0][1] * inv_det],
            [-m[1][0] * inv_det, m[0][0] * inv_det],
        ]))
    }
}

impl<T: Real> SmallSquare for DenseMatrix<T, 3, 3> {
    type Scalar = T;

    fn determinant(&self) -> T {
        let m = &self.data;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]) - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    fn inverse(&self) -> Result<Self, SingularMatrixError> {
        let det = self.determinant();
        if det == T::zero() {
            return Err(SingularMatrixError);
        }
        let m = &self.data;
        let inv_det = T::one() / det;
        // Transposed cofactor matrix
        let cofactor = |r0: usize, r1: usize, c0: usize, c1: usize| m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0];
        Ok(Self::from_rows([
            [
                cofactor(1, 2, 1, 2) * inv_det,
                -cofactor(0, 2, 1, 2) * inv_det,
                cofactor(0, 1, 1, 2) * inv_det,
            ],
            [
                -cofactor(1, 2, 0, 2) * inv_det,
                cofactor(0, 2, 0, 2) * inv_det,
                -cofactor(0, 1, 0, 2) * inv_det,
            ],
            [
                cofactor(1, 2, 0, 1) * inv_det,
                -cofactor(0, 2, 0, 1) * inv_det,
                cofactor(0, 1, 0, 1) * inv_det,
            ],
        ]))
    }
}

impl<T, const R: usize, const C: usize> Index<(usize, usize)> for DenseMatrix<T, R, C> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        &self.data[row][col]
    }
}

impl<T, const R: usize, const C: usize> IndexMut<(usize, usize)> for DenseMatrix<T, R, C> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        &mut self.data[row][col]
    }
}

impl<T: Copy + Zero, const R: usize, const C: usize> Default for DenseMatrix<T, R, C> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<T: Real, const R: usize, const C: usize> From<SMatrix<T, R, C>> for DenseMatrix<T, R, C> {
    fn from(m: SMatrix<T, R, C>) -> Self {
        Self::from_fn(|i, j| m[(i, j)])
    }
}

impl<T: Real, const R: usize, const C: usize> From<DenseMatrix<T, R, C>> for SMatrix<T, R, C> {
    fn from(m: DenseMatrix<T, R, C>) -> Self {
        m.to_nalgebra()
    }
}

impl<T: Real, const R: usize, const C: usize> AddAssign for DenseMatrix<T, R, C> {
    fn add_assign(&mut self, rhs: Self) {
        for (row, rhs_row) in self.data.iter_mut().zip(rhs.data) {
            for (a, b) in row.iter_mut().zip(rhs_row) {
                *a += b;
            }
        }
    }
}

impl<T: Real, const R: usize, const C: usize> Add for DenseMatrix<T, R, C> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl<T: Real, const R: usize, const C: usize> SubAssign for DenseMatrix<T, R, C> {
    fn sub_assign(&mut self, rhs: Self) {
        for (row, rhs_row) in self.data.iter_mut().zip(rhs.data) {
            for (a, b) in row.iter_mut().zip(rhs_row) {
                *a -= b;
            }
        }
    }
}

impl<T: Real, const R: usize, const C: usize> Sub for DenseMatrix<T, R, C> {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

impl<T: Real, const R: usize, const C: usize> Mul<T> for DenseMatrix<T, R, C> {
    type Output = Self;

    fn mul(mut self, alpha: T) -> Self {
        self.scale(alpha);
        self
    }
}

impl<T: Real, const R: usize, const C: usize> Mul<DenseVector<T, C>> for DenseMatrix<T, R, C> {
    type Output = DenseVector<T, R>;

    fn mul(self, v: DenseVector<T, C>) -> DenseVector<T, R> {
        DenseVector::from_fn(|i| self.row(i).dot(&v))
    }
}

impl<T: Real, const R: usize, const K: usize, const C: usize> Mul<DenseMatrix<T, K, C>> for DenseMatrix<T, R, K> {
    type Output = DenseMatrix<T, R, C>;

    fn mul(self, rhs: DenseMatrix<T, K, C>) -> DenseMatrix<T, R, C> {
        DenseMatrix::from_fn(|i, j| (0..K).fold(T::zero(), |acc, k| acc + self.data[i][k] * rhs.data[k][j]))
    }
}
