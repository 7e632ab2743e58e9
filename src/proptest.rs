//! Strategies for property testing the dense kernels.
use crate::dense::{DenseMatrix, DenseMatrixSymm};
use ::proptest::collection::vec;
use ::proptest::prelude::*;

/// Entries are drawn from a moderate range so that products and inverses stay well scaled.
fn entries(n: usize) -> impl Strategy<Value = Vec<f64>> {
    vec(-10.0..10.0, n)
}

pub fn dense_matrix<const R: usize, const C: usize>() -> impl Strategy<Value = DenseMatrix<f64, R, C>> {
    entries(R * C).prop_map(|values| DenseMatrix::from_fn(|i, j| values[i * C + j]))
}

/// Strictly diagonally dominant, hence invertible, square matrices.
pub fn invertible_matrix<const N: usize>() -> impl Strategy<Value = DenseMatrix<f64, N, N>> {
    (dense_matrix::<N, N>(), vec(prop_oneof![Just(-1.0), Just(1.0)], N)).prop_map(|(mut matrix, signs)| {
        for i in 0..N {
            let off_diagonal: f64 = (0..N)
                .filter(|&j| j != i)
                .map(|j| matrix.get(i, j).abs())
                .sum();
            matrix.set(i, i, signs[i] * (off_diagonal + 1.0 + matrix.get(i, i).abs()));
        }
        matrix
    })
}

pub fn dense_symm<const N: usize>() -> impl Strategy<Value = DenseMatrixSymm<f64, N>> {
    entries(N * (N + 1) / 2).prop_map(|values| {
        let mut matrix = DenseMatrixSymm::zero();
        let mut k = 0;
        for i in 0..N {
            for j in i..N {
                matrix.set(i, j, values[k]);
                k += 1;
            }
        }
        matrix
    })
}
