use galerkin::dense::{Array1D, Array2D, DenseMatrix, DenseMatrixSymm, DenseVector, SingularMatrixError, SmallSquare};
use galerkin::proptest::{dense_symm, invertible_matrix};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{Matrix3, SMatrix};
use proptest::prelude::*;

fn check_inverse_round_trip<const N: usize>(m: DenseMatrix<f64, N, N>)
where
    DenseMatrix<f64, N, N>: SmallSquare<Scalar = f64>,
{
    let inv = m.inverse().unwrap();
    let identity: SMatrix<f64, N, N> = (m * inv).to_nalgebra();
    assert_matrix_eq!(identity, SMatrix::<f64, N, N>::identity(), comp = abs, tol = 1e-9);
    let inv_inv = inv.inverse().unwrap();
    assert_matrix_eq!(inv_inv.to_nalgebra(), m.to_nalgebra(), comp = abs, tol = 1e-9);
}

proptest! {
    #[test]
    fn symm_get_is_symmetric(m in dense_symm::<4>()) {
        for row in 0..4 {
            for col in 0..4 {
                prop_assert_eq!(m.get(row, col), m.get(col, row));
                prop_assert_eq!(m[(row, col)], m.to_full().get(col, row));
            }
        }
    }

    #[test]
    fn inverse_round_trip_1x1(m in invertible_matrix::<1>()) {
        check_inverse_round_trip(m);
    }

    #[test]
    fn inverse_round_trip_2x2(m in invertible_matrix::<2>()) {
        check_inverse_round_trip(m);
    }

    #[test]
    fn inverse_round_trip_3x3(m in invertible_matrix::<3>()) {
        check_inverse_round_trip(m);
    }
}

#[test]
fn symm_packed_storage() {
    assert_eq!(DenseMatrixSymm::<f64, 3>::STORAGE_SIZE, 6);
    let mut m = DenseMatrixSymm::<f64, 3>::zero();
    m.set(2, 0, 5.0);
    assert_eq!(m.get(0, 2), 5.0);
    assert_eq!(DenseMatrixSymm::<f64, 3>::idx(2, 0), DenseMatrixSymm::<f64, 3>::idx(0, 2));
}

#[test]
fn singular_matrices_are_rejected() {
    let zero = DenseMatrix::<f64, 1, 1>::zero();
    assert_eq!(zero.inverse(), Err(SingularMatrixError));

    let rank_one = DenseMatrix::from_rows([[1.0, 2.0], [2.0, 4.0]]);
    assert_eq!(rank_one.inverse(), Err(SingularMatrixError));

    let rank_two = DenseMatrix::from_rows([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
    assert_scalar_eq!(rank_two.determinant(), 0.0, comp = abs, tol = 1e-12);
}

#[test]
fn determinant_matches_nalgebra() {
    let m = DenseMatrix::from_rows([[2.0, -1.0, 0.5], [0.0, 3.0, 1.0], [1.0, 1.0, 4.0]]);
    let reference = Matrix3::new(2.0, -1.0, 0.5, 0.0, 3.0, 1.0, 1.0, 1.0, 4.0);
    assert_scalar_eq!(m.determinant(), reference.determinant(), comp = abs, tol = 1e-12);
}

#[test]
fn vector_operations() {
    let a = DenseVector::from_array([1.0, 0.0, 0.0]);
    let b = DenseVector::from_array([0.0, 1.0, 0.0]);
    assert_eq!(a.cross(&b), DenseVector::from_array([0.0, 0.0, 1.0]));
    assert_eq!((a + b).sum(), 2.0);
    assert_scalar_eq!((a - b).magnitude(), 2.0f64.sqrt(), comp = abs, tol = 1e-14);
    let c = DenseVector::from_array([3.0, 4.0]);
    assert_scalar_eq!(c.normalize().dot(&c), 5.0, comp = abs, tol = 1e-14);
}

#[test]
fn matrix_vector_product() {
    let m = DenseMatrix::from_rows([[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
    let v = DenseVector::from_array([1.0, -1.0]);
    assert_eq!(m * v, DenseVector::from_array([-1.0, -1.0, -1.0]));
    assert_eq!(m.transpose().row(1), DenseVector::from_array([2.0, 4.0, 6.0]));
}

#[test]
fn array2d_zero_clears_all_entries() {
    let mut array = Array2D::filled(3, 4, 7.0);
    array.zero();
    for i in 0..3 {
        for j in 0..4 {
            assert_eq!(*array.get(i, j), 0.0);
        }
    }
}

#[test]
fn array1d_gathers_by_index() {
    let array: Array1D<f64> = vec![10.0, 11.0, 12.0, 13.0].into();
    let gathered = array.get_values(&DenseVector::from_array([3, 0]));
    assert_eq!(gathered, DenseVector::from_array([13.0, 10.0]));
}
