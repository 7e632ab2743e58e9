use galerkin_optimize::calculus::*;
use matrixcompare::assert_matrix_eq;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use std::error::Error;

struct SimpleTwoDimensionalPolynomial;

impl VectorFunction<f64> for SimpleTwoDimensionalPolynomial {
    fn dimension(&self) -> usize {
        2
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        assert_eq!(x.len(), 2);
        assert_eq!(f.len(), x.len());
        let x1 = x[0];
        let x2 = x[1];
        f[0] = x1 * x2 + 3.0;
        f[1] = x1 * x1 + x2 * x2 + x1 + 5.0;
        Ok(())
    }
}

#[test]
fn approximate_jacobian_simple_function() {
    let h = 1e-6;
    let x = DVector::from_column_slice(&[3.0, 4.0]);
    let j = approximate_jacobian(SimpleTwoDimensionalPolynomial, &x, &h).unwrap();

    // J = [   x2           x1 ]
    //     [ 2*x1 + 1     2*x2 ]
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(2, 2,
                                           &[4.0, 3.0,
                                             7.0, 8.0]);

    assert_matrix_eq!(j, expected, comp = abs, tol = 1e-6);
}

#[test]
fn approximate_jacobian_propagates_evaluation_failure() {
    struct Failing;

    impl VectorFunction<f64> for Failing {
        fn dimension(&self) -> usize {
            1
        }

        fn eval_into(&mut self, _f: &mut DVectorViewMut<f64>, _x: &DVectorView<f64>) -> Result<(), Box<dyn Error>> {
            Err(Box::from("evaluation failed"))
        }
    }

    let x = DVector::from_column_slice(&[1.0]);
    let err = approximate_jacobian(Failing, &x, &1e-6).unwrap_err();
    assert_eq!(err.to_string(), "evaluation failed");
}
