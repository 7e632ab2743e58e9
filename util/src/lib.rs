//! Test helpers shared by the workspace.
use nalgebra::DMatrix;

/// Poor man's approx assertion for matrices
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = $x - $y;

        let max_absdiff = diff.abs().max();
        let approx_eq = max_absdiff <= $tol;

        if !approx_eq {
            println!("abstol: {:e}", $tol);
            println!("left: {}", $x);
            println!("right: {}", $y);
            println!("diff: {:e}", diff);
        }
        assert!(approx_eq);
    }};
}

/// Approx assertion for slices of `f64`, compared entry by entry.
#[macro_export]
macro_rules! assert_approx_slice_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let x: &[f64] = &$x;
        let y: &[f64] = &$y;
        assert_eq!(x.len(), y.len(), "slices differ in length");
        for (i, (a, b)) in x.iter().zip(y.iter()).enumerate() {
            if (a - b).abs() > $tol {
                println!("abstol: {:e}", $tol);
                println!("left: {:?}", x);
                println!("right: {:?}", y);
                panic!("entry {} differs: {} vs {}", i, a, b);
            }
        }
    }};
}

#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::catch_unwind;
        use std::stringify;
        let expr_string = stringify!($e);
        let result = catch_unwind(|| $e);
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}

/// Wraps a flat row-major slice as a dense matrix, for comparing element matrices.
pub fn row_major_matrix(nrows: usize, ncols: usize, data: &[f64]) -> DMatrix<f64> {
    assert_eq!(data.len(), nrows * ncols);
    DMatrix::from_row_slice(nrows, ncols, data)
}

