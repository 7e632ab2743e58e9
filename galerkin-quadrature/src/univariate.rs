//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::Rule;
use std::f64::consts::PI;

/// Newton iterations per root before the last iterate is accepted.
const MAX_NEWTON_ITERATIONS: usize = 100;

/// Legendre polynomial `p_n` and its predecessor evaluated at a single point.
///
/// The derivative formula is singular at |x| == 1, so this is only suitable for evaluation in
/// the open interval (-1, 1).
#[derive(Debug, Default)]
struct LegendreRecurrence {
    n: usize,
    x: f64,
    // p_n(x)
    p1: f64,
    // p_{n - 1}(x)
    p2: f64,
}

impl LegendreRecurrence {
    fn evaluate(n: usize, x: f64) -> Self {
        //  m P_m(x) = (2m - 1) * x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let mut p1 = 1.0;
        let mut p2 = 0.0;
        for m in 1..=n {
            let m = m as f64;
            let p3 = p2;
            p2 = p1;
            p1 = ((2.0 * m - 1.0) * x * p2 - (m - 1.0) * p3) / m;
        }

        Self { n, x, p1, p2 }
    }

    fn value(&self) -> f64 {
        self.p1
    }

    fn derivative(&self) -> f64 {
        let Self { n, x, p1, p2 } = *self;
        // dp_n/dx (x) = n * (x * p_n(x) - p_{n - 1}(x)) / (x^2 - 1)
        n as f64 * (x * p1 - p2) / (x * x - 1.0)
    }
}

/// Finds the root of `p_n` closest to the initial guess `x` and returns it with `p_n'` there.
fn legendre_root(n: usize, mut x: f64) -> (f64, f64) {
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let recurrence = LegendreRecurrence::evaluate(n, x);
        let dx = -recurrence.value() / recurrence.derivative();
        x += dx;
        if dx.abs() <= 1e-15 {
            break;
        }
    }
    (x, LegendreRecurrence::evaluate(n, x).derivative())
}

/// Gauss quadrature for the reference interval [-1, 1].
///
/// Returns the [Gauss quadrature rule] with the given number of points, sorted by increasing
/// coordinate. Given `n` points, the rule integrates polynomials of order up to `2 n - 1` exactly.
///
/// # Panics
///
/// Panics if zero points are requested.
///
/// [Gauss quadrature rule]: https://en.wikipedia.org/wiki/Gaussian_quadrature
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    let mut points = vec![[0.0]; n];
    let mut weights = vec![0.0; n];

    // Roots are symmetric about the origin, so only the positive half is computed
    let m = (n + 1) / 2;
    for i in 0..m {
        let guess = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let (x, dp) = legendre_root(n, guess);
        let w = 2.0 / ((1.0 - x * x) * dp * dp);

        points[i] = [-x];
        points[n - 1 - i] = [x];
        weights[i] = w;
        weights[n - 1 - i] = w;
    }
    if n % 2 == 1 {
        points[m - 1] = [0.0];
    }

    (weights, points)
}
