use galerkin_quadrature::integrate;
use galerkin_quadrature::simplex::{tetrahedron_collapsed_gauss, triangle_collapsed_gauss};
use matrixcompare::assert_scalar_eq;

fn factorial(n: i32) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

/// Integral of `(1 + x)^a (1 + y)^b` over the reference triangle.
fn triangle_monomial_integral(a: i32, b: i32) -> f64 {
    4.0 * 2f64.powi(a + b) * factorial(a) * factorial(b) / factorial(a + b + 2)
}

/// Integral of `(1 + x)^a (1 + y)^b (1 + z)^c` over the reference tetrahedron.
fn tetrahedron_monomial_integral(a: i32, b: i32, c: i32) -> f64 {
    8.0 * 2f64.powi(a + b + c) * factorial(a) * factorial(b) * factorial(c) / factorial(a + b + c + 3)
}

#[test]
fn triangle_rules_satisfy_expected_accuracy() {
    for n in 1..=8 {
        let degree = 2 * n as i32 - 2;
        let rule = triangle_collapsed_gauss(n);
        assert_eq!(rule.0.len(), n * n);
        assert!(rule.0.iter().all(|&w| w > 0.0));
        assert!(rule.1.iter().all(|&[x, y]| x > -1.0 && y > -1.0 && x + y < 0.0));

        for a in 0..=degree {
            for b in 0..=degree - a {
                let estimated = integrate(&rule, |&[x, y]| (1.0 + x).powi(a) * (1.0 + y).powi(b));
                let expected = triangle_monomial_integral(a, b);
                assert_scalar_eq!(estimated, expected, comp = abs, tol = 1e-12);
            }
        }
    }
}

#[test]
fn tetrahedron_rules_satisfy_expected_accuracy() {
    for n in 2..=5 {
        let degree = 2 * n as i32 - 3;
        let rule = tetrahedron_collapsed_gauss(n);
        assert_eq!(rule.0.len(), n * n * n);
        assert!(rule.0.iter().all(|&w| w > 0.0));
        assert!(rule
            .1
            .iter()
            .all(|&[x, y, z]| x > -1.0 && y > -1.0 && z > -1.0 && x + y + z < -1.0));

        for a in 0..=degree {
            for b in 0..=degree - a {
                for c in 0..=degree - a - b {
                    let estimated = integrate(&rule, |&[x, y, z]| {
                        (1.0 + x).powi(a) * (1.0 + y).powi(b) * (1.0 + z).powi(c)
                    });
                    let expected = tetrahedron_monomial_integral(a, b, c);
                    assert_scalar_eq!(estimated, expected, comp = abs, tol = 1e-12);
                }
            }
        }
    }
}

#[test]
fn single_point_rules_sit_at_the_centroid_of_the_collapsed_square() {
    let (weights, points) = triangle_collapsed_gauss(1);
    assert_scalar_eq!(weights[0], 2.0, comp = abs, tol = 1e-15);
    assert_eq!(points[0], [-0.5, 0.0]);
}
