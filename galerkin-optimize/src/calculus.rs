use galerkin_traits::Real;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut, Scalar};

use numeric_literals::replace_float_literals;
use std::error::Error;

/// A vector function $F: \mathbb{R}^n \rightarrow \mathbb{R}^n$ whose evaluation may fail.
///
/// Evaluation failures are reported to the caller instead of producing garbage values, since a
/// failed residual evaluation usually indicates a broken problem set-up.
pub trait VectorFunction<T>
where
    T: Scalar,
{
    fn dimension(&self) -> usize;
    fn eval_into(&mut self, f: &mut DVectorViewMut<T>, x: &DVectorView<T>) -> Result<(), Box<dyn Error>>;
}

impl<T, X> VectorFunction<T> for &mut X
where
    T: Scalar,
    X: VectorFunction<T>,
{
    fn dimension(&self) -> usize {
        X::dimension(self)
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<T>, x: &DVectorView<T>) -> Result<(), Box<dyn Error>> {
        X::eval_into(self, f, x)
    }
}

pub trait DifferentiableVectorFunction<T>: VectorFunction<T>
where
    T: Scalar,
{
    /// Solves `J(x) sol = rhs` for `sol`.
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<T>,
        x: &DVectorView<T>,
        rhs: &DVectorView<T>,
    ) -> Result<(), Box<dyn Error>>;
}

impl<T, X> DifferentiableVectorFunction<T> for &mut X
where
    T: Scalar,
    X: DifferentiableVectorFunction<T>,
{
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<T>,
        x: &DVectorView<T>,
        rhs: &DVectorView<T>,
    ) -> Result<(), Box<dyn Error>> {
        X::solve_jacobian_system(self, sol, x, rhs)
    }
}

#[derive(Debug, Clone)]
pub struct VectorFunctionBuilder {
    dimension: usize,
}

#[derive(Debug, Clone)]
pub struct ConcreteVectorFunction<F, J> {
    dimension: usize,
    function: F,
    jacobian_solver: J,
}

impl VectorFunctionBuilder {
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn with_function<F, T>(self, function: F) -> ConcreteVectorFunction<F, ()>
    where
        T: Scalar,
        F: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>),
    {
        ConcreteVectorFunction {
            dimension: self.dimension,
            function,
            jacobian_solver: (),
        }
    }
}

impl<F> ConcreteVectorFunction<F, ()> {
    pub fn with_jacobian_solver<J, T>(self, jacobian_solver: J) -> ConcreteVectorFunction<F, J>
    where
        T: Scalar,
        J: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>, &DVectorView<T>) -> Result<(), Box<dyn Error>>,
    {
        ConcreteVectorFunction {
            dimension: self.dimension,
            function: self.function,
            jacobian_solver,
        }
    }
}

impl<F, J, T> VectorFunction<T> for ConcreteVectorFunction<F, J>
where
    T: Scalar,
    F: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>),
{
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<T>, x: &DVectorView<T>) -> Result<(), Box<dyn Error>> {
        let func = &mut self.function;
        func(f, x);
        Ok(())
    }
}

impl<F, J, T> DifferentiableVectorFunction<T> for ConcreteVectorFunction<F, J>
where
    T: Scalar,
    F: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>),
    J: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>, &DVectorView<T>) -> Result<(), Box<dyn Error>>,
{
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<T>,
        x: &DVectorView<T>,
        rhs: &DVectorView<T>,
    ) -> Result<(), Box<dyn Error>> {
        let j = &mut self.jacobian_solver;
        j(sol, x, rhs)
    }
}

/// Approximates the Jacobian of a vector function evaluated at `x`, using
/// central finite differences with resolution `h`.
///
/// Fails if any evaluation of the function fails.
#[replace_float_literals(T::from_constant(literal))]
pub fn approximate_jacobian<T>(mut f: impl VectorFunction<T>, x: &DVector<T>, h: &T) -> Result<DMatrix<T>, Box<dyn Error>>
where
    T: Real,
{
    let out_dim = f.dimension();
    let in_dim = x.len();

    let mut result = DMatrix::zeros(out_dim, in_dim);

    // x+ := x + h e_j, x- := x - h e_j
    let mut x_plus = x.clone();
    let mut x_minus = x.clone();

    let mut f_plus = DVector::zeros(out_dim);
    let mut f_minus = DVector::zeros(out_dim);

    for j in 0..in_dim {
        x_plus[j] += *h;
        x_minus[j] -= *h;

        f.eval_into(&mut DVectorViewMut::from(&mut f_plus), &DVectorView::from(&x_plus))?;
        f.eval_into(&mut DVectorViewMut::from(&mut f_minus), &DVectorView::from(&x_minus))?;

        x_plus[j] = x[j];
        x_minus[j] = x[j];

        // result[.., j] := (f+ - f-) / 2h
        let mut column_j = result.column_mut(j);
        column_j += &f_plus;
        column_j -= &f_minus;
        column_j /= 2.0 * *h;
    }

    Ok(result)
}
