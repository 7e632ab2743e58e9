use galerkin_traits::Real;
use nalgebra::SVector;
use num::Zero;
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Neg, Sub, SubAssign};

/// A vector of `N` entries stored inline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DenseVector<T, const N: usize> {
    data: [T; N],
}

/// Variable-size counterpart of [`DenseVector`].
pub type DynDenseVector<T> = nalgebra::DVector<T>;

impl<T, const N: usize> DenseVector<T, N> {
    pub const fn from_array(data: [T; N]) -> Self {
        Self { data }
    }

    pub const fn size(&self) -> usize {
        N
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn into_array(self) -> [T; N] {
        self.data
    }
}

impl<T: Copy, const N: usize> DenseVector<T, N> {
    pub fn get(&self, i: usize) -> T {
        self.data[i]
    }

    pub fn set(&mut self, i: usize, value: T) {
        self.data[i] = value;
    }

    /// Sets every entry to `value`.
    pub fn set_values(&mut self, value: T) {
        self.data = [value; N];
    }

    /// Builds a vector by evaluating `f` for each index.
    pub fn from_fn(f: impl FnMut(usize) -> T) -> Self {
        Self {
            data: std::array::from_fn(f),
        }
    }
}

impl<T: Copy + Zero, const N: usize> DenseVector<T, N> {
    pub fn zero() -> Self {
        Self { data: [T::zero(); N] }
    }

    pub fn set_zero(&mut self) {
        self.data = [T::zero(); N];
    }
}

impl<T: Real, const N: usize> DenseVector<T, N> {
    pub fn dot(&self, other: &Self) -> T {
        self.data
            .iter()
            .zip(other.data.iter())
            .fold(T::zero(), |acc, (&a, &b)| acc + a * b)
    }

    pub fn magnitude(&self) -> T {
        self.dot(self).sqrt()
    }

    /// Returns the vector scaled to unit length.
    ///
    /// A zero vector stays zero.
    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag == T::zero() {
            *self
        } else {
            *self * (T::one() / mag)
        }
    }

    pub fn scale(&mut self, alpha: T) {
        for x in &mut self.data {
            *x *= alpha;
        }
    }

    pub fn sum(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &x| acc + x)
    }

    pub fn avg(&self) -> T {
        self.sum() / T::from_count(N)
    }

    pub fn min(&self) -> T {
        self.data
            .iter()
            .skip(1)
            .fold(self.data[0], |acc, &x| if x < acc { x } else { acc })
    }

    pub fn max(&self) -> T {
        self.data
            .iter()
            .skip(1)
            .fold(self.data[0], |acc, &x| if x > acc { x } else { acc })
    }

    pub fn to_nalgebra(&self) -> SVector<T, N> {
        SVector::from_column_slice(&self.data)
    }
}

impl<T: Real> DenseVector<T, 3> {
    pub fn cross(&self, other: &Self) -> Self {
        let (a, b) = (self, other);
        Self::from_array([
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ])
    }
}

impl<T, const N: usize> Index<usize> for DenseVector<T, N> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<T, const N: usize> IndexMut<usize> for DenseVector<T, N> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }
}

impl<T: Copy + Zero, const N: usize> Default for DenseVector<T, N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<T, const N: usize> From<[T; N]> for DenseVector<T, N> {
    fn from(data: [T; N]) -> Self {
        Self { data }
    }
}

impl<T: Real, const N: usize> From<SVector<T, N>> for DenseVector<T, N> {
    fn from(v: SVector<T, N>) -> Self {
        Self::from_fn(|i| v[i])
    }
}

impl<T: Real, const N: usize> From<DenseVector<T, N>> for SVector<T, N> {
    fn from(v: DenseVector<T, N>) -> Self {
        v.to_nalgebra()
    }
}

impl<T: Real, const N: usize> Add for DenseVector<T, N> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl<T: Real, const N: usize> AddAssign for DenseVector<T, N> {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.data.iter_mut().zip(rhs.data) {
            *a += b;
        }
    }
}

impl<T: Real, const N: usize> Sub for DenseVector<T, N> {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

impl<T: Real, const N: usize> SubAssign for DenseVector<T, N> {
    fn sub_assign(&mut self, rhs: Self) {
        for (a, b) in self.data.iter_mut().zip(rhs.data) {
            *a -= b;
        }
    }
}

impl<T: Real, const N: usize> Neg for DenseVector<T, N> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_fn(|i| -self.data[i])
    }
}

impl<T: Real, const N: usize> Mul<T> for DenseVector<T, N> {
    type Output = Self;

    fn mul(mut self, alpha: T) -> Self {
        self.scale(alpha);
        self
    }
}

impl<const N: usize> Mul<DenseVector<f64, N>> for f64 {
    type Output = DenseVector<f64, N>;

    fn mul(self, v: DenseVector<f64, N>) -> DenseVector<f64, N> {
        v * self
    }
}

/// Dot product of two vectors.
pub fn dot<T: Real, const N: usize>(a: &DenseVector<T, N>, b: &DenseVector<T, N>) -> T {
    a.dot(b)
}

/// Cross product of two 3-vectors.
pub fn cross_product<T: Real>(a: &DenseVector<T, 3>, b: &DenseVector<T, 3>) -> DenseVector<T, 3> {
    a.cross(b)
}
