use galerkin_traits::Real;

/// Identifies one of the flat buffers of [`AssemblyData`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AssemblyBuffer {
    /// Primary field values.
    U,
    /// Primary field time derivatives.
    UT,
    /// Primary field gradients, followed by Hessians for fields with jet degree 2.
    UX,
    /// Auxiliary field values.
    A,
    /// Auxiliary field gradients.
    AX,
    /// Physical coordinates of the quadrature point.
    Xyz,
    /// Outward unit normal on boundaries.
    Normal,
}

/// Scratch context describing the current quadrature point.
///
/// The buffers are sized once when the problem is created and overwritten in place at every
/// quadrature point, so assembly performs no allocation. The engine writes one point at a time;
/// functionals only ever see a shared reference.
#[derive(Debug, Clone)]
pub struct AssemblyData<T> {
    dim: usize,
    pub(crate) u: Vec<T>,
    pub(crate) u_t: Vec<T>,
    pub(crate) u_x: Vec<T>,
    pub(crate) a: Vec<T>,
    pub(crate) a_x: Vec<T>,
    pub(crate) xyz: Vec<T>,
    pub(crate) normals: Vec<T>,
    pub(crate) time: T,
    pub(crate) u_t_shift: T,
}

impl<T: Real> AssemblyData<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            u: Vec::new(),
            u_t: Vec::new(),
            u_x: Vec::new(),
            a: Vec::new(),
            a_x: Vec::new(),
            xyz: vec![T::zero(); dim],
            normals: vec![T::zero(); dim],
            time: T::zero(),
            u_t_shift: T::zero(),
        }
    }

    /// Sizes the primary buffers for `total_components` components.
    ///
    /// With `with_hessians`, room for a `dim x dim` block per component is reserved after the
    /// gradients.
    pub(crate) fn resize_primary(&mut self, total_components: usize, with_hessians: bool) {
        let d = self.dim;
        let ux_len = total_components * d + if with_hessians { total_components * d * d } else { 0 };
        self.u = vec![T::zero(); total_components];
        self.u_t = vec![T::zero(); total_components];
        self.u_x = vec![T::zero(); ux_len];
    }

    pub(crate) fn resize_aux(&mut self, total_components: usize, with_hessians: bool) {
        let d = self.dim;
        let ax_len = total_components * d + if with_hessians { total_components * d * d } else { 0 };
        self.a = vec![T::zero(); total_components];
        self.a_x = vec![T::zero(); ax_len];
    }

    pub(crate) fn set_point(&mut self, xyz: &[T]) {
        self.xyz.copy_from_slice(&xyz[..self.dim]);
    }

    pub(crate) fn set_normal(&mut self, normal: &[T]) {
        self.normals.copy_from_slice(&normal[..self.dim]);
    }
}

impl<T> AssemblyData<T> {
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Time at which the forms are evaluated.
    pub fn time(&self) -> &T {
        &self.time
    }

    /// The shift `a` in `dF/dU + a dF/dU_t`, as set by the time integrator.
    pub fn u_t_shift(&self) -> &T {
        &self.u_t_shift
    }

    pub fn u(&self) -> &[T] {
        &self.u
    }

    pub fn u_t(&self) -> &[T] {
        &self.u_t
    }

    pub fn u_x(&self) -> &[T] {
        &self.u_x
    }

    pub fn a(&self) -> &[T] {
        &self.a
    }

    pub fn a_x(&self) -> &[T] {
        &self.a_x
    }

    pub fn xyz(&self) -> &[T] {
        &self.xyz
    }

    pub fn normal(&self) -> &[T] {
        &self.normals
    }

    pub fn buffer(&self, buffer: AssemblyBuffer) -> &[T] {
        match buffer {
            AssemblyBuffer::U => &self.u,
            AssemblyBuffer::UT => &self.u_t,
            AssemblyBuffer::UX => &self.u_x,
            AssemblyBuffer::A => &self.a,
            AssemblyBuffer::AX => &self.a_x,
            AssemblyBuffer::Xyz => &self.xyz,
            AssemblyBuffer::Normal => &self.normals,
        }
    }
}
