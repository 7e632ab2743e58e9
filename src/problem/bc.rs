use std::fmt;

/// Function of time and position writing one value per requested component.
pub type SpaceTimeFunction<T> = Box<dyn Fn(T, &[T], &mut [T])>;

/// Essential boundary condition prescribing components of a field on a boundary.
pub struct DirichletBC<T> {
    boundary: String,
    field: usize,
    components: Vec<usize>,
    value: SpaceTimeFunction<T>,
}

impl<T> DirichletBC<T> {
    /// Prescribes `components` of field `field` (by id) on the vertices of `boundary`.
    ///
    /// `value(t, x, out)` writes `out[i]` for component `components[i]`.
    pub fn new(
        boundary: &str,
        field: usize,
        components: &[usize],
        value: impl Fn(T, &[T], &mut [T]) + 'static,
    ) -> Self {
        Self {
            boundary: boundary.to_string(),
            field,
            components: components.to_vec(),
            value: Box::new(value),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn components(&self) -> &[usize] {
        &self.components
    }

    pub fn evaluate(&self, t: T, x: &[T], out: &mut [T]) {
        (self.value)(t, x, out)
    }
}

impl<T> fmt::Debug for DirichletBC<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirichletBC")
            .field("boundary", &self.boundary)
            .field("field", &self.field)
            .field("components", &self.components)
            .finish()
    }
}

/// Initial values of all components of a field.
pub struct InitialCondition<T> {
    field: usize,
    value: Box<dyn Fn(&[T], &mut [T])>,
}

impl<T> InitialCondition<T> {
    pub fn new(field: usize, value: impl Fn(&[T], &mut [T]) + 'static) -> Self {
        Self {
            field,
            value: Box::new(value),
        }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn evaluate(&self, x: &[T], out: &mut [T]) {
        (self.value)(x, out)
    }
}

impl<T> fmt::Debug for InitialCondition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitialCondition")
            .field("field", &self.field)
            .finish()
    }
}

/// Values of an auxiliary field, interpolated at the mesh vertices.
pub struct AuxFunction<T> {
    field: usize,
    value: SpaceTimeFunction<T>,
}

impl<T> AuxFunction<T> {
    /// `value(t, x, out)` writes every component of auxiliary field `field` (by id).
    pub fn new(field: usize, value: impl Fn(T, &[T], &mut [T]) + 'static) -> Self {
        Self {
            field,
            value: Box::new(value),
        }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn evaluate(&self, t: T, x: &[T], out: &mut [T]) {
        (self.value)(t, x, out)
    }
}

impl<T> fmt::Debug for AuxFunction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuxFunction")
            .field("field", &self.field)
            .finish()
    }
}
