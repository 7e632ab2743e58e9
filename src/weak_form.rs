//! Registry of pointwise integrands keyed by region, field and part.
use crate::functional::{JacobianIntegrand, ResidualIntegrand};
use std::collections::BTreeMap;
use std::fmt;

/// Kinds of residual integrands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResidualKind {
    /// Term multiplying the test function.
    F0,
    /// Term multiplying the test function gradient.
    F1,
    BndF0,
    BndF1,
}

impl ResidualKind {
    pub fn is_boundary(&self) -> bool {
        matches!(self, Self::BndF0 | Self::BndF1)
    }
}

/// Kinds of Jacobian integrands.
///
/// `G*` are the blocks of the Jacobian, `GP*` of its preconditioner and `GT*` of the derivative
/// with respect to the time derivative of the solution. The digit is the block:
/// 0 (value x value), 1 (value x gradient), 2 (gradient x value), 3 (gradient x gradient).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JacobianKind {
    G0,
    G1,
    G2,
    G3,
    GP0,
    GP1,
    GP2,
    GP3,
    GT0,
    GT1,
    GT2,
    GT3,
    BndG0,
    BndG1,
    BndG2,
    BndG3,
}

/// Which operator a Jacobian assembly computes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum JacobianType {
    Jacobian,
    Preconditioner,
    /// The time-derivative contribution `dF/dU_t`.
    Dynamic,
}

impl JacobianKind {
    /// The four block kinds `[X0, X1, X2, X3]` for a volumetric Jacobian of type `jtype`.
    pub fn blocks(jtype: JacobianType) -> [JacobianKind; 4] {
        match jtype {
            JacobianType::Jacobian => [Self::G0, Self::G1, Self::G2, Self::G3],
            JacobianType::Preconditioner => [Self::GP0, Self::GP1, Self::GP2, Self::GP3],
            JacobianType::Dynamic => [Self::GT0, Self::GT1, Self::GT2, Self::GT3],
        }
    }

    pub fn boundary_blocks() -> [JacobianKind; 4] {
        [Self::BndG0, Self::BndG1, Self::BndG2, Self::BndG3]
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self, Self::BndG0 | Self::BndG1 | Self::BndG2 | Self::BndG3)
    }
}

/// Identifies a set of integrands: a region (`label`/`value`), a field (or field pair) and a part.
///
/// For Jacobians `field` encodes the pair `(f, g)` as `f * num_fields + g`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Key {
    pub label: Option<String>,
    pub value: i64,
    pub field: usize,
    pub part: i64,
}

impl Key {
    pub fn new(label: Option<&str>, value: i64, field: usize, part: i64) -> Self {
        Self {
            label: label.map(str::to_string),
            value,
            field,
            part,
        }
    }

    /// Key for `field` restricted to `region`, where an empty region is the whole domain.
    pub fn for_region(region: &str, field: usize) -> Self {
        let label = if region.is_empty() { None } else { Some(region) };
        Self::new(label, 0, field, 0)
    }

    /// Name of the region, empty for the whole domain.
    pub fn region(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.label.as_deref().unwrap_or("<domain>"),
            self.value,
            self.field,
            self.part
        )
    }
}

/// Integrands of a problem, grouped by kind and key.
pub struct WeakForm<T> {
    num_fields: usize,
    residuals: BTreeMap<Key, BTreeMap<ResidualKind, Vec<ResidualIntegrand<T>>>>,
    jacobians: BTreeMap<Key, BTreeMap<JacobianKind, Vec<JacobianIntegrand<T>>>>,
}

impl<T> Default for WeakForm<T> {
    fn default() -> Self {
        Self {
            num_fields: 0,
            residuals: BTreeMap::new(),
            jacobians: BTreeMap::new(),
        }
    }
}

impl<T> fmt::Debug for WeakForm<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakForm")
            .field("num_fields", &self.num_fields)
            .field("residual_keys", &self.residuals.keys().collect::<Vec<_>>())
            .field("jacobian_keys", &self.jacobians.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T> WeakForm<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_num_fields(&mut self, num_fields: usize) {
        self.num_fields = num_fields;
    }

    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    /// Field index of a Jacobian key for the pair `(f, g)`.
    pub fn jacobian_field(&self, f: usize, g: usize) -> usize {
        f * self.num_fields + g
    }

    /// Splits the field index of a Jacobian key into `(f, g)`.
    pub fn split_jacobian_field(&self, field: usize) -> (usize, usize) {
        (field / self.num_fields, field % self.num_fields)
    }

    /// Appends an integrand to the list for `(kind, key)`; `None` is ignored.
    pub fn add_residual(&mut self, kind: ResidualKind, key: Key, integrand: Option<ResidualIntegrand<T>>) {
        if let Some(integrand) = integrand {
            self.residuals
                .entry(key)
                .or_default()
                .entry(kind)
                .or_default()
                .push(integrand);
        }
    }

    pub fn add_jacobian(&mut self, kind: JacobianKind, key: Key, integrand: Option<JacobianIntegrand<T>>) {
        if let Some(integrand) = integrand {
            self.jacobians
                .entry(key)
                .or_default()
                .entry(kind)
                .or_default()
                .push(integrand);
        }
    }

    /// Integrands for `(kind, key)`, empty if none are registered.
    pub fn get_residual(&self, kind: ResidualKind, key: &Key) -> &[ResidualIntegrand<T>] {
        self.residuals
            .get(key)
            .and_then(|forms| forms.get(&kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get_jacobian(&self, kind: JacobianKind, key: &Key) -> &[JacobianIntegrand<T>] {
        self.jacobians
            .get(key)
            .and_then(|forms| forms.get(&kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn residual_keys(&self, boundary: bool) -> Vec<Key> {
        self.residuals
            .iter()
            .filter(|(_, forms)| forms.keys().any(|kind| kind.is_boundary() == boundary))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn jacobian_keys(&self, boundary: bool) -> Vec<Key> {
        self.jacobians
            .iter()
            .filter(|(_, forms)| forms.keys().any(|kind| kind.is_boundary() == boundary))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Keys with volumetric residual integrands.
    pub fn get_residual_keys(&self) -> Vec<Key> {
        self.residual_keys(false)
    }

    pub fn get_bnd_residual_keys(&self) -> Vec<Key> {
        self.residual_keys(true)
    }

    /// Keys with volumetric Jacobian integrands of any type.
    pub fn get_jacobian_keys(&self) -> Vec<Key> {
        self.jacobian_keys(false)
    }

    pub fn get_bnd_jacobian_keys(&self) -> Vec<Key> {
        self.jacobian_keys(true)
    }

    /// Whether `key` has integrands for any of the given block kinds.
    pub fn has_jacobian_blocks(&self, kinds: &[JacobianKind], key: &Key) -> bool {
        kinds
            .iter()
            .any(|&kind| !self.get_jacobian(kind, key).is_empty())
    }

    fn has_any(&self, kinds: [JacobianKind; 4]) -> bool {
        self.jacobians
            .values()
            .any(|forms| forms.keys().any(|kind| kinds.contains(kind)))
    }

    pub fn has_jacobian(&self) -> bool {
        self.has_any(JacobianKind::blocks(JacobianType::Jacobian))
    }

    pub fn has_jacobian_preconditioner(&self) -> bool {
        self.has_any(JacobianKind::blocks(JacobianType::Preconditioner))
    }

    pub fn has_dyn_jacobian(&self) -> bool {
        self.has_any(JacobianKind::blocks(JacobianType::Dynamic))
    }
}
