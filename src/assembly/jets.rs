use crate::fe::{DiscreteSystem, Tabulation};
use galerkin_traits::Real;

/// Pushes the reference gradient `grad_ref` (length `cdim`) to physical space.
#[inline]
fn push_forward_gradient<T: Real>(grad_ref: &[T], inv_jacobian: &[T], dim_embed: usize, out: &mut [T]) {
    for d in 0..dim_embed {
        out[d] = grad_ref
            .iter()
            .enumerate()
            .fold(T::zero(), |acc, (e, &g)| acc + g * inv_jacobian[e * dim_embed + d]);
    }
}

/// Pushes the reference Hessian `hess_ref` (`cdim x cdim`) to physical space as `invJ^T H invJ`.
#[inline]
fn push_forward_hessian<T: Real>(hess_ref: &[T], cdim: usize, inv_jacobian: &[T], dim_embed: usize, out: &mut [T]) {
    for d1 in 0..dim_embed {
        for d2 in 0..dim_embed {
            let mut h = T::zero();
            for e1 in 0..cdim {
                for e2 in 0..cdim {
                    h += inv_jacobian[e1 * dim_embed + d1] * hess_ref[e1 * cdim + e2] * inv_jacobian[e2 * dim_embed + d2];
                }
            }
            out[d1 * dim_embed + d2] = h;
        }
    }
}

/// Evaluates the jets of every field of `ds` at point `q` of tabulation region `r`.
///
/// `tabs[f]` is the tabulation of field `f` and `coefficients` the element closure (`tot_dim`
/// entries). Values are written to `u[comp_offset + c]`, gradients to
/// `u_x[(comp_offset + c) * dE + d]` and, for fields with jet degree 2, Hessians to
/// `u_x[tot_comp * dE + (comp_offset + c) * dE^2 + d1 * dE + d2]`. Reference derivatives are
/// accumulated first and then pushed forward with `inv_jacobian`.
///
/// With `coefficients_t`, time derivatives are written to `u_t` in the same layout as `u`.
/// Nothing is allocated.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_field_jets<T: Real>(
    ds: &DiscreteSystem<T>,
    tabs: &[&Tabulation<T>],
    r: usize,
    q: usize,
    inv_jacobian: &[T],
    dim_embed: usize,
    coefficients: &[T],
    coefficients_t: Option<&[T]>,
    u: &mut [T],
    u_x: &mut [T],
    mut u_t: Option<&mut [T]>,
) {
    let de = dim_embed;
    let hessian_offset = ds.total_components() * de;

    for (f, tab) in tabs.iter().enumerate() {
        let nb = tab.num_basis();
        let nc = tab.num_components();
        let cdim = tab.cdim();
        let off = ds.field_offset(f);
        let coff = ds.component_offset(f);
        let basis = tab.values_at(r, q);
        let basis_der = tab.gradients_at(r, q);
        let basis_hess = if ds.jet_degree(f) > 1 { tab.hessians_at(r, q) } else { None };

        let values = &mut u[coff..coff + nc];
        values.fill(T::zero());
        let grads = &mut u_x[coff * de..(coff + nc) * de];
        grads.fill(T::zero());

        // Reference gradients are accumulated in the first cdim slots of each component
        for b in 0..nb {
            let coeff = coefficients[off + b];
            for c in 0..nc {
                let bc = b * nc + c;
                values[c] += basis[bc] * coeff;
                for e in 0..cdim {
                    grads[c * de + e] += basis_der[bc * cdim + e] * coeff;
                }
            }
        }

        let mut grad_ref = [T::zero(); 3];
        for c in 0..nc {
            grad_ref[..cdim].copy_from_slice(&grads[c * de..c * de + cdim]);
            push_forward_gradient(&grad_ref[..cdim], inv_jacobian, de, &mut grads[c * de..(c + 1) * de]);
        }

        if let Some(basis_hess) = basis_hess {
            let n2 = cdim * cdim;
            let m2 = de * de;
            let hess = &mut u_x[hessian_offset + coff * m2..hessian_offset + (coff + nc) * m2];
            let mut hess_ref = [T::zero(); 9];
            for c in 0..nc {
                hess_ref.fill(T::zero());
                for b in 0..nb {
                    let coeff = coefficients[off + b];
                    let bc = b * nc + c;
                    for k in 0..n2 {
                        hess_ref[k] += basis_hess[bc * n2 + k] * coeff;
                    }
                }
                push_forward_hessian(&hess_ref[..n2], cdim, inv_jacobian, de, &mut hess[c * m2..(c + 1) * m2]);
            }
        }

        match (coefficients_t, u_t.as_deref_mut()) {
            (Some(coefficients_t), Some(u_t)) => {
                let dots = &mut u_t[coff..coff + nc];
                dots.fill(T::zero());
                for b in 0..nb {
                    let coeff = coefficients_t[off + b];
                    for c in 0..nc {
                        dots[c] += basis[b * nc + c] * coeff;
                    }
                }
            }
            (None, Some(u_t)) => u_t[coff..coff + nc].fill(T::zero()),
            _ => {}
        }
    }
}

/// Evaluates only the values of every field of `ds`, leaving gradients at zero.
///
/// Used for auxiliary fields discretized directly on a boundary, whose reference cell does not
/// match the geometry of the supporting cell.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_field_values<T: Real>(
    ds: &DiscreteSystem<T>,
    tabs: &[&Tabulation<T>],
    r: usize,
    q: usize,
    dim_embed: usize,
    coefficients: &[T],
    u: &mut [T],
    u_x: &mut [T],
) {
    for (f, tab) in tabs.iter().enumerate() {
        let nb = tab.num_basis();
        let nc = tab.num_components();
        let off = ds.field_offset(f);
        let coff = ds.component_offset(f);
        let basis = tab.values_at(r, q);
        let values = &mut u[coff..coff + nc];
        values.fill(T::zero());
        for b in 0..nb {
            for c in 0..nc {
                values[c] += basis[b * nc + c] * coefficients[off + b];
            }
        }
        u_x[coff * dim_embed..(coff + nc) * dim_embed].fill(T::zero());
    }
}
