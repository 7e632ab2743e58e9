use crate::fe::Tabulation;
use galerkin_traits::Real;

/// Basis functions of one field at one point, with gradients in physical space.
#[derive(Debug, Copy, Clone)]
pub struct PointBasis<'a, T> {
    pub num_basis: usize,
    pub num_components: usize,
    /// `values[b * Nc + c]`
    pub values: &'a [T],
    /// `gradients[(b * Nc + c) * dE + d]`
    pub gradients: &'a [T],
}

/// Tabulated basis values at point `q` of region `r`, with the reference gradients pushed
/// forward into `gradients` (`Nb * Nc * dE` entries).
pub fn fill_point_basis<'a, T: Real>(
    tab: &'a Tabulation<T>,
    r: usize,
    q: usize,
    inv_jacobian: &[T],
    dim_embed: usize,
    gradients: &'a mut [T],
) -> PointBasis<'a, T> {
    let nb = tab.num_basis();
    let nc = tab.num_components();
    let cdim = tab.cdim();
    let reference = tab.gradients_at(r, q);
    for bc in 0..nb * nc {
        for d in 0..dim_embed {
            let mut g = T::zero();
            for e in 0..cdim {
                g += reference[bc * cdim + e] * inv_jacobian[e * dim_embed + d];
            }
            gradients[bc * dim_embed + d] = g;
        }
    }
    PointBasis {
        num_basis: nb,
        num_components: nc,
        values: tab.values_at(r, q),
        gradients: &gradients[..nb * nc * dim_embed],
    }
}

/// Contracts the weighted pointwise residual at one point against the test functions.
///
/// `f0` holds `Nc` entries and `f1` holds `Nc * dE` entries for this point; either may be empty
/// to skip it. Results are added to `elem_vec[b]`, so `elem_vec` should start at the offset of
/// the field within the element.
pub fn update_element_vec<T: Real>(basis: &PointBasis<T>, dim_embed: usize, f0: &[T], f1: &[T], elem_vec: &mut [T]) {
    let nb = basis.num_basis;
    let nc = basis.num_components;
    for b in 0..nb {
        let mut sum = T::zero();
        for c in 0..nc {
            let bc = b * nc + c;
            if !f0.is_empty() {
                sum += basis.values[bc] * f0[c];
            }
            if !f1.is_empty() {
                for d in 0..dim_embed {
                    sum += basis.gradients[bc * dim_embed + d] * f1[c * dim_embed + d];
                }
            }
        }
        elem_vec[b] += sum;
    }
}

/// Pointwise Jacobian blocks of one test/trial field pair at one point.
///
/// An empty slice marks a block without integrands.
#[derive(Debug, Copy, Clone)]
pub struct JacobianBlocks<'a, T> {
    pub g0: &'a [T],
    pub g1: &'a [T],
    pub g2: &'a [T],
    pub g3: &'a [T],
}

/// Contracts the weighted pointwise Jacobian blocks at one point against the test (`basis_i`)
/// and trial (`basis_j`) functions.
///
/// The entry for test function `f` and trial function `g` is added to
/// `elem_mat[(offset_i + f) * tot_dim + offset_j + g]`, so `elem_mat` should start at the
/// element's `tot_dim x tot_dim` block.
pub fn update_element_mat<T: Real>(
    basis_i: &PointBasis<T>,
    basis_j: &PointBasis<T>,
    dim_embed: usize,
    blocks: &JacobianBlocks<T>,
    tot_dim: usize,
    (offset_i, offset_j): (usize, usize),
    elem_mat: &mut [T],
) {
    let de = dim_embed;
    let (nb_i, nc_i) = (basis_i.num_basis, basis_i.num_components);
    let (nb_j, nc_j) = (basis_j.num_basis, basis_j.num_components);
    let JacobianBlocks { g0, g1, g2, g3 } = *blocks;

    for f in 0..nb_i {
        let i = offset_i + f;
        for fc in 0..nc_i {
            let fidx = f * nc_i + fc;
            let phi_i = basis_i.values[fidx];
            let dphi_i = &basis_i.gradients[fidx * de..(fidx + 1) * de];
            for g in 0..nb_j {
                let j = offset_j + g;
                let mut sum = T::zero();
                for gc in 0..nc_j {
                    let gidx = g * nc_j + gc;
                    let phi_j = basis_j.values[gidx];
                    let dphi_j = &basis_j.gradients[gidx * de..(gidx + 1) * de];
                    let block = fc * nc_j + gc;

                    if !g0.is_empty() {
                        sum += phi_i * g0[block] * phi_j;
                    }
                    for df in 0..de {
                        if !g1.is_empty() {
                            sum += phi_i * g1[block * de + df] * dphi_j[df];
                        }
                        if !g2.is_empty() {
                            sum += dphi_i[df] * g2[block * de + df] * phi_j;
                        }
                        if !g3.is_empty() {
                            for dg in 0..de {
                                sum += dphi_i[df] * g3[(block * de + df) * de + dg] * dphi_j[dg];
                            }
                        }
                    }
                }
                elem_mat[i * tot_dim + j] += sum;
            }
        }
    }
}
