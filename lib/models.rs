//! Bulk MPO blocks for simple nearest-neighbor spin-1/2 chains.
//!
//! Each block is a rank-4 tensor with axis signature
//! `[ operator-left, operator-right, physical-out, physical-in ]`, i.e. a
//! square matrix of 2×2 operators. Blocks are arranged in the lower-triangular
//! convention: the first column collects operators that *finish* a term and
//! the last row those that *start* one, so that [`MPO::new`][crate::mpo::MPO::new]
//! takes the last row for the first site and the first column for the last.

use ndarray as nd;
use crate::{ ComplexLinalgScalar, ops };

// assemble a (b, b, 2, 2) tensor from a b×b grid of 2×2 operators
fn from_blocks<A: ComplexLinalgScalar>(blocks: &[Vec<nd::Array2<A>>])
    -> nd::Array4<A>
{
    let b = blocks.len();
    nd::Array4::from_shape_fn(
        (b, b, 2, 2),
        |(i, j, s, t)| blocks[i][j][[s, t]],
    )
}

/// Construct the bulk block for the transverse-field Ising model,
///
/// *H* = −*J* Σ<sub>*k*</sub> *S*<sup>*z*</sup><sub>*k*</sub>
/// *S*<sup>*z*</sup><sub>*k*+1</sub>
/// − *h* Σ<sub>*k*</sub> *S*<sup>*x*</sup><sub>*k*</sub>
///
/// with coupling `j` and transverse field strength `h`. The returned block has
/// shape `(3, 3, 2, 2)`.
pub fn ising<A: ComplexLinalgScalar>(j: A::Real, h: A::Real) -> nd::Array4<A> {
    let id: nd::Array2<A> = ops::make_id();
    let o: nd::Array2<A> = ops::make_zero();
    let sx: nd::Array2<A> = ops::make_sx();
    let sz: nd::Array2<A> = ops::make_sz();
    let j = A::from_real(j);
    let h = A::from_real(h);
    from_blocks(&[
        vec![id.clone(),         o.clone(),          o.clone()],
        vec![sz.clone(),         o.clone(),          o.clone()],
        vec![sx.mapv(|x| -h * x), sz.mapv(|x| -j * x), id       ],
    ])
}

/// Construct the bulk block for the XXZ Heisenberg model in a longitudinal
/// field,
///
/// *H* = Σ<sub>*k*</sub> [
/// (*J*/2) (*S*<sup>+</sup><sub>*k*</sub> *S*<sup>−</sup><sub>*k*+1</sub>
/// + *S*<sup>−</sup><sub>*k*</sub> *S*<sup>+</sup><sub>*k*+1</sub>)
/// + *J*<sub>*z*</sub> *S*<sup>*z*</sup><sub>*k*</sub>
/// *S*<sup>*z*</sup><sub>*k*+1</sub> ]
/// − *h* Σ<sub>*k*</sub> *S*<sup>*z*</sup><sub>*k*</sub>
///
/// with in-plane coupling `j`, axial coupling `jz`, and field strength `h`.
/// The returned block has shape `(5, 5, 2, 2)`.
pub fn heisenberg<A: ComplexLinalgScalar>(j: A::Real, jz: A::Real, h: A::Real)
    -> nd::Array4<A>
{
    let id: nd::Array2<A> = ops::make_id();
    let o: nd::Array2<A> = ops::make_zero();
    let sp: nd::Array2<A> = ops::make_sp();
    let sm: nd::Array2<A> = ops::make_sm();
    let sz: nd::Array2<A> = ops::make_sz();
    let j2 = A::from_real(j) / (A::one() + A::one());
    let jz = A::from_real(jz);
    let h = A::from_real(h);
    from_blocks(&[
        vec![id.clone(), o.clone(), o.clone(), o.clone(), o.clone()],
        vec![sp.clone(), o.clone(), o.clone(), o.clone(), o.clone()],
        vec![sm.clone(), o.clone(), o.clone(), o.clone(), o.clone()],
        vec![sz.clone(), o.clone(), o.clone(), o.clone(), o.clone()],
        vec![
            sz.mapv(|x| -h * x),
            sm.mapv(|x| j2 * x),
            sp.mapv(|x| j2 * x),
            sz.mapv(|x| jz * x),
            id,
        ],
    ])
}
