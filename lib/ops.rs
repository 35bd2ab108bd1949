//! Local operators for a single spin-1/2 particle in the basis
//! { ∣↑⟩, ∣↓⟩ }.
//!
//! Each operator comes in two forms: a generic constructor for any
//! [`ComplexLinalgScalar`] element type and a lazily-constructed, `f64`-valued
//! static.

use ndarray as nd;
use num_traits::{ One, Zero };
use once_cell::sync::Lazy;
use crate::ComplexLinalgScalar;

// 1/2 without going through a fallible numeric cast
fn half<A: ComplexLinalgScalar>() -> A {
    A::from_real(A::Real::one() / (A::Real::one() + A::Real::one()))
}

/// Make the 2×2 identity.
///
/// Consider using the lazily-constructed, `f64`-valued [`IDMAT`] instead.
pub fn make_id<A: ComplexLinalgScalar>() -> nd::Array2<A> {
    nd::Array2::eye(2)
}

/// Lazy-static version of [`make_id`].
pub static IDMAT: Lazy<nd::Array2<f64>> = Lazy::new(make_id);

/// Make the 2×2 zero block.
///
/// Consider using the lazily-constructed, `f64`-valued [`ZEROMAT`] instead.
pub fn make_zero<A: ComplexLinalgScalar>() -> nd::Array2<A> {
    nd::Array2::zeros((2, 2))
}

/// Lazy-static version of [`make_zero`].
pub static ZEROMAT: Lazy<nd::Array2<f64>> = Lazy::new(make_zero);

/// Make the raising operator *S*<sup>+</sup>.
///
/// Consider using the lazily-constructed, `f64`-valued [`SPMAT`] instead.
pub fn make_sp<A: ComplexLinalgScalar>() -> nd::Array2<A> {
    nd::array![
        [A::zero(), A::one() ],
        [A::zero(), A::zero()],
    ]
}

/// Lazy-static version of [`make_sp`].
pub static SPMAT: Lazy<nd::Array2<f64>> = Lazy::new(make_sp);

/// Make the lowering operator *S*<sup>−</sup>.
///
/// Consider using the lazily-constructed, `f64`-valued [`SMMAT`] instead.
pub fn make_sm<A: ComplexLinalgScalar>() -> nd::Array2<A> {
    nd::array![
        [A::zero(), A::zero()],
        [A::one(),  A::zero()],
    ]
}

/// Lazy-static version of [`make_sm`].
pub static SMMAT: Lazy<nd::Array2<f64>> = Lazy::new(make_sm);

/// Make the spin projection operator *S*<sup>*x*</sup> = *σ*<sup>*x*</sup>/2.
///
/// Consider using the lazily-constructed, `f64`-valued [`SXMAT`] instead.
pub fn make_sx<A: ComplexLinalgScalar>() -> nd::Array2<A> {
    let h: A = half();
    nd::array![
        [A::zero(), h        ],
        [h,         A::zero()],
    ]
}

/// Lazy-static version of [`make_sx`].
pub static SXMAT: Lazy<nd::Array2<f64>> = Lazy::new(make_sx);

/// Make the spin projection operator *S*<sup>*z*</sup> = *σ*<sup>*z*</sup>/2.
///
/// Consider using the lazily-constructed, `f64`-valued [`SZMAT`] instead.
pub fn make_sz<A: ComplexLinalgScalar>() -> nd::Array2<A> {
    let h: A = half();
    nd::array![
        [h,         A::zero()],
        [A::zero(), -h       ],
    ]
}

/// Lazy-static version of [`make_sz`].
pub static SZMAT: Lazy<nd::Array2<f64>> = Lazy::new(make_sz);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_operators_compose_to_sz() {
        // [S+, S-] = 2 Sz
        let comm = SPMAT.dot(&*SMMAT) - SMMAT.dot(&*SPMAT);
        assert_eq!(comm, &*SZMAT * 2.0);
    }

    #[test]
    fn spin_operators_square_to_quarter() {
        let quarter = &*IDMAT * 0.25;
        assert_eq!(SXMAT.dot(&*SXMAT), quarter);
        assert_eq!(SZMAT.dot(&*SZMAT), quarter);
        assert!(ZEROMAT.iter().all(|x| *x == 0.0));
    }
}
