#![allow(non_snake_case)]

//! Naive ground-state search for one-dimensional spin chains using the
//! density matrix renormalization group (DMRG).
//!
//! The quantum state is held as a matrix product state (MPS) of rank-3
//! [local tensors][state::LocalState], and the Hamiltonian as a matrix product
//! operator ([MPO][mpo::MPO]) of rank-4 tensors. Each step of a sweep builds
//! the effective Hamiltonian for a single site from cached
//! [environment tensors][env::Environment], diagonalizes it fully, and moves
//! the orthogonality center one site over via a truncated singular value
//! decomposition.
//!
//! ```text
//!      .- bond -.      .- bond -.
//!      V        V      V        V
//! A[1] ---------- A[2] ---------- ... ---------- A[L]      <- MPS
//!  |               |                              |
//!  | <- physical   |                              |
//!  |               |                              |
//! W[1] ---------- W[2] ---------- ... ---------- W[L]      <- MPO
//!  |               |                              |
//! ```
//!
//! # Example
//!
//! ```no_run
//! use naive_dmrg::{ dmrg::{ DMRG, DMRGConfig }, models, mpo::MPO };
//!
//! let mpo: MPO<f64> = MPO::new(models::ising(1.0, 1.0), 10, false).unwrap();
//! let config = DMRGConfig::new(50).seed(10546);
//! let mut dmrg = DMRG::new(mpo, config).unwrap();
//! let energy = dmrg.run().unwrap();
//! println!("ground state energy: {energy:.12}");
//! ```

use ndarray as nd;
use ndarray_linalg::types::{ Lapack, Scalar };

pub mod ops;
pub mod models;

pub mod state;
pub mod mpo;
pub mod env;
pub mod dmrg;

/// Convenience trait to identify real or complex number types that can be
/// used in LAPACK-backed linear-algebraic operations.
pub trait ComplexLinalgScalar: Scalar + Lapack { }

impl<A> ComplexLinalgScalar for A
where A: Scalar + Lapack
{ }

// copy an array into standard (row-major) memory order before reshaping it
//
// `into_shape` reinterprets contiguous data in whatever memory order it
// happens to be in, so outputs of LAPACK routines and matrix products have to
// pass through here first
pub(crate) fn reshaped<A, S, D, E>(arr: &nd::ArrayBase<S, D>, shape: E)
    -> Result<nd::Array<A, E::Dim>, nd::ShapeError>
where
    A: Clone,
    S: nd::Data<Elem = A>,
    D: nd::Dimension,
    E: nd::IntoDimension,
{
    arr.as_standard_layout().into_owned().into_shape(shape)
}

#[cfg(test)]
pub(crate) fn assert_all_close<S1, S2, D>(
    a: &nd::ArrayBase<S1, D>,
    b: &nd::ArrayBase<S2, D>,
    eps: f64,
)
where
    S1: nd::Data<Elem = f64>,
    S2: nd::Data<Elem = f64>,
    D: nd::Dimension,
{
    assert_eq!(a.shape(), b.shape());
    a.iter().zip(b.iter())
        .for_each(|(x, y)| { approx::assert_abs_diff_eq!(*x, *y, epsilon = eps); });
}
