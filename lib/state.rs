//! Rank-3 local tensors of a matrix product state.
//!
//! Each tensor carries the axis signature
//! ```text
//!              physical
//!                 |
//!     left bond --*-- right bond
//! ```
//! Positions at either end of the chain hold degenerate, zero-size dummy
//! tensors that are never touched by a sweep.

use std::ops::Add;
use ndarray as nd;
use ndarray_linalg::{ SVDInto, error::LinalgError };
use num_traits::{ Float, Zero };
use rand::{
    Rng,
    distributions::{ Distribution, Standard },
};
use thiserror::Error;
use crate::{ ComplexLinalgScalar, reshaped };

#[derive(Debug, Error)]
pub enum StateError {
    /// Returned when attempting to factorize a zero-size (dummy) tensor.
    #[error("error in truncation: cannot factorize an empty tensor")]
    EmptyTensor,

    /// Returned when a local tensor cannot be reshaped into a matrix.
    #[error("error in truncation: {0}")]
    Shape(#[from] nd::ShapeError),

    /// Returned when the singular value decomposition fails.
    #[error("error in truncation: {0}")]
    Linalg(#[from] LinalgError),
}
use StateError::*;
pub type StateResult<T> = Result<T, StateError>;

/// Direction in which a local tensor is factorized.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Fuse the left bond with the physical index, i.e. factorize
    /// `[ (left, physical), right ]`. The left factor is left-canonical and
    /// the remainder is pushed onto the right neighbor.
    Left,
    /// Fuse the physical index with the right bond, i.e. factorize
    /// `[ left, (physical, right) ]`. The right factor is right-canonical and
    /// the remainder is pushed onto the left neighbor.
    Right,
}

/// Data struct holding a (possibly truncated) singular value decomposition
/// of a local tensor reshaped into a matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Svd<A: ComplexLinalgScalar> {
    /// Matrix whose columns are the kept left singular vectors.
    pub u: nd::Array2<A>,
    /// Kept singular values, non-negative and in descending order.
    pub s: nd::Array1<A::Real>,
    /// Matrix whose rows are the kept right singular vectors.
    pub vh: nd::Array2<A>,
    /// Number of kept singular values.
    pub rank: usize,
    /// Sum of the squares of all singular values that were dropped.
    pub discarded: A::Real,
}

/// A single rank-3 tensor of a matrix product state.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalState<A> {
    // axis signature [ left, physical, right ]
    data: nd::Array3<A>,
}

impl<A> LocalState<A>
where A: ComplexLinalgScalar
{
    /// Create a new tensor of shape `(left, phys, right)` filled with random
    /// values.
    ///
    /// If either bond dimension is zero, the result is instead an empty dummy
    /// tensor of shape `(0, 0, 0)`.
    pub fn new<R>(left: usize, phys: usize, right: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
        Standard: Distribution<A>,
    {
        if left == 0 || right == 0 { return Self::empty(); }
        let data: nd::Array3<A>
            = nd::Array3::from_shape_fn((left, phys, right), |_| rng.gen());
        Self { data }
    }

    /// Create an empty dummy tensor of shape `(0, 0, 0)`.
    pub fn empty() -> Self { Self { data: nd::Array3::zeros((0, 0, 0)) } }

    /// Wrap an existing array with axis signature `[ left, physical, right ]`.
    pub fn from_array(data: nd::Array3<A>) -> Self { Self { data } }

    /// Return `true` if `self` is a dummy tensor.
    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Return the dimensions of the left bond, physical, and right bond
    /// indices.
    pub fn dims(&self) -> (usize, usize, usize) { self.data.dim() }

    /// Return the dimension of the left bond index.
    pub fn left(&self) -> usize { self.data.dim().0 }

    /// Return the dimension of the physical index.
    pub fn phys(&self) -> usize { self.data.dim().1 }

    /// Return the dimension of the right bond index.
    pub fn right(&self) -> usize { self.data.dim().2 }

    /// Return a reference to the underlying array.
    pub fn data(&self) -> &nd::Array3<A> { &self.data }

    /// Unwrap `self` into the underlying array.
    pub fn into_data(self) -> nd::Array3<A> { self.data }

    /// Replace the underlying array.
    pub fn update(&mut self, data: nd::Array3<A>) { self.data = data; }

    /// Reshape into a matrix according to `dir` and compute its singular value
    /// decomposition, keeping at most `max_bond` (but at least one) of the
    /// largest singular values.
    ///
    /// Truncation is hard: dropped singular values are reported through
    /// [`Svd::discarded`] but otherwise have no effect.
    ///
    /// Fails if `self` is a dummy tensor.
    pub fn truncate(&self, dir: Direction, max_bond: usize)
        -> StateResult<Svd<A>>
    {
        if self.is_empty() { return Err(EmptyTensor); }
        let (l, p, r) = self.dims();
        let q: nd::Array2<A>
            = match dir {
                Direction::Left => reshaped(&self.data, (l * p, r))?,
                Direction::Right => reshaped(&self.data, (l, p * r))?,
            };
        // LAPACK gives back full square U and V†; only the leading
        // min(m, n) vectors pair with a singular value
        let (Some(u), s, Some(vh)) = q.svd_into(true, true)?
            else { unreachable!() };
        let rank = s.len().min(max_bond.max(1));
        let discarded: A::Real
            = s.iter().skip(rank)
            .map(|sj| Float::powi(*sj, 2))
            .fold(A::Real::zero(), A::Real::add);
        let u = u.slice(nd::s![.., ..rank]).to_owned();
        let vh = vh.slice(nd::s![..rank, ..]).to_owned();
        let s = s.slice(nd::s![..rank]).to_owned();
        Ok(Svd { u, s, vh, rank, discarded })
    }

    /// Compute the Gram matrix of the left bond,
    /// *G*<sub>*ab*</sub> = Σ<sub>*s*,*w*</sub> *A*<sub>*asw*</sub>
    /// *A*<sup>*</sup><sub>*bsw*</sub>,
    /// which is the identity if `self` is right-canonical.
    pub fn right_gram(&self) -> StateResult<nd::Array2<A>> {
        let (l, p, r) = self.dims();
        let m: nd::Array2<A> = reshaped(&self.data, (l, p * r))?;
        let mh: nd::Array2<A> = m.t().mapv(|x| x.conj());
        Ok(m.dot(&mh))
    }

    /// Compute the Gram matrix of the right bond,
    /// *G*<sub>*ab*</sub> = Σ<sub>*v*,*s*</sub> *A*<sup>*</sup><sub>*vsa*</sub>
    /// *A*<sub>*vsb*</sub>,
    /// which is the identity if `self` is left-canonical.
    pub fn left_gram(&self) -> StateResult<nd::Array2<A>> {
        let (l, p, r) = self.dims();
        let m: nd::Array2<A> = reshaped(&self.data, (l * p, r))?;
        let mh: nd::Array2<A> = m.t().mapv(|x| x.conj());
        Ok(mh.dot(&m))
    }
}
