//! Matrix product operators for open chains built from a repeating bulk
//! block.
//!
//! Each site tensor carries the axis signature
//! ```text
//!                  | physical-out
//!     op-left --#-- op-right
//!                  | physical-in
//! ```
//! For the simple spin models considered here, all sites except the first and
//! last share the same bulk tensor *W*. The first site takes the last row of
//! *W* and the last site its first column:
//! ```text
//! W[0]     = W[B - 1, .., .., ..]   shape (1, B, d, d)
//! W[k]     = W                      shape (B, B, d, d)
//! W[n - 1] = W[.., 0, .., ..]       shape (B, 1, d, d)
//! ```

use ndarray as nd;
use thiserror::Error;
use crate::ComplexLinalgScalar;

#[derive(Debug, Error)]
pub enum MPOError {
    /// Returned when the bulk operator block is not a rank-4 tensor.
    #[error("error in MPO creation: expected a rank-4 operator block but got rank {0}")]
    IncompatibleRank(usize),

    /// Returned when the two operator bond dimensions of the bulk block
    /// differ.
    #[error("error in MPO creation: non-square operator bonds ({0} != {1})")]
    NonSquareBond(usize, usize),

    /// Returned when the two physical dimensions of the bulk block differ.
    #[error("error in MPO creation: non-square physical indices ({0} != {1})")]
    NonSquarePhysical(usize, usize),

    /// Returned when the bulk block has a zero-dimensional axis.
    #[error("error in MPO creation: encountered a zero-dimensional axis")]
    ZeroDim,

    /// Returned when attempting to create an MPO for fewer than two sites.
    #[error("error in MPO creation: need at least 2 sites but got {0}")]
    ChainTooShort(usize),

    /// Returned when the chain length cannot be represented in the element
    /// type for averaging.
    #[error("error in MPO creation: cannot average over {0} sites")]
    UnrepresentableLength(usize),
}
use MPOError::*;
pub type MPOResult<T> = Result<T, MPOError>;

/// A matrix product operator on an open chain.
#[derive(Clone, Debug, PartialEq)]
pub struct MPO<A> {
    // Number of sites.
    n: usize, // ≥ 2
    // Tensors for each site, with axis signature
    //   [ o{k - 1}, o{k}, s{k}, s'{k} ]
    // where `o{j}` is an operator bond and `s{k}`/`s'{k}` are the outgoing and
    // incoming physical indices.
    data: Vec<nd::Array4<A>>, // length n
}

impl<A> MPO<A>
where A: ComplexLinalgScalar
{
    /// Assemble an `n`-site MPO from a bulk operator block.
    ///
    /// Pass `averaged = true` to divide the last site tensor by `n`, which
    /// turns a sum of local terms into its per-site average.
    ///
    /// Fails if `n < 2` or if `op` is not square in both its operator bond and
    /// physical index pairs.
    pub fn new(op: nd::Array4<A>, n: usize, averaged: bool) -> MPOResult<Self> {
        let (bl, br, dout, din) = op.dim();
        if bl != br { return Err(NonSquareBond(bl, br)); }
        if dout != din { return Err(NonSquarePhysical(dout, din)); }
        if bl == 0 || dout == 0 { return Err(ZeroDim); }
        if n < 2 { return Err(ChainTooShort(n)); }

        let mut data: Vec<nd::Array4<A>> = Vec::with_capacity(n);
        data.push(op.slice(nd::s![bl - 1..bl, .., .., ..]).to_owned());
        (0..n - 2).for_each(|_| { data.push(op.clone()); });
        let mut last = op.slice(nd::s![.., 0..1, .., ..]).to_owned();
        if averaged {
            let norm = A::from_usize(n).ok_or(UnrepresentableLength(n))?;
            last.map_inplace(|w| { *w /= norm; });
        }
        data.push(last);
        Ok(Self { n, data })
    }

    /// Like [`Self::new`], but for a bulk block whose rank is only known at
    /// runtime.
    ///
    /// Fails additionally if `op` is not rank 4.
    pub fn from_dyn(op: nd::ArrayD<A>, n: usize, averaged: bool)
        -> MPOResult<Self>
    {
        let rank = op.ndim();
        let op = op.into_dimensionality::<nd::Ix4>()
            .map_err(|_| IncompatibleRank(rank))?;
        Self::new(op, n, averaged)
    }

    /// Return the number of sites.
    pub fn n(&self) -> usize { self.n }

    /// Return the physical dimension of the `k`-th site, if it exists.
    pub fn phys_at(&self, k: usize) -> Option<usize> {
        self.data.get(k).map(|w| w.dim().2)
    }

    /// Return the operator bond dimensions `(left, right)` of the `k`-th site,
    /// if it exists.
    pub fn bond_at(&self, k: usize) -> Option<(usize, usize)> {
        self.data.get(k).map(|w| (w.dim().0, w.dim().1))
    }

    /// Return a reference to the tensor of the `k`-th site, if it exists.
    pub fn get(&self, k: usize) -> Option<&nd::Array4<A>> { self.data.get(k) }

    /// Return a reference to all site tensors.
    pub fn data(&self) -> &Vec<nd::Array4<A>> { &self.data }

    /// Unwrap `self` into the list of site tensors.
    pub fn into_data(self) -> Vec<nd::Array4<A>> { self.data }

    /// Contract the full chain into a single dense matrix acting on the
    /// Π<sub>*k*</sub> *d*<sub>*k*</sub>-dimensional Hilbert space.
    ///
    /// Rows index outgoing and columns incoming physical states, with site 0
    /// as the most significant digit. The cost is exponential in the number of
    /// sites, so this is only useful for checking small systems.
    pub fn contract(&self) -> nd::Array2<A> {
        // partial[b] is the operator on all sites so far, with the open
        // operator bond on the right fixed to b
        let w0 = &self.data[0];
        let mut partial: Vec<nd::Array2<A>>
            = (0..w0.dim().1)
            .map(|b| w0.slice(nd::s![0, b, .., ..]).to_owned())
            .collect();
        let mut dim = w0.dim().2;
        for wk in self.data.iter().skip(1) {
            let (bl, br, dk, _) = wk.dim();
            partial
                = (0..br)
                .map(|c| {
                    (0..bl)
                        .fold(
                            nd::Array2::zeros((dim * dk, dim * dk)),
                            |acc, b| {
                                acc + kron(
                                    &partial[b],
                                    &wk.slice(nd::s![b, c, .., ..]),
                                )
                            },
                        )
                })
                .collect();
            dim *= dk;
        }
        partial.swap_remove(0)
    }
}

// Kronecker product of two matrices
fn kron<A, S1, S2>(a: &nd::ArrayBase<S1, nd::Ix2>, b: &nd::ArrayBase<S2, nd::Ix2>)
    -> nd::Array2<A>
where
    A: ComplexLinalgScalar,
    S1: nd::Data<Elem = A>,
    S2: nd::Data<Elem = A>,
{
    let (ma, na) = a.dim();
    let (mb, nb) = b.dim();
    nd::Array2::from_shape_fn(
        (ma * mb, na * nb),
        |(i, j)| a[[i / mb, j / nb]] * b[[i % mb, j % nb]],
    )
}
