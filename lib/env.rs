//! Lazily computed, memoized partial contractions of ⟨ψ|*H*|ψ⟩.
//!
//! For a chain of `n` real sites (positions `1..=n`, with dummies at `0` and
//! `n + 1`), three families of rank-6 tensors are kept, all with axis
//! signature
//! ```text
//! [ bra-left, op-left, ket-left, bra-right, op-right, ket-right ]
//! ```
//! - the site block *F*(*k*), contracting the conjugated local state, the
//!   operator tensor, and the local state at position *k* over their physical
//!   indices;
//! - the left environment *L*(*k*) = *F*(1) ⋯ *F*(*k*);
//! - the right environment *R*(*k*) = *F*(*k*) ⋯ *F*(*n*).
//!
//! *L*(0) and *R*(*n* + 1) are fixed all-ones tensors of shape
//! `(1, 1, 1, 1, 1, 1)`.
//!
//! If *L*(*k*) is present, so is every *L*(*j*) with *j* < *k*, and likewise
//! every *R*(*j*) with *j* > *k* if *R*(*k*) is present. Invalidation relies on
//! this to stop early.

use ndarray as nd;
use thiserror::Error;
use crate::{ ComplexLinalgScalar, reshaped, state::LocalState };

#[derive(Debug, Error)]
pub enum EnvError {
    /// Returned when a position lies outside the range valid for the requested
    /// environment family.
    #[error("error in environment: invalid position {0}")]
    InvalidPosition(usize),

    /// Returned when the physical dimension of a local state does not match
    /// that of its operator tensor.
    #[error("error in environment: physical dimension mismatch at position {0}")]
    PhysicalMismatch(usize),

    /// Returned when the bonds of adjacent blocks do not line up.
    #[error("error in environment: bond dimension mismatch at position {0}")]
    BondMismatch(usize),

    #[error("error in environment: {0}")]
    Shape(#[from] nd::ShapeError),
}
use EnvError::*;
pub type EnvResult<T> = Result<T, EnvError>;

/// Cache of environment tensors for a chain of `n` real sites.
///
/// The cache does not own the local states or operator tensors; these are
/// passed to each accessor as slices of length `n + 2` indexed by position,
/// dummies included. Whoever mutates a local state must call
/// [`invalidate`][Self::invalidate] with its position before the next
/// access.
#[derive(Clone, Debug)]
pub struct Environment<A> {
    n: usize,
    blocks: Vec<Option<nd::Array6<A>>>, // length n + 2
    left: Vec<Option<nd::Array6<A>>>, // length n + 2
    right: Vec<Option<nd::Array6<A>>>, // length n + 2
}

impl<A> Environment<A>
where A: ComplexLinalgScalar
{
    /// Create a new, empty cache for `n` real sites.
    pub fn new(n: usize) -> Self {
        let ones = || Some(nd::Array6::ones((1, 1, 1, 1, 1, 1)));
        let mut left: Vec<Option<nd::Array6<A>>> = vec![None; n + 2];
        left[0] = ones();
        let mut right: Vec<Option<nd::Array6<A>>> = vec![None; n + 2];
        right[n + 1] = ones();
        Self { n, blocks: vec![None; n + 2], left, right }
    }

    /// Return the number of real sites.
    pub fn n(&self) -> usize { self.n }

    /// Return `true` if *F*(`k`) is currently cached.
    pub fn has_block(&self, k: usize) -> bool {
        self.blocks.get(k).is_some_and(|b| b.is_some())
    }

    /// Return `true` if *L*(`k`) is currently cached.
    pub fn has_left(&self, k: usize) -> bool {
        self.left.get(k).is_some_and(|l| l.is_some())
    }

    /// Return `true` if *R*(`k`) is currently cached.
    pub fn has_right(&self, k: usize) -> bool {
        self.right.get(k).is_some_and(|r| r.is_some())
    }

    /// Return *F*(`k`), computing it if necessary.
    ///
    /// Fails if `k` is not a real site, `1..=n`.
    pub fn block_at(
        &mut self,
        k: usize,
        sites: &[LocalState<A>],
        ops: &[nd::Array4<A>],
    ) -> EnvResult<&nd::Array6<A>>
    {
        if !(1..=self.n).contains(&k) { return Err(InvalidPosition(k)); }
        if self.blocks[k].is_none() {
            let site = sites.get(k).ok_or(InvalidPosition(k))?;
            let op = ops.get(k).ok_or(InvalidPosition(k))?;
            self.blocks[k] = Some(site_block(k, site, op)?);
        }
        let Some(block) = &self.blocks[k] else { unreachable!() };
        Ok(block)
    }

    /// Return *L*(`k`), computing it and every missing *L*(*j*), *j* < `k`,
    /// if necessary.
    ///
    /// Fails if `k` is not in `0..=n`.
    pub fn left_at(
        &mut self,
        k: usize,
        sites: &[LocalState<A>],
        ops: &[nd::Array4<A>],
    ) -> EnvResult<&nd::Array6<A>>
    {
        if k > self.n { return Err(InvalidPosition(k)); }
        if self.left[k].is_none() {
            let new
                = if k == 1 {
                    self.block_at(1, sites, ops)?.clone()
                } else {
                    self.left_at(k - 1, sites, ops)?;
                    self.block_at(k, sites, ops)?;
                    let (Some(prev), Some(block))
                        = (&self.left[k - 1], &self.blocks[k])
                        else { unreachable!() };
                    join(k, prev, block)?
                };
            self.left[k] = Some(new);
        }
        let Some(left) = &self.left[k] else { unreachable!() };
        Ok(left)
    }

    /// Return *R*(`k`), computing it and every missing *R*(*j*), *j* > `k`,
    /// if necessary.
    ///
    /// Fails if `k` is not in `1..=n + 1`.
    pub fn right_at(
        &mut self,
        k: usize,
        sites: &[LocalState<A>],
        ops: &[nd::Array4<A>],
    ) -> EnvResult<&nd::Array6<A>>
    {
        if k == 0 || k > self.n + 1 { return Err(InvalidPosition(k)); }
        if self.right[k].is_none() {
            let new
                = if k == self.n {
                    self.block_at(k, sites, ops)?.clone()
                } else {
                    self.right_at(k + 1, sites, ops)?;
                    self.block_at(k, sites, ops)?;
                    let (Some(block), Some(next))
                        = (&self.blocks[k], &self.right[k + 1])
                        else { unreachable!() };
                    join(k, block, next)?
                };
            self.right[k] = Some(new);
        }
        let Some(right) = &self.right[k] else { unreachable!() };
        Ok(right)
    }

    /// Drop every cached tensor that depends on the local state at position
    /// `k`: *F*(`k`), *L*(*j*) for *j* ≥ `k`, and *R*(*j*) for *j* ≤ `k`.
    ///
    /// Each scan stops at the first entry that is already absent. Positions
    /// outside `1..=n` hold dummies that never change, so this is a no-op for
    /// them.
    pub fn invalidate(&mut self, k: usize) {
        if !(1..=self.n).contains(&k) { return; }
        self.blocks[k] = None;
        for left in self.left[k..=self.n].iter_mut() {
            if left.take().is_none() { break; }
        }
        for right in self.right[1..=k].iter_mut().rev() {
            if right.take().is_none() { break; }
        }
    }

    /// Drop every cached tensor except the two boundary seeds.
    pub fn clear(&mut self) {
        self.blocks.iter_mut().for_each(|b| { *b = None; });
        self.left.iter_mut().skip(1).for_each(|l| { *l = None; });
        let n = self.n;
        self.right.iter_mut().take(n + 1).for_each(|r| { *r = None; });
    }
}

// F[bl, ol, kl, br, or, kr] = Σ_{p, q} conj(A[bl, p, br]) W[ol, or, p, q] A[kl, q, kr]
fn site_block<A>(k: usize, site: &LocalState<A>, op: &nd::Array4<A>)
    -> EnvResult<nd::Array6<A>>
where A: ComplexLinalgScalar
{
    let (l, p, r) = site.dims();
    let (ol, or, pout, pin) = op.dim();
    if p != pout || p != pin { return Err(PhysicalMismatch(k)); }
    let a = site.data();

    // W · A over the incoming physical index -> [ ol, or, p, kl, kr ]
    let w_mat: nd::Array2<A> = reshaped(op, (ol * or * p, p))?;
    let a_mat: nd::Array2<A>
        = reshaped(&a.view().permuted_axes([1, 0, 2]), (p, l * r))?;
    let wa: nd::Array5<A>
        = reshaped(&w_mat.dot(&a_mat), (ol, or, p, l, r))?;

    // conj(A) · (W · A) over the outgoing physical index
    // -> [ bl, br, ol, or, kl, kr ]
    let wa_mat: nd::Array2<A>
        = reshaped(&wa.permuted_axes([2, 0, 1, 3, 4]), (p, ol * or * l * r))?;
    let ac_mat: nd::Array2<A>
        = reshaped(&a.view().permuted_axes([0, 2, 1]), (l * r, p))?
        .mapv(|x| x.conj());
    let f: nd::Array6<A>
        = reshaped(&ac_mat.dot(&wa_mat), (l, r, ol, or, l, r))?;
    Ok(f.permuted_axes([0, 2, 4, 1, 3, 5]).as_standard_layout().into_owned())
}

// contract the right bond triple of `lhs` with the left bond triple of `rhs`
fn join<A>(k: usize, lhs: &nd::Array6<A>, rhs: &nd::Array6<A>)
    -> EnvResult<nd::Array6<A>>
where A: ComplexLinalgScalar
{
    let (a0, a1, a2, a3, a4, a5) = lhs.dim();
    let (b0, b1, b2, b3, b4, b5) = rhs.dim();
    if (a3, a4, a5) != (b0, b1, b2) { return Err(BondMismatch(k)); }
    let lhs_mat: nd::Array2<A> = reshaped(lhs, (a0 * a1 * a2, a3 * a4 * a5))?;
    let rhs_mat: nd::Array2<A> = reshaped(rhs, (b0 * b1 * b2, b3 * b4 * b5))?;
    Ok(reshaped(&lhs_mat.dot(&rhs_mat), (a0, a1, a2, b3, b4, b5))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{ SeedableRng, rngs::StdRng };
    use crate::{ assert_all_close, models, mpo::MPO };

    struct Chain {
        sites: Vec<LocalState<f64>>,
        ops: Vec<nd::Array4<f64>>,
        mpo: MPO<f64>,
    }

    // random three-site state with bonds 1 - 3 - 3 - 1 under a transverse
    // Ising Hamiltonian, padded with dummies
    fn chain() -> Chain {
        let mut rng = StdRng::seed_from_u64(10546);
        let mpo: MPO<f64> = MPO::new(models::ising(1.0, 0.8), 3, false).unwrap();
        let sites = vec![
            LocalState::empty(),
            LocalState::new(1, 2, 3, &mut rng),
            LocalState::new(3, 2, 3, &mut rng),
            LocalState::new(3, 2, 1, &mut rng),
            LocalState::empty(),
        ];
        let mut ops = vec![nd::Array4::zeros((0, 0, 0, 0))];
        ops.extend(mpo.data().iter().cloned());
        ops.push(nd::Array4::zeros((0, 0, 0, 0)));
        Chain { sites, ops, mpo }
    }

    // dense ⟨ψ|H|ψ⟩ for comparison
    fn dense_expectation(chain: &Chain) -> f64 {
        let mut psi: nd::Array2<f64> = nd::Array2::ones((1, 1));
        for site in chain.sites.iter().filter(|s| !s.is_empty()) {
            let (l, p, r) = site.dims();
            let m: nd::Array2<f64> = reshaped(site.data(), (l, p * r)).unwrap();
            let next = psi.dot(&m);
            psi = reshaped(&next, (psi.nrows() * p, r)).unwrap();
        }
        let psi = psi.column(0).to_owned();
        psi.dot(&chain.mpo.contract().dot(&psi))
    }

    #[test]
    fn boundary_seeds_are_ones() {
        let Chain { sites, ops, .. } = chain();
        let mut env: Environment<f64> = Environment::new(3);
        assert!(env.has_left(0) && env.has_right(4));
        let l0 = env.left_at(0, &sites, &ops).unwrap();
        assert_eq!(l0.dim(), (1, 1, 1, 1, 1, 1));
        assert_eq!(l0[[0, 0, 0, 0, 0, 0]], 1.0);
        let r4 = env.right_at(4, &sites, &ops).unwrap();
        assert_eq!(r4[[0, 0, 0, 0, 0, 0]], 1.0);
    }

    #[test]
    fn edge_environments_equal_blocks() {
        let Chain { sites, ops, .. } = chain();
        let mut env: Environment<f64> = Environment::new(3);
        let f1 = env.block_at(1, &sites, &ops).unwrap().clone();
        assert_eq!(f1.dim(), (1, 1, 1, 3, 3, 3));
        let l1 = env.left_at(1, &sites, &ops).unwrap().clone();
        assert_eq!(l1, f1);
        let f3 = env.block_at(3, &sites, &ops).unwrap().clone();
        assert_eq!(f3.dim(), (3, 3, 3, 1, 1, 1));
        let r3 = env.right_at(3, &sites, &ops).unwrap().clone();
        assert_eq!(r3, f3);
    }

    #[test]
    fn full_contractions_agree() {
        let chain = chain();
        let Chain { sites, ops, .. } = &chain;
        let mut env: Environment<f64> = Environment::new(3);
        let from_left = env.left_at(3, sites, ops).unwrap().clone();
        let from_right = env.right_at(1, sites, ops).unwrap().clone();
        assert_eq!(from_left.dim(), (1, 1, 1, 1, 1, 1));
        assert_eq!(from_right.dim(), (1, 1, 1, 1, 1, 1));
        assert_all_close(&from_left, &from_right, 1e-10);
        let expected = dense_expectation(&chain);
        assert_abs_diff_eq!(
            from_left[[0, 0, 0, 0, 0, 0]], expected, epsilon = 1e-10);
    }

    #[test]
    fn invalidation_is_monotonic() {
        let Chain { sites, ops, .. } = chain();
        let mut env: Environment<f64> = Environment::new(3);
        env.left_at(3, &sites, &ops).unwrap();
        env.right_at(1, &sites, &ops).unwrap();
        assert!((1..=3).all(|k| env.has_block(k)));
        assert!((0..=3).all(|k| env.has_left(k)));
        assert!((1..=4).all(|k| env.has_right(k)));

        env.invalidate(2);
        assert!(env.has_block(1) && !env.has_block(2) && env.has_block(3));
        assert!(env.has_left(0) && env.has_left(1));
        assert!(!env.has_left(2) && !env.has_left(3));
        assert!(!env.has_right(1) && !env.has_right(2));
        assert!(env.has_right(3) && env.has_right(4));

        // idempotent
        env.invalidate(2);
        assert!(env.has_left(1) && !env.has_left(2) && !env.has_left(3));
        assert!(!env.has_right(2) && env.has_right(3));

        // a scan that hits an absent entry leaves the rest alone
        env.invalidate(3);
        assert!(!env.has_block(3) && !env.has_right(3));
        assert!(env.has_left(1) && env.has_block(1));
        assert!(env.has_right(4));

        // dummies never change
        env.invalidate(0);
        env.invalidate(4);
        assert!(env.has_left(0) && env.has_right(4));
    }

    #[test]
    fn recomputation_tracks_updates() {
        let Chain { mut sites, ops, .. } = chain();
        let mut env: Environment<f64> = Environment::new(3);
        let before = env.left_at(3, &sites, &ops).unwrap().clone();
        let doubled = sites[2].data() * 2.0;
        sites[2].update(doubled);
        env.invalidate(2);
        let after = env.left_at(3, &sites, &ops).unwrap().clone();
        assert_all_close(&(&before * 4.0), &after, 1e-10);
        env.clear();
        assert!((1..=3).all(|k| !env.has_block(k) && !env.has_left(k)));
        assert!(env.has_left(0) && env.has_right(4));
    }

    #[test]
    fn invalid_positions_are_rejected() {
        let Chain { sites, ops, .. } = chain();
        let mut env: Environment<f64> = Environment::new(3);
        assert!(matches!(env.block_at(0, &sites, &ops), Err(InvalidPosition(0))));
        assert!(matches!(env.block_at(4, &sites, &ops), Err(InvalidPosition(4))));
        assert!(matches!(env.left_at(4, &sites, &ops), Err(InvalidPosition(4))));
        assert!(matches!(env.right_at(0, &sites, &ops), Err(InvalidPosition(0))));
    }
}
