//! Single-site DMRG sweeps over a matrix product state.
//!
//! Positions are indexed so that the real sites occupy `1..=n`, with a dummy
//! at each of `0` and `n + 1`. Log output reports the zero-based site index,
//! `position - 1`.
//!
//! The state starts out fully right-canonical. Each iteration of
//! [`DMRG::run`] passes over the chain from left to right, replacing each
//! site by the ground state of its effective Hamiltonian and moving the
//! orthogonality center one site to the right, then passes back from right to
//! left. The last local energy of each iteration is recorded, and iterations
//! continue until two consecutive recorded energies agree to within
//! tolerance.

use ndarray as nd;
use ndarray_linalg::{ Eigh, UPLO, error::LinalgError };
use num_traits::{ Float, NumCast, Zero };
use rand::{
    SeedableRng,
    distributions::{ Distribution, Standard },
    rngs::StdRng,
};
use thiserror::Error;
use crate::{
    ComplexLinalgScalar,
    reshaped,
    env::{ EnvError, Environment },
    mpo::MPO,
    state::{ Direction, LocalState, StateError, Svd },
};

#[derive(Debug, Error)]
pub enum DMRGError {
    /// Returned when the maximum bond dimension is zero.
    #[error("error in DMRG: maximum bond dimension must be at least 1")]
    ZeroBondDim,

    /// Returned when a convergence tolerance is negative or NaN.
    #[error("error in DMRG: invalid tolerance {0}")]
    InvalidTolerance(f64),

    /// Returned when a site operation is requested outside the real sites.
    #[error("error in DMRG: invalid position {0}")]
    InvalidPosition(usize),

    /// Returned when the environment bonds around a site do not match the
    /// site's own bonds.
    #[error("error in DMRG: bond dimension mismatch at position {0}")]
    BondMismatch(usize),

    /// Returned by [`DMRG::run`] when a maximum number of sweep iterations is
    /// set and exhausted before convergence.
    #[error("error in DMRG: no convergence after {sweeps} sweep iterations (last energy {energy})")]
    NotConverged { sweeps: usize, energy: f64 },

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("environment error: {0}")]
    Env(#[from] EnvError),

    #[error("error in DMRG: {0}")]
    Shape(#[from] nd::ShapeError),

    #[error("error in DMRG: {0}")]
    Linalg(#[from] LinalgError),
}
use DMRGError::*;
pub type DMRGResult<T> = Result<T, DMRGError>;

// lower bound on convergence tolerances, in machine epsilons
const TOL_ULPS: f64 = 16.0;

/// Parameters for a DMRG run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DMRGConfig {
    /// Maximum bond dimension.
    pub max_bond: usize,
    /// Relative tolerance for the convergence test.
    pub rtol: f64,
    /// Absolute tolerance for the convergence test.
    pub atol: f64,
    /// Maximum number of sweep iterations; sweep indefinitely if `None`.
    pub max_sweeps: Option<usize>,
    /// Seed for the random initial state; seed from system entropy if
    /// `None`.
    pub seed: Option<u64>,
}

impl DMRGConfig {
    /// Default tolerance for both [`rtol`][Self::rtol] and
    /// [`atol`][Self::atol].
    ///
    /// Either tolerance is raised to 16 machine epsilons of the element type
    /// if it falls below that, so this default only applies as written for
    /// double precision.
    pub const TOL: f64 = 1e-12;

    /// Create a new configuration with default tolerances, no sweep limit, and
    /// no seed.
    pub fn new(max_bond: usize) -> Self {
        Self {
            max_bond,
            rtol: Self::TOL,
            atol: Self::TOL,
            max_sweeps: None,
            seed: None,
        }
    }

    /// Set the relative tolerance.
    pub fn rtol(mut self, rtol: f64) -> Self {
        self.rtol = rtol;
        self
    }

    /// Set the absolute tolerance.
    pub fn atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    /// Set the maximum number of sweep iterations.
    pub fn max_sweeps(mut self, max_sweeps: usize) -> Self {
        self.max_sweeps = Some(max_sweeps);
        self
    }

    /// Set the seed for the random initial state.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Single-site DMRG driver.
///
/// Owns the local states of the chain, the operator tensors of the
/// Hamiltonian, and the cache of environment tensors built from both.
#[derive(Clone, Debug)]
pub struct DMRG<A: ComplexLinalgScalar> {
    n: usize,
    config: DMRGConfig,
    rtol: A::Real,
    atol: A::Real,
    // length n + 2; dummies at 0 and n + 1
    sites: Vec<LocalState<A>>,
    // length n + 2; dummies at 0 and n + 1
    ops: Vec<nd::Array4<A>>,
    env: Environment<A>,
    energy: A::Real,
    sweep_energies: Vec<A::Real>,
}

impl<A> DMRG<A>
where A: ComplexLinalgScalar
{
    /// Set up a randomly initialized state for the Hamiltonian `mpo` and bring
    /// it into right-canonical form.
    ///
    /// Fails if `config.max_bond` is zero or either tolerance is negative.
    pub fn new(mpo: MPO<A>, config: DMRGConfig) -> DMRGResult<Self>
    where Standard: Distribution<A>
    {
        let DMRGConfig { max_bond, rtol, atol, seed, .. } = config;
        if max_bond == 0 { return Err(ZeroBondDim); }
        let rtol = tolerance::<A::Real>(rtol)?;
        let atol = tolerance::<A::Real>(atol)?;
        let mut rng
            = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            };

        let n = mpo.n();
        let mut sites: Vec<LocalState<A>> = Vec::with_capacity(n + 2);
        sites.push(LocalState::empty());
        for (k, w) in mpo.data().iter().enumerate() {
            let left = if k == 0 { 1 } else { max_bond };
            let right = if k == n - 1 { 1 } else { max_bond };
            sites.push(LocalState::new(left, w.dim().2, right, &mut rng));
        }
        sites.push(LocalState::empty());

        let mut ops: Vec<nd::Array4<A>> = Vec::with_capacity(n + 2);
        ops.push(nd::Array4::zeros((0, 0, 0, 0)));
        ops.extend(mpo.into_data());
        ops.push(nd::Array4::zeros((0, 0, 0, 0)));

        let mut dmrg = Self {
            n,
            config,
            rtol,
            atol,
            sites,
            ops,
            env: Environment::new(n),
            energy: A::Real::zero(),
            sweep_energies: Vec::new(),
        };
        for idx in (1..=n).rev() {
            dmrg.canonicalize_right_at(idx)?;
        }
        log::debug!("initialized {n}-site chain with maximum bond dimension {max_bond}");
        Ok(dmrg)
    }

    /// Return the number of real sites.
    pub fn n(&self) -> usize { self.n }

    /// Return the maximum bond dimension.
    pub fn max_bond(&self) -> usize { self.config.max_bond }

    /// Return the configuration used to create `self`.
    pub fn config(&self) -> &DMRGConfig { &self.config }

    /// Return the most recently recorded energy. This is zero until the first
    /// sweep iteration has completed.
    pub fn energy(&self) -> A::Real { self.energy }

    /// Return the energies recorded at the end of each sweep iteration, in
    /// order.
    pub fn sweep_energies(&self) -> &Vec<A::Real> { &self.sweep_energies }

    /// Return a reference to the local state at position `idx`, if it exists.
    pub fn site(&self, idx: usize) -> Option<&LocalState<A>> {
        self.sites.get(idx)
    }

    /// Return a reference to all local states, dummies included.
    pub fn sites(&self) -> &[LocalState<A>] { &self.sites }

    fn check_pos(&self, idx: usize) -> DMRGResult<()> {
        (1..=self.n).contains(&idx).then_some(()).ok_or(InvalidPosition(idx))
    }

    fn update_site(&mut self, idx: usize, data: nd::Array3<A>) {
        self.sites[idx].update(data);
        self.env.invalidate(idx);
    }

    /// Factorize the local state at `idx` so that it becomes left-canonical,
    /// keeping at most `max_bond` singular values, and absorb the remainder
    /// into the site on the right.
    ///
    /// At the last real site the remainder is a single number, the norm of
    /// the state, and is dropped. At a dummy position this is a no-op.
    pub fn canonicalize_left_at(&mut self, idx: usize) -> DMRGResult<()> {
        if idx == 0 || idx == self.n + 1 { return Ok(()); }
        self.check_pos(idx)?;
        let (l, p, _) = self.sites[idx].dims();
        let Svd { u, s, vh, rank, discarded }
            = self.sites[idx].truncate(Direction::Left, self.config.max_bond)?;
        log::trace!(
            "site {:2}: kept {rank} singular value(s), discarded weight {discarded:.3e}",
            idx - 1,
        );
        self.update_site(idx, reshaped(&u, (l, p, rank))?);
        if idx < self.n {
            let (r, p2, r2) = self.sites[idx + 1].dims();
            let svh: nd::Array2<A>
                = vh * &s.mapv(A::from_real).insert_axis(nd::Axis(1));
            let next: nd::Array2<A>
                = reshaped(self.sites[idx + 1].data(), (r, p2 * r2))?;
            let next = reshaped(&svh.dot(&next), (rank, p2, r2))?;
            self.update_site(idx + 1, next);
        }
        Ok(())
    }

    /// Factorize the local state at `idx` so that it becomes right-canonical,
    /// keeping at most `max_bond` singular values, and absorb the remainder
    /// into the site on the left.
    ///
    /// At the first real site the remainder is a single number, the norm of
    /// the state, and is dropped. At a dummy position this is a no-op.
    pub fn canonicalize_right_at(&mut self, idx: usize) -> DMRGResult<()> {
        if idx == 0 || idx == self.n + 1 { return Ok(()); }
        self.check_pos(idx)?;
        let (_, p, r) = self.sites[idx].dims();
        let Svd { u, s, vh, rank, discarded }
            = self.sites[idx].truncate(Direction::Right, self.config.max_bond)?;
        log::trace!(
            "site {:2}: kept {rank} singular value(s), discarded weight {discarded:.3e}",
            idx - 1,
        );
        self.update_site(idx, reshaped(&vh, (rank, p, r))?);
        if idx > 1 {
            let (l0, p0, l) = self.sites[idx - 1].dims();
            let us: nd::Array2<A>
                = u * &s.mapv(A::from_real).insert_axis(nd::Axis(0));
            let prev: nd::Array2<A>
                = reshaped(self.sites[idx - 1].data(), (l0 * p0, l))?;
            let prev = reshaped(&prev.dot(&us), (l0, p0, rank))?;
            self.update_site(idx - 1, prev);
        }
        Ok(())
    }

    /// Build the effective Hamiltonian for the local state at `idx` from the
    /// left environment at `idx - 1`, the operator tensor at `idx`, and the
    /// right environment at `idx + 1`.
    ///
    /// Rows and columns are indexed by the fused `(left, physical, right)`
    /// indices of the local state, in row-major order.
    pub fn effective_hamiltonian_at(&mut self, idx: usize)
        -> DMRGResult<nd::Array2<A>>
    {
        self.check_pos(idx)?;
        let (l, p, r) = self.sites[idx].dims();
        let (a, b, _, _) = self.ops[idx].dim();

        // [ bra, op, ket ] bonds on either side
        let lm: nd::Array3<A> = {
            let lenv = self.env.left_at(idx - 1, &self.sites, &self.ops)?;
            let (_, _, _, x, y, z) = lenv.dim();
            reshaped(lenv, (x, y, z))?
        };
        let rm: nd::Array3<A> = {
            let renv = self.env.right_at(idx + 1, &self.sites, &self.ops)?;
            let (x, y, z, _, _, _) = renv.dim();
            reshaped(renv, (x, y, z))?
        };
        if lm.dim() != (l, a, l) || rm.dim() != (r, b, r) {
            return Err(BondMismatch(idx));
        }

        // Σ_a L[l, a, l'] W[a, b, p, p'] -> [ l, l', b, p, p' ]
        let lm_mat: nd::Array2<A>
            = reshaped(&lm.permuted_axes([0, 2, 1]), (l * l, a))?;
        let w_mat: nd::Array2<A> = reshaped(&self.ops[idx], (a, b * p * p))?;
        let lw: nd::Array5<A> = reshaped(&lm_mat.dot(&w_mat), (l, l, b, p, p))?;

        // Σ_b (L W)[l, l', p, p', b] R[r, b, r'] -> [ l, l', p, p', r, r' ]
        let lw_mat: nd::Array2<A>
            = reshaped(&lw.permuted_axes([0, 1, 3, 4, 2]), (l * l * p * p, b))?;
        let rm_mat: nd::Array2<A>
            = reshaped(&rm.permuted_axes([1, 0, 2]), (b, r * r))?;
        let h: nd::Array6<A>
            = reshaped(&lw_mat.dot(&rm_mat), (l, l, p, p, r, r))?;

        let dim = l * p * r;
        Ok(reshaped(&h.permuted_axes([0, 2, 4, 1, 3, 5]), (dim, dim))?)
    }

    /// Replace the local state at `idx` with the ground state of its effective
    /// Hamiltonian, then canonicalize it in the direction `dir`.
    ///
    /// Returns the ground state energy of the effective Hamiltonian.
    pub fn solve_and_update(&mut self, idx: usize, dir: Direction)
        -> DMRGResult<A::Real>
    {
        let h = self.effective_hamiltonian_at(idx)?;
        let (l, p, r) = self.sites[idx].dims();
        // eigenvalues in ascending order
        let (evals, evecs) = h.eigh(UPLO::Lower)?;
        let ground: nd::Array3<A> = reshaped(&evecs.column(0), (l, p, r))?;
        self.update_site(idx, ground);
        match dir {
            Direction::Left => { self.canonicalize_left_at(idx)?; },
            Direction::Right => { self.canonicalize_right_at(idx)?; },
        }
        Ok(evals[0])
    }

    /// Perform a single sweep iteration: a pass from the first to the last
    /// site followed by a pass back.
    ///
    /// The final local energy is recorded and returned.
    pub fn sweep(&mut self) -> DMRGResult<A::Real> {
        let mut energy = A::Real::zero();
        log::info!(">>>>>>>>>> sweep from left to right >>>>>>>>>>");
        for idx in 1..=self.n {
            energy = self.solve_and_update(idx, Direction::Left)?;
            log::info!("site: {:2}, energy: {:.12}", idx - 1, energy);
        }
        log::info!("<<<<<<<<<< sweep from right to left <<<<<<<<<<");
        for idx in (1..=self.n).rev() {
            energy = self.solve_and_update(idx, Direction::Right)?;
            log::info!("site: {:2}, energy: {:.12}", idx - 1, energy);
        }
        self.sweep_energies.push(energy);
        self.energy = energy;
        Ok(energy)
    }

    // compare the last two recorded energies
    fn converged(&self) -> bool {
        let [.., prev, last] = self.sweep_energies.as_slice() else {
            return false;
        };
        let residual = Float::abs(*last - *prev);
        log::debug!("energy: {last:.12}, residual: {residual:.3e}");
        residual <= self.atol + self.rtol * Float::abs(*prev)
    }

    /// Perform sweep iterations until the energy converges, returning the
    /// converged ground state energy.
    ///
    /// At least two iterations are performed on every call. If
    /// [`DMRGConfig::max_sweeps`] is set, fails with
    /// [`DMRGError::NotConverged`] once that many iterations have passed
    /// without convergence.
    pub fn run(&mut self) -> DMRGResult<A::Real> {
        log::info!("********* naive DMRG for spin model *********");
        let mut count: usize = 0;
        loop {
            if self.config.max_sweeps.is_some_and(|m| count >= m) {
                return Err(NotConverged {
                    sweeps: count,
                    energy: <f64 as NumCast>::from(self.energy)
                        .unwrap_or(f64::NAN),
                });
            }
            count += 1;
            log::info!("*************** sweep: {count} ***************");
            self.sweep()?;
            if count >= 2 && self.converged() { break; }
        }
        log::info!("********** task finished in {count} sweep iterations **********");
        log::info!("ground state energy: {:.12}", self.energy);
        Ok(self.energy)
    }
}

// tolerances are floored at a few ulps of the working precision
fn tolerance<R: Float>(tol: f64) -> DMRGResult<R> {
    if tol.is_nan() || tol < 0.0 { return Err(InvalidTolerance(tol)); }
    let tol_r = <R as NumCast>::from(tol).ok_or(InvalidTolerance(tol))?;
    let ulps = <R as NumCast>::from(TOL_ULPS).ok_or(InvalidTolerance(tol))?;
    Ok(Float::max(tol_r, R::epsilon() * ulps))
}
