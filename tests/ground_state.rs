use approx::{ assert_abs_diff_eq, assert_relative_eq };
use ndarray_linalg::{ Eigh, UPLO };
use num_complex::Complex64 as C64;
use naive_dmrg::{
    dmrg::{ DMRG, DMRGConfig },
    models,
    mpo::MPO,
};

fn config(max_bond: usize) -> DMRGConfig {
    DMRGConfig::new(max_bond).seed(10546).max_sweeps(100)
}

fn exact_ground_energy(mpo: &MPO<f64>) -> f64 {
    let (e, _) = mpo.contract().eigh(UPLO::Lower).unwrap();
    e[0]
}

fn dmrg_ground_energy(mpo: MPO<f64>, max_bond: usize) -> f64 {
    run_with(mpo, config(max_bond))
}

fn run_with(mpo: MPO<f64>, config: DMRGConfig) -> f64 {
    let mut dmrg = DMRG::new(mpo, config).unwrap();
    let energy = dmrg.run().unwrap();
    assert!(dmrg.sweep_energies().len() >= 2);
    assert_eq!(dmrg.energy(), energy);
    energy
}

#[test]
fn classical_ising_at_minimal_bond() {
    let mpo: MPO<f64> = MPO::new(models::ising(1.0, 0.0), 4, false).unwrap();
    let energy = dmrg_ground_energy(mpo, 1);
    assert_abs_diff_eq!(energy, -0.75, epsilon = 1e-10);
}

#[test]
fn classical_ising_at_full_bond() {
    let mpo: MPO<f64> = MPO::new(models::ising(1.0, 0.0), 4, false).unwrap();
    assert_abs_diff_eq!(exact_ground_energy(&mpo), -0.75, epsilon = 1e-12);
    let energy = dmrg_ground_energy(mpo, 4);
    assert_abs_diff_eq!(energy, -0.75, epsilon = 1e-10);
}

#[test]
fn zero_couplings_give_zero_energy() {
    let mpo: MPO<f64> = MPO::new(models::ising(0.0, 0.0), 5, false).unwrap();
    assert_abs_diff_eq!(dmrg_ground_energy(mpo, 3), 0.0, epsilon = 1e-12);
    let mpo: MPO<f64> = MPO::new(models::heisenberg(0.0, 0.0, 0.0), 4, false).unwrap();
    assert_abs_diff_eq!(dmrg_ground_energy(mpo, 2), 0.0, epsilon = 1e-12);
}

#[test]
fn transverse_ising_matches_exact() {
    let mpo: MPO<f64> = MPO::new(models::ising(1.0, 1.0), 6, false).unwrap();
    let exact = exact_ground_energy(&mpo);
    let energy = dmrg_ground_energy(mpo, 8);
    assert_abs_diff_eq!(energy, exact, epsilon = 1e-9);
}

#[test]
fn heisenberg_matches_exact() {
    let mpo: MPO<f64> = MPO::new(models::heisenberg(1.0, 1.0, 0.0), 6, false).unwrap();
    let exact = exact_ground_energy(&mpo);
    let energy = dmrg_ground_energy(mpo, 8);
    assert_abs_diff_eq!(energy, exact, epsilon = 1e-9);

    let mpo: MPO<f64> = MPO::new(models::heisenberg(1.0, 0.5, 0.1), 6, false).unwrap();
    let exact = exact_ground_energy(&mpo);
    let energy = dmrg_ground_energy(mpo, 8);
    assert_abs_diff_eq!(energy, exact, epsilon = 1e-9);
}

#[test]
fn truncated_bond_is_variational() {
    // bond dimension 2 cannot represent the exact ground state of 8 sites, but
    // the energy can never fall below it
    let mpo: MPO<f64> = MPO::new(models::heisenberg(1.0, 1.0, 0.0), 8, false).unwrap();
    let exact = exact_ground_energy(&mpo);
    let config = DMRGConfig::new(2).seed(10546).rtol(1e-8).atol(1e-8).max_sweeps(500);
    let energy = run_with(mpo, config);
    assert!(energy >= exact - 1e-10);
    assert!(energy < 0.0);
}

#[test]
fn averaged_energy_is_per_site() {
    let total: MPO<f64> = MPO::new(models::ising(1.0, 0.5), 6, false).unwrap();
    let exact = exact_ground_energy(&total);
    let averaged: MPO<f64> = MPO::new(models::ising(1.0, 0.5), 6, true).unwrap();
    let energy = dmrg_ground_energy(averaged, 8);
    assert_relative_eq!(energy, exact / 6.0, max_relative = 1e-9);
}

#[test]
fn complex_ising_matches_real() {
    let real: MPO<f64> = MPO::new(models::ising(1.0, 0.5), 4, false).unwrap();
    let exact = exact_ground_energy(&real);
    let mpo: MPO<C64> = MPO::new(models::ising(1.0, 0.5), 4, false).unwrap();
    let mut dmrg = DMRG::new(mpo, config(4)).unwrap();
    let energy: f64 = dmrg.run().unwrap();
    assert_abs_diff_eq!(energy, exact, epsilon = 1e-9);
}

#[test]
fn seeded_runs_are_reproducible() {
    let run = || {
        let mpo: MPO<f64> = MPO::new(models::ising(1.0, 0.7), 5, false).unwrap();
        let mut dmrg = DMRG::new(mpo, config(4)).unwrap();
        dmrg.run().unwrap();
        dmrg.sweep_energies().clone()
    };
    let (a, b) = (run(), run());
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter())
        .for_each(|(ea, eb)| { assert_abs_diff_eq!(*ea, *eb, epsilon = 1e-12); });
}

#[test]
fn single_precision_converges_with_default_tolerances() {
    let real: MPO<f64> = MPO::new(models::ising(1.0, 0.5), 4, false).unwrap();
    let exact = exact_ground_energy(&real);
    let mpo: MPO<f32> = MPO::new(models::ising(1.0, 0.5), 4, false).unwrap();
    let mut dmrg = DMRG::new(mpo, config(4)).unwrap();
    let energy: f32 = dmrg.run().unwrap();
    assert_abs_diff_eq!(energy as f64, exact, epsilon = 1e-4);
}
