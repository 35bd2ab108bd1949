//! Ground state of the transverse-field Ising chain,
//!
//!   H = -J Σ_k Sz_k Sz_{k+1} - h Σ_k Sx_k

use clap::Parser;
use itertools::Itertools;
use naive_dmrg::{
    dmrg::{ DMRG, DMRGConfig },
    models,
    mpo::MPO,
};

#[derive(Parser, Debug)]
#[command(name = "ising")]
#[command(about = "Naive DMRG ground state search for the transverse-field Ising chain")]
struct Args {
    /// Number of sites
    #[arg(short, long, default_value_t = 10)]
    n: usize,

    /// Maximum bond dimension
    #[arg(short = 'm', long, default_value_t = 50)]
    max_bond: usize,

    /// Spin-spin coupling strength
    #[arg(short, long, default_value_t = 1.0, allow_negative_numbers = true)]
    j: f64,

    /// Transverse field strength
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    h: f64,

    /// Report the energy per site instead of the total energy
    #[arg(short, long)]
    averaged: bool,

    /// Stop with an error after this many sweep iterations
    #[arg(long)]
    max_sweeps: Option<usize>,

    /// Seed for the random initial state
    #[arg(short, long)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();
    let args = Args::parse();

    let mpo: MPO<f64> = MPO::new(models::ising(args.j, args.h), args.n, args.averaged)?;
    let mut config = DMRGConfig::new(args.max_bond);
    if let Some(m) = args.max_sweeps { config = config.max_sweeps(m); }
    if let Some(s) = args.seed { config = config.seed(s); }
    let mut dmrg = DMRG::new(mpo, config)?;
    let energy = dmrg.run()?;
    println!(
        "sweep energies: [{}]",
        dmrg.sweep_energies().iter().map(|e| format!("{e:.12}")).join(", "),
    );
    println!("--> DMRG energy: {energy:.12}");
    Ok(())
}
