use clap::Parser;

extern crate nalgebra as na;

mod observers;
mod postprocessing;
mod preprocessing;
mod sim;

use na::DMatrix;

/// A scalar quantity sampled over the padded simulation grid: an N x N
/// interior wrapped in a one-cell ghost border, so every buffer is
/// (N + 2) x (N + 2). Interior cells are addressed 1..=N on each axis.
type ScalarField = DMatrix<f32>;

fn main() {
    tracing_subscriber::fmt::init();

    let args = preprocessing::cli::CliArgs::parse();
    let input = args.build_input();
    input.log();

    let handle = sim::task::spawn_sim_thread(input.clone());
    let output = handle.join().expect("solver thread panicked");

    postprocessing::report(&input, &output);
}
