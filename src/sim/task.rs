// Task runner for the solver thread

use std::{
    sync::mpsc,
    thread::{self, JoinHandle},
};

use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;

use crate::{
    observers::diagnostics::{self, FrameSnapshot},
    preprocessing::{SimulationInput, SourceSettings},
    sim::solver::FluidSolver,
};

pub struct SimulationOutput {
    pub temporal_map: Vec<f32>, // maps idx->timestamp
    pub total_density: f32,
    pub peak_speed: f32,
}

/// Drive the solver for the configured simulation time, handing each frame to
/// the diagnostics observer through a single-slot channel: the solver blocks
/// until the previous frame has been taken, so mutation and consumption
/// strictly alternate even across threads.
pub fn run_solver(input: &SimulationInput) -> SimulationOutput {
    let bar = ProgressBar::new(10_000);
    bar.set_style(
        ProgressStyle::with_template(
            "[Elapsed: {elapsed_precise}] [{bar:40.cyan/blue}] {percent}% (Remaining: {eta_precise})"
        )
        .unwrap()
        .progress_chars("##-"),
    );

    let mut solver = FluidSolver::new(
        input.resolution,
        input.diffusion,
        input.viscosity,
        input.confinement,
        input.buoyancy,
    )
    .with_sweeps(input.diffusion_sweeps, input.projection_sweeps);

    let (sender, receiver) = mpsc::sync_channel::<FrameSnapshot>(1);
    let observer = thread::spawn(move || diagnostics::diagnostics_loop(receiver));

    let mut rng = rand::rng();
    let steps = (input.simulation_time / input.timestep).ceil() as usize;
    let mut temporal_map: Vec<f32> = Vec::with_capacity(steps);

    for i in 0..steps {
        if let Some(source) = &input.source {
            inject_source(&mut solver, source, &mut rng);
        }

        solver.simulate_step(input.timestep);
        debug_assert!(solver.frame_ready());

        sender
            .send(FrameSnapshot {
                density: solver.density_field().clone(),
                velocity_x: solver.u_field().clone(),
                velocity_y: solver.v_field().clone(),
                i,
                t: solver.clock() as f32,
            })
            .expect("diagnostics observer disconnected");
        solver.mark_frame_consumed();

        temporal_map.push(solver.clock() as f32);

        let progress = ((solver.clock() as f32 / input.simulation_time) * 10_000.0).round() as u64;
        bar.set_position(progress);
    }

    drop(sender);
    observer.join().expect("diagnostics observer panicked");
    bar.finish();

    summarize(&solver, temporal_map)
}

/// Spawns the simulation thread and starts the solver task
pub fn spawn_sim_thread(input: SimulationInput) -> JoinHandle<SimulationOutput> {
    thread::spawn(move || run_solver(&input))
}

/// Feed the configured emitter into the solver through its delta-accumulation
/// interface, perturbed the same way each tick.
fn inject_source(solver: &mut FluidSolver, source: &SourceSettings, rng: &mut impl Rng) {
    let noise: f32 = if source.jitter > 0.0 {
        rng.random_range(0.0..source.jitter)
    } else {
        0.0
    };

    solver.add_density(source.x, source.y, source.density * (1.0 + noise));
    solver.add_velocity(
        source.x,
        source.y,
        source.velocity.0 * (1.0 + noise),
        source.velocity.1 * (1.0 + noise),
    );
}

fn summarize(solver: &FluidSolver, temporal_map: Vec<f32>) -> SimulationOutput {
    let n = solver.resolution();
    let mut total_density = 0.0;
    let mut peak_speed = 0.0f32;

    for x in 1..=n {
        for y in 1..=n {
            total_density += solver.density(x, y);
            let speed = (solver.u(x, y).powi(2) + solver.v(x, y).powi(2)).sqrt();
            peak_speed = peak_speed.max(speed);
        }
    }

    SimulationOutput {
        temporal_map,
        total_density,
        peak_speed,
    }
}
