use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::PathBuf,
    process::exit,
};

use clap::Parser;
use tracing::{error, info};

use crate::preprocessing::{SimulationInput, SourceSettings};

// Raw, CLI input
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    #[arg(long, help = "An input file with pre-loaded parameters.")]
    input_json: Option<PathBuf>,

    #[arg(long, help = "Optional path to save the resolved input file to.")]
    input_json_savepath: Option<PathBuf>,

    #[arg(short, long, default_value = "128", help = "Grid cells per axis.")]
    resolution: usize,

    #[arg(long, default_value = "0.016", help = "Seconds advanced per tick.")]
    timestep: f32,

    #[arg(short, long, default_value = "10", help = "Simulation time in seconds.")]
    simtime: f32,

    #[arg(long, default_value = "0.0001", help = "Density diffusion rate.")]
    diffusion: f32,

    #[arg(long, default_value = "0.0001", help = "Velocity diffusion rate.")]
    viscosity: f32,

    #[arg(long, default_value = "0.3", help = "Vorticity confinement strength.")]
    confinement: f32,

    #[arg(long, default_value = "0.15", help = "Buoyancy coefficient.")]
    buoyancy: f32,

    #[arg(long, default_value = "20", help = "Gauss-Seidel sweeps per diffusion pass.")]
    diffusion_sweeps: usize,

    #[arg(long, default_value = "20", help = "Relaxation sweeps per projection solve.")]
    projection_sweeps: usize,

    #[arg(long, help = "Source cell x (defaults to the grid center).")]
    source_x: Option<usize>,

    #[arg(long, help = "Source cell y (defaults to the lower quarter).")]
    source_y: Option<usize>,

    #[arg(long, default_value = "100.0", help = "Density injected per tick.")]
    source_density: f32,

    #[arg(long, default_value = "0.0", help = "Source velocity impulse, x component.")]
    source_velocity_x: f32,

    #[arg(long, default_value = "2.0", help = "Source velocity impulse, y component.")]
    source_velocity_y: f32,

    #[arg(long, default_value = "0.1", help = "Per-tick source perturbation bound.")]
    source_jitter: f32,

    #[arg(long, default_value = "false", help = "Run without any source emitter.")]
    no_source: bool,
}

impl CliArgs {
    pub fn build_input(&self) -> SimulationInput {
        // if the input file is supplied, just use that
        if let Some(input_filepath) = &self.input_json {
            if !input_filepath.exists() {
                error!("Input file {:?} does not exist.", input_filepath);
                exit(1);
            }
            if input_filepath.is_dir() {
                error!("Input file {:?} is a directory.", input_filepath);
                exit(1);
            }

            info!(
                "Using input file {}",
                input_filepath.to_str().unwrap_or("<unknown>")
            );

            let input_file = File::open(input_filepath)
                .inspect_err(|err| {
                    error!("Failed to open input file: {:?}", err);
                    exit(1);
                })
                .unwrap();

            let reader = BufReader::new(input_file);
            let loaded_input: SimulationInput = serde_json::from_reader(reader)
                .inspect_err(|err| {
                    error!("Failed to deserialize input file: {:?}", err);
                    exit(1);
                })
                .unwrap();

            return self.validate(loaded_input);
        }

        // otherwise, build the input from the other arguments
        let source = (!self.no_source).then(|| SourceSettings {
            x: self.source_x.unwrap_or(self.resolution / 2),
            y: self.source_y.unwrap_or((self.resolution / 4).max(1)),
            density: self.source_density,
            velocity: (self.source_velocity_x, self.source_velocity_y),
            jitter: self.source_jitter,
        });

        let input = SimulationInput {
            resolution: self.resolution,
            timestep: self.timestep,
            simulation_time: self.simtime,
            diffusion: self.diffusion,
            viscosity: self.viscosity,
            confinement: self.confinement,
            buoyancy: self.buoyancy,
            diffusion_sweeps: self.diffusion_sweeps,
            projection_sweeps: self.projection_sweeps,
            source,
        };

        self.validate(input)
    }

    /// Reject inputs the solver would fail fast on and clamp the source cell
    /// into the simulated interior, the way an interactive caller would.
    fn validate(&self, mut input: SimulationInput) -> SimulationInput {
        if input.resolution == 0 {
            error!("Grid resolution must be positive.");
            exit(1);
        }
        if input.timestep <= 0.0 || input.simulation_time <= 0.0 {
            error!("Timestep and simulation time must both be positive.");
            exit(1);
        }

        if let Some(source) = &mut input.source {
            source.x = source.x.clamp(1, input.resolution);
            source.y = source.y.clamp(1, input.resolution);
        }

        if let Some(savepath) = &self.input_json_savepath {
            let save_file = File::create(savepath)
                .inspect_err(|err| {
                    error!("Failed to create input savepath: {:?}", err);
                    exit(1);
                })
                .unwrap();

            serde_json::to_writer_pretty(BufWriter::new(save_file), &input)
                .inspect_err(|err| error!("Failed to serialize input file: {:?}", err))
                .ok();

            info!("Saved resolved input to {:?}", savepath);
        }

        input
    }
}
