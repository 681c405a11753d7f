// Contains post-processors summarizing simulation results

use tracing::info;

use crate::{preprocessing::SimulationInput, sim::task::SimulationOutput};

pub fn report(input: &SimulationInput, output: &SimulationOutput) {
    let steps = output.temporal_map.len();
    let simulated = output.temporal_map.last().copied().unwrap_or(0.0);

    info!(
        "Completed {} solver steps covering {:.2}s of simulation time (target {:.2}s)",
        steps, simulated, input.simulation_time
    );
    info!(
        "Final interior density {:.3}, peak speed {:.3}",
        output.total_density, output.peak_speed
    );
}
