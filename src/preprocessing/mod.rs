use serde::{Deserialize, Serialize};
use tracing::info;

pub mod cli;

/// A density/velocity emitter the task runner drives into the solver each
/// tick through the delta-accumulation interface.
#[derive(Serialize, Deserialize, Clone)]
pub struct SourceSettings {
    pub x: usize,
    pub y: usize,
    pub density: f32,
    pub velocity: (f32, f32),
    /// Upper bound of the per-tick multiplicative perturbation
    pub jitter: f32,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SimulationInput {
    pub resolution: usize,
    pub timestep: f32,
    pub simulation_time: f32,
    pub diffusion: f32,
    pub viscosity: f32,
    pub confinement: f32,
    pub buoyancy: f32,
    pub diffusion_sweeps: usize,
    pub projection_sweeps: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceSettings>,
}

impl SimulationInput {
    pub fn log(&self) {
        info!(
            "Simulation is shown below:\n\n\
        \t resolution:  {} x {} cells\n\
        \t timestep:    {} s\n\
        \t time range:  {} s\n\
        \t diffusion:   {}\n\
        \t viscosity:   {}\n\
        \t confinement: {}\n\
        \t buoyancy:    {}\n\
        \t sweeps:      {} diffusion / {} projection\n\n\
        ",
            self.resolution,
            self.resolution,
            self.timestep,
            self.simulation_time,
            self.diffusion,
            self.viscosity,
            self.confinement,
            self.buoyancy,
            self.diffusion_sweeps,
            self.projection_sweeps,
        );

        match &self.source {
            Some(source) => {
                let source_str = serde_json::to_string_pretty(source).unwrap();
                info!("Source parameters are:\n\n{}", source_str);
            }
            None => info!("No source configured; fields evolve from their initial state."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_save_load() {
        let original = SimulationInput {
            resolution: 96,
            timestep: 0.02,
            simulation_time: 4.0,
            diffusion: 0.0001,
            viscosity: 0.00005,
            confinement: 0.25,
            buoyancy: 0.12,
            diffusion_sweeps: 20,
            projection_sweeps: 40,
            source: Some(SourceSettings {
                x: 48,
                y: 24,
                density: 100.0,
                velocity: (0.0, 2.0),
                jitter: 0.1,
            }),
        };

        let serialized = serde_json::to_string_pretty(&original).unwrap();

        println!("Serialized input:\n\n{serialized}");

        let deserialized: SimulationInput = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.resolution, original.resolution);
        assert_eq!(deserialized.timestep, original.timestep);
        assert_eq!(deserialized.projection_sweeps, original.projection_sweeps);

        let source = deserialized.source.expect("source should survive the trip");
        assert_eq!(source.x, 48);
        assert_eq!(source.velocity, (0.0, 2.0));
    }
}
