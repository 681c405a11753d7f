use std::sync::mpsc;

use tracing::{info, warn};

use crate::{ScalarField, sim::numeric};

/// Frames between logged diagnostic lines.
const LOG_STRIDE: usize = 30;

/// Divergence norm above which a frame is flagged as suspicious.
const DIVERGENCE_WARN: f32 = 1.0;

#[derive(Clone)]
pub struct FrameSnapshot {
    pub density: ScalarField,
    pub velocity_x: ScalarField,
    pub velocity_y: ScalarField,
    pub i: usize,
    pub t: f32,
}

/// Receive frames until the solver hangs up, logging field health at a fixed
/// stride: total interior density, peak speed, and the interior divergence
/// norm left over by the finite projection sweeps.
pub fn diagnostics_loop(frames: mpsc::Receiver<FrameSnapshot>) {
    while let Ok(frame) = frames.recv() {
        let div_norm = divergence_norm(&frame);

        if div_norm > DIVERGENCE_WARN {
            warn!(
                "step {} t={:.2}s divergence norm {:.3e} exceeds {:.1}",
                frame.i, frame.t, div_norm, DIVERGENCE_WARN
            );
        }

        if frame.i % LOG_STRIDE != 0 {
            continue;
        }

        let n = frame.density.nrows() - 2;
        let mut total_density = 0.0;
        let mut peak_speed = 0.0f32;

        for x in 1..=n {
            for y in 1..=n {
                total_density += frame.density[(x, y)];
                let speed = (frame.velocity_x[(x, y)].powi(2)
                    + frame.velocity_y[(x, y)].powi(2))
                .sqrt();
                peak_speed = peak_speed.max(speed);
            }
        }

        info!(
            "step {:>5} t={:>7.2}s density={:>10.3} peak-speed={:.3} div-norm={:.3e}",
            frame.i, frame.t, total_density, peak_speed, div_norm
        );
    }
}

fn divergence_norm(frame: &FrameSnapshot) -> f32 {
    let n = frame.density.nrows() - 2;
    numeric::divergence(&frame.velocity_x, &frame.velocity_y, n).norm()
}
