// Stable-fluids smoke solver

use std::mem;

use crate::ScalarField;
use crate::sim::{
    grid::{self, FieldKind},
    numeric,
};

/// Gauss-Seidel sweeps per diffusion pass unless overridden at construction.
pub const DEFAULT_DIFFUSION_SWEEPS: usize = 20;

/// Relaxation sweeps per projection Poisson solve unless overridden.
pub const DEFAULT_PROJECTION_SWEEPS: usize = 20;

/// Guards the normalization of the vorticity-magnitude gradient against a
/// near-zero length.
const CURL_GRADIENT_EPSILON: f32 = 1e-6;

/// Incompressible 2D fluid integrator: a density field advected and diffused
/// through a divergence-free velocity field, stepped with unconditionally
/// stable passes (implicit Gauss-Seidel diffusion, semi-Lagrangian advection,
/// Helmholtz-Hodge projection) plus vorticity confinement and buoyancy.
///
/// Single-threaded and synchronous: one driver alternates `simulate_step`
/// with accessor reads. The `frame_ready` flag is the one-bit new-data signal
/// for that driver; cross-thread use goes through the task runner instead.
pub struct FluidSolver {
    /// Interior cells per axis, fixed at construction
    res: usize,
    /// Density diffusion rate
    diffusion: f32,
    /// Velocity diffusion rate
    viscosity: f32,
    /// Vorticity confinement strength
    confinement: f32,
    /// Buoyancy coefficient
    buoyancy: f32,

    diffusion_sweeps: usize,
    projection_sweeps: usize,

    /// Active time-step size, seconds
    dt: f32,
    /// Accumulated simulation clock, seconds
    time: f64,

    d: ScalarField,
    d0: ScalarField,
    u: ScalarField,
    u0: ScalarField,
    v: ScalarField,
    v0: ScalarField,
    /// Vorticity magnitude scratch, used only by confinement
    curl: ScalarField,

    /// Injected deltas are waiting in `d0` for the next step
    pending_density: bool,
    /// Injected deltas are waiting in `u0`/`v0` for the next step
    pending_velocity: bool,

    /// Results of the last step have not been read yet
    fresh: bool,
}

impl FluidSolver {
    /// Allocate a solver with a zeroed `res` x `res` interior.
    ///
    /// # Panics
    ///
    /// Panics if `res` is zero.
    pub fn new(
        res: usize,
        diffusion: f32,
        viscosity: f32,
        confinement: f32,
        buoyancy: f32,
    ) -> Self {
        assert!(res > 0, "grid resolution must be positive");

        FluidSolver {
            res,
            diffusion,
            viscosity,
            confinement,
            buoyancy,
            diffusion_sweeps: DEFAULT_DIFFUSION_SWEEPS,
            projection_sweeps: DEFAULT_PROJECTION_SWEEPS,
            dt: 0.0,
            time: 0.0,
            d: grid::alloc_field(res),
            d0: grid::alloc_field(res),
            u: grid::alloc_field(res),
            u0: grid::alloc_field(res),
            v: grid::alloc_field(res),
            v0: grid::alloc_field(res),
            curl: grid::alloc_field(res),
            pending_density: false,
            pending_velocity: false,
            fresh: false,
        }
    }

    /// Fix the relaxation sweep budgets at construction time.
    pub fn with_sweeps(mut self, diffusion_sweeps: usize, projection_sweeps: usize) -> Self {
        self.diffusion_sweeps = diffusion_sweeps;
        self.projection_sweeps = projection_sweeps;
        self
    }

    /// Zero every field in place. Parameters and the simulation clock are
    /// preserved; no buffer is reallocated.
    pub fn reset(&mut self) {
        for field in [
            &mut self.d,
            &mut self.d0,
            &mut self.u,
            &mut self.u0,
            &mut self.v,
            &mut self.v0,
            &mut self.curl,
        ] {
            grid::fill(field, 0.0);
        }
        self.pending_density = false;
        self.pending_velocity = false;
        self.fresh = false;
    }

    pub fn resolution(&self) -> usize {
        self.res
    }

    /// Accumulated simulation time in seconds.
    pub fn clock(&self) -> f64 {
        self.time
    }

    pub fn density(&self, x: usize, y: usize) -> f32 {
        self.check_interior(x, y);
        self.d[(x, y)]
    }

    pub fn u(&self, x: usize, y: usize) -> f32 {
        self.check_interior(x, y);
        self.u[(x, y)]
    }

    pub fn v(&self, x: usize, y: usize) -> f32 {
        self.check_interior(x, y);
        self.v[(x, y)]
    }

    /// Write directly into the current density buffer. Repeated calls within
    /// one tick overwrite; use `add_density` to accumulate instead.
    pub fn set_density(&mut self, x: usize, y: usize, value: f32) {
        self.check_interior(x, y);
        self.d[(x, y)] = value;
    }

    pub fn set_u(&mut self, x: usize, y: usize, value: f32) {
        self.check_interior(x, y);
        self.u[(x, y)] = value;
    }

    pub fn set_v(&mut self, x: usize, y: usize, value: f32) {
        self.check_interior(x, y);
        self.v[(x, y)] = value;
    }

    /// Accumulate a density delta for the next step. Deltas land in the
    /// previous buffer, which holds stale scratch between steps, so the first
    /// injection of a tick clears it.
    pub fn add_density(&mut self, x: usize, y: usize, amount: f32) {
        self.check_interior(x, y);
        if !self.pending_density {
            grid::fill(&mut self.d0, 0.0);
            self.pending_density = true;
        }
        self.d0[(x, y)] += amount;
    }

    /// Accumulate a velocity delta for the next step.
    pub fn add_velocity(&mut self, x: usize, y: usize, du: f32, dv: f32) {
        self.check_interior(x, y);
        if !self.pending_velocity {
            grid::fill(&mut self.u0, 0.0);
            grid::fill(&mut self.v0, 0.0);
            self.pending_velocity = true;
        }
        self.u0[(x, y)] += du;
        self.v0[(x, y)] += dv;
    }

    /// Whether an unread step result is pending.
    pub fn frame_ready(&self) -> bool {
        self.fresh
    }

    /// Clear the readiness flag once the resulting fields have been read.
    pub fn mark_frame_consumed(&mut self) {
        self.fresh = false;
    }

    /// Current density buffer, ghost border included.
    pub fn density_field(&self) -> &ScalarField {
        &self.d
    }

    /// Current horizontal velocity buffer, ghost border included.
    pub fn u_field(&self) -> &ScalarField {
        &self.u
    }

    /// Current vertical velocity buffer, ghost border included.
    pub fn v_field(&self) -> &ScalarField {
        &self.v
    }

    /// Advance the simulation by one tick of `delta` seconds: the velocity
    /// field settles first, then density is transported through it.
    pub fn simulate_step(&mut self, delta: f32) {
        self.dt = delta;
        self.time += f64::from(delta);

        self.velocity_step();
        self.density_step();

        self.fresh = true;
    }

    fn velocity_step(&mut self) {
        let (sweeps, n) = (self.diffusion_sweeps, self.res);

        if mem::take(&mut self.pending_velocity) {
            self.u += &self.u0;
            self.v += &self.v0;
        }

        mem::swap(&mut self.u, &mut self.u0);
        numeric::diffuse(
            FieldKind::VelocityX,
            &mut self.u,
            &self.u0,
            self.viscosity,
            self.dt,
            sweeps,
            n,
        );
        mem::swap(&mut self.v, &mut self.v0);
        numeric::diffuse(
            FieldKind::VelocityY,
            &mut self.v,
            &self.v0,
            self.viscosity,
            self.dt,
            sweeps,
            n,
        );
        self.project();

        // After this swap the projected field lives in u0/v0; advecting the
        // components through that frozen copy keeps the two transports
        // consistent with each other.
        mem::swap(&mut self.u, &mut self.u0);
        mem::swap(&mut self.v, &mut self.v0);
        numeric::advect(
            FieldKind::VelocityX,
            &mut self.u,
            &self.u0,
            &self.u0,
            &self.v0,
            self.dt,
            n,
        );
        numeric::advect(
            FieldKind::VelocityY,
            &mut self.v,
            &self.v0,
            &self.u0,
            &self.v0,
            self.dt,
            n,
        );
        self.project();

        self.vorticity_confinement();
        self.buoyancy();
    }

    fn density_step(&mut self) {
        let (sweeps, n) = (self.diffusion_sweeps, self.res);

        if mem::take(&mut self.pending_density) {
            self.d += &self.d0;
        }

        mem::swap(&mut self.d, &mut self.d0);
        numeric::diffuse(
            FieldKind::Scalar,
            &mut self.d,
            &self.d0,
            self.diffusion,
            self.dt,
            sweeps,
            n,
        );
        mem::swap(&mut self.d, &mut self.d0);
        numeric::advect(
            FieldKind::Scalar,
            &mut self.d,
            &self.d0,
            &self.u,
            &self.v,
            self.dt,
            n,
        );
    }

    /// Strip the divergent component from the velocity field so it becomes
    /// approximately divergence-free (Helmholtz-Hodge decomposition): solve
    /// the discrete Poisson equation for a scalar potential whose gradient
    /// carries the divergence, then subtract that gradient.
    ///
    /// `u0` and `v0` double as the potential and divergence scratch buffers;
    /// callers swap or overwrite them right after, so nothing of value is
    /// lost.
    fn project(&mut self) {
        let n = self.res;
        let h = 1.0 / n as f32;

        for x in 1..=n {
            for y in 1..=n {
                self.v0[(x, y)] = -0.5
                    * h
                    * (self.u[(x + 1, y)] - self.u[(x - 1, y)] + self.v[(x, y + 1)]
                        - self.v[(x, y - 1)]);
                self.u0[(x, y)] = 0.0;
            }
        }
        grid::set_boundaries(FieldKind::Scalar, &mut self.v0, n);
        grid::set_boundaries(FieldKind::Scalar, &mut self.u0, n);

        numeric::linear_solver(
            FieldKind::Scalar,
            &mut self.u0,
            &self.v0,
            1.0,
            4.0,
            self.projection_sweeps,
            n,
        );

        for x in 1..=n {
            for y in 1..=n {
                self.u[(x, y)] -= 0.5 * (self.u0[(x + 1, y)] - self.u0[(x - 1, y)]) / h;
                self.v[(x, y)] -= 0.5 * (self.u0[(x, y + 1)] - self.u0[(x, y - 1)]) / h;
            }
        }
        grid::set_boundaries(FieldKind::VelocityX, &mut self.u, n);
        grid::set_boundaries(FieldKind::VelocityY, &mut self.v, n);
    }

    /// Re-inject the small-scale rotational energy that implicit diffusion
    /// and semi-Lagrangian advection smooth away: push velocity along the
    /// cross product of the normalized vorticity-magnitude gradient with the
    /// signed curl.
    fn vorticity_confinement(&mut self) {
        let n = self.res;

        for x in 1..=n {
            for y in 1..=n {
                self.curl[(x, y)] = numeric::curl_at(&self.u, &self.v, x, y).abs();
            }
        }

        // The magnitude gradient needs curl values one cell out, which only
        // exist for the inner interior.
        for x in 2..n {
            for y in 2..n {
                let mut grad_x = 0.5 * (self.curl[(x + 1, y)] - self.curl[(x - 1, y)]);
                let mut grad_y = 0.5 * (self.curl[(x, y + 1)] - self.curl[(x, y - 1)]);

                let length = (grad_x * grad_x + grad_y * grad_y).sqrt() + CURL_GRADIENT_EPSILON;
                grad_x /= length;
                grad_y /= length;

                let w = numeric::curl_at(&self.u, &self.v, x, y);
                self.u[(x, y)] += self.confinement * self.dt * (grad_y * -w);
                self.v[(x, y)] += self.confinement * self.dt * (grad_x * w);
            }
        }

        grid::set_boundaries(FieldKind::VelocityX, &mut self.u, n);
        grid::set_boundaries(FieldKind::VelocityY, &mut self.v, n);
    }

    /// Lift cells that are denser than the ambient mean, modeling hot smoke
    /// rising through cooler surroundings.
    fn buoyancy(&mut self) {
        let n = self.res;

        let mut ambient = 0.0;
        for x in 1..=n {
            for y in 1..=n {
                ambient += self.d[(x, y)];
            }
        }
        ambient /= (n * n) as f32;

        for x in 1..=n {
            for y in 1..=n {
                self.v[(x, y)] += self.buoyancy * self.dt * (self.d[(x, y)] - ambient);
            }
        }

        grid::set_boundaries(FieldKind::VelocityY, &mut self.v, n);
    }

    fn check_interior(&self, x: usize, y: usize) {
        debug_assert!(
            (1..=self.res).contains(&x) && (1..=self.res).contains(&y),
            "cell ({x}, {y}) outside the simulated interior 1..={}",
            self.res
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interior_total(solver: &FluidSolver) -> f32 {
        let n = solver.resolution();
        let mut total = 0.0;
        for x in 1..=n {
            for y in 1..=n {
                total += solver.density(x, y);
            }
        }
        total
    }

    #[test]
    fn reset_zeroes_every_interior_cell() {
        let mut solver = FluidSolver::new(8, 0.001, 0.001, 0.3, 0.1);

        for x in 1..=8 {
            for y in 1..=8 {
                solver.set_density(x, y, 2.5);
                solver.set_u(x, y, 1.0);
                solver.set_v(x, y, -1.0);
            }
        }
        solver.simulate_step(0.05);
        solver.reset();

        for x in 1..=8 {
            for y in 1..=8 {
                assert_eq!(solver.density(x, y), 0.0);
                assert_eq!(solver.u(x, y), 0.0);
                assert_eq!(solver.v(x, y), 0.0);
            }
        }
        assert!(!solver.frame_ready());
    }

    #[test]
    fn projection_drives_divergence_toward_zero() {
        const N: usize = 16;
        let mut solver = FluidSolver::new(N, 0.0, 0.0, 0.0, 0.0).with_sweeps(20, 60);

        // A smooth but decidedly non-solenoidal field
        for x in 1..=N {
            for y in 1..=N {
                solver.set_u(x, y, (x as f32 * 0.2).sin());
                solver.set_v(x, y, (y as f32 * 0.3).cos());
            }
        }
        grid::set_boundaries(FieldKind::VelocityX, &mut solver.u, N);
        grid::set_boundaries(FieldKind::VelocityY, &mut solver.v, N);

        let before = numeric::divergence(&solver.u, &solver.v, N).norm();
        solver.project();
        let after = numeric::divergence(&solver.u, &solver.v, N).norm();

        println!("divergence norm: {before} -> {after}");
        assert!(
            after < before * 0.25,
            "projection left too much divergence: {before} -> {after}"
        );
    }

    #[test]
    fn still_step_preserves_an_injected_cell() {
        let mut solver = FluidSolver::new(8, 0.0, 0.0, 0.0, 0.0);

        solver.set_density(4, 4, 5.0);
        solver.simulate_step(0.1);

        for x in 1..=8 {
            for y in 1..=8 {
                let expected = if (x, y) == (4, 4) { 5.0 } else { 0.0 };
                assert_eq!(solver.density(x, y), expected, "cell ({x}, {y})");
            }
        }
        assert!(solver.frame_ready());
    }

    #[test]
    fn diffusion_spreads_density_and_conserves_total() {
        let mut solver = FluidSolver::new(8, 0.001, 0.0, 0.0, 0.0);

        solver.set_density(4, 4, 100.0);
        let injected = interior_total(&solver);

        let mut last_neighbor = 0.0;
        for _ in 0..3 {
            solver.simulate_step(0.1);

            let neighbor = solver.density(5, 4);
            assert!(
                neighbor > last_neighbor,
                "neighbor density should keep rising: {last_neighbor} -> {neighbor}"
            );
            last_neighbor = neighbor;
        }

        let total = interior_total(&solver);
        assert!(
            (total - injected).abs() < 0.1,
            "interior density drifted: {injected} -> {total}"
        );
    }

    #[test]
    fn injected_deltas_accumulate_until_the_next_step() {
        let mut solver = FluidSolver::new(8, 0.0, 0.0, 0.0, 0.0);

        solver.add_density(3, 3, 1.0);
        solver.add_density(3, 3, 2.0);
        solver.simulate_step(0.1);
        assert_eq!(solver.density(3, 3), 3.0);

        // Consumed deltas must not leak into the following step
        solver.simulate_step(0.1);
        assert_eq!(solver.density(3, 3), 3.0);
    }

    #[test]
    #[should_panic(expected = "grid resolution must be positive")]
    fn zero_resolution_is_rejected() {
        FluidSolver::new(0, 0.0, 0.0, 0.0, 0.0);
    }
}
