use glam::Vec3;

use crate::{
    dispatch::Dispatch,
    grid::NeighborGrid,
    kernels::SphKernels,
    obstacle::ObstacleSet,
    params::{ConfigError, SphParams},
    particle::ParticleStore,
    Fluid, StepError,
};

mod density;
mod force;
mod integrate;

/// A particle fluid advanced with smoothed particle hydrodynamics.
///
/// One step runs the stages
///
/// 1. hash particles into cell keys,
/// 2. bitonic-sort the pairs by key,
/// 3. record where each key's run starts,
/// 4. accumulate density and pressure,
/// 5. accumulate pressure, viscosity and gravity forces,
/// 6. integrate and resolve collisions,
///
/// each as one or more dispatches on `X`. A stage starts only after the previous one returned.
#[derive(Debug)]
pub struct SphFluid<X> {
    particles: ParticleStore,
    grid: NeighborGrid,
    kernels: SphKernels,
    dispatch: X,
}

impl<X: Dispatch> SphFluid<X> {
    /// Wraps existing particles. `particle_radius` is the smoothing radius for the fluid's
    /// lifetime.
    pub fn new(particles: ParticleStore, particle_radius: f32, dispatch: X) -> Result<Self, ConfigError> {
        if !(particle_radius.is_finite() && particle_radius > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "particle_radius",
                expected: "finite and positive",
                value: particle_radius,
            });
        }

        let grid = NeighborGrid::new(particles.len(), particle_radius)?;

        log::info!(
            "fluid with {} particles (sort buffer {}, {} groups of {})",
            particles.len(),
            grid.padded_len(),
            dispatch.groups(particles.len()),
            dispatch.group_size(),
        );

        Ok(Self {
            particles,
            grid,
            kernels: SphKernels::new(particle_radius),
            dispatch,
        })
    }

    /// Spawns the lattice described by `params`.
    pub fn spawn(params: &SphParams, dispatch: X) -> Result<Self, ConfigError> {
        params.validate()?;
        Self::new(ParticleStore::spawn(params), params.particle_radius, dispatch)
    }

    #[inline(always)]
    pub fn particles(&self) -> &ParticleStore {
        &self.particles
    }

    #[inline(always)]
    pub fn grid(&self) -> &NeighborGrid {
        &self.grid
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particle_radius(&self) -> f32 {
        self.kernels.h()
    }

    /// Runs the hash, sort and offset stages on the current positions.
    pub fn rebuild_grid(&mut self) {
        self.grid.rebuild(&self.dispatch, &self.particles.positions);
    }

    /// Particles within the smoothing radius of particle `i`, excluding `i`. Uses the grid as of
    /// the last [`SphFluid::rebuild_grid`] or step.
    pub fn neighbors(&self, i: usize) -> Vec<usize> {
        let positions = &self.particles.positions;
        let p = positions[i];
        let mut neighbors = Vec::new();

        self.grid.for_each_candidate(p, |j| {
            if j != i && p.distance_squared(positions[j]) <= self.kernels.h2() {
                neighbors.push(j);
            }
        });

        neighbors
    }

    pub fn stats(&self) -> FluidStats {
        let mut stats = FluidStats {
            min_density: f32::MAX,
            max_density: 0.0,
            max_speed: 0.0,
        };

        for (_, v, &density) in self.particles.iter_particles() {
            stats.min_density = stats.min_density.min(density);
            stats.max_density = stats.max_density.max(density);
            stats.max_speed = stats.max_speed.max(v.length());
        }

        stats
    }
}

impl<X: Dispatch> Fluid for SphFluid<X> {
    type Params = SphParams;

    fn step(&mut self, dt: f32, params: &Self::Params, box_size: Vec3, obstacles: &ObstacleSet) -> Result<(), StepError> {
        if let Some(particle) = self.particles.first_non_finite() {
            return Err(StepError::Diverged { particle });
        }

        self.rebuild_grid();
        self.compute_density_pressure(params.particle_mass, params.gas_constant, params.rest_density);
        self.compute_forces(params.particle_mass, params.viscosity, params.gravity_y);
        self.integrate(dt, params.bound_damping, box_size, obstacles);

        match self.particles.first_non_finite() {
            Some(particle) => Err(StepError::Diverged { particle }),
            None => Ok(()),
        }
    }
}

/// Summary of the fluid state, for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidStats {
    pub min_density: f32,
    pub max_density: f32,
    pub max_speed: f32,
}
