use glam::{UVec3, Vec3};
use thiserror::Error;

/// Largest particle count the pipeline accepts.
///
/// Pair indices, cell keys and offsets are `u32` with `u32::MAX` reserved as a sentinel, and the
/// bitonic sorter pads to the next power of two.
pub const MAX_PARTICLES: u64 = 1 << 31;

/// Fluid constants for a simulation run. Handed to the scene once and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphParams {
    /// Particles per axis of the spawn lattice.
    pub num_to_spawn: UVec3,
    /// Extents of the bounding box, which is centred on the origin.
    pub box_size: Vec3,
    /// Lattice corner the spawn block grows from.
    pub spawn_center: Vec3,
    /// Radius of a particle. Also the smoothing radius `h`; hash cells are `2h` wide.
    pub particle_radius: f32,
    /// Random displacement of spawned particles, in multiples of the radius.
    pub spawn_jitter: f32,
    /// Fraction of the normal velocity kept after hitting a boundary, in `[0, 1]`.
    pub bound_damping: f32,
    pub viscosity: f32,
    pub particle_mass: f32,
    pub gas_constant: f32,
    /// Density subtracted in the equation of state. `0.0` gives `p = k * rho`.
    pub rest_density: f32,
    pub timestep: f32,
    /// Downward gravitational acceleration.
    pub gravity_y: f32,
    /// Seed for the spawn jitter.
    pub seed: u64,
}

impl Default for SphParams {
    fn default() -> Self {
        Self {
            num_to_spawn: UVec3::new(10, 10, 10),
            box_size: Vec3::new(4.0, 10.0, 3.0),
            spawn_center: Vec3::new(-0.9, -3.0, -0.9),
            particle_radius: 0.1,
            spawn_jitter: 0.2,
            bound_damping: 0.3,
            viscosity: 0.003,
            particle_mass: 1.0,
            gas_constant: 2.0,
            rest_density: 0.0,
            timestep: 0.007,
            gravity_y: 9.8,
            seed: 0,
        }
    }
}

impl SphParams {
    /// Number of particles the spawn lattice produces.
    pub fn particle_count(&self) -> usize {
        (self.num_to_spawn.x as usize) * (self.num_to_spawn.y as usize) * (self.num_to_spawn.z as usize)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_to_spawn.min_element() == 0 {
            return Err(ConfigError::EmptyLattice(self.num_to_spawn));
        }

        let count = self.num_to_spawn.x as u64 * self.num_to_spawn.y as u64 * self.num_to_spawn.z as u64;
        if count > MAX_PARTICLES {
            return Err(ConfigError::TooManyParticles { count, max: MAX_PARTICLES });
        }

        positive("particle_radius", self.particle_radius)?;
        positive("timestep", self.timestep)?;
        positive("box_size.x", self.box_size.x)?;
        positive("box_size.y", self.box_size.y)?;
        positive("box_size.z", self.box_size.z)?;
        non_negative("particle_mass", self.particle_mass)?;
        non_negative("spawn_jitter", self.spawn_jitter)?;

        if !(0.0..=1.0).contains(&self.bound_damping) {
            return Err(ConfigError::OutOfRange {
                name: "bound_damping",
                expected: "within [0, 1]",
                value: self.bound_damping,
            });
        }

        let finite = [
            ("spawn_center.x", self.spawn_center.x),
            ("spawn_center.y", self.spawn_center.y),
            ("spawn_center.z", self.spawn_center.z),
            ("viscosity", self.viscosity),
            ("gas_constant", self.gas_constant),
            ("rest_density", self.rest_density),
            ("gravity_y", self.gravity_y),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::OutOfRange { name, expected: "finite", value });
            }
        }

        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, expected: "finite and positive", value })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, expected: "finite and non-negative", value })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("spawn lattice {0} has an empty axis")]
    EmptyLattice(UVec3),
    #[error("a fluid needs at least one particle")]
    NoParticles,
    #[error("{count} particles exceed the supported maximum of {max}")]
    TooManyParticles { count: u64, max: u64 },
    #[error("`{name}` must be {expected}, got {value}")]
    OutOfRange { name: &'static str, expected: &'static str, value: f32 },
}
