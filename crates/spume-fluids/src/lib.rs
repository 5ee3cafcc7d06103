use glam::Vec3;
use obstacle::ObstacleSet;
use thiserror::Error;

pub mod dispatch;
pub mod grid;
pub mod hash;
pub mod kernels;
pub mod obstacle;
pub mod offsets;
pub mod params;
pub mod particle;
pub mod scene;
pub mod sort;
pub mod sph;

pub trait Fluid {
    type Params;

    /// Advances the fluid by `dt` inside a box of extents `box_size` centred on the origin.
    fn step(&mut self, dt: f32, params: &Self::Params, box_size: Vec3, obstacles: &ObstacleSet) -> Result<(), StepError>;
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StepError {
    #[error("particle {particle} has a non-finite position or velocity")]
    Diverged { particle: usize },
}
