use glam::Vec3;
use thiserror::Error;

use crate::{
    dispatch::Dispatch,
    obstacle::{Obstacle, ObstacleId, ObstacleSet},
    params::{ConfigError, SphParams},
    sph::SphFluid,
    Fluid, StepError,
};

pub type SphScene<X> = Scene<SphFluid<X>, SphParams>;

pub struct Scene<F, P> {
    /// The fluid for this scene.
    pub fluid: F,
    /// The parameters for this scene's fluid.
    params: P,
    /// Extents of the bounding box, centred on the origin.
    box_size: Vec3,
    /// The obstacles in this scene.
    obstacles: ObstacleSet,
    /// The number of obstacles (used for IDs).
    n_obstacles: usize,
    /// Steps taken so far.
    steps: u64,
}

impl<F: Fluid<Params = P>, P> Scene<F, P> {
    #[inline(always)]
    pub fn new(fluid: F, params: P, box_size: Vec3) -> Self {
        Self {
            params,
            fluid,
            box_size,
            obstacles: ObstacleSet::default(),
            n_obstacles: 0,
            steps: 0,
        }
    }

    #[inline(always)]
    pub fn params(&self) -> &P {
        &self.params
    }

    #[inline(always)]
    pub fn box_size(&self) -> Vec3 {
        self.box_size
    }

    /// Resizes the bounding box. Takes effect on the next step.
    pub fn set_box_size(&mut self, box_size: Vec3) {
        self.box_size = box_size;
    }

    #[inline(always)]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    /// Adds an obstacle to the set, returning its ID.
    pub fn add_obstacle<T: Obstacle + 'static>(&mut self, obstacle: T) -> ObstacleId {
        let i = self.n_obstacles;
        self.n_obstacles += 1;

        self.obstacles.obstacles.insert(i, Box::new(obstacle));
        ObstacleId(i)
    }

    /// Removes an obstacle from the set, given its ID.
    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Option<Box<dyn Obstacle>> {
        self.obstacles.obstacles.remove(&id.0)
    }

    /// Insert an obstacle into the set at the given ID, overriding and returning the old value if
    /// it was previously in the set.
    pub fn insert_obstacle<T: Obstacle + 'static>(&mut self, id: ObstacleId, obstacle: T) -> Option<Box<dyn Obstacle>> {
        self.obstacles.obstacles.insert(id.0, Box::new(obstacle))
    }

    pub fn step(&mut self, dt: f32) -> Result<(), SceneError> {
        let result = self.fluid.step(
            dt,
            &self.params,
            self.box_size,
            &self.obstacles,
        );
        let step = self.steps;
        self.steps += 1;

        result.map_err(|source| {
            log::error!("step {step} failed: {source}");
            SceneError::Step { step, source }
        })
    }
}

impl<X: Dispatch> Scene<SphFluid<X>, SphParams> {
    /// Spawns the fluid described by `params` inside its initial box.
    pub fn from_params(params: SphParams, dispatch: X) -> Result<Self, ConfigError> {
        let fluid = SphFluid::spawn(&params, dispatch)?;
        Ok(Scene::new(fluid, params, params.box_size))
    }

    /// Steps by the configured timestep.
    pub fn advance(&mut self) -> Result<(), SceneError> {
        self.step(self.params.timestep)?;

        if log::log_enabled!(log::Level::Debug) {
            let stats = self.fluid.stats();
            log::debug!(
                "step {}: density {:.3}..{:.3}, max speed {:.3}",
                self.steps,
                stats.min_density,
                stats.max_density,
                stats.max_speed,
            );
        }

        Ok(())
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    #[error("simulation failed at step {step}")]
    Step {
        step: u64,
        #[source]
        source: StepError,
    },
}

#[cfg(test)]
mod tests {
    use glam::UVec3;

    use crate::{dispatch::Serial, obstacle::sphere::Sphere};

    use super::*;

    fn small_params() -> SphParams {
        SphParams {
            num_to_spawn: UVec3::new(3, 3, 3),
            spawn_center: Vec3::splat(-0.2),
            ..Default::default()
        }
    }

    #[test]
    fn test_obstacle_ids() {
        let mut scene = SphScene::from_params(small_params(), Serial::default()).unwrap();
        let a = scene.add_obstacle(Sphere::new(Vec3::ZERO, 1.0));
        let b = scene.add_obstacle(Sphere::new(Vec3::ONE, 1.0));
        assert_ne!(a, b);
        assert_eq!(scene.obstacles().len(), 2);

        assert!(scene.insert_obstacle(a, Sphere::new(Vec3::X, 0.5)).is_some());
        assert!(scene.remove_obstacle(b).is_some());
        assert!(scene.remove_obstacle(b).is_none());
        assert_eq!(scene.obstacles().len(), 1);
    }

    #[test]
    fn test_steps_are_counted() {
        let mut scene = SphScene::from_params(small_params(), Serial::default()).unwrap();
        for _ in 0..3 {
            scene.advance().unwrap();
        }
        assert_eq!(scene.steps(), 3);
        assert_eq!(scene.fluid.len(), 27);
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let params = SphParams { particle_radius: -1.0, ..small_params() };
        assert!(SphScene::from_params(params, Serial::default()).is_err());
    }

    #[test]
    fn test_box_resize_applies_next_step() {
        let mut scene = SphScene::from_params(small_params(), Serial::default()).unwrap();
        scene.set_box_size(Vec3::splat(0.2));
        scene.advance().unwrap();

        for p in scene.fluid.particles().positions() {
            assert!(p.abs().max_element() <= 0.1 + 1e-6);
        }
    }
}
