use glam::Vec3;
use indicatif::{style::TemplateError, ProgressBar, ProgressIterator, ProgressStyle};
use spume_fluids::{
    dispatch::{Dispatch, DispatchError},
    obstacle::{sphere::Sphere, ObstacleId},
    params::{ConfigError, SphParams},
    scene::{SceneError, SphScene},
};
use spume_io::encode::{EncodingError, FluidDataEncoder};
use thiserror::Error;

/// The box never gets narrower than this along x.
pub const MIN_BOX_WIDTH: f32 = 2.0;

/// Scripted stand-in for an interactive controller. Applied once before every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controller {
    /// Change in box width per step.
    pub box_rate: f32,
    pub sphere: Option<Sphere>,
    /// Sphere displacement per step.
    pub sphere_velocity: Vec3,
}

impl Controller {
    /// Adds the sphere to the scene, returning its ID.
    pub fn attach<X: Dispatch>(&self, scene: &mut SphScene<X>) -> Option<ObstacleId> {
        self.sphere.map(|sphere| scene.add_obstacle(sphere))
    }

    pub fn update<X: Dispatch>(&mut self, scene: &mut SphScene<X>, sphere_id: Option<ObstacleId>) {
        if self.box_rate != 0.0 {
            let mut size = scene.box_size();
            let width = size.x + self.box_rate;

            if width < MIN_BOX_WIDTH {
                if size.x > MIN_BOX_WIDTH {
                    log::warn!("box width reached its minimum of {MIN_BOX_WIDTH}");
                }
                size.x = MIN_BOX_WIDTH;
            } else {
                size.x = width;
            }

            scene.set_box_size(size);
        }

        if let (Some(sphere), Some(id)) = (&mut self.sphere, sphere_id) {
            if self.sphere_velocity != Vec3::ZERO {
                sphere.set_center(sphere.center + self.sphere_velocity);
                scene.insert_obstacle(id, *sphere);
            }
        }
    }
}

pub fn run_sph<X: Dispatch>(
    params: SphParams,
    dispatch: X,
    steps: u64,
    mut controller: Controller,
    mut encoder: Option<FluidDataEncoder>,
) -> Result<(), RunError> {
    let mut scene = SphScene::from_params(params, dispatch)?;
    let sphere_id = controller.attach(&mut scene);

    if let Some(encoder) = &mut encoder {
        encoder.encode_metadata(&scene)?;
    }

    let bar_template = "Running Simulation {spinner:.green} [{elapsed}] [{bar:50.white/white}] {pos}/{len} ({eta})";
    let style = ProgressStyle::with_template(bar_template)?
        .progress_chars("=> ").tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let progress = ProgressBar::new(steps).with_style(style);

    for _ in (0..steps).progress_with(progress) {
        controller.update(&mut scene, sphere_id);
        scene.advance()?;

        if let Some(encoder) = &mut encoder {
            encoder.encode_frame(&scene)?;
        }
    }

    let stats = scene.fluid.stats();
    log::info!(
        "finished {} steps: density {:.3}..{:.3}, max speed {:.3}",
        scene.steps(),
        stats.min_density,
        stats.max_density,
        stats.max_speed,
    );

    Ok(())
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid parameters")]
    Config(#[from] ConfigError),
    #[error("could not set up dispatch")]
    Dispatch(#[from] DispatchError),
    #[error("could not write frames")]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("bad progress bar template")]
    Template(#[from] TemplateError),
}
