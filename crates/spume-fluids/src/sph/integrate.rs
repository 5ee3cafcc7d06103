use glam::Vec3;

use crate::{dispatch::Dispatch, obstacle::ObstacleSet, particle::ParticleStore};

use super::SphFluid;

impl<X: Dispatch> SphFluid<X> {
    /// Semi-implicit Euler, then collisions: obstacles first, the box last so that every particle
    /// ends the step inside the box.
    pub(super) fn integrate(&mut self, dt: f32, bound_damping: f32, box_size: Vec3, obstacles: &ObstacleSet) {
        let half = 0.5 * box_size;
        let ParticleStore { densities, forces, velocities, positions, .. } = &mut self.particles;
        let (densities, forces) = (&*densities, &*forces);

        self.dispatch.for_each_zip(velocities.as_mut_slice(), positions.as_mut_slice(), |i, velocity, position| {
            let density = densities[i];
            if density > 0.0 {
                *velocity += dt * forces[i] / density;
            }
            *position += dt * *velocity;

            obstacles.resolve(position, velocity, bound_damping);
            resolve_box(position, velocity, half, bound_damping);
        });

        log::trace!("integrated particles");
    }
}

/// Clamps `position` into `[-half, half]`, reflecting and damping the velocity on each axis it
/// left through.
#[inline]
fn resolve_box(position: &mut Vec3, velocity: &mut Vec3, half: Vec3, damping: f32) {
    for axis in 0..3 {
        if position[axis] < -half[axis] {
            position[axis] = -half[axis];
            velocity[axis] *= -damping;
        } else if position[axis] > half[axis] {
            position[axis] = half[axis];
            velocity[axis] *= -damping;
        }
    }
}
