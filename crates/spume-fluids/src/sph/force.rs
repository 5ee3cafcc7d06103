use glam::Vec3;

use crate::{dispatch::Dispatch, particle::ParticleStore};

use super::SphFluid;

impl<X: Dispatch> SphFluid<X> {
    /// Pressure and viscosity from every neighbour with `0 < r <= h`, plus gravity.
    ///
    /// Neighbours with zero density contribute nothing.
    pub(super) fn compute_forces(&mut self, particle_mass: f32, viscosity: f32, gravity_y: f32) {
        let grid = &self.grid;
        let kernels = &self.kernels;
        let ParticleStore { pressures, densities, forces, velocities, positions } = &mut self.particles;
        let (positions, velocities, densities, pressures) = (&*positions, &*velocities, &*densities, &*pressures);

        let gravity = Vec3::new(0.0, -particle_mass * gravity_y, 0.0);

        self.dispatch.for_each(forces.as_mut_slice(), |i, force| {
            let p = positions[i];
            let v = velocities[i];
            let pressure = pressures[i];

            let mut pressure_force = Vec3::ZERO;
            let mut viscous_force = Vec3::ZERO;

            grid.for_each_candidate(p, |j| {
                if j == i {
                    return;
                }

                let offset = p - positions[j];
                let r2 = offset.length_squared();
                if r2 > kernels.h2() || r2 == 0.0 {
                    return;
                }

                let density = densities[j];
                if density <= 0.0 {
                    return;
                }

                let r = r2.sqrt();
                pressure_force += -particle_mass * (pressure + pressures[j]) / (2.0 * density)
                    * kernels.spiky_gradient(offset, r);
                viscous_force += viscosity * particle_mass * (velocities[j] - v) / density
                    * kernels.viscosity_laplacian(r);
            });

            *force = pressure_force + viscous_force + gravity;
        });

        log::trace!("computed forces");
    }
}
