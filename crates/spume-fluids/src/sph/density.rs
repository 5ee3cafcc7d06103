use crate::{dispatch::Dispatch, particle::ParticleStore};

use super::SphFluid;

impl<X: Dispatch> SphFluid<X> {
    /// Sums `mass * poly6(r²)` over every neighbour within `h`, the particle itself included, then
    /// applies the equation of state `p = k (rho - rho_0)`.
    pub(super) fn compute_density_pressure(&mut self, particle_mass: f32, gas_constant: f32, rest_density: f32) {
        let grid = &self.grid;
        let kernels = &self.kernels;
        let ParticleStore { positions, densities, pressures, .. } = &mut self.particles;
        let positions = &*positions;

        self.dispatch.for_each(densities.as_mut_slice(), |i, density| {
            let p = positions[i];
            let mut sum = 0.0;

            grid.for_each_candidate(p, |j| {
                let r2 = p.distance_squared(positions[j]);
                if r2 <= kernels.h2() {
                    sum += particle_mass * kernels.poly6(r2);
                }
            });

            *density = sum;
        });

        let densities = &*densities;
        self.dispatch.for_each(pressures.as_mut_slice(), |i, pressure| {
            *pressure = gas_constant * (densities[i] - rest_density);
        });

        log::trace!("computed density and pressure");
    }
}
