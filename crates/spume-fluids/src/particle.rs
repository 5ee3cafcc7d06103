use bytemuck::{Pod, Zeroable};
use glam::{UVec3, Vec3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::params::SphParams;

/// Size in bytes of one [`Particle`] record: eleven `f32`s.
pub const PARTICLE_RECORD_SIZE: usize = 44;

/// A single particle in its exchange layout. Field order is significant.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub pressure: f32,
    pub density: f32,
    pub force: Vec3,
    pub velocity: Vec3,
    pub position: Vec3,
}

const _: () = assert!(std::mem::size_of::<Particle>() == PARTICLE_RECORD_SIZE);

/// Owns every particle of a fluid, one array per field.
///
/// Each pipeline stage writes a single field of particle `i` while reading other fields of its
/// neighbours, so fields are kept apart rather than interleaved as [`Particle`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleStore {
    pub(crate) pressures: Vec<f32>,
    pub(crate) densities: Vec<f32>,
    pub(crate) forces: Vec<Vec3>,
    pub(crate) velocities: Vec<Vec3>,
    pub(crate) positions: Vec<Vec3>,
}

impl ParticleStore {
    /// Fills the spawn lattice of `params`, spacing particles one diameter apart and nudging each
    /// by a random offset of length `particle_radius * spawn_jitter`.
    pub fn spawn(params: &SphParams) -> Self {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let spacing = 2.0 * params.particle_radius;
        let jitter = params.particle_radius * params.spawn_jitter;
        let UVec3 { x: nx, y: ny, z: nz } = params.num_to_spawn;

        let mut positions = Vec::with_capacity(params.particle_count());

        for x in 0..nx {
            for y in 0..ny {
                for z in 0..nz {
                    let mut p = params.spawn_center + UVec3::new(x, y, z).as_vec3() * spacing;
                    if jitter > 0.0 {
                        p += on_unit_sphere(&mut rng) * jitter;
                    }
                    positions.push(p);
                }
            }
        }

        Self::from_positions(positions)
    }

    /// A store of particles at rest at the given positions.
    pub fn from_positions<I: IntoIterator<Item = Vec3>>(positions: I) -> Self {
        let positions: Vec<Vec3> = positions.into_iter().collect();
        let n = positions.len();

        Self {
            pressures: vec![0.0; n],
            densities: vec![0.0; n],
            forces: vec![Vec3::ZERO; n],
            velocities: vec![Vec3::ZERO; n],
            positions,
        }
    }

    pub fn from_records(records: &[Particle]) -> Self {
        Self {
            pressures: records.iter().map(|p| p.pressure).collect(),
            densities: records.iter().map(|p| p.density).collect(),
            forces: records.iter().map(|p| p.force).collect(),
            velocities: records.iter().map(|p| p.velocity).collect(),
            positions: records.iter().map(|p| p.position).collect(),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn record(&self, i: usize) -> Particle {
        Particle {
            pressure: self.pressures[i],
            density: self.densities[i],
            force: self.forces[i],
            velocity: self.velocities[i],
            position: self.positions[i],
        }
    }

    pub fn records(&self) -> Vec<Particle> {
        (0..self.len()).map(|i| self.record(i)).collect()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    pub fn forces(&self) -> &[Vec3] {
        &self.forces
    }

    pub fn densities(&self) -> &[f32] {
        &self.densities
    }

    pub fn pressures(&self) -> &[f32] {
        &self.pressures
    }

    /// Position, velocity and density of every particle, for renderers.
    pub fn iter_particles(&self) -> impl Iterator<Item = (&Vec3, &Vec3, &f32)> {
        self.positions.iter().zip(self.velocities.iter()).zip(self.densities.iter()).map(|((p, v), d)| (p, v, d))
    }

    /// Index of the first particle whose position or velocity is NaN or infinite.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.positions.iter()
            .zip(self.velocities.iter())
            .position(|(p, v)| !p.is_finite() || !v.is_finite())
    }
}

fn on_unit_sphere<R: Rng>(rng: &mut R) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );

        let len2 = v.length_squared();
        if len2 > 1e-6 && len2 <= 1.0 {
            return v / len2.sqrt();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_fills_lattice() {
        let params = SphParams {
            num_to_spawn: UVec3::new(2, 3, 4),
            spawn_center: Vec3::new(1.0, 2.0, 3.0),
            spawn_jitter: 0.0,
            ..Default::default()
        };

        let store = ParticleStore::spawn(&params);
        assert_eq!(store.len(), 24);

        // z is the innermost lattice axis.
        assert_eq!(store.positions()[0], Vec3::new(1.0, 2.0, 3.0));
        assert!((store.positions()[1] - Vec3::new(1.0, 2.0, 3.2)).length() < 1e-6);
        assert!((store.positions()[23] - Vec3::new(1.2, 2.4, 3.6)).length() < 1e-6);

        assert!(store.velocities().iter().all(|&v| v == Vec3::ZERO));
        assert!(store.densities().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_spawn_jitter_stays_on_sphere() {
        let params = SphParams { spawn_jitter: 0.5, ..Default::default() };
        let jittered = ParticleStore::spawn(&params);
        let lattice = ParticleStore::spawn(&SphParams { spawn_jitter: 0.0, ..params });

        for (a, b) in jittered.positions().iter().zip(lattice.positions()) {
            let offset = (*a - *b).length();
            assert!((offset - 0.05).abs() < 1e-4, "offset {offset}");
        }

        // Same seed, same layout.
        assert_eq!(jittered, ParticleStore::spawn(&params));
    }

    #[test]
    fn test_record_layout() {
        let store = ParticleStore::from_positions([Vec3::new(1.0, 2.0, 3.0)]);
        let record = store.record(0);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&record));

        assert_eq!(floats.len(), 11);
        assert_eq!(&floats[8..], &[1.0, 2.0, 3.0]);
        assert_eq!(ParticleStore::from_records(&store.records()), store);
    }

    #[test]
    fn test_first_non_finite() {
        let mut store = ParticleStore::from_positions([Vec3::ZERO, Vec3::ONE, Vec3::X]);
        assert_eq!(store.first_non_finite(), None);

        store.velocities[2].y = f32::INFINITY;
        assert_eq!(store.first_non_finite(), Some(2));
    }
}
