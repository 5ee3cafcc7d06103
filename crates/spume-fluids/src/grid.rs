use glam::Vec3;

use crate::{
    dispatch::Dispatch,
    hash::{IndexKeyPair, SpatialHasher},
    offsets::CellOffsetTable,
    params::{ConfigError, MAX_PARTICLES},
    sort,
};

/// Neighbour search structure, rebuilt from scratch every step.
///
/// [`NeighborGrid::rebuild`] runs the hash, sort and offset stages. Afterwards the members of a
/// cell key are a contiguous run of [`NeighborGrid::sorted`].
#[derive(Debug)]
pub struct NeighborGrid {
    hasher: SpatialHasher,
    /// Sort buffer. Only the first `len` pairs are real.
    pairs: Vec<IndexKeyPair>,
    offsets: CellOffsetTable,
    len: usize,
}

impl NeighborGrid {
    pub fn new(len: usize, particle_radius: f32) -> Result<Self, ConfigError> {
        if len == 0 {
            return Err(ConfigError::NoParticles);
        }

        let too_many = ConfigError::TooManyParticles { count: len as u64, max: MAX_PARTICLES };
        if len as u64 > MAX_PARTICLES {
            return Err(too_many);
        }
        let padded = sort::padded_len(len).ok_or(too_many)?;

        Ok(Self {
            hasher: SpatialHasher::new(particle_radius, len as u32),
            pairs: vec![IndexKeyPair::SENTINEL; padded],
            offsets: CellOffsetTable::new(len),
            len,
        })
    }

    pub fn rebuild<X: Dispatch>(&mut self, dispatch: &X, positions: &[Vec3]) {
        debug_assert_eq!(positions.len(), self.len);

        let (real, padding) = self.pairs.split_at_mut(self.len);

        self.hasher.hash(dispatch, positions, real);
        log::trace!("hashed {} particles", self.len);

        dispatch.for_each(padding, |_, pair| *pair = IndexKeyPair::SENTINEL);
        sort::bitonic_sort(dispatch, &mut self.pairs);
        log::trace!("sorted {} pairs", self.pairs.len());

        self.offsets.build(dispatch, &self.pairs[..self.len]);
        log::trace!("built cell offsets");
    }

    #[inline(always)]
    pub fn hasher(&self) -> &SpatialHasher {
        &self.hasher
    }

    #[inline(always)]
    pub fn offsets(&self) -> &CellOffsetTable {
        &self.offsets
    }

    /// Real pairs in key order.
    #[inline(always)]
    pub fn sorted(&self) -> &[IndexKeyPair] {
        &self.pairs[..self.len]
    }

    /// Length of the sort buffer, including padding.
    #[inline(always)]
    pub fn padded_len(&self) -> usize {
        self.pairs.len()
    }

    pub fn cell_members(&self, key: u32) -> &[IndexKeyPair] {
        self.offsets.run(self.sorted(), key)
    }

    /// Calls `f` with every particle sharing a key with one of the 27 cells around `p`.
    ///
    /// Candidates may lie far away when keys collide, and include the particle at `p` itself.
    #[inline]
    pub fn for_each_candidate<F: FnMut(usize)>(&self, p: Vec3, mut f: F) {
        for key in self.hasher.neighbor_keys(self.hasher.cell(p)) {
            for pair in self.cell_members(key) {
                f(pair.index as usize);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::dispatch::{Serial, ThreadPool};

    use super::*;

    fn scattered(n: usize) -> Vec<Vec3> {
        let mut rng = StdRng::seed_from_u64(42);
        (0..n).map(|_| Vec3::new(
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-1.5..1.5),
        )).collect()
    }

    fn check_round_trip<X: Dispatch>(dispatch: &X, positions: &[Vec3]) {
        let mut grid = NeighborGrid::new(positions.len(), 0.1).unwrap();
        grid.rebuild(dispatch, positions);

        let sorted = grid.sorted();
        assert_eq!(sorted.len(), positions.len());
        assert!(sorted.windows(2).all(|w| w[0].key <= w[1].key));

        // Each particle is found in the run of its own key.
        for (i, &p) in positions.iter().enumerate() {
            let key = grid.hasher().key(p);
            assert!(grid.cell_members(key).iter().any(|pair| pair.index as usize == i));
            assert!(grid.cell_members(key).iter().all(|pair| pair.key == key));
        }

        // Runs partition the sorted array.
        let mut keys: Vec<u32> = sorted.iter().map(|pair| pair.key).collect();
        keys.dedup();
        let total: usize = keys.iter().map(|&key| grid.cell_members(key).len()).sum();
        assert_eq!(total, positions.len());
    }

    #[test]
    fn test_hash_sort_offset_round_trip() {
        let positions = scattered(1000);
        check_round_trip(&Serial::default(), &positions);
        check_round_trip(&ThreadPool::new(4, 64).unwrap(), &positions);
    }

    #[test]
    fn test_single_particle() {
        check_round_trip(&Serial::default(), &[Vec3::ZERO]);
    }

    #[test]
    fn test_padding_matches_power_of_two() {
        let grid = NeighborGrid::new(1000, 0.1).unwrap();
        assert_eq!(grid.padded_len(), 1024);
        assert_eq!(grid.sorted().len(), 1000);
    }

    #[test]
    fn test_empty_grid_is_rejected() {
        assert_eq!(NeighborGrid::new(0, 0.1).unwrap_err(), ConfigError::NoParticles);
    }

    #[test]
    fn test_candidates_cover_adjacent_cells() {
        let positions = [Vec3::new(0.05, 0.05, 0.05), Vec3::new(0.25, 0.05, 0.05), Vec3::new(3.0, 3.0, 3.0)];
        let mut grid = NeighborGrid::new(positions.len(), 0.1).unwrap();
        grid.rebuild(&Serial::default(), &positions);

        let mut found = Vec::new();
        grid.for_each_candidate(positions[0], |j| found.push(j));
        assert!(found.contains(&0));
        assert!(found.contains(&1));
    }
}
