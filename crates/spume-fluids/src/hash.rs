use bytemuck::{Pod, Zeroable};
use glam::{IVec3, Vec3};
use smallvec::SmallVec;

use crate::dispatch::Dispatch;

const P1: u32 = 73856093;
const P2: u32 = 19349663;
const P3: u32 = 83492791;

/// A particle reference tagged with the key of the cell it occupies.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct IndexKeyPair {
    pub index: u32,
    pub key: u32,
}

impl IndexKeyPair {
    /// Padding entry. Sorts after every real key.
    pub const SENTINEL: Self = Self { index: u32::MAX, key: u32::MAX };
}

/// Maps positions to cell keys in `[0, table_size)`.
///
/// Distinct cells may share a key. Consumers treat a key's members as candidates only and always
/// check the actual distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialHasher {
    cell_size: f32,
    table_size: u32,
}

impl SpatialHasher {
    /// Cells are one particle diameter wide.
    pub fn new(particle_radius: f32, table_size: u32) -> Self {
        debug_assert!(table_size > 0);

        Self {
            cell_size: 2.0 * particle_radius,
            table_size,
        }
    }

    #[inline]
    pub fn cell(&self, p: Vec3) -> IVec3 {
        (p / self.cell_size).floor().as_ivec3()
    }

    #[inline]
    pub fn cell_key(&self, cell: IVec3) -> u32 {
        (cell.x as u32).wrapping_mul(P1)
            .wrapping_add((cell.y as u32).wrapping_mul(P2))
            .wrapping_add((cell.z as u32).wrapping_mul(P3))
            % self.table_size
    }

    #[inline]
    pub fn key(&self, p: Vec3) -> u32 {
        self.cell_key(self.cell(p))
    }

    /// Keys of the 3×3×3 block of cells around `cell`, each listed once. Coordinates wrap at the
    /// edge of the `i32` range.
    pub fn neighbor_keys(&self, cell: IVec3) -> SmallVec<[u32; 27]> {
        let mut keys = SmallVec::new();

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = self.cell_key(cell.wrapping_add(IVec3::new(dx, dy, dz)));
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
            }
        }

        keys
    }

    /// Writes `(i, key(positions[i]))` into `pairs[i]`.
    pub fn hash<X: Dispatch>(&self, dispatch: &X, positions: &[Vec3], pairs: &mut [IndexKeyPair]) {
        debug_assert_eq!(positions.len(), pairs.len());

        dispatch.for_each(pairs, |i, pair| {
            *pair = IndexKeyPair {
                index: i as u32,
                key: self.key(positions[i]),
            };
        });
    }
}
