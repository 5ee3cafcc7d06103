use std::collections::HashMap;

use glam::Vec3;

pub mod sphere;

/// A solid the fluid collides with. Obstacles are moved by the caller between steps.
pub trait Obstacle: Send + Sync {
    fn sdf(&self, p: Vec3) -> Sdf;
}

/// Signed distance to an obstacle surface and the outward surface normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sdf {
    pub distance: f32,
    pub gradient: Vec3,
}

impl Sdf {
    pub fn new(distance: f32, gradient: Vec3) -> Sdf {
        Sdf { distance, gradient }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObstacleId(pub usize);

#[derive(Default)]
pub struct ObstacleSet {
    pub obstacles: HashMap<usize, Box<dyn Obstacle>>,
}

impl ObstacleSet {
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Pushes a penetrating particle back onto the nearest surface and reflects its normal
    /// velocity, keeping `damping` of it.
    #[inline]
    pub fn resolve(&self, position: &mut Vec3, velocity: &mut Vec3, damping: f32) {
        if self.is_empty() {
            return;
        }

        let sdf = self.sdf(*position);
        if sdf.distance < 0.0 {
            let normal = sdf.gradient;
            *position -= sdf.distance * normal;

            let vn = velocity.dot(normal);
            *velocity -= (1.0 + damping) * vn * normal;
        }
    }
}

impl Obstacle for ObstacleSet {
    fn sdf(&self, p: Vec3) -> Sdf {
        let mut dist = f32::MAX;
        let mut gradient = Vec3::ZERO;

        for obstacle in self.obstacles.values() {
            let sd = obstacle.sdf(p);
            if dist > sd.distance {
                dist = sd.distance;
                gradient = sd.gradient;
            }
        }

        Sdf::new(dist, gradient)
    }
}
