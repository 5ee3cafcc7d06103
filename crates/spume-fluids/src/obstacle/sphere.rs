use glam::Vec3;

use super::{Obstacle, Sdf};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Sphere {
            center,
            radius,
        }
    }

    /// Sets the center of the sphere. Should be called every time step.
    pub fn set_center(&mut self, center: Vec3) {
        self.center = center;
    }
}

impl Obstacle for Sphere {
    fn sdf(&self, p: Vec3) -> Sdf {
        let offset = p - self.center;
        let d = offset.length();

        // The centre has no defined normal; push straight up.
        let gradient = if d > 0.0 { offset / d } else { Vec3::Y };

        Sdf {
            distance: d - self.radius,
            gradient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_sdf() {
        let sphere = Sphere::new(Vec3::new(1.0, 0.0, 0.0), 0.5);

        let sdf = sphere.sdf(Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(sdf.distance, 1.5);
        assert_eq!(sdf.gradient, Vec3::X);

        let center = sphere.sdf(sphere.center);
        assert_eq!(center.distance, -0.5);
        assert_eq!(center.gradient, Vec3::Y);
    }
}
