use std::f32::consts::PI;

use glam::Vec3;

/// Smoothing kernels for a fixed support radius `h`, with coefficients computed once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphKernels {
    h: f32,
    h2: f32,
    poly6: f32,
    spiky: f32,
    viscosity: f32,
}

impl SphKernels {
    pub fn new(h: f32) -> Self {
        Self {
            h,
            h2: h * h,
            poly6: 315.0 / (64.0 * PI * h.powi(9)),
            spiky: 45.0 / (PI * h.powi(6)),
            viscosity: 45.0 / (PI * h.powi(6)),
        }
    }

    #[inline(always)]
    pub fn h(&self) -> f32 {
        self.h
    }

    #[inline(always)]
    pub fn h2(&self) -> f32 {
        self.h2
    }

    /// `315 / (64 π h⁹) · (h² − r²)³`, for density.
    #[inline]
    pub fn poly6(&self, r2: f32) -> f32 {
        if r2 > self.h2 {
            return 0.0;
        }

        let d = self.h2 - r2;
        self.poly6 * d * d * d
    }

    /// `−45 / (π h⁶) · (h − r)² · offset / r`, for pressure. `offset` points from the neighbour to
    /// the particle and has length `r`. Zero at `r = 0`, where the direction is undefined.
    #[inline]
    pub fn spiky_gradient(&self, offset: Vec3, r: f32) -> Vec3 {
        if r <= 0.0 || r > self.h {
            return Vec3::ZERO;
        }

        let d = self.h - r;
        -self.spiky * d * d * offset / r
    }

    /// `45 / (π h⁶) · (h − r)`, for viscosity.
    #[inline]
    pub fn viscosity_laplacian(&self, r: f32) -> f32 {
        if r > self.h {
            return 0.0;
        }

        self.viscosity * (self.h - r)
    }
}
