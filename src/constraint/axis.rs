//! 轴向约束：让 a − b 保持与固定轴平行

use glam::Vec3;

use super::{apply_pair, delta_lambda, is_disabled, PairCorrection, INV_MASS_EPSILON};
use crate::math::{safe_normalize, EPSILON};
use crate::particle::Particle;

/// `C = |P × A|`，B = P × A，`∇C = −(B × A) / |B|`
pub fn solve_axis(
    pa: Vec3,
    wa: f32,
    pb: Vec3,
    wb: f32,
    axis: Vec3,
    compliance: f32,
    sq_dt: f32,
    lambda: f32,
) -> PairCorrection {
    let w_sum = wa + wb;
    if w_sum < INV_MASS_EPSILON {
        return PairCorrection::default();
    }
    let p = pa - pb;
    let b = p.cross(axis);
    let c = b.length();
    let grad = -b.cross(axis) / (c + EPSILON);
    let dl = delta_lambda(c, w_sum * grad.length_squared(), compliance, sq_dt, lambda);
    PairCorrection {
        delta_lambda: dl,
        a: grad * (wa * dl),
        b: grad * (-wb * dl),
    }
}

#[derive(Clone, Copy, Debug)]
pub struct AxisConstraint {
    pub a: usize,
    pub b: usize,
    /// 单位轴
    pub axis: Vec3,
    pub compliance: f32,
}

impl AxisConstraint {
    pub fn new(a: usize, b: usize, axis: Vec3, compliance: f32) -> Self {
        Self {
            a,
            b,
            axis: safe_normalize(axis),
            compliance,
        }
    }

    pub fn solve(&self, particles: &mut [Particle], sq_dt: f32, lambda: f32) -> f32 {
        if is_disabled(self.compliance) {
            return 0.0;
        }
        let (pa, pb) = (&particles[self.a], &particles[self.b]);
        let correction = solve_axis(
            pa.position,
            pa.inv_mass,
            pb.position,
            pb.inv_mass,
            self.axis,
            self.compliance,
            sq_dt,
            lambda,
        );
        apply_pair(particles, self.a, self.b, &correction);
        correction.delta_lambda
    }
}
