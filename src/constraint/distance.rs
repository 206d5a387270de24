//! 距离约束与单侧最大距离约束

use glam::Vec3;

use super::{apply_pair, delta_lambda, is_disabled, PairCorrection, INV_MASS_EPSILON};
use crate::math::safe_normalize;
use crate::particle::Particle;

/// `C = |P| − rest`，P = a − b
///
/// 梯度取归一化向量并视为单位长度（∇C·∇C = 1）。
/// 零距离奇异点处归一化结果略短于 1，这里保留原样。
pub fn solve_distance(
    pa: Vec3,
    wa: f32,
    pb: Vec3,
    wb: f32,
    rest: f32,
    compliance: f32,
    sq_dt: f32,
    lambda: f32,
) -> PairCorrection {
    let w_sum = wa + wb;
    if w_sum < INV_MASS_EPSILON {
        return PairCorrection::default();
    }
    let p = pa - pb;
    let len = p.length();
    let n = safe_normalize(p);
    let c = len - rest;
    let dl = delta_lambda(c, w_sum, compliance, sq_dt, lambda);
    PairCorrection {
        delta_lambda: dl,
        a: n * (wa * dl),
        b: n * (-wb * dl),
    }
}

/// 单侧版本：距离在界内时立即松弛（Δλ = −λ，不动粒子）
pub fn solve_max_distance(
    pa: Vec3,
    wa: f32,
    pb: Vec3,
    wb: f32,
    max: f32,
    compliance: f32,
    sq_dt: f32,
    lambda: f32,
) -> PairCorrection {
    if (pa - pb).length_squared() <= max * max {
        return PairCorrection::relax(lambda);
    }
    solve_distance(pa, wa, pb, wb, max, compliance, sq_dt, lambda)
}

#[derive(Clone, Copy, Debug)]
pub struct DistanceConstraint {
    pub a: usize,
    pub b: usize,
    pub rest: f32,
    pub compliance: f32,
}

impl DistanceConstraint {
    pub fn solve(&self, particles: &mut [Particle], sq_dt: f32, lambda: f32) -> f32 {
        if is_disabled(self.compliance) {
            return 0.0;
        }
        let (pa, pb) = (&particles[self.a], &particles[self.b]);
        let correction = solve_distance(
            pa.position,
            pa.inv_mass,
            pb.position,
            pb.inv_mass,
            self.rest,
            self.compliance,
            sq_dt,
            lambda,
        );
        apply_pair(particles, self.a, self.b, &correction);
        correction.delta_lambda
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MaxDistanceConstraint {
    pub a: usize,
    pub b: usize,
    pub max: f32,
    pub compliance: f32,
}

impl MaxDistanceConstraint {
    pub fn solve(&self, particles: &mut [Particle], sq_dt: f32, lambda: f32) -> f32 {
        if is_disabled(self.compliance) {
            return 0.0;
        }
        let (pa, pb) = (&particles[self.a], &particles[self.b]);
        let correction = solve_max_distance(
            pa.position,
            pa.inv_mass,
            pb.position,
            pb.inv_mass,
            self.max,
            self.compliance,
            sq_dt,
            lambda,
        );
        apply_pair(particles, self.a, self.b, &correction);
        correction.delta_lambda
    }
}
