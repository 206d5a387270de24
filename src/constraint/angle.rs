//! 带限角度约束（父 / 关节 / 子 三点）
//!
//! 在 (u, v) 二维平面里测量当前子方向相对静止方向的夹角：
//! - u：经父链累计旋转后的静止方向
//! - v：当前子偏移在 u 正交补上的分量方向
//!
//! `θ = atan2(w·v, w·u)`，避免三维旋转分解的奇异。
//! 两个区间共享同一梯度，但柔度与乘子各自独立：
//! - `θ ≤ limit`：只解软的中性项，限制项 λ 强制归零
//! - `θ > limit`：对 `θ − limit` 解硬的限制项，中性项 λ 强制归零

use glam::Vec3;

use super::{delta_lambda, is_disabled, INV_MASS_EPSILON};
use crate::math::EPSILON;
use crate::particle::Particle;

/// 角度约束的一对乘子
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AngleLambda {
    pub neutral: f32,
    pub limit: f32,
}

impl AngleLambda {
    pub const ZERO: Self = Self { neutral: 0.0, limit: 0.0 };

    #[inline]
    pub fn accumulate(&mut self, delta: AngleLambda) {
        self.neutral += delta.neutral;
        self.limit += delta.limit;
    }
}

/// 单次求解结果
#[derive(Clone, Copy, Debug, Default)]
pub struct AngleSolve {
    pub delta: AngleLambda,
    /// 求解前测得的偏角（弧度）
    pub angle: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct AngleConstraint {
    /// 关节的父粒子（关节为根时没有）
    pub parent: Option<usize>,
    pub joint: usize,
    pub child: usize,
    /// 最大偏角（弧度）
    pub max_angle: f32,
    pub neutral_compliance: f32,
    pub limit_compliance: f32,
}

impl AngleConstraint {
    /// 两项都关闭时无需参与求解
    pub fn is_active(&self) -> bool {
        !is_disabled(self.neutral_compliance)
            || (self.max_angle < std::f32::consts::PI && !is_disabled(self.limit_compliance))
    }

    /// 求解一次
    ///
    /// `rest_direction` 为已旋转到当前帧的静止方向（关节 → 子）。
    pub fn solve(
        &self,
        particles: &mut [Particle],
        rest_direction: Vec3,
        sq_dt: f32,
        lambda: AngleLambda,
    ) -> AngleSolve {
        let x_j = particles[self.joint].position;
        let x_c = particles[self.child].position;
        let w_j = particles[self.joint].inv_mass;
        let w_c = particles[self.child].inv_mass;
        let (x_p, w_p) = match self.parent {
            Some(p) => (particles[p].position, particles[p].inv_mass),
            None => (x_j, 0.0),
        };

        // 二维投影
        let u = rest_direction.normalize_or_zero();
        let w = x_c - x_j;
        let along = w.dot(u);
        let perp = w - u * along;
        let across = perp.length();
        let v = perp / (across + EPSILON);
        let angle = across.atan2(along);

        if w_p + w_j + w_c < INV_MASS_EPSILON {
            return AngleSolve { delta: AngleLambda::ZERO, angle };
        }

        // 平面法线；θ 关于各点的梯度都落在该平面内
        let n = u.cross(v);
        let grad_c = n.cross(w) / (w.length_squared() + EPSILON);
        let grad_p = match self.parent {
            Some(_) => {
                let e = x_j - x_p;
                let e_perp = e - n * e.dot(n);
                n.cross(e) / (e_perp.length_squared() + EPSILON)
            }
            None => Vec3::ZERO,
        };
        let grad_j = -grad_c - grad_p;
        let grad_weight = w_p * grad_p.length_squared()
            + w_j * grad_j.length_squared()
            + w_c * grad_c.length_squared();

        // 限制项关闭时相当于没有上限，始终走中性区间
        let within_limit = angle <= self.max_angle || is_disabled(self.limit_compliance);
        let (delta, step) = if within_limit {
            let d_neutral = if is_disabled(self.neutral_compliance) {
                -lambda.neutral
            } else {
                delta_lambda(angle, grad_weight, self.neutral_compliance, sq_dt, lambda.neutral)
            };
            let step = if is_disabled(self.neutral_compliance) { 0.0 } else { d_neutral };
            (AngleLambda { neutral: d_neutral, limit: -lambda.limit }, step)
        } else {
            let residual = angle - self.max_angle;
            let d_limit = delta_lambda(residual, grad_weight, self.limit_compliance, sq_dt, lambda.limit);
            (AngleLambda { neutral: -lambda.neutral, limit: d_limit }, d_limit)
        };

        if step != 0.0 {
            if let Some(p) = self.parent {
                particles[p].position += grad_p * (w_p * step);
            }
            particles[self.joint].position += grad_j * (w_j * step);
            particles[self.child].position += grad_c * (w_c * step);
        }

        AngleSolve { delta, angle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::angle_between;
    use crate::particle::ParticleParams;

    const SQ_DT: f32 = (1.0 / 60.0 / 10.0) * (1.0 / 60.0 / 10.0);

    /// 竖直三点链，子节点相对向下方向弯 `bend` 度
    fn bent_chain(bend_deg: f32) -> Vec<Particle> {
        let bend = bend_deg.to_radians();
        let joint = Vec3::new(0.0, -1.0, 0.0);
        let child = joint + Vec3::new(bend.sin(), -bend.cos(), 0.0);
        vec![
            Particle::from_params(0, &ParticleParams::fixed(Vec3::ZERO), None).unwrap(),
            Particle::from_params(1, &ParticleParams::new(joint).with_parent(0), None).unwrap(),
            Particle::from_params(2, &ParticleParams::new(child).with_parent(1), None).unwrap(),
        ]
    }

    fn constraint() -> AngleConstraint {
        AngleConstraint {
            parent: Some(0),
            joint: 1,
            child: 2,
            max_angle: 30f32.to_radians(),
            neutral_compliance: 1e-4,
            limit_compliance: 1e-8,
        }
    }

    #[test]
    fn test_neutral_regime() {
        let mut particles = bent_chain(10.0);
        let solve = constraint().solve(&mut particles, -Vec3::Y, SQ_DT, AngleLambda::ZERO);
        assert!((solve.angle - 10f32.to_radians()).abs() < 1e-3);
        assert!(solve.delta.neutral != 0.0);
        assert_eq!(solve.delta.limit, 0.0);
    }

    #[test]
    fn test_limit_regime() {
        let mut particles = bent_chain(45.0);
        let accumulated = AngleLambda { neutral: 0.3, limit: 0.0 };
        let solve = constraint().solve(&mut particles, -Vec3::Y, SQ_DT, accumulated);
        assert!(solve.delta.limit != 0.0);
        let mut lambda = accumulated;
        lambda.accumulate(solve.delta);
        assert_eq!(lambda.neutral, 0.0);
    }

    #[test]
    fn test_limit_pulls_back_inside() {
        let mut particles = bent_chain(45.0);
        let c = constraint();
        let mut lambda = AngleLambda::ZERO;
        for _ in 0..10 {
            let solve = c.solve(&mut particles, -Vec3::Y, SQ_DT, lambda);
            lambda.accumulate(solve.delta);
        }
        let dir = particles[2].position - particles[1].position;
        let angle = angle_between(-Vec3::Y, dir);
        assert!(angle < 31f32.to_radians(), "angle {}", angle.to_degrees());
    }

    #[test]
    fn test_disabled_limit_is_skipped() {
        // 两项都关闭：不动，只松弛乘子
        let mut particles = bent_chain(45.0);
        let before = particles[2].position;
        let c = AngleConstraint {
            neutral_compliance: 1.0,
            limit_compliance: 1.0,
            ..constraint()
        };
        assert!(!c.is_active());
        let accumulated = AngleLambda { neutral: 0.0, limit: 0.2 };
        let solve = c.solve(&mut particles, -Vec3::Y, SQ_DT, accumulated);
        assert_eq!(solve.delta.limit, -0.2);
        assert!(particles[2].position.distance(before) < 1e-7);

        // 只关闭限制项：超出上限仍按中性项求解
        let mut particles = bent_chain(45.0);
        let c = AngleConstraint { limit_compliance: 1.0, ..constraint() };
        let solve = c.solve(&mut particles, -Vec3::Y, SQ_DT, AngleLambda::ZERO);
        assert_eq!(solve.delta.limit, 0.0);
        assert!(solve.delta.neutral != 0.0);
    }

    #[test]
    fn test_straight_chain_is_noop() {
        let mut particles = bent_chain(0.0);
        let before: Vec<Vec3> = particles.iter().map(|p| p.position).collect();
        let solve = constraint().solve(&mut particles, -Vec3::Y, SQ_DT, AngleLambda::ZERO);
        assert!(solve.delta.neutral.abs() < 1e-6);
        for (p, b) in particles.iter().zip(before) {
            assert!(p.position.distance(b) < 1e-6);
        }
    }

    #[test]
    fn test_root_joint_without_parent() {
        let mut particles = bent_chain(20.0);
        let c = AngleConstraint { parent: None, joint: 1, child: 2, ..constraint() };
        particles[1].inv_mass = 0.0;
        let solve = c.solve(&mut particles, -Vec3::Y, SQ_DT, AngleLambda::ZERO);
        assert!(solve.delta.neutral < 0.0);
        // 子节点朝静止方向回摆
        let dir = particles[2].position - particles[1].position;
        assert!(angle_between(-Vec3::Y, dir) < 20f32.to_radians());
    }
}
