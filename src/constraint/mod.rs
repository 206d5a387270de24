//! XPBD 约束集
//!
//! 所有约束共享同一求解公式（α̃ = compliance / dt²）：
//!
//! ```text
//! Δλ = (−C − α̃·λ) / (Σ wᵢ|∇Cᵢ|² + α̃)
//! Δxᵢ = wᵢ · Δλ · ∇Cᵢ
//! ```
//!
//! 软约束（高柔度）与硬约束（低柔度）可以在同一迭代预算里共存。
//! λ 由调用方持有：每个外部时间步清零，内部迭代间累加。

mod angle;
mod axis;
mod contact;
mod distance;

pub use angle::{AngleConstraint, AngleLambda, AngleSolve};
pub use axis::{solve_axis, AxisConstraint};
pub use contact::solve_contact;
pub use distance::{solve_distance, solve_max_distance, DistanceConstraint, MaxDistanceConstraint};

use glam::Vec3;

use crate::error::{DynamicsError, Result};
use crate::particle::Particle;

/// 柔度达到此值视为无限软（约束关闭）
pub const DISABLED_COMPLIANCE: f32 = 1.0;

/// 参与者逆质量之和低于此值时约束不做任何事
pub const INV_MASS_EPSILON: f32 = 1e-6;

/// 柔度是否表示"关闭"
#[inline]
pub fn is_disabled(compliance: f32) -> bool {
    compliance >= DISABLED_COMPLIANCE
}

/// XPBD 乘子增量
///
/// `grad_weight = Σ wᵢ|∇Cᵢ|²`；分母退化时返回 0。
#[inline]
pub fn delta_lambda(c: f32, grad_weight: f32, compliance: f32, sq_dt: f32, lambda: f32) -> f32 {
    let alpha = compliance / sq_dt;
    let denom = grad_weight + alpha;
    if denom < INV_MASS_EPSILON {
        return 0.0;
    }
    (-c - alpha * lambda) / denom
}

/// 两点约束的求解结果
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PairCorrection {
    pub delta_lambda: f32,
    /// 加到第一个参与者上的位移
    pub a: Vec3,
    /// 加到第二个参与者上的位移
    pub b: Vec3,
}

impl PairCorrection {
    /// 只更新乘子、不移动粒子
    #[inline]
    pub fn relax(lambda: f32) -> Self {
        Self {
            delta_lambda: -lambda,
            a: Vec3::ZERO,
            b: Vec3::ZERO,
        }
    }
}

// ============================================================================
// 约束描述（构建输入）
// ============================================================================

/// 约束种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Distance = 0,
    MaxDistance = 1,
    Axis = 2,
}

impl ConstraintKind {
    /// 从外部原始编码转换
    pub fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(ConstraintKind::Distance),
            1 => Ok(ConstraintKind::MaxDistance),
            2 => Ok(ConstraintKind::Axis),
            other => Err(DynamicsError::UnknownConstraintKind(other)),
        }
    }
}

/// 约束描述
#[derive(Clone, Copy, Debug)]
pub struct ConstraintDesc {
    pub kind: ConstraintKind,
    pub a: usize,
    pub b: usize,
    /// 静止值（距离 / 最大距离）；None 表示按静止姿态测量
    pub rest: Option<f32>,
    pub compliance: f32,
    /// 轴向约束的固定轴
    pub axis: Vec3,
}

impl ConstraintDesc {
    pub fn distance(a: usize, b: usize, compliance: f32) -> Self {
        Self {
            kind: ConstraintKind::Distance,
            a,
            b,
            rest: None,
            compliance,
            axis: Vec3::ZERO,
        }
    }

    pub fn max_distance(a: usize, b: usize, max: f32, compliance: f32) -> Self {
        Self {
            kind: ConstraintKind::MaxDistance,
            a,
            b,
            rest: Some(max),
            compliance,
            axis: Vec3::ZERO,
        }
    }

    pub fn axis(a: usize, b: usize, axis: Vec3, compliance: f32) -> Self {
        Self {
            kind: ConstraintKind::Axis,
            a,
            b,
            rest: None,
            compliance,
            axis,
        }
    }

    pub fn with_rest(mut self, rest: f32) -> Self {
        self.rest = Some(rest);
        self
    }

    /// 校验索引并生成运行时约束；柔度关闭的约束返回 None
    pub fn build(&self, index: usize, particles: &[Particle]) -> Result<Option<Constraint>> {
        let len = particles.len();
        for particle in [self.a, self.b] {
            if particle >= len {
                return Err(DynamicsError::ConstraintOutOfRange {
                    constraint: index,
                    particle,
                    len,
                });
            }
        }
        if self.a == self.b {
            return Err(DynamicsError::ConstraintSelfLoop {
                constraint: index,
                particle: self.a,
            });
        }
        if is_disabled(self.compliance) {
            log::debug!("[XPBD] 约束 {} 柔度 {} 视为关闭，跳过", index, self.compliance);
            return Ok(None);
        }

        let measured = particles[self.a]
            .default_position
            .distance(particles[self.b].default_position);
        let rest = self.rest.unwrap_or(measured);

        let constraint = match self.kind {
            ConstraintKind::Distance => Constraint::Distance(DistanceConstraint {
                a: self.a,
                b: self.b,
                rest,
                compliance: self.compliance,
            }),
            ConstraintKind::MaxDistance => Constraint::MaxDistance(MaxDistanceConstraint {
                a: self.a,
                b: self.b,
                max: rest,
                compliance: self.compliance,
            }),
            ConstraintKind::Axis => Constraint::Axis(AxisConstraint::new(
                self.a,
                self.b,
                self.axis,
                self.compliance,
            )),
        };
        Ok(Some(constraint))
    }
}

// ============================================================================
// 运行时约束
// ============================================================================

/// 按声明顺序求解的两点约束
#[derive(Clone, Copy, Debug)]
pub enum Constraint {
    Distance(DistanceConstraint),
    MaxDistance(MaxDistanceConstraint),
    Axis(AxisConstraint),
}

impl Constraint {
    /// 求解一次，就地修改粒子位置，返回 Δλ
    pub fn solve(&self, particles: &mut [Particle], sq_dt: f32, lambda: f32) -> f32 {
        match self {
            Constraint::Distance(c) => c.solve(particles, sq_dt, lambda),
            Constraint::MaxDistance(c) => c.solve(particles, sq_dt, lambda),
            Constraint::Axis(c) => c.solve(particles, sq_dt, lambda),
        }
    }

    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::Distance(_) => ConstraintKind::Distance,
            Constraint::MaxDistance(_) => ConstraintKind::MaxDistance,
            Constraint::Axis(_) => ConstraintKind::Axis,
        }
    }

    pub fn participants(&self) -> (usize, usize) {
        match self {
            Constraint::Distance(c) => (c.a, c.b),
            Constraint::MaxDistance(c) => (c.a, c.b),
            Constraint::Axis(c) => (c.a, c.b),
        }
    }

    pub fn compliance(&self) -> f32 {
        match self {
            Constraint::Distance(c) => c.compliance,
            Constraint::MaxDistance(c) => c.compliance,
            Constraint::Axis(c) => c.compliance,
        }
    }

    /// 原地修改柔度（不重建拓扑）
    pub fn set_compliance(&mut self, compliance: f32) {
        match self {
            Constraint::Distance(c) => c.compliance = compliance,
            Constraint::MaxDistance(c) => c.compliance = compliance,
            Constraint::Axis(c) => c.compliance = compliance,
        }
    }
}

/// 把两点修正写回粒子
#[inline]
pub(crate) fn apply_pair(particles: &mut [Particle], a: usize, b: usize, correction: &PairCorrection) {
    particles[a].position += correction.a;
    particles[b].position += correction.b;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleParams;

    fn two_particles(distance: f32) -> Vec<Particle> {
        vec![
            Particle::from_params(0, &ParticleParams::new(Vec3::ZERO), None).unwrap(),
            Particle::from_params(1, &ParticleParams::new(Vec3::X * distance), None).unwrap(),
        ]
    }

    #[test]
    fn test_kind_from_raw() {
        assert_eq!(ConstraintKind::from_raw(1).unwrap(), ConstraintKind::MaxDistance);
        assert!(matches!(
            ConstraintKind::from_raw(7),
            Err(DynamicsError::UnknownConstraintKind(7))
        ));
    }

    #[test]
    fn test_build_measures_rest() {
        let particles = two_particles(2.0);
        let c = ConstraintDesc::distance(0, 1, 0.0).build(0, &particles).unwrap().unwrap();
        match c {
            Constraint::Distance(d) => assert!((d.rest - 2.0).abs() < 1e-6),
            _ => panic!("wrong kind"),
        }
    }

    #[test]
    fn test_build_rejects_bad_index() {
        let particles = two_particles(1.0);
        assert!(matches!(
            ConstraintDesc::distance(0, 5, 0.0).build(3, &particles),
            Err(DynamicsError::ConstraintOutOfRange { constraint: 3, particle: 5, .. })
        ));
        assert!(matches!(
            ConstraintDesc::distance(1, 1, 0.0).build(0, &particles),
            Err(DynamicsError::ConstraintSelfLoop { .. })
        ));
    }

    #[test]
    fn test_set_compliance() {
        let particles = two_particles(1.0);
        let mut c = ConstraintDesc::distance(0, 1, 0.0).build(0, &particles).unwrap().unwrap();
        c.set_compliance(0.25);
        assert_eq!(c.compliance(), 0.25);
        assert_eq!(c.kind(), ConstraintKind::Distance);
        assert_eq!(c.participants(), (0, 1));
    }

    #[test]
    fn test_disabled_compliance_skipped() {
        let particles = two_particles(1.0);
        let built = ConstraintDesc::distance(0, 1, 1.0).build(0, &particles).unwrap();
        assert!(built.is_none());
    }

    #[test]
    fn test_delta_lambda_degenerate() {
        assert_eq!(delta_lambda(1.0, 0.0, 0.0, 1e-4, 0.0), 0.0);
    }
}
