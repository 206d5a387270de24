//! 粒子构建参数（由外部创作层提供）

use glam::{Quat, Vec3};

use super::{check_param, ParticleFlags};
use crate::error::Result;

/// 单个粒子的创作参数
#[derive(Clone, Debug)]
pub struct ParticleParams {
    /// 静止世界位置
    pub position: Vec3,
    /// 静止世界旋转
    pub rotation: Quat,
    /// 质量（接近 0 视为固定）
    pub mass: f32,
    /// 碰撞半径
    pub radius: f32,
    /// 最大偏角（弧度）
    pub max_angle: f32,
    /// 角度中性项柔度（>=1 关闭）
    pub angle_compliance: f32,
    /// 回复半衰期（秒，<0 关闭）
    pub restore_half_life: f32,
    /// 最大活动范围（<=0 不限）
    pub max_movable_range: f32,
    /// 父粒子索引
    pub parent: Option<usize>,
    pub flags: ParticleFlags,
}

impl ParticleParams {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            mass: 1.0,
            radius: 0.0,
            max_angle: std::f32::consts::PI,
            angle_compliance: 1.0,
            restore_half_life: -1.0,
            max_movable_range: 0.0,
            parent: None,
            flags: ParticleFlags::default(),
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// 角度限制与中性柔度
    pub fn with_angle(mut self, max_angle: f32, compliance: f32) -> Self {
        self.max_angle = max_angle;
        self.angle_compliance = compliance;
        self
    }

    pub fn with_restore_half_life(mut self, half_life: f32) -> Self {
        self.restore_half_life = half_life;
        self
    }

    pub fn with_movable_range(mut self, range: f32) -> Self {
        self.max_movable_range = range;
        self
    }

    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_flags(mut self, flags: ParticleFlags) -> Self {
        self.flags = flags;
        self
    }

    /// 固定粒子（质量 0）
    pub fn fixed(position: Vec3) -> Self {
        Self::new(position).with_mass(0.0)
    }

    pub(crate) fn validate(&self, index: usize) -> Result<()> {
        check_param(index, "mass", self.mass, false)?;
        check_param(index, "radius", self.radius, false)?;
        check_param(index, "max_angle", self.max_angle, false)?;
        check_param(index, "angle_compliance", self.angle_compliance, false)?;
        check_param(index, "restore_half_life", self.restore_half_life, true)?;
        check_param(index, "max_movable_range", self.max_movable_range, true)?;
        if !self.position.is_finite() {
            return Err(crate::error::DynamicsError::InvalidParameter {
                index,
                name: "position",
                value: f32::NAN,
            });
        }
        Ok(())
    }
}
