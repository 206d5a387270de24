//! 粒子数据模型
//!
//! 每个粒子绑定一个骨骼节点：
//! - 参数（质量、半径、角度限制、柔度、回复半衰期、活动范围）
//! - 静止姿态（相对父节点的本地变换）
//! - 每帧默认姿态（由父链传播得到的世界变换）
//! - 模拟状态（位置、速度）与回写结果（修正后的旋转）

mod params;

pub use params::ParticleParams;

use bitflags::bitflags;
use glam::{Quat, Vec3};

use crate::error::{DynamicsError, Result};
use crate::math::inverse_mass;

// ============================================================================
// 粒子标志
// ============================================================================

bitflags! {
    /// 粒子标志位
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ParticleFlags: u32 {
        /// 强制固定（忽略质量，逆质量为 0）
        const FIXED = 1 << 0;
        /// 参与碰撞
        const COLLIDE = 1 << 1;
        /// 回写旋转时驱动父关节
        const FEEDBACK = 1 << 2;
    }
}

impl Default for ParticleFlags {
    fn default() -> Self {
        ParticleFlags::COLLIDE | ParticleFlags::FEEDBACK
    }
}

// ============================================================================
// 粒子
// ============================================================================

/// 模拟粒子
#[derive(Clone, Debug)]
pub struct Particle {
    // ========================================
    // 静态数据（构建后不变）
    // ========================================

    /// 缓冲区索引
    pub index: usize,

    /// 父粒子索引（根为 None，且父一定排在子之前）
    pub parent: Option<usize>,

    /// 静止本地位置（相对父节点）
    pub rest_local_position: Vec3,

    /// 静止本地旋转（相对父节点）
    pub rest_local_rotation: Quat,

    // ========================================
    // 参数（可在不重建拓扑的情况下重新同步）
    // ========================================

    pub mass: f32,
    pub inv_mass: f32,
    /// 碰撞代理球半径
    pub radius: f32,
    /// 与静止方向的最大偏角（弧度）
    pub max_angle: f32,
    /// 角度约束"中性"项柔度
    pub angle_compliance: f32,
    /// 回到默认姿态的半衰期（<0 或无穷表示关闭）
    pub restore_half_life: f32,
    /// 距默认位置的最大活动范围（<=0 表示不限）
    pub max_movable_range: f32,
    pub flags: ParticleFlags,

    // ========================================
    // 动态数据（每帧更新）
    // ========================================

    /// 动画采样的本地位置（animation re-sync 时使用）
    pub local_position: Vec3,

    /// 动画采样的本地旋转
    pub local_rotation: Quat,

    /// 当前默认世界位置
    pub default_position: Vec3,

    /// 当前默认世界旋转
    pub default_rotation: Quat,

    /// 当前位置
    pub position: Vec3,

    /// 速度（由位置差重建）
    pub velocity: Vec3,

    /// 本步开始时的位置（速度重建用）
    pub(crate) step_start: Vec3,

    /// 回写结果：世界旋转
    pub world_rotation: Quat,

    /// 回写结果：本地旋转
    pub local_feedback_rotation: Quat,
}

impl Particle {
    /// 从参数创建
    ///
    /// `parent_pose` 为父粒子的静止世界位姿，用于推导本地静止变换；
    /// 根粒子的本地变换相对链根变换（构建时为单位变换）。
    pub fn from_params(
        index: usize,
        params: &ParticleParams,
        parent_pose: Option<(Vec3, Quat)>,
    ) -> Result<Self> {
        params.validate(index)?;

        let (rest_local_position, rest_local_rotation) = match parent_pose {
            Some((parent_pos, parent_rot)) => {
                let inv = parent_rot.inverse();
                (inv * (params.position - parent_pos), inv * params.rotation)
            }
            None => (params.position, params.rotation),
        };

        let mut particle = Self {
            index,
            parent: params.parent,
            rest_local_position,
            rest_local_rotation,
            mass: 0.0,
            inv_mass: 0.0,
            radius: 0.0,
            max_angle: 0.0,
            angle_compliance: 0.0,
            restore_half_life: -1.0,
            max_movable_range: 0.0,
            flags: ParticleFlags::default(),
            local_position: rest_local_position,
            local_rotation: rest_local_rotation,
            default_position: params.position,
            default_rotation: params.rotation,
            position: params.position,
            velocity: Vec3::ZERO,
            step_start: params.position,
            world_rotation: params.rotation,
            local_feedback_rotation: rest_local_rotation,
        };
        particle.apply_params(params);
        Ok(particle)
    }

    /// 重新同步参数（不影响位置、速度、拓扑）
    pub fn apply_params(&mut self, params: &ParticleParams) {
        self.mass = params.mass;
        self.flags = params.flags;
        self.inv_mass = if params.flags.contains(ParticleFlags::FIXED) {
            0.0
        } else {
            inverse_mass(params.mass)
        };
        self.radius = params.radius;
        self.max_angle = params.max_angle;
        self.angle_compliance = params.angle_compliance;
        self.restore_half_life = params.restore_half_life;
        self.max_movable_range = params.max_movable_range;
    }

    // ========================================
    // 访问器
    // ========================================

    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.inv_mass == 0.0
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[inline]
    pub fn collides(&self) -> bool {
        self.flags.contains(ParticleFlags::COLLIDE)
    }

    #[inline]
    pub fn has_movable_range(&self) -> bool {
        self.max_movable_range > 0.0
    }

    /// 本帧用于默认姿态传播的本地变换
    #[inline]
    pub fn pose_local(&self, animated: bool) -> (Vec3, Quat) {
        if animated {
            (self.local_position, self.local_rotation)
        } else {
            (self.rest_local_position, self.rest_local_rotation)
        }
    }

    /// 吸附到默认姿态并清空速度
    pub fn snap_to_default(&mut self) {
        self.position = self.default_position;
        self.step_start = self.default_position;
        self.velocity = Vec3::ZERO;
        self.world_rotation = self.default_rotation;
    }
}

/// 检查浮点参数（供 `ParticleParams::validate` 使用）
pub(crate) fn check_param(index: usize, name: &'static str, value: f32, allow_negative: bool) -> Result<()> {
    if value.is_nan() || (!allow_negative && value < 0.0) {
        return Err(DynamicsError::InvalidParameter { index, name, value });
    }
    Ok(())
}
