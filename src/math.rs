//! 数学工具
//!
//! 所有归一化都走 `v / (|v| + EPSILON)`，不分支，奇异点处得到接近零的向量而不是 NaN。

use glam::{Quat, Vec3};

/// 归一化保护量
pub const EPSILON: f32 = 1e-7;

/// 质量低于此值视为固定粒子
pub const MASS_EPSILON: f32 = 1e-6;

/// 带 epsilon 保护的归一化
#[inline]
pub fn safe_normalize(v: Vec3) -> Vec3 {
    v / (v.length() + EPSILON)
}

/// 质量 → 逆质量（过小视为固定）
#[inline]
pub fn inverse_mass(mass: f32) -> f32 {
    if mass < MASS_EPSILON {
        0.0
    } else {
        1.0 / mass
    }
}

/// 最短弧旋转：把 `from` 方向转到 `to` 方向
///
/// 任一输入为零向量时返回单位旋转。
pub fn from_to_rotation(from: Vec3, to: Vec3) -> Quat {
    let from_len = from.length();
    let to_len = to.length();
    if from_len < EPSILON || to_len < EPSILON {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(from / from_len, to / to_len)
}

/// 两方向夹角（弧度，[0, π]）
#[inline]
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    a.normalize_or_zero()
        .dot(b.normalize_or_zero())
        .clamp(-1.0, 1.0)
        .acos()
}

/// 把摆动旋转限制在 `max_angle` 以内
///
/// `angle` 是该旋转的实际角度（调用方通常已算出），超限时按比例 slerp 回去。
pub fn clamp_swing(swing: Quat, angle: f32, max_angle: f32) -> Quat {
    if angle <= max_angle || angle < EPSILON {
        swing
    } else {
        Quat::IDENTITY.slerp(swing, (max_angle / angle).max(0.0))
    }
}
