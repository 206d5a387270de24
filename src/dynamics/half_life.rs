//! 半衰期衰减
//!
//! 空气阻力与回复力都用 `2^(-t/HL)` 描述，积分取闭式解，
//! 因此结果与外部步长的切分方式无关。

use std::f32::consts::LN_2;

use crate::math::EPSILON;

/// 半衰期是否视为"瞬时"（衰减到 0）
#[inline]
fn is_instant(half_life: f32) -> bool {
    half_life >= 0.0 && half_life <= EPSILON
}

/// 半衰期是否视为"关闭"（永不衰减）
#[inline]
fn is_disabled(half_life: f32) -> bool {
    half_life < 0.0 || !half_life.is_finite()
}

/// 经过 `t` 后的剩余比例 `2^(-t/HL)`
///
/// - `HL ≈ 0` → 0
/// - `HL < 0` 或无穷 → 1
#[inline]
pub fn decay(half_life: f32, t: f32) -> f32 {
    if is_disabled(half_life) {
        1.0
    } else if is_instant(half_life) {
        0.0
    } else {
        (-t / half_life).exp2()
    }
}

/// `∫₀ᵗ 2^(-s/HL) ds = HL / ln2 · (1 - 2^(-t/HL))`
///
/// - `HL ≈ 0` → 0（速度立即耗尽）
/// - `HL < 0` 或无穷 → t（没有阻力）
#[inline]
pub fn decay_integral(half_life: f32, t: f32) -> f32 {
    if is_disabled(half_life) {
        t
    } else if is_instant(half_life) {
        0.0
    } else {
        half_life / LN_2 * (1.0 - decay(half_life, t))
    }
}
