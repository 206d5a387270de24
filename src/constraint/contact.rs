//! 碰撞接触约束：每帧临时生成的单侧"沿法线最小距离"约束

use glam::Vec3;

use super::{delta_lambda, INV_MASS_EPSILON};
use crate::collider::Contact;

/// 求解单个粒子对碰撞体的接触
///
/// `C = −depth`（穿透为负），梯度为接触法线。只允许推出，累计 λ 不会变负。
/// 返回 (Δλ, 位移)。
pub fn solve_contact(
    inv_mass: f32,
    contact: &Contact,
    compliance: f32,
    sq_dt: f32,
    lambda: f32,
) -> (f32, Vec3) {
    if inv_mass < INV_MASS_EPSILON {
        return (0.0, Vec3::ZERO);
    }
    let dl = delta_lambda(-contact.depth, inv_mass, compliance, sq_dt, lambda).max(-lambda);
    (dl, contact.normal * (inv_mass * dl))
}
