//! 球体碰撞体

use glam::Vec3;

use super::Contact;
use crate::math::EPSILON;

#[derive(Clone, Copy, Debug)]
pub struct SphereCollider {
    pub center: Vec3,
    pub radius: f32,
}

impl SphereCollider {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// 平方距离与半径和比较；零距离时分母的 `+EPSILON` 保证结果有限
    pub fn probe(&self, position: Vec3, radius: f32) -> Option<Contact> {
        probe_sphere(self.center, self.radius, position, radius)
    }
}

/// 球-球探测（胶囊复用）
#[inline]
pub(crate) fn probe_sphere(center: Vec3, sphere_radius: f32, position: Vec3, radius: f32) -> Option<Contact> {
    let offset = position - center;
    let sum = sphere_radius + radius;
    let dist_sq = offset.length_squared();
    if dist_sq >= sum * sum {
        return None;
    }
    let dist = dist_sq.sqrt();
    Some(Contact {
        normal: offset / (dist + EPSILON),
        depth: sum - dist,
    })
}
