//! 胶囊碰撞体（两端半径可不同）

use glam::Vec3;

use super::sphere::probe_sphere;
use super::Contact;
use crate::math::safe_normalize;

/// 胶囊：中心 + 单位轴向，两端球心距中心 `half_height`
#[derive(Clone, Copy, Debug)]
pub struct CapsuleCollider {
    pub center: Vec3,
    pub axis: Vec3,
    pub half_height: f32,
    /// 轴向负端（底）半径
    pub radius_head: f32,
    /// 轴向正端（顶）半径
    pub radius_tail: f32,
}

impl CapsuleCollider {
    pub fn new(center: Vec3, axis: Vec3, half_height: f32, radius_head: f32, radius_tail: f32) -> Self {
        Self {
            center,
            axis: safe_normalize(axis),
            half_height: half_height.max(0.0),
            radius_head,
            radius_tail,
        }
    }

    pub fn probe(&self, position: Vec3, radius: f32) -> Option<Contact> {
        let offset = position - self.center;

        // 包围球粗判：取两端球半径和的较大者
        let bound = self.half_height + self.radius_head.max(self.radius_tail) + radius;
        if offset.length_squared() >= bound * bound {
            return None;
        }

        let t = offset.dot(self.axis);
        if t <= -self.half_height {
            // 底端球
            let head = self.center - self.axis * self.half_height;
            probe_sphere(head, self.radius_head, position, radius)
        } else if t >= self.half_height {
            // 顶端球
            let tail = self.center + self.axis * self.half_height;
            probe_sphere(tail, self.radius_tail, position, radius)
        } else {
            // 圆柱段：投影点上的插值半径
            let s = if self.half_height > 0.0 {
                (t + self.half_height) / (2.0 * self.half_height)
            } else {
                0.5
            };
            let r = self.radius_head + (self.radius_tail - self.radius_head) * s;
            probe_sphere(self.center + self.axis * t, r, position, radius)
        }
    }
}
