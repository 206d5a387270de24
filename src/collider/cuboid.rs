//! 有向盒碰撞体

use glam::{Quat, Vec3};

use super::Contact;
use crate::math::EPSILON;

#[derive(Clone, Copy, Debug)]
pub struct BoxCollider {
    pub center: Vec3,
    pub rotation: Quat,
    pub half_extents: Vec3,
}

impl BoxCollider {
    pub fn new(center: Vec3, rotation: Quat, half_extents: Vec3) -> Self {
        Self {
            center,
            rotation,
            half_extents: half_extents.abs(),
        }
    }

    /// 按三组平行平面（slab）分类：
    /// - 三轴都在内部：选退出距离最短的轴做面推出
    /// - 否则：内部轴清零，外部残差即到最近特征（点/边/面）的向量
    pub fn probe(&self, position: Vec3, radius: f32) -> Option<Contact> {
        let local = self.rotation.inverse() * (position - self.center);
        let h = self.half_extents;
        let abs = local.abs();
        let inside = abs.cmplt(h);

        if inside.all() {
            let exit = h - abs;
            let (axis, depth) = if exit.x <= exit.y && exit.x <= exit.z {
                (Vec3::X * local.x.signum(), exit.x)
            } else if exit.y <= exit.z {
                (Vec3::Y * local.y.signum(), exit.y)
            } else {
                (Vec3::Z * local.z.signum(), exit.z)
            };
            return Some(Contact {
                normal: self.rotation * axis,
                depth: depth + radius,
            });
        }

        let residual = local - local.clamp(-h, h);
        let dist = residual.length();
        if dist > radius {
            return None;
        }
        let normal = residual / (dist + EPSILON);
        let depth = radius - dist;
        if depth <= 0.0 {
            return None;
        }
        Some(Contact {
            normal: self.rotation * normal,
            depth,
        })
    }
}
