//! 无限平面（半空间）碰撞体

use glam::Vec3;

use super::Contact;
use crate::math::safe_normalize;

#[derive(Clone, Copy, Debug)]
pub struct PlaneCollider {
    pub point: Vec3,
    pub normal: Vec3,
}

impl PlaneCollider {
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        Self {
            point,
            normal: safe_normalize(normal),
        }
    }

    /// 沿法线的有符号距离小于粒子半径时推出到正面
    pub fn probe(&self, position: Vec3, radius: f32) -> Option<Contact> {
        let distance = (position - self.point).dot(self.normal);
        if distance >= radius {
            return None;
        }
        Some(Contact {
            normal: self.normal,
            depth: radius - distance,
        })
    }
}
