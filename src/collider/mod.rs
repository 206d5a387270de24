//! 碰撞体图元
//!
//! 每帧由外部变换快照重建一次（世界空间），对粒子无状态。
//! 两种输出形式：
//! - probe: 法线 + 穿透深度，交给接触约束求解
//! - push_out: 直接给出"不穿透"的修正位置

mod capsule;
mod cuboid;
mod plane;
mod sphere;

pub use capsule::CapsuleCollider;
pub use cuboid::BoxCollider;
pub use plane::PlaneCollider;
pub use sphere::SphereCollider;

use glam::{Quat, Vec3};

use crate::error::{DynamicsError, Result};

/// 接触信息（探测形式）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// 推出方向（单位向量，指向碰撞体外）
    pub normal: Vec3,
    /// 穿透深度（> 0）
    pub depth: f32,
}

impl Contact {
    /// 推出后的位置
    #[inline]
    pub fn resolve(&self, position: Vec3) -> Vec3 {
        position + self.normal * self.depth
    }
}

/// 世界空间碰撞体
#[derive(Clone, Copy, Debug)]
pub enum Collider {
    Sphere(SphereCollider),
    Capsule(CapsuleCollider),
    Box(BoxCollider),
    Plane(PlaneCollider),
}

impl Collider {
    /// 探测：返回法线与深度，未穿透返回 None
    pub fn probe(&self, position: Vec3, radius: f32) -> Option<Contact> {
        match self {
            Collider::Sphere(s) => s.probe(position, radius),
            Collider::Capsule(c) => c.probe(position, radius),
            Collider::Box(b) => b.probe(position, radius),
            Collider::Plane(p) => p.probe(position, radius),
        }
    }

    /// 推出：返回不穿透的位置，未穿透返回 None
    #[inline]
    pub fn push_out(&self, position: Vec3, radius: f32) -> Option<Vec3> {
        self.probe(position, radius).map(|c| c.resolve(position))
    }

    pub fn kind(&self) -> ColliderKind {
        match self {
            Collider::Sphere(_) => ColliderKind::Sphere,
            Collider::Capsule(_) => ColliderKind::Capsule,
            Collider::Box(_) => ColliderKind::Box,
            Collider::Plane(_) => ColliderKind::Plane,
        }
    }
}

// ============================================================================
// 外部快照
// ============================================================================

/// 碰撞体种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColliderKind {
    Sphere = 0,
    Capsule = 1,
    Box = 2,
    Plane = 3,
}

impl ColliderKind {
    /// 从外部原始编码转换，未知编码是创作层错误
    pub fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(ColliderKind::Sphere),
            1 => Ok(ColliderKind::Capsule),
            2 => Ok(ColliderKind::Box),
            3 => Ok(ColliderKind::Plane),
            other => Err(DynamicsError::UnknownColliderKind(other)),
        }
    }
}

/// 碰撞体变换快照（外部每帧提供）
///
/// 形状参数在本地空间描述：
/// - 球体：`radius`
/// - 胶囊：沿本地 Y 轴，`height` 为两端球心距离，两端半径 `radius` / `radius_tail`
/// - 盒子：`half_extents`
/// - 平面：本地 +Y 为法线，`position` 在平面上
#[derive(Clone, Copy, Debug)]
pub struct ColliderSnapshot {
    pub kind: ColliderKind,
    pub position: Vec3,
    pub rotation: Quat,
    /// 统一缩放（取外部变换缩放的最大分量）
    pub scale: f32,
    pub radius: f32,
    pub radius_tail: f32,
    pub height: f32,
    pub half_extents: Vec3,
}

impl ColliderSnapshot {
    pub fn sphere(position: Vec3, radius: f32) -> Self {
        Self {
            kind: ColliderKind::Sphere,
            position,
            rotation: Quat::IDENTITY,
            scale: 1.0,
            radius,
            radius_tail: radius,
            height: 0.0,
            half_extents: Vec3::ZERO,
        }
    }

    pub fn capsule(position: Vec3, rotation: Quat, height: f32, radius: f32, radius_tail: f32) -> Self {
        Self {
            kind: ColliderKind::Capsule,
            position,
            rotation,
            scale: 1.0,
            radius,
            radius_tail,
            height,
            half_extents: Vec3::ZERO,
        }
    }

    pub fn cuboid(position: Vec3, rotation: Quat, half_extents: Vec3) -> Self {
        Self {
            kind: ColliderKind::Box,
            position,
            rotation,
            scale: 1.0,
            radius: 0.0,
            radius_tail: 0.0,
            height: 0.0,
            half_extents,
        }
    }

    pub fn plane(position: Vec3, rotation: Quat) -> Self {
        Self {
            kind: ColliderKind::Plane,
            position,
            rotation,
            scale: 1.0,
            radius: 0.0,
            radius_tail: 0.0,
            height: 0.0,
            half_extents: Vec3::ZERO,
        }
    }

    /// 转换为世界空间图元
    pub fn to_collider(&self) -> Collider {
        let s = self.scale;
        match self.kind {
            ColliderKind::Sphere => Collider::Sphere(SphereCollider::new(self.position, self.radius * s)),
            ColliderKind::Capsule => {
                let axis = self.rotation * Vec3::Y;
                Collider::Capsule(CapsuleCollider::new(
                    self.position,
                    axis,
                    self.height * 0.5 * s,
                    self.radius * s,
                    self.radius_tail * s,
                ))
            }
            ColliderKind::Box => Collider::Box(BoxCollider::new(
                self.position,
                self.rotation,
                self.half_extents * s,
            )),
            ColliderKind::Plane => {
                Collider::Plane(PlaneCollider::new(self.position, self.rotation * Vec3::Y))
            }
        }
    }
}
