//! 链拓扑
//!
//! - ChainTopology: 父 / 子 / 兄弟关系与深度，构建时校验"父在子前"
//! - propagate_default_pose: 一次根到叶遍历计算默认世界姿态
//! - ParamCurve / ChainParameters: 沿链分布的创作参数
//! - ChainBuilder: 单链、树、网格三种拓扑生成器

mod builder;
mod param_curve;

pub use builder::{
    ChainBuilder, ChainDesc, ChainParameters, GridBuilder, StrandBuilder, TreeBuilder, TreeJoint,
};
pub use param_curve::{Curve, ParamCurve};

use glam::{Quat, Vec3};

use crate::error::{DynamicsError, Result};
use crate::particle::Particle;

/// 链拓扑（只存索引关系）
#[derive(Clone, Debug, Default)]
pub struct ChainTopology {
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    next_sibling: Vec<Option<usize>>,
    depth: Vec<u32>,
    max_depth: u32,
    roots: Vec<usize>,
}

impl ChainTopology {
    /// 从父索引列表构建
    ///
    /// 父索引必须在范围内且严格小于子索引。
    pub fn from_parents(parents: &[Option<usize>]) -> Result<Self> {
        let len = parents.len();
        if len == 0 {
            return Err(DynamicsError::EmptyChain);
        }

        let mut children = vec![Vec::new(); len];
        let mut next_sibling = vec![None; len];
        let mut depth = vec![0u32; len];
        let mut roots = Vec::new();
        let mut last_child: Vec<Option<usize>> = vec![None; len];
        let mut last_root: Option<usize> = None;

        for (index, parent) in parents.iter().enumerate() {
            match *parent {
                Some(parent) => {
                    if parent >= len {
                        return Err(DynamicsError::ParentOutOfRange { index, parent, len });
                    }
                    if parent >= index {
                        return Err(DynamicsError::ParentNotBeforeChild { index, parent });
                    }
                    depth[index] = depth[parent] + 1;
                    if let Some(prev) = last_child[parent] {
                        next_sibling[prev] = Some(index);
                    }
                    last_child[parent] = Some(index);
                    children[parent].push(index);
                }
                None => {
                    if let Some(prev) = last_root {
                        next_sibling[prev] = Some(index);
                    }
                    last_root = Some(index);
                    roots.push(index);
                }
            }
        }

        let max_depth = depth.iter().copied().max().unwrap_or(0);
        Ok(Self {
            parents: parents.to_vec(),
            children,
            next_sibling,
            depth,
            max_depth,
            roots,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    #[inline]
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents[index]
    }

    #[inline]
    pub fn children(&self, index: usize) -> &[usize] {
        &self.children[index]
    }

    #[inline]
    pub fn first_child(&self, index: usize) -> Option<usize> {
        self.children[index].first().copied()
    }

    /// 同一父节点下的下一个兄弟（根之间也串成兄弟）
    #[inline]
    pub fn next_sibling(&self, index: usize) -> Option<usize> {
        self.next_sibling[index]
    }

    #[inline]
    pub fn is_leaf(&self, index: usize) -> bool {
        self.children[index].is_empty()
    }

    #[inline]
    pub fn depth(&self, index: usize) -> u32 {
        self.depth[index]
    }

    /// 归一化深度 [0, 1]，用于沿链采样参数曲线
    #[inline]
    pub fn normalized_depth(&self, index: usize) -> f32 {
        if self.max_depth == 0 {
            0.0
        } else {
            self.depth[index] as f32 / self.max_depth as f32
        }
    }

    #[inline]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// 第一个子节点是否为 `child`（回写旋转由第一个子节点驱动）
    #[inline]
    pub fn is_first_child(&self, child: usize) -> bool {
        match self.parents[child] {
            Some(parent) => self.first_child(parent) == Some(child),
            None => false,
        }
    }
}

/// 根到叶传播默认世界姿态
///
/// 根粒子的本地姿态相对链根变换 (`root_position`, `root_rotation`)；
/// `animated` 为 true 时使用本帧动画采样的本地姿态，否则使用静止姿态。
/// 依赖"父在子前"的存储顺序，单次线性遍历即可。
pub fn propagate_default_pose(
    particles: &mut [Particle],
    root_position: Vec3,
    root_rotation: Quat,
    animated: bool,
) {
    for index in 0..particles.len() {
        let (local_pos, local_rot) = particles[index].pose_local(animated);
        let (parent_pos, parent_rot) = match particles[index].parent {
            Some(parent) => (
                particles[parent].default_position,
                particles[parent].default_rotation,
            ),
            None => (root_position, root_rotation),
        };
        let particle = &mut particles[index];
        particle.default_position = parent_pos + parent_rot * local_pos;
        particle.default_rotation = (parent_rot * local_rot).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleParams;

    #[test]
    fn test_linkage() {
        let topo = ChainTopology::from_parents(&[None, Some(0), Some(0), Some(1), None]).unwrap();
        assert_eq!(topo.children(0), &[1, 2]);
        assert_eq!(topo.first_child(0), Some(1));
        assert_eq!(topo.next_sibling(1), Some(2));
        assert_eq!(topo.next_sibling(2), None);
        assert_eq!(topo.next_sibling(0), Some(4));
        assert_eq!(topo.roots(), &[0, 4]);
        assert_eq!(topo.depth(3), 2);
        assert!((topo.normalized_depth(1) - 0.5).abs() < 1e-6);
        assert!(topo.is_leaf(3));
        assert!(topo.is_first_child(1));
        assert!(!topo.is_first_child(2));
    }

    #[test]
    fn test_rejects_bad_order() {
        assert!(matches!(
            ChainTopology::from_parents(&[Some(1), None]),
            Err(DynamicsError::ParentNotBeforeChild { index: 0, parent: 1 })
        ));
        assert!(matches!(
            ChainTopology::from_parents(&[None, Some(9)]),
            Err(DynamicsError::ParentOutOfRange { index: 1, parent: 9, len: 2 })
        ));
        assert!(matches!(
            ChainTopology::from_parents(&[]),
            Err(DynamicsError::EmptyChain)
        ));
    }

    #[test]
    fn test_propagate_follows_root() {
        let p0 = ParticleParams::fixed(Vec3::ZERO);
        let p1 = ParticleParams::new(Vec3::new(0.0, -1.0, 0.0)).with_parent(0);
        let mut particles = vec![
            Particle::from_params(0, &p0, None).unwrap(),
            Particle::from_params(1, &p1, Some((Vec3::ZERO, Quat::IDENTITY))).unwrap(),
        ];
        let rot = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        propagate_default_pose(&mut particles, Vec3::new(5.0, 0.0, 0.0), rot, false);
        assert!((particles[0].default_position - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-5);
        // -Y 绕 Z 转 90° 得 +X
        assert!((particles[1].default_position - Vec3::new(6.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_propagate_animated_pose() {
        let p0 = ParticleParams::fixed(Vec3::ZERO);
        let p1 = ParticleParams::new(Vec3::new(0.0, -1.0, 0.0)).with_parent(0);
        let mut particles = vec![
            Particle::from_params(0, &p0, None).unwrap(),
            Particle::from_params(1, &p1, Some((Vec3::ZERO, Quat::IDENTITY))).unwrap(),
        ];
        particles[0].local_rotation = Quat::from_rotation_z(std::f32::consts::PI);
        propagate_default_pose(&mut particles, Vec3::ZERO, Quat::IDENTITY, true);
        assert!((particles[1].default_position - Vec3::Y).length() < 1e-5);
        propagate_default_pose(&mut particles, Vec3::ZERO, Quat::IDENTITY, false);
        assert!((particles[1].default_position + Vec3::Y).length() < 1e-5);
    }
}
