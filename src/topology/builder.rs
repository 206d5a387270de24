//! 链构建器
//!
//! 不同拓扑生成器实现同一个 `ChainBuilder` 接口，输出有序粒子缓冲
//! （父在子前）与约束列表；积分器本身与拓扑无关。

use std::f32::consts::PI;

use glam::{Quat, Vec3};

use super::param_curve::{Curve, ParamCurve};
use crate::constraint::ConstraintDesc;
use crate::error::{DynamicsError, Result};
use crate::math::safe_normalize;
use crate::particle::{ParticleFlags, ParticleParams};

// ============================================================================
// 构建输出
// ============================================================================

/// 一条链的构建数据
#[derive(Clone, Debug, Default)]
pub struct ChainDesc {
    /// 调试名称
    pub name: String,
    /// 有序粒子参数（父在子前）
    pub particles: Vec<ParticleParams>,
    /// 约束列表（按声明顺序求解）
    pub constraints: Vec<ConstraintDesc>,
    /// 缓冲索引 → 创作层原始索引
    pub source: Vec<usize>,
}

/// 拓扑生成器
pub trait ChainBuilder {
    fn build(&self) -> Result<ChainDesc>;
}

// ============================================================================
// 参数分布
// ============================================================================

/// 沿链分布的创作参数（按归一化深度采样）
#[derive(Clone, Debug)]
pub struct ChainParameters {
    pub mass: ParamCurve,
    pub radius: ParamCurve,
    /// 最大偏角（弧度）
    pub max_angle: ParamCurve,
    pub angle_compliance: ParamCurve,
    /// 回复半衰期（秒，<0 关闭）
    pub restore_half_life: ParamCurve,
    /// 最大活动范围（<=0 不限）
    pub movable_range: ParamCurve,
    /// 父子距离约束柔度
    pub distance_compliance: ParamCurve,
    /// 根粒子固定
    pub fixed_roots: bool,
    pub flags: ParticleFlags,
}

impl Default for ChainParameters {
    fn default() -> Self {
        Self {
            mass: ParamCurve::constant(1.0),
            radius: ParamCurve::constant(0.02),
            max_angle: ParamCurve::constant(PI / 3.0),
            angle_compliance: ParamCurve::constant(1e-3),
            restore_half_life: ParamCurve::constant(-1.0),
            movable_range: ParamCurve::constant(0.0),
            distance_compliance: ParamCurve::constant(0.0),
            fixed_roots: true,
            flags: ParticleFlags::default(),
        }
    }
}

impl ChainParameters {
    /// 把深度 `t` 处的参数写入 `params`（位置与父关系不动）
    pub fn apply(&self, params: &mut ParticleParams, t: f32) {
        let is_root = params.parent.is_none();
        params.mass = if is_root && self.fixed_roots {
            0.0
        } else {
            self.mass.value(t).max(0.0)
        };
        params.radius = self.radius.value(t).max(0.0);
        params.max_angle = self.max_angle.value(t).clamp(0.0, PI);
        params.angle_compliance = self.angle_compliance.value(t).max(0.0);
        params.restore_half_life = self.restore_half_life.value(t);
        params.max_movable_range = self.movable_range.value(t);
        params.flags = self.flags;
    }

    fn particle(&self, position: Vec3, rotation: Quat, parent: Option<usize>, t: f32) -> ParticleParams {
        let mut params = ParticleParams::new(position).with_rotation(rotation);
        params.parent = parent;
        self.apply(&mut params, t);
        params
    }

    fn link(&self, a: usize, b: usize, t: f32) -> ConstraintDesc {
        ConstraintDesc::distance(a, b, self.distance_compliance.value(t).max(0.0))
    }
}

// ============================================================================
// 单链（绳 / 辫子）
// ============================================================================

/// 单条直链：`count` 个粒子，从 `origin` 沿 `direction` 等距排列
#[derive(Clone, Debug)]
pub struct StrandBuilder {
    pub name: String,
    pub origin: Vec3,
    pub direction: Vec3,
    pub segment_length: f32,
    pub count: usize,
    pub parameters: ChainParameters,
}

impl StrandBuilder {
    pub fn new(origin: Vec3, direction: Vec3, segment_length: f32, count: usize) -> Self {
        Self {
            name: "strand".to_string(),
            origin,
            direction,
            segment_length,
            count,
            parameters: ChainParameters::default(),
        }
    }

    pub fn with_parameters(mut self, parameters: ChainParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

impl ChainBuilder for StrandBuilder {
    fn build(&self) -> Result<ChainDesc> {
        if self.count == 0 {
            return Err(DynamicsError::EmptyChain);
        }
        let dir = safe_normalize(self.direction);
        let last = (self.count - 1).max(1) as f32;

        let mut desc = ChainDesc {
            name: self.name.clone(),
            ..Default::default()
        };
        for i in 0..self.count {
            let t = i as f32 / last;
            let parent = i.checked_sub(1);
            let position = self.origin + dir * (self.segment_length * i as f32);
            desc.particles
                .push(self.parameters.particle(position, Quat::IDENTITY, parent, t));
            if let Some(parent) = parent {
                desc.constraints.push(self.parameters.link(parent, i, t));
            }
            desc.source.push(i);
        }
        Ok(desc)
    }
}

// ============================================================================
// 树（任意骨骼层级）
// ============================================================================

/// 创作层骨骼节点（任意顺序）
#[derive(Clone, Debug)]
pub struct TreeJoint {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub parent: Option<usize>,
}

/// 从骨骼层级构建：重排为深度优先前序，保证父在子前
#[derive(Clone, Debug)]
pub struct TreeBuilder {
    pub name: String,
    pub joints: Vec<TreeJoint>,
    pub parameters: ChainParameters,
    /// 相邻兄弟之间加距离约束（平面树 / 裙摆）
    pub sibling_links: bool,
}

impl TreeBuilder {
    pub fn new(joints: Vec<TreeJoint>) -> Self {
        Self {
            name: "tree".to_string(),
            joints,
            parameters: ChainParameters::default(),
            sibling_links: false,
        }
    }

    pub fn with_parameters(mut self, parameters: ChainParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_sibling_links(mut self, enabled: bool) -> Self {
        self.sibling_links = enabled;
        self
    }

    /// 深度优先前序；返回 (缓冲顺序 → 原索引, 原索引深度)
    fn order(&self) -> Result<(Vec<usize>, Vec<u32>)> {
        let len = self.joints.len();
        let mut children = vec![Vec::new(); len];
        let mut roots = Vec::new();
        for (index, joint) in self.joints.iter().enumerate() {
            match joint.parent {
                Some(parent) if parent >= len => {
                    return Err(DynamicsError::ParentOutOfRange { index, parent, len });
                }
                Some(parent) => children[parent].push(index),
                None => roots.push(index),
            }
        }

        let mut order = Vec::with_capacity(len);
        let mut depth = vec![0u32; len];
        let mut stack: Vec<usize> = roots.into_iter().rev().collect();
        while let Some(index) = stack.pop() {
            order.push(index);
            for &child in children[index].iter().rev() {
                depth[child] = depth[index] + 1;
                stack.push(child);
            }
        }

        // 环上的节点永远到不了
        if order.len() < len {
            let mut visited = vec![false; len];
            for &index in &order {
                visited[index] = true;
            }
            if let Some(index) = visited.iter().position(|v| !v) {
                return Err(DynamicsError::Cycle { index });
            }
        }
        Ok((order, depth))
    }
}

impl ChainBuilder for TreeBuilder {
    fn build(&self) -> Result<ChainDesc> {
        if self.joints.is_empty() {
            return Err(DynamicsError::EmptyChain);
        }
        let (order, depth) = self.order()?;
        let max_depth = depth.iter().copied().max().unwrap_or(0).max(1) as f32;

        let mut slot = vec![0usize; self.joints.len()];
        for (buffer, &source) in order.iter().enumerate() {
            slot[source] = buffer;
        }

        let mut desc = ChainDesc {
            name: self.name.clone(),
            source: order.clone(),
            ..Default::default()
        };
        let mut last_child: Vec<Option<usize>> = vec![None; order.len()];
        for (buffer, &source) in order.iter().enumerate() {
            let joint = &self.joints[source];
            let t = depth[source] as f32 / max_depth;
            let parent = joint.parent.map(|p| slot[p]);
            desc.particles
                .push(self.parameters.particle(joint.position, joint.rotation, parent, t));
            if let Some(parent) = parent {
                desc.constraints.push(self.parameters.link(parent, buffer, t));
                if self.sibling_links {
                    if let Some(sibling) = last_child[parent] {
                        desc.constraints.push(self.parameters.link(sibling, buffer, t));
                    }
                    last_child[parent] = Some(buffer);
                }
            }
        }
        Ok(desc)
    }
}

// ============================================================================
// 网格（布料 / 裙摆）
// ============================================================================

/// 行优先网格：第 0 行为根，每列是一条向下的链，同行相邻列加横向约束
#[derive(Clone, Debug)]
pub struct GridBuilder {
    pub name: String,
    pub origin: Vec3,
    /// 列方向（单位间距）
    pub right: Vec3,
    /// 行方向（单位间距）
    pub down: Vec3,
    pub columns: usize,
    pub rows: usize,
    pub parameters: ChainParameters,
    /// 横向约束柔度（>=1 关闭）
    pub horizontal_compliance: f32,
    /// 首尾列相连（环形裙摆）
    pub wrap: bool,
}

impl GridBuilder {
    pub fn new(origin: Vec3, right: Vec3, down: Vec3, columns: usize, rows: usize) -> Self {
        Self {
            name: "grid".to_string(),
            origin,
            right,
            down,
            columns,
            rows,
            parameters: ChainParameters::default(),
            horizontal_compliance: 0.0,
            wrap: false,
        }
    }

    pub fn with_parameters(mut self, parameters: ChainParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_horizontal_compliance(mut self, compliance: f32) -> Self {
        self.horizontal_compliance = compliance;
        self
    }

    pub fn with_wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    #[inline]
    fn index(&self, row: usize, column: usize) -> usize {
        row * self.columns + column
    }
}

impl ChainBuilder for GridBuilder {
    fn build(&self) -> Result<ChainDesc> {
        if self.columns == 0 || self.rows == 0 {
            return Err(DynamicsError::EmptyChain);
        }
        let last_row = (self.rows - 1).max(1) as f32;

        let mut desc = ChainDesc {
            name: self.name.clone(),
            ..Default::default()
        };
        for row in 0..self.rows {
            let t = row as f32 / last_row;
            for column in 0..self.columns {
                let index = self.index(row, column);
                let position = self.origin + self.right * column as f32 + self.down * row as f32;
                let parent = row.checked_sub(1).map(|r| self.index(r, column));
                desc.particles
                    .push(self.parameters.particle(position, Quat::IDENTITY, parent, t));
                desc.source.push(index);
                if let Some(parent) = parent {
                    desc.constraints.push(self.parameters.link(parent, index, t));
                }
            }
            // 根行固定，横向约束从第 1 行开始
            if row == 0 {
                continue;
            }
            for column in 1..self.columns {
                desc.constraints.push(ConstraintDesc::distance(
                    self.index(row, column - 1),
                    self.index(row, column),
                    self.horizontal_compliance,
                ));
            }
            if self.wrap && self.columns > 2 {
                desc.constraints.push(ConstraintDesc::distance(
                    self.index(row, self.columns - 1),
                    self.index(row, 0),
                    self.horizontal_compliance,
                ));
            }
        }
        Ok(desc)
    }
}
