//! 单链积分器
//!
//! 一个外部时间步：
//! 1. 根到叶传播默认姿态
//! 2. 自由运动（闭式空气阻力、速度上限、回复默认姿态），固定粒子吸附
//! 3. 清零乘子
//! 4. XPBD 内部迭代：角度 → 活动范围 → 碰撞 → 声明约束
//! 5. 由位置差重建速度
//! 6. 回写骨骼旋转

use glam::{Quat, Vec3};

use super::config::{get_config, SolverConfig};
use super::half_life;
use crate::collider::{Collider, ColliderSnapshot};
use crate::constraint::{
    is_disabled, solve_contact, solve_max_distance, AngleConstraint, AngleLambda, Constraint,
    ConstraintKind,
};
use crate::error::{DynamicsError, Result};
use crate::math::{angle_between, clamp_swing, from_to_rotation};
use crate::particle::{Particle, ParticleFlags, ParticleParams};
use crate::topology::{propagate_default_pose, ChainDesc, ChainParameters, ChainTopology, Curve};

/// 每帧驱动输入
#[derive(Clone, Copy, Debug)]
pub struct FrameInput<'a> {
    /// 外部时间步（必须 > 0）
    pub dt: f32,
    pub gravity: Vec3,
    /// 风速
    pub wind: Vec3,
    /// 全局空气阻力半衰期（<0 或无穷表示无阻力）
    pub air_drag_half_life: f32,
    /// 速度上限（无穷表示不限）
    pub max_speed: f32,
    /// true: 使用本帧动画采样的本地姿态；false: 使用静止姿态
    pub resync_animation: bool,
    /// 世界空间碰撞体快照
    pub colliders: &'a [ColliderSnapshot],
}

impl<'a> FrameInput<'a> {
    /// 标准重力、无风、无阻力、无碰撞体
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            wind: Vec3::ZERO,
            air_drag_half_life: f32::INFINITY,
            max_speed: f32::INFINITY,
            resync_animation: false,
            colliders: &[],
        }
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_wind(mut self, wind: Vec3) -> Self {
        self.wind = wind;
        self
    }

    pub fn with_air_drag(mut self, half_life: f32) -> Self {
        self.air_drag_half_life = half_life;
        self
    }

    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    pub fn with_animation(mut self, resync: bool) -> Self {
        self.resync_animation = resync;
        self
    }

    pub fn with_colliders(mut self, colliders: &'a [ColliderSnapshot]) -> Self {
        self.colliders = colliders;
        self
    }
}

/// 单条链的模拟世界
///
/// 持有粒子缓冲、约束与全部乘子；不持有任何外部变换系统的引用。
#[derive(Clone, Debug)]
pub struct World {
    name: String,
    config: SolverConfig,
    particles: Vec<Particle>,
    topology: ChainTopology,
    /// 缓冲索引 → 创作层原始索引
    source: Vec<usize>,
    constraints: Vec<Constraint>,
    /// 以子粒子索引存放（根为 None）
    angle_constraints: Vec<Option<AngleConstraint>>,
    colliders: Vec<Collider>,

    // 乘子：每个外部时间步清零
    constraint_lambdas: Vec<f32>,
    angle_lambdas: Vec<AngleLambda>,
    leash_lambdas: Vec<f32>,
    /// 粒子 × 碰撞体
    collision_lambdas: Vec<f32>,

    /// 角度迭代中每段相对默认方向的累计旋转
    delta_rotations: Vec<Quat>,

    root_position: Vec3,
    root_rotation: Quat,
    /// 上一步是否使用动画姿态
    animated: bool,
}

impl World {
    /// 使用全局默认配置构建
    pub fn build(desc: &ChainDesc) -> Result<Self> {
        Self::with_config(desc, get_config())
    }

    /// 使用指定配置构建
    pub fn with_config(desc: &ChainDesc, config: SolverConfig) -> Result<Self> {
        let parents: Vec<Option<usize>> = desc.particles.iter().map(|p| p.parent).collect();
        let topology = ChainTopology::from_parents(&parents)?;

        let particles = desc
            .particles
            .iter()
            .enumerate()
            .map(|(index, params)| {
                let parent_pose = params
                    .parent
                    .map(|p| (desc.particles[p].position, desc.particles[p].rotation));
                Particle::from_params(index, params, parent_pose)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut constraints = Vec::with_capacity(desc.constraints.len());
        for (index, constraint) in desc.constraints.iter().enumerate() {
            if let Some(constraint) = constraint.build(index, &particles)? {
                constraints.push(constraint);
            }
        }

        let len = particles.len();
        let source = if desc.source.len() == len {
            desc.source.clone()
        } else {
            (0..len).collect()
        };
        let angle_constraints = Self::angle_constraints_for(&particles, &config);
        let active_angles = angle_constraints.iter().flatten().count();

        log::info!(
            "[XPBD] 链 '{}' 构建完成: {} 粒子, {} 约束, {} 角度约束",
            desc.name,
            len,
            constraints.len(),
            active_angles
        );

        Ok(Self {
            name: desc.name.clone(),
            config,
            topology,
            source,
            constraint_lambdas: vec![0.0; constraints.len()],
            constraints,
            angle_constraints,
            colliders: Vec::new(),
            angle_lambdas: vec![AngleLambda::ZERO; len],
            leash_lambdas: vec![0.0; len],
            collision_lambdas: Vec::new(),
            delta_rotations: vec![Quat::IDENTITY; len],
            particles,
            root_position: Vec3::ZERO,
            root_rotation: Quat::IDENTITY,
            animated: false,
        })
    }

    /// 每个非根粒子一个（父, 关节, 子）三点约束；两项都关闭的跳过
    fn angle_constraints_for(particles: &[Particle], config: &SolverConfig) -> Vec<Option<AngleConstraint>> {
        particles
            .iter()
            .map(|child| {
                let joint = child.parent?;
                let constraint = AngleConstraint {
                    parent: particles[joint].parent,
                    joint,
                    child: child.index,
                    max_angle: child.max_angle,
                    neutral_compliance: child.angle_compliance,
                    limit_compliance: config.angle_limit_compliance,
                };
                constraint.is_active().then_some(constraint)
            })
            .collect()
    }

    // ========================================
    // 时间步
    // ========================================

    /// 推进一个外部时间步
    pub fn step(&mut self, input: &FrameInput) {
        debug_assert!(input.dt > 0.0, "dt must be positive");
        let dt = input.dt;

        self.animated = input.resync_animation;
        propagate_default_pose(
            &mut self.particles,
            self.root_position,
            self.root_rotation,
            self.animated,
        );

        let iterations = self.config.iteration_count;
        if iterations == 0 {
            self.follow_default_pose(dt);
            return;
        }

        self.update_colliders(input.colliders);
        self.integrate(input);
        self.reset_lambdas();

        let sub_dt = dt / iterations as f32;
        let sq_dt = sub_dt * sub_dt;
        for _ in 0..iterations {
            self.solve_angles(sq_dt);
            self.solve_leash(sq_dt);
            self.solve_collisions(sq_dt);
            self.solve_constraints(sq_dt);
        }

        self.reconstruct_velocities(dt);
        if self.config.feedback_enabled {
            self.apply_feedback();
        } else {
            self.reset_feedback_rotations();
        }

        if self.config.debug_log {
            let max_speed = self
                .particles
                .iter()
                .map(|p| p.velocity.length())
                .fold(0.0f32, f32::max);
            log::debug!(
                "[XPBD] 链 '{}' dt={:.4} 迭代={} 碰撞体={} 最大速度={:.3}",
                self.name,
                dt,
                iterations,
                self.colliders.len(),
                max_speed
            );
        }
    }

    /// 迭代次数为 0：直接跟随默认姿态，速度由差分得到
    fn follow_default_pose(&mut self, dt: f32) {
        let inv_dt = 1.0 / dt;
        for p in &mut self.particles {
            p.step_start = p.position;
            p.position = p.default_position;
            p.velocity = (p.position - p.step_start) * inv_dt;
        }
        self.reset_lambdas();
        self.reset_feedback_rotations();
    }

    fn update_colliders(&mut self, snapshots: &[ColliderSnapshot]) {
        self.colliders.clear();
        if self.config.collisions_enabled {
            self.colliders.extend(snapshots.iter().map(ColliderSnapshot::to_collider));
        }
        self.collision_lambdas
            .resize(self.particles.len() * self.colliders.len(), 0.0);
    }

    /// 自由运动
    ///
    /// `pos += (v + g·dt)·I + wind·(dt − I)`，I 为阻力衰减在 [0, dt] 上的积分；
    /// 之后按回复半衰期向默认位置插值。
    fn integrate(&mut self, input: &FrameInput) {
        let dt = input.dt;
        let drag = half_life::decay_integral(input.air_drag_half_life, dt);
        let wind = input.wind * (dt - drag);
        let max_speed = input.max_speed.max(0.0);

        for p in &mut self.particles {
            p.step_start = p.position;
            if p.is_fixed() {
                p.position = p.default_position;
                p.velocity = Vec3::ZERO;
                continue;
            }
            let velocity = p.velocity.clamp_length_max(max_speed);
            let free = p.position + (velocity + input.gravity * dt) * drag + wind;
            let keep = half_life::decay(p.restore_half_life, dt);
            p.position = p.default_position.lerp(free, keep);
        }
    }

    fn reset_lambdas(&mut self) {
        self.constraint_lambdas.fill(0.0);
        self.angle_lambdas.fill(AngleLambda::ZERO);
        self.leash_lambdas.fill(0.0);
        self.collision_lambdas.fill(0.0);
    }

    /// 角度约束，根到叶
    ///
    /// 静止方向先经关节所在段的累计旋转变换；每个三点解完后
    /// 立即更新本段的累计旋转，供下游使用。
    fn solve_angles(&mut self, sq_dt: f32) {
        for index in 0..self.particles.len() {
            let Some(joint) = self.particles[index].parent else {
                self.delta_rotations[index] = Quat::IDENTITY;
                continue;
            };
            let joint_delta = self.delta_rotations[joint];
            let default_dir =
                self.particles[index].default_position - self.particles[joint].default_position;
            let rest_direction = joint_delta * default_dir;

            if let Some(constraint) = self.angle_constraints[index] {
                let solve =
                    constraint.solve(&mut self.particles, rest_direction, sq_dt, self.angle_lambdas[index]);
                self.angle_lambdas[index].accumulate(solve.delta);
            }

            let current = self.particles[index].position - self.particles[joint].position;
            self.delta_rotations[index] = from_to_rotation(rest_direction, current) * joint_delta;
        }
    }

    /// 活动范围：到默认位置的单侧距离约束
    fn solve_leash(&mut self, sq_dt: f32) {
        let compliance = self.config.leash_compliance;
        for (p, lambda) in self.particles.iter_mut().zip(&mut self.leash_lambdas) {
            if !p.has_movable_range() || p.is_fixed() {
                continue;
            }
            let correction = solve_max_distance(
                p.position,
                p.inv_mass,
                p.default_position,
                0.0,
                p.max_movable_range,
                compliance,
                sq_dt,
                *lambda,
            );
            p.position += correction.a;
            *lambda += correction.delta_lambda;
        }
    }

    fn solve_collisions(&mut self, sq_dt: f32) {
        let count = self.colliders.len();
        if count == 0 {
            return;
        }
        let compliance = self.config.collision_compliance;
        for (p, lambdas) in self
            .particles
            .iter_mut()
            .zip(self.collision_lambdas.chunks_mut(count))
        {
            if !p.collides() {
                continue;
            }
            for (collider, lambda) in self.colliders.iter().zip(lambdas) {
                match collider.probe(p.position, p.radius) {
                    Some(contact) => {
                        let (dl, delta) = solve_contact(p.inv_mass, &contact, compliance, sq_dt, *lambda);
                        p.position += delta;
                        *lambda += dl;
                    }
                    None => *lambda = 0.0,
                }
            }
        }
    }

    /// 声明约束，按声明顺序
    fn solve_constraints(&mut self, sq_dt: f32) {
        for (constraint, lambda) in self.constraints.iter().zip(&mut self.constraint_lambdas) {
            if is_disabled(constraint.compliance()) {
                *lambda = 0.0;
                continue;
            }
            *lambda += constraint.solve(&mut self.particles, sq_dt, *lambda);
        }
    }

    fn reconstruct_velocities(&mut self, dt: f32) {
        let inv_dt = 1.0 / dt;
        for p in &mut self.particles {
            p.velocity = if p.is_fixed() {
                Vec3::ZERO
            } else {
                (p.position - p.step_start) * inv_dt
            };
        }
    }

    /// 父节点的 (回写世界旋转, 默认世界旋转)
    #[inline]
    fn parent_frames(&self, index: usize) -> (Quat, Quat) {
        match self.particles[index].parent {
            Some(p) => (self.particles[p].world_rotation, self.particles[p].default_rotation),
            None => (self.root_rotation, self.root_rotation),
        }
    }

    /// 骨骼回写
    ///
    /// 每个关节由第一个子粒子驱动：把默认的子方向以最短弧转到修正后的方向，
    /// 可选地限制到子粒子的最大偏角，并把子粒子投影回限制后的方向（保持当前长度）。
    /// 没有驱动子粒子的关节沿用父节点的修正。
    fn apply_feedback(&mut self) {
        let clamp = self.config.feedback_clamp_angle;
        for index in 0..self.particles.len() {
            let (parent_world, parent_default) = self.parent_frames(index);
            let default_rotation = self.particles[index].default_rotation;
            let mut world = parent_world * parent_default.inverse() * default_rotation;

            let driver = self
                .topology
                .first_child(index)
                .filter(|&c| self.particles[c].flags.contains(ParticleFlags::FEEDBACK));
            if let Some(child) = driver {
                let origin = self.particles[index].position;
                let default_dir =
                    self.particles[child].default_position - self.particles[index].default_position;
                let current = self.particles[child].position - origin;
                let mut swing = from_to_rotation(default_dir, current);

                let max_angle = self.particles[child].max_angle;
                if clamp {
                    let angle = angle_between(default_dir, current);
                    if angle > max_angle {
                        swing = clamp_swing(swing, angle, max_angle);
                        // 固定粒子只影响旋转，位置保持默认姿态
                        if !self.particles[child].is_fixed() {
                            let direction = (swing * default_dir).normalize_or_zero();
                            self.particles[child].position = origin + direction * current.length();
                        }
                    }
                }
                world = swing * default_rotation;
            }

            let world = world.normalize();
            let particle = &mut self.particles[index];
            particle.world_rotation = world;
            particle.local_feedback_rotation = (parent_world.inverse() * world).normalize();
        }
    }

    /// 回写旋转等于默认姿态
    fn reset_feedback_rotations(&mut self) {
        for index in 0..self.particles.len() {
            let (_, parent_default) = self.parent_frames(index);
            let particle = &mut self.particles[index];
            particle.world_rotation = particle.default_rotation;
            particle.local_feedback_rotation =
                (parent_default.inverse() * particle.default_rotation).normalize();
        }
    }

    // ========================================
    // 外部驱动
    // ========================================

    /// 设置链根变换（下一步传播默认姿态时生效）
    pub fn set_root_transform(&mut self, position: Vec3, rotation: Quat) {
        self.root_position = position;
        self.root_rotation = rotation.normalize();
    }

    /// 写入本帧动画采样的本地姿态（按缓冲顺序，每个粒子一个）
    pub fn set_local_pose(&mut self, poses: &[(Vec3, Quat)]) -> Result<()> {
        if poses.len() != self.particles.len() {
            return Err(DynamicsError::ParameterCountMismatch {
                expected: self.particles.len(),
                actual: poses.len(),
            });
        }
        for (p, &(position, rotation)) in self.particles.iter_mut().zip(poses) {
            p.local_position = position;
            p.local_rotation = rotation;
        }
        Ok(())
    }

    /// 重新同步粒子参数（不重建拓扑、不清速度）
    ///
    /// 参数中的位置与父索引被忽略。
    pub fn resync_parameters(&mut self, params: &[ParticleParams]) -> Result<()> {
        if params.len() != self.particles.len() {
            return Err(DynamicsError::ParameterCountMismatch {
                expected: self.particles.len(),
                actual: params.len(),
            });
        }
        for (index, p) in params.iter().enumerate() {
            p.validate(index)?;
        }
        for (particle, p) in self.particles.iter_mut().zip(params) {
            particle.apply_params(p);
        }
        self.angle_constraints = Self::angle_constraints_for(&self.particles, &self.config);
        Ok(())
    }

    /// 按沿链参数分布重新同步，父子距离约束的柔度一并更新
    pub fn resync_with(&mut self, parameters: &ChainParameters) -> Result<()> {
        let params: Vec<ParticleParams> = self
            .particles
            .iter()
            .enumerate()
            .map(|(index, p)| {
                let mut params =
                    ParticleParams::new(p.default_position).with_rotation(p.default_rotation);
                params.parent = p.parent;
                parameters.apply(&mut params, self.topology.normalized_depth(index));
                params
            })
            .collect();
        self.resync_parameters(&params)?;

        for constraint in &mut self.constraints {
            if constraint.kind() != ConstraintKind::Distance {
                continue;
            }
            let (a, b) = constraint.participants();
            if self.particles[b].parent == Some(a) {
                let t = self.topology.normalized_depth(b);
                constraint.set_compliance(parameters.distance_compliance.value(t).max(0.0));
            }
        }
        Ok(())
    }

    /// 吸附到当前默认姿态，清空速度与乘子（保留拓扑）
    pub fn reset(&mut self) {
        propagate_default_pose(
            &mut self.particles,
            self.root_position,
            self.root_rotation,
            self.animated,
        );
        for p in &mut self.particles {
            p.snap_to_default();
        }
        self.reset_lambdas();
        self.delta_rotations.fill(Quat::IDENTITY);
        self.reset_feedback_rotations();
    }

    /// 替换配置（角度限制柔度随之更新）
    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
        self.angle_constraints = Self::angle_constraints_for(&self.particles, &self.config);
    }

    // ========================================
    // 访问器
    // ========================================

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    #[inline]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[inline]
    pub fn particle(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    #[inline]
    pub fn topology(&self) -> &ChainTopology {
        &self.topology
    }

    #[inline]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// 缓冲索引 → 创作层原始索引
    #[inline]
    pub fn source_indices(&self) -> &[usize] {
        &self.source
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.particles.iter().map(|p| p.position)
    }

    pub fn velocities(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.particles.iter().map(|p| p.velocity)
    }

    pub fn world_rotations(&self) -> impl Iterator<Item = Quat> + '_ {
        self.particles.iter().map(|p| p.world_rotation)
    }

    /// 回写的本地旋转（相对回写后的父节点）
    pub fn local_rotations(&self) -> impl Iterator<Item = Quat> + '_ {
        self.particles.iter().map(|p| p.local_feedback_rotation)
    }

    /// 本步末的角度乘子（以子粒子索引）
    #[inline]
    pub fn angle_lambdas(&self) -> &[AngleLambda] {
        &self.angle_lambdas
    }

    /// 本步末的碰撞乘子（粒子 × 碰撞体，行优先）
    #[inline]
    pub fn collision_lambdas(&self) -> &[f32] {
        &self.collision_lambdas
    }

    #[inline]
    pub fn constraint_lambdas(&self) -> &[f32] {
        &self.constraint_lambdas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintDesc;
    use crate::topology::{ChainBuilder, ParamCurve, StrandBuilder};

    const DT: f32 = 1.0 / 60.0;

    fn config(iterations: usize) -> SolverConfig {
        SolverConfig {
            iteration_count: iterations,
            ..Default::default()
        }
    }

    /// 沿 -Y 的直链，根固定，相邻距离约束
    fn vertical_chain(count: usize, spacing: f32, compliance: f32) -> ChainDesc {
        let mut desc = ChainDesc {
            name: "test".to_string(),
            ..Default::default()
        };
        for i in 0..count {
            let position = Vec3::new(0.0, -spacing * i as f32, 0.0);
            let params = if i == 0 {
                ParticleParams::fixed(position)
            } else {
                ParticleParams::new(position).with_parent(i - 1)
            };
            desc.particles.push(params);
            if i > 0 {
                desc.constraints.push(ConstraintDesc::distance(i - 1, i, compliance));
            }
        }
        desc
    }

    fn still<'a>(dt: f32) -> FrameInput<'a> {
        FrameInput::new(dt).with_gravity(Vec3::ZERO)
    }

    #[test]
    fn test_rejects_malformed_chain() {
        let mut desc = vertical_chain(3, 1.0, 0.0);
        desc.particles[1].parent = Some(2);
        assert!(matches!(
            World::with_config(&desc, config(10)),
            Err(DynamicsError::ParentNotBeforeChild { index: 1, parent: 2 })
        ));

        let mut desc = vertical_chain(3, 1.0, 0.0);
        desc.constraints.push(ConstraintDesc::distance(0, 7, 0.0));
        assert!(matches!(
            World::with_config(&desc, config(10)),
            Err(DynamicsError::ConstraintOutOfRange { particle: 7, .. })
        ));
    }

    #[test]
    fn test_fixed_particle_follows_default_pose() {
        let desc = vertical_chain(3, 0.5, 0.0);
        let mut world = World::with_config(&desc, config(10)).unwrap();
        let mut t = 0.0f32;
        for dt in [1.0 / 30.0, 1.0 / 60.0, 1.0 / 240.0, 0.1] {
            t += dt;
            let root = Vec3::new(t.sin(), 0.3 * t, t.cos());
            world.set_root_transform(root, Quat::from_rotation_y(t));
            world.step(&FrameInput::new(dt));
            let p = &world.particles()[0];
            assert!((p.position - p.default_position).length() < 1e-6);
            assert!((p.position - root).length() < 1e-5);
            assert_eq!(p.velocity, Vec3::ZERO);
        }
    }

    #[test]
    fn test_distance_converges_with_iterations() {
        // 静止长度 1，初始间距 2
        let mut desc = ChainDesc::default();
        for i in 0..4 {
            let position = Vec3::X * (2.0 * i as f32);
            let params = if i == 0 {
                ParticleParams::fixed(position)
            } else {
                ParticleParams::new(position).with_parent(i - 1)
            };
            desc.particles.push(params);
            if i > 0 {
                desc.constraints
                    .push(ConstraintDesc::distance(i - 1, i, 0.0).with_rest(1.0));
            }
        }

        let error = |iterations: usize| {
            let mut world = World::with_config(&desc, config(iterations)).unwrap();
            world.step(&still(DT));
            let p: Vec<Vec3> = world.positions().collect();
            p.windows(2)
                .map(|w| (w[0].distance(w[1]) - 1.0).abs())
                .sum::<f32>()
        };

        let e1 = error(1);
        let e4 = error(4);
        let e16 = error(16);
        assert!(e4 < e1, "{} !< {}", e4, e1);
        assert!(e16 < e4, "{} !< {}", e16, e4);
        assert!(error(64) < 1e-3);
    }

    fn angle_chain() -> World {
        let desc = ChainDesc {
            particles: vec![
                ParticleParams::fixed(Vec3::ZERO),
                ParticleParams::new(Vec3::new(0.0, -1.0, 0.0)).with_parent(0),
                ParticleParams::new(Vec3::new(0.0, -2.0, 0.0))
                    .with_parent(1)
                    .with_angle(30f32.to_radians(), 1e-4),
            ],
            constraints: vec![ConstraintDesc::distance(0, 1, 0.0), ConstraintDesc::distance(1, 2, 0.0)],
            ..Default::default()
        };
        World::with_config(&desc, config(1)).unwrap()
    }

    fn bend(world: &mut World, degrees: f32) {
        let r = degrees.to_radians();
        world.particles[2].position = Vec3::new(r.sin(), -1.0 - r.cos(), 0.0);
    }

    #[test]
    fn test_angle_regime_switch() {
        let mut world = angle_chain();
        bend(&mut world, 10.0);
        world.step(&still(DT));
        let lambda = world.angle_lambdas()[2];
        assert!(lambda.neutral != 0.0);
        assert_eq!(lambda.limit, 0.0);

        let mut world = angle_chain();
        bend(&mut world, 45.0);
        world.step(&still(DT));
        let lambda = world.angle_lambdas()[2];
        assert!(lambda.limit != 0.0);
        assert_eq!(lambda.neutral, 0.0);
    }

    #[test]
    fn test_collision_idempotent_when_outside() {
        let desc = vertical_chain(3, 0.5, 0.0);
        let mut world = World::with_config(&desc, config(10)).unwrap();
        let colliders = [
            ColliderSnapshot::plane(Vec3::new(0.0, -10.0, 0.0), Quat::IDENTITY),
            ColliderSnapshot::sphere(Vec3::new(5.0, 0.0, 0.0), 1.0),
        ];
        for _ in 0..5 {
            world.step(&still(DT).with_colliders(&colliders));
        }
        assert_eq!(world.collision_lambdas().len(), 6);
        assert!(world.collision_lambdas().iter().all(|&l| l == 0.0));
        for p in world.particles() {
            assert!((p.position - p.default_position).length() < 1e-6);
        }
    }

    #[test]
    fn test_collision_pushes_out() {
        let desc = vertical_chain(3, 0.5, 1e-3);
        let mut world = World::with_config(&desc, config(10)).unwrap();
        let colliders = [ColliderSnapshot::sphere(Vec3::new(0.1, -1.0, 0.0), 0.3)];
        world.step(&still(DT).with_colliders(&colliders));
        let tip = world.particles()[2].position;
        assert!(tip.distance(Vec3::new(0.1, -1.0, 0.0)) > 0.29);
        assert!(world.collision_lambdas()[2 * colliders.len()] > 0.0);
    }

    #[test]
    fn test_instant_restore_round_trip() {
        for magnitude in [0.1, 10.0, 1000.0] {
            let mut desc = vertical_chain(3, 0.5, 0.0);
            for p in &mut desc.particles[1..] {
                p.restore_half_life = 0.0;
            }
            let mut world = World::with_config(&desc, config(10)).unwrap();
            world.particles[2].position += Vec3::new(magnitude, magnitude, 0.0);
            world.particles[1].velocity = Vec3::Z * magnitude;
            for _ in 0..2 {
                world.step(&still(DT));
            }
            for p in world.particles() {
                assert!(
                    (p.position - p.default_position).length() < 1e-4,
                    "magnitude {}",
                    magnitude
                );
            }
        }
    }

    #[test]
    fn test_hanging_chain_end_to_end() {
        let desc = vertical_chain(5, 0.5, 1e-6);
        let mut world = World::with_config(&desc, config(15)).unwrap();
        let before: Vec<Vec3> = world.positions().collect();
        world.step(&FrameInput::new(DT));
        let after: Vec<Vec3> = world.positions().collect();

        assert_eq!(after[0], before[0]);
        for i in 1..5 {
            assert!(after[i].y < before[i].y, "particle {} did not fall", i);
        }
        for w in after.windows(2) {
            let len = w[0].distance(w[1]);
            assert!((len - 0.5).abs() <= 0.005, "length {}", len);
        }
    }

    #[test]
    fn test_zero_iterations_follows_pose() {
        let desc = vertical_chain(3, 0.5, 0.0);
        let mut world = World::with_config(&desc, config(0)).unwrap();
        world.set_root_transform(Vec3::X, Quat::IDENTITY);
        world.step(&FrameInput::new(0.1));
        for p in world.particles() {
            assert!((p.position - p.default_position).length() < 1e-6);
            assert!((p.velocity - Vec3::X * 10.0).length() < 1e-3);
        }
    }

    #[test]
    fn test_leash_limits_range() {
        let mut desc = vertical_chain(2, 1.0, 1.0);
        desc.particles[1].max_movable_range = 0.1;
        let mut world = World::with_config(&desc, config(10)).unwrap();
        for _ in 0..30 {
            world.step(&FrameInput::new(DT));
        }
        let p = &world.particles()[1];
        assert!(p.position.distance(p.default_position) <= 0.1 + 1e-4);
    }

    #[test]
    fn test_feedback_rotation_follows_child() {
        let desc = vertical_chain(2, 1.0, 0.0);
        let mut world = World::with_config(&desc, config(1)).unwrap();
        world.particles[1].position = Vec3::X;
        world.step(&still(DT));
        let dir = world.particles()[0].world_rotation * Vec3::NEG_Y;
        assert!((dir - Vec3::X).length() < 1e-3, "{:?}", dir);
    }

    #[test]
    fn test_feedback_keeps_fixed_tip() {
        // 两端固定的绳
        let mut desc = vertical_chain(3, 1.0, 0.0);
        desc.particles[2] = ParticleParams::fixed(Vec3::new(0.0, -2.0, 0.0))
            .with_parent(1)
            .with_angle(10f32.to_radians(), 1.0);
        let cfg = SolverConfig {
            iteration_count: 1,
            angle_limit_compliance: 1e-3,
            ..Default::default()
        };
        let mut world = World::with_config(&desc, cfg).unwrap();
        world.particles[1].position = Vec3::new(0.5, -1.0, 0.0);
        world.step(&still(DT));

        let tip = &world.particles()[2];
        assert!(tip.is_fixed());
        assert!((tip.position - tip.default_position).length() < 1e-6);
        // 旋转仍按限制后的方向回写
        let dir = world.particles()[1].world_rotation * Vec3::NEG_Y;
        assert!(angle_between(Vec3::NEG_Y, dir) <= 10f32.to_radians() + 1e-3);
    }

    #[test]
    fn test_feedback_clamps_angle() {
        let mut desc = vertical_chain(2, 1.0, 0.0);
        desc.particles[1].max_angle = 30f32.to_radians();
        let cfg = SolverConfig {
            iteration_count: 1,
            // 只测回写的硬限制
            angle_limit_compliance: 1.0,
            ..Default::default()
        };
        let mut world = World::with_config(&desc, cfg).unwrap();
        world.particles[1].position = Vec3::X;
        world.step(&still(DT));
        let p = world.particles();
        let offset = p[1].position - p[0].position;
        assert!((angle_between(Vec3::NEG_Y, offset) - 30f32.to_radians()).abs() < 1e-3);
        assert!((offset.length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_resync_and_reset() {
        let desc = StrandBuilder::new(Vec3::ZERO, Vec3::NEG_Y, 0.5, 4).build().unwrap();
        let mut world = World::with_config(&desc, config(10)).unwrap();
        for _ in 0..10 {
            world.step(&FrameInput::new(DT).with_air_drag(0.5).with_wind(Vec3::X));
        }
        let velocity = world.particles()[3].velocity;

        assert!(matches!(
            world.resync_parameters(&desc.particles[..2]),
            Err(DynamicsError::ParameterCountMismatch { expected: 4, actual: 2 })
        ));

        let parameters = ChainParameters {
            radius: ParamCurve::constant(0.25),
            distance_compliance: ParamCurve::constant(1e-4),
            ..Default::default()
        };
        world.resync_with(&parameters).unwrap();
        assert!((world.particles()[3].radius - 0.25).abs() < 1e-6);
        assert_eq!(world.particles()[3].velocity, velocity);
        assert!(world
            .constraints()
            .iter()
            .all(|c| (c.compliance() - 1e-4).abs() < 1e-9));

        world.reset();
        for p in world.particles() {
            assert_eq!(p.position, p.default_position);
            assert_eq!(p.velocity, Vec3::ZERO);
        }
    }

    #[test]
    fn test_animated_pose() {
        let desc = vertical_chain(2, 1.0, 0.0);
        let mut world = World::with_config(&desc, config(0)).unwrap();
        let flipped = Quat::from_rotation_z(std::f32::consts::PI);
        world
            .set_local_pose(&[(Vec3::ZERO, flipped), (Vec3::NEG_Y, Quat::IDENTITY)])
            .unwrap();
        world.step(&still(DT).with_animation(true));
        assert!((world.particles()[1].position - Vec3::Y).length() < 1e-5);
        world.step(&still(DT));
        assert!((world.particles()[1].position - Vec3::NEG_Y).length() < 1e-5);
        assert!(world.set_local_pose(&[]).is_err());
    }
}
