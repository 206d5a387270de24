//! 骨骼链二次运动求解器
//!
//! 头发、裙摆、绳索等附属物的 XPBD 模拟：
//! - particle: 粒子数据模型（每个骨骼节点一个质点）
//! - collider: 球体 / 胶囊 / 盒子 / 平面碰撞体
//! - constraint: 距离、最大距离、轴向、带限角度约束
//! - topology: 链拓扑、默认姿态传播、链构建器
//! - dynamics: 积分器（World）与多链并行调度（ChainSet）

pub mod collider;
pub mod constraint;
pub mod dynamics;
pub mod error;
pub mod math;
pub mod particle;
pub mod topology;

pub use collider::{Collider, ColliderKind, ColliderSnapshot, Contact};
pub use constraint::{
    AngleConstraint, AngleLambda, Constraint, ConstraintDesc, ConstraintKind,
    DISABLED_COMPLIANCE,
};
pub use dynamics::{
    get_config, reset_config, set_config, ChainHandle, ChainSet, FrameInput, SolverConfig,
    World,
};
pub use error::{DynamicsError, Result};
pub use particle::{Particle, ParticleFlags, ParticleParams};
pub use topology::{
    ChainBuilder, ChainDesc, ChainParameters, ChainTopology, GridBuilder, ParamCurve,
    StrandBuilder, TreeBuilder, TreeJoint,
};
