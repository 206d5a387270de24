//! 积分器
//!
//! - World: 单条链的完整时间步（默认姿态 → 自由运动 → XPBD 迭代 → 速度重建 → 骨骼回写）
//! - ChainSet: 持有多条互相独立的链，按链并行推进
//! - SolverConfig: 扁平配置与全局默认值

mod chain_set;
mod config;
pub mod half_life;
mod world;

pub use chain_set::{ChainHandle, ChainSet};
pub use config::{get_config, reset_config, set_config, SolverConfig};
pub use world::{FrameInput, World};
