//! 求解器配置
//!
//! 扁平结构。全局实例只为新建的 World 提供默认值，
//! 求解时一律使用 World 自己持有的那份。

use once_cell::sync::Lazy;
use std::sync::RwLock;

/// 求解器配置（扁平化，不嵌套）
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    // ========== 迭代 ==========
    /// 每个外部时间步的内部迭代次数，默认 10；0 表示直接跟随默认姿态
    pub iteration_count: usize,

    // ========== 柔度 ==========
    /// 角度约束限制项柔度（硬），默认 1e-7
    pub angle_limit_compliance: f32,
    /// 碰撞接触柔度，默认 1e-9
    pub collision_compliance: f32,
    /// 活动范围约束柔度，默认 0（刚性）
    pub leash_compliance: f32,

    // ========== 骨骼回写 ==========
    /// 是否计算回写旋转，默认 true
    pub feedback_enabled: bool,
    /// 回写时是否把偏角硬限制到粒子的最大偏角，默认 true
    pub feedback_clamp_angle: bool,

    // ========== 碰撞 ==========
    /// 是否处理碰撞体，默认 true
    pub collisions_enabled: bool,

    // ========== 调试 ==========
    /// 每步输出调试日志，默认 false
    pub debug_log: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            // 5~15 之间都可用，越大越硬也越慢
            iteration_count: 10,

            angle_limit_compliance: 1e-7,
            collision_compliance: 1e-9,
            leash_compliance: 0.0,

            feedback_enabled: true,
            feedback_clamp_angle: true,

            collisions_enabled: true,

            debug_log: false,
        }
    }
}

/// 全局默认配置
static SOLVER_CONFIG: Lazy<RwLock<SolverConfig>> =
    Lazy::new(|| RwLock::new(SolverConfig::default()));

/// 获取当前默认配置
pub fn get_config() -> SolverConfig {
    SOLVER_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 设置默认配置（只影响之后创建的 World）
pub fn set_config(config: SolverConfig) {
    *SOLVER_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    *SOLVER_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = SolverConfig::default();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.iteration_count, 10);
        assert!(config.angle_limit_compliance < 1e-6);
        assert!(config.feedback_enabled);
    }
}
