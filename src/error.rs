//! 错误类型
//!
//! 只有链构建阶段的结构错误会以 `Err` 形式出现；
//! 数值退化（零逆质量、零长度向量）由 epsilon 保护的公式就地吸收。

use thiserror::Error;

/// 链构建 / 参数同步错误
#[derive(Debug, Error)]
pub enum DynamicsError {
    #[error("chain has no particles")]
    EmptyChain,

    #[error("particle {index}: parent index {parent} out of range (len {len})")]
    ParentOutOfRange { index: usize, parent: usize, len: usize },

    #[error("particle {index}: parent {parent} must precede its child in the buffer")]
    ParentNotBeforeChild { index: usize, parent: usize },

    #[error("joint {index} is part of a parent cycle")]
    Cycle { index: usize },

    #[error("constraint {constraint}: participant {particle} out of range (len {len})")]
    ConstraintOutOfRange { constraint: usize, particle: usize, len: usize },

    #[error("constraint {constraint}: both participants are particle {particle}")]
    ConstraintSelfLoop { constraint: usize, particle: usize },

    #[error("unknown constraint kind {0}")]
    UnknownConstraintKind(u8),

    #[error("unknown collider kind {0}")]
    UnknownColliderKind(u8),

    #[error("particle {index}: invalid parameter {name} = {value}")]
    InvalidParameter { index: usize, name: &'static str, value: f32 },

    #[error("parameter count mismatch: expected {expected}, got {actual}")]
    ParameterCountMismatch { expected: usize, actual: usize },

    #[error("invalid chain handle {0}")]
    InvalidHandle(usize),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, DynamicsError>;
