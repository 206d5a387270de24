//! 多链调度
//!
//! 各链之间没有共享的可变状态，`step_all` 用 rayon 按链并行；
//! 链内部的各个求解阶段仍然顺序执行。

use rayon::prelude::*;

use super::config::{get_config, SolverConfig};
use super::world::{FrameInput, World};
use crate::error::{DynamicsError, Result};
use crate::topology::ChainDesc;

/// 链句柄（ChainSet 内的槽位）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChainHandle(usize);

impl ChainHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// 一组独立的链
#[derive(Debug, Default)]
pub struct ChainSet {
    slots: Vec<Option<World>>,
    /// 新链使用的配置；None 时取全局默认
    config: Option<SolverConfig>,
}

impl ChainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有新链使用同一份配置
    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            slots: Vec::new(),
            config: Some(config),
        }
    }

    /// 构建并加入一条链
    ///
    /// 构建失败时记录一次警告并返回错误，已有的链不受影响。
    pub fn add(&mut self, desc: &ChainDesc) -> Result<ChainHandle> {
        let config = self.config.clone().unwrap_or_else(get_config);
        match World::with_config(desc, config) {
            Ok(world) => Ok(self.insert(world)),
            Err(e) => {
                log::warn!("[XPBD] 链 '{}' 构建失败，不参与模拟: {}", desc.name, e);
                Err(e)
            }
        }
    }

    /// 加入已构建的链（优先复用空槽）
    pub fn insert(&mut self, world: World) -> ChainHandle {
        if let Some(index) = self.slots.iter().position(Option::is_none) {
            self.slots[index] = Some(world);
            ChainHandle(index)
        } else {
            self.slots.push(Some(world));
            ChainHandle(self.slots.len() - 1)
        }
    }

    pub fn remove(&mut self, handle: ChainHandle) -> Result<World> {
        self.slots
            .get_mut(handle.0)
            .and_then(Option::take)
            .ok_or(DynamicsError::InvalidHandle(handle.0))
    }

    #[inline]
    pub fn get(&self, handle: ChainHandle) -> Option<&World> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, handle: ChainHandle) -> Option<&mut World> {
        self.slots.get_mut(handle.0).and_then(Option::as_mut)
    }

    /// 活动链数量
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChainHandle, &World)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|w| (ChainHandle(i), w)))
    }

    /// 推进所有链一个时间步（按链并行）
    pub fn step_all(&mut self, input: &FrameInput) {
        self.slots
            .par_iter_mut()
            .filter_map(Option::as_mut)
            .for_each(|world| world.step(input));
    }

    /// 所有链吸附到默认姿态
    pub fn reset_all(&mut self) {
        for world in self.slots.iter_mut().flatten() {
            world.reset();
        }
    }
}
