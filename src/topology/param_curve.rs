//! 参数曲线 - 沿链深度分布创作参数
//!
//! 形状用三次贝塞尔（端点固定在 (0,0) / (1,1)），预采样后线性查找；
//! 输出再线性映射到 [start, end]。

use glam::Vec2;

/// 曲线 trait
pub trait Curve {
    fn value(&self, t: f32) -> f32;
}

/// 沿链参数曲线
#[derive(Debug, Clone, PartialEq)]
pub struct ParamCurve {
    /// 根处的值
    pub start: f32,
    /// 末端的值
    pub end: f32,
    /// 预计算的形状采样点（按 x 排序）
    points: Vec<Vec2>,
}

impl ParamCurve {
    const P0: Vec2 = Vec2::ZERO;
    const P1: Vec2 = Vec2::ONE;
    const SAMPLES: u32 = 32;

    /// 贝塞尔形状曲线
    ///
    /// # 参数
    /// - `c0` / `c1`: 形状控制点（归一化到 0-1 范围）
    pub fn new(start: f32, end: f32, c0: Vec2, c1: Vec2) -> Self {
        let interval_f = Self::SAMPLES as f32;
        let mut points: Vec<Vec2> = (0..=Self::SAMPLES)
            .map(|i| {
                let t = i as f32 / interval_f;
                let it = 1.0 - t;
                // B(t) = (1-t)³P₀ + 3(1-t)²tC₀ + 3(1-t)t²C₁ + t³P₁
                Self::P0 * it.powi(3)
                    + c0 * 3.0 * it.powi(2) * t
                    + c1 * 3.0 * it * t.powi(2)
                    + Self::P1 * t.powi(3)
            })
            .collect();
        points.sort_unstable_by(|a, b| a.x.total_cmp(&b.x));
        Self { start, end, points }
    }

    /// 常量
    pub fn constant(value: f32) -> Self {
        Self::linear(value, value)
    }

    /// 线性插值
    pub fn linear(start: f32, end: f32) -> Self {
        Self::new(start, end, Vec2::splat(1.0 / 3.0), Vec2::splat(2.0 / 3.0))
    }

    /// 缓入（末端变化更快）
    pub fn ease_in(start: f32, end: f32) -> Self {
        Self::new(start, end, Vec2::new(0.42, 0.0), Vec2::ONE)
    }

    /// 缓出（根部变化更快）
    pub fn ease_out(start: f32, end: f32) -> Self {
        Self::new(start, end, Vec2::ZERO, Vec2::new(0.58, 1.0))
    }

    /// 形状值 [0, 1]
    fn shape(&self, v: f32) -> f32 {
        let v = v.clamp(0.0, 1.0);
        let mut n = (self.points[0], self.points[1]);
        for point in &self.points[2..] {
            if n.1.x > v {
                break;
            }
            n = (n.1, *point);
        }
        if n.0.x == n.1.x {
            n.0.y
        } else {
            n.0.y + (v - n.0.x) * (n.1.y - n.0.y) / (n.1.x - n.0.x)
        }
    }
}

impl Curve for ParamCurve {
    /// 按归一化深度 `t` 取值
    fn value(&self, t: f32) -> f32 {
        self.start + (self.end - self.start) * self.shape(t)
    }
}

impl Default for ParamCurve {
    fn default() -> Self {
        Self::constant(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_curve() {
        let curve = ParamCurve::linear(2.0, 4.0);
        assert!((curve.value(0.0) - 2.0).abs() < 0.01);
        assert!((curve.value(0.5) - 3.0).abs() < 0.05);
        assert!((curve.value(1.0) - 4.0).abs() < 0.01);
    }

    #[test]
    fn test_constant_curve() {
        let curve = ParamCurve::constant(0.25);
        for t in [0.0, 0.3, 0.9, 1.0] {
            assert!((curve.value(t) - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn test_ease_in_curve() {
        let curve = ParamCurve::ease_in(0.0, 1.0);
        // 缓入在开始时较慢
        assert!(curve.value(0.25) < 0.25);
    }

    #[test]
    fn test_clamped_input() {
        let curve = ParamCurve::linear(1.0, 2.0);
        assert!((curve.value(-1.0) - 1.0).abs() < 0.01);
        assert!((curve.value(3.0) - 2.0).abs() < 0.01);
    }
}
