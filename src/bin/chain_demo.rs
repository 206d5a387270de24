//! 链模拟演示
//!
//! 一条辫子 + 一片裙摆，绕着一个移动的球体摆动，定期打印末端位置。
//! 运行：`RUST_LOG=info cargo run --features demo --bin chain_demo`

use std::f32::consts::{PI, TAU};

use bone_dynamics::{
    ChainBuilder, ChainParameters, ChainSet, ColliderSnapshot, FrameInput, GridBuilder,
    ParamCurve, Result, SolverConfig, StrandBuilder,
};
use glam::{Quat, Vec3};

const FPS: f32 = 60.0;
const FRAMES: usize = 240;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SolverConfig {
        iteration_count: 12,
        ..Default::default()
    };
    let mut chains = ChainSet::with_config(config);

    let braid = StrandBuilder::new(Vec3::new(0.0, 1.6, -0.1), Vec3::NEG_Y, 0.08, 10)
        .with_parameters(ChainParameters {
            radius: ParamCurve::linear(0.03, 0.015),
            max_angle: ParamCurve::ease_in(PI / 6.0, PI / 2.0),
            restore_half_life: ParamCurve::constant(0.6),
            ..Default::default()
        })
        .build()?;
    let braid = chains.add(&braid)?;

    let mut skirt = GridBuilder::new(
        Vec3::new(-0.2, 1.0, 0.15),
        Vec3::X * 0.08,
        Vec3::NEG_Y * 0.08,
        6,
        5,
    )
    .with_horizontal_compliance(1e-4)
    .build()?;
    skirt.name = "skirt".to_string();
    let skirt = chains.add(&skirt)?;

    for frame in 0..FRAMES {
        let t = frame as f32 / FPS;
        let body = Vec3::new(0.15 * (t * TAU * 0.5).sin(), 1.2, 0.0);
        let colliders = [
            ColliderSnapshot::sphere(body, 0.12),
            ColliderSnapshot::capsule(body - Vec3::Y * 0.4, Quat::IDENTITY, 0.4, 0.1, 0.08),
            ColliderSnapshot::plane(Vec3::ZERO, Quat::IDENTITY),
        ];
        if let Some(world) = chains.get_mut(braid) {
            world.set_root_transform(body - Vec3::new(0.0, 1.2, 0.0), Quat::from_rotation_y(0.3 * t.sin()));
        }

        let input = FrameInput::new(1.0 / FPS)
            .with_wind(Vec3::new(0.0, 0.0, 0.5 * (t * 1.3).sin()))
            .with_air_drag(0.4)
            .with_max_speed(20.0)
            .with_colliders(&colliders);
        chains.step_all(&input);

        if frame % 20 == 0 {
            for (handle, world) in chains.iter() {
                if let Some(tip) = world.positions().last() {
                    println!(
                        "frame {:4} chain {} '{}': tip = ({:+.3}, {:+.3}, {:+.3})",
                        frame,
                        handle.index(),
                        world.name(),
                        tip.x,
                        tip.y,
                        tip.z
                    );
                }
            }
        }
    }

    if let Some(world) = chains.get(skirt) {
        let rotations: Vec<Quat> = world.local_rotations().collect();
        log::info!("裙摆回写旋转 {} 个", rotations.len());
    }
    Ok(())
}
