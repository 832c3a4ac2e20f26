// demos/headless.rs
//! Headless cloth driver
//!
//! Stands in for the host application: acquires a device, initializes the
//! simulation, then ticks it with wall-clock deltas while orbiting the
//! collision sphere through the cloth. No window, no drawing; run with
//! RUST_LOG=info to watch the lifecycle.

use std::time::Instant;

use anyhow::{bail, Result};
use cgmath::Vector3;
use tartan::{ClothConfig, ClothSimulation, CollisionSphere, GpuContext, SimulationState};

fn main() -> Result<()> {
    env_logger::init();

    let context = GpuContext::new()?;
    let mut cloth = ClothSimulation::new(context.device(), ClothConfig::default())?;

    cloth.initialize(context.device(), context.queue());
    while !cloth.poll_initialized(context.device()) {
        if cloth.state() == SimulationState::Failed {
            bail!("cloth initialization failed");
        }
        std::thread::yield_now();
    }

    let mut last_frame = Instant::now();
    for frame in 0..600u32 {
        let now = Instant::now();
        let delta = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        // Swing the sphere back and forth through the cloth plane.
        let t = frame as f32 / 60.0;
        let sphere = CollisionSphere::new(
            Vector3::new(t.sin() * 1.5, 0.0, (t * 0.7).cos() * 1.0),
            0.75,
        );
        cloth.update_collider(context.queue(), sphere);
        cloth.tick(context.device(), context.queue(), delta);

        // Pace the loop roughly like a 60 Hz frame callback.
        std::thread::sleep(std::time::Duration::from_millis(16));
    }

    cloth.dispose();
    Ok(())
}
