// src/lib.rs
//! Tartan
//!
//! A GPU cloth simulation library built on wgpu. A rectangular cloth is
//! modelled as a mass-spring particle grid and integrated entirely in
//! compute shaders: three kernels (init, velocity step, position step)
//! run over the grid at a fixed timestep decoupled from the render rate,
//! with sphere collision and wind supplied by the host each frame.
//!
//! The host application drives the loop: it ticks the simulation with
//! wall-clock deltas, moves the collision sphere, and hands the resulting
//! position/normal buffers to [`ClothRenderer`] (or its own pipeline) for
//! drawing.

pub mod error;
pub mod gfx;
pub mod sim;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use error::ClothError;
pub use gfx::{ClothRenderer, GpuContext};
pub use sim::{ClothConfig, ClothSimulation, CollisionSphere, SimulateSettings, SimulationState};

/// Creates a default-configured simulation on a freshly acquired device
pub fn default() -> Result<(GpuContext, ClothSimulation), ClothError> {
    let context = GpuContext::new()?;
    let simulation = ClothSimulation::new(context.device(), ClothConfig::default())?;
    Ok((context, simulation))
}
