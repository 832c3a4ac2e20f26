// src/gfx/mod.rs
//! Graphics-facing surface: device acquisition and the cloth draw adapter

pub mod context;
pub mod renderer;

pub use context::GpuContext;
pub use renderer::ClothRenderer;
