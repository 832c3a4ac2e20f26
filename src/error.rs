// src/error.rs
//! Error types for the tartan library
//!
//! Errors only surface at the construction and initialization boundaries.
//! Once a simulation is running, stepping and drawing have no failure path.

use thiserror::Error;

/// Errors raised while building or initializing a cloth simulation
#[derive(Debug, Error)]
pub enum ClothError {
    /// Invalid configuration detected at construction time
    #[error("invalid cloth configuration: {0}")]
    Config(String),

    /// No compatible GPU adapter could be acquired
    #[error("failed to acquire a GPU adapter")]
    Adapter(#[from] wgpu::RequestAdapterError),

    /// The adapter refused to hand out a device
    #[error("failed to acquire a GPU device")]
    Device(#[from] wgpu::RequestDeviceError),

    /// The initialization readback fence reported a device-side error
    #[error("initialization readback failed")]
    InitReadback(#[from] wgpu::BufferAsyncError),
}
