// src/sim/mod.rs
//! Cloth simulation: topology, scheduling, and the GPU solver core

pub mod cloth;
pub mod collision;
pub mod scheduler;
pub mod settings;
pub mod topology;

pub use cloth::{ClothSimulation, SimulationState};
pub use collision::CollisionSphere;
pub use scheduler::StepAccumulator;
pub use settings::{ClothConfig, SimulateSettings};
pub use topology::ClothGrid;
