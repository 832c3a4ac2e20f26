// src/sim/settings.rs
//! Cloth configuration and runtime simulation parameters
//!
//! `ClothConfig` fixes the grid at construction time; `SimulateSettings`
//! holds the knobs the external driver may change while the simulation
//! is running (wind, stiffness, mass).

use cgmath::Vector3;

use crate::error::ClothError;

/// Compute workgroup edge length along X (one thread per particle)
pub const THREAD_X: u32 = 8;
/// Compute workgroup edge length along Y
pub const THREAD_Y: u32 = 8;

/// Mutable simulation parameters, pushed to the GPU on change
///
/// Defaults reproduce a steady wind along +Z strong enough to hold an
/// unpinned cloth aloft against a colliding sphere.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulateSettings {
    /// Wind force vector applied to every particle
    pub wind: Vector3<f32>,
    /// Extra wind gain when the surface normal faces the wind (0 = constant wind)
    pub wind_multiply_at_normal: f32,
    /// Hooke stiffness per spring category (structural, shear, bend)
    pub spring_stiffness: Vector3<f32>,
    /// Particle mass in kilograms
    pub mass: f32,
    /// Fixed integration step in seconds
    ///
    /// The solver is semi-implicit Euler: stability requires the step to be
    /// small relative to the stiffness/mass ratio. The default of 3 ms is
    /// near the edge for the default 25 kN/m springs; raising stiffness
    /// without shrinking the step will diverge.
    pub fixed_step: f32,
}

impl Default for SimulateSettings {
    fn default() -> Self {
        Self {
            wind: Vector3::new(0.0, 0.0, 10.0),
            wind_multiply_at_normal: 0.0,
            spring_stiffness: Vector3::new(25000.0, 25000.0, 25000.0),
            mass: 1.0,
            fixed_step: 0.003,
        }
    }
}

impl SimulateSettings {
    /// Checks the runtime parameters
    ///
    /// Applied both at construction and to every live update, so a bad
    /// driver-supplied value can never reach the accumulator or the
    /// kernels mid-run.
    pub fn validate(&self) -> Result<(), ClothError> {
        if !(self.mass > 0.0) {
            return Err(ClothError::Config(format!(
                "particle mass must be positive, got {}",
                self.mass
            )));
        }
        if !(self.fixed_step > 0.0) {
            return Err(ClothError::Config(format!(
                "fixed step must be positive, got {}",
                self.fixed_step
            )));
        }
        Ok(())
    }
}

/// Construction-time cloth configuration
#[derive(Clone, Debug)]
pub struct ClothConfig {
    /// Vertex count per grid dimension (the cloth is resolution x resolution)
    pub resolution: u32,
    /// Physical edge length of the cloth in meters
    pub size: f32,
    /// Pin the top row of particles in place (off by default)
    pub pin_top_edge: bool,
    /// Initial runtime parameters
    pub settings: SimulateSettings,
}

impl Default for ClothConfig {
    fn default() -> Self {
        Self {
            resolution: 32,
            size: 4.0,
            pin_top_edge: false,
            settings: SimulateSettings::default(),
        }
    }
}

impl ClothConfig {
    /// Checks the configuration before any GPU resource is allocated
    pub fn validate(&self) -> Result<(), ClothError> {
        if self.resolution < 2 {
            return Err(ClothError::Config(format!(
                "grid resolution must be at least 2, got {}",
                self.resolution
            )));
        }
        if !(self.size > 0.0) {
            return Err(ClothError::Config(format!(
                "cloth size must be positive, got {}",
                self.size
            )));
        }
        self.settings.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ClothConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_grid() {
        let mut config = ClothConfig::default();
        config.resolution = 1;
        assert!(config.validate().is_err());
        config.resolution = 0;
        assert!(config.validate().is_err());
        config.resolution = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_scalars() {
        let mut config = ClothConfig::default();
        config.settings.mass = 0.0;
        assert!(config.validate().is_err());

        let mut config = ClothConfig::default();
        config.settings.fixed_step = -0.003;
        assert!(config.validate().is_err());

        let mut config = ClothConfig::default();
        config.size = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn live_updates_get_the_same_scalar_checks() {
        assert!(SimulateSettings::default().validate().is_ok());

        // A zero step would otherwise trip the accumulator's positivity
        // assertion the moment the settings are applied.
        let mut settings = SimulateSettings::default();
        settings.fixed_step = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = SimulateSettings::default();
        settings.mass = -1.0;
        assert!(settings.validate().is_err());

        let mut settings = SimulateSettings::default();
        settings.fixed_step = f32::NAN;
        assert!(settings.validate().is_err());
    }
}
