// src/sim/collision.rs
//! Sphere collider and collision response
//!
//! The response rule lives here as plain host math so it can be unit
//! tested; `shaders/cloth.wgsl` mirrors it operation for operation in
//! the `step_position` kernel.

use cgmath::{InnerSpace, Vector3};

/// Degenerate-direction cutoff shared with the kernel
const EPSILON: f32 = 1e-6;

/// Moving collision sphere, refreshed by the external driver each tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionSphere {
    pub center: Vector3<f32>,
    pub radius: f32,
}

impl CollisionSphere {
    pub fn new(center: Vector3<f32>, radius: f32) -> Self {
        Self { center, radius }
    }

    /// A sphere that can never be hit, used before the driver supplies one
    pub fn none() -> Self {
        Self {
            center: Vector3::new(0.0, 0.0, 0.0),
            radius: 0.0,
        }
    }

    /// Packed center + radius as consumed by the kernel uniform
    pub fn to_array(self) -> [f32; 4] {
        [self.center.x, self.center.y, self.center.z, self.radius]
    }
}

/// Projects a particle out of the sphere and clamps its inward velocity
///
/// A position strictly inside the sphere is pushed to the surface along the
/// center-to-particle direction, and the velocity component pointing back
/// into the sphere is removed. Positions on or outside the surface pass
/// through untouched.
pub fn resolve_sphere(
    position: Vector3<f32>,
    velocity: Vector3<f32>,
    sphere: &CollisionSphere,
) -> (Vector3<f32>, Vector3<f32>) {
    let offset = position - sphere.center;
    let distance = offset.magnitude();
    if distance >= sphere.radius {
        return (position, velocity);
    }

    // A particle sitting exactly on the center has no direction; pick +Z.
    let normal = if distance > EPSILON {
        offset / distance
    } else {
        Vector3::unit_z()
    };

    let projected = sphere.center + normal * sphere.radius;
    let inward = velocity.dot(normal);
    let corrected = if inward < 0.0 {
        velocity - normal * inward
    } else {
        velocity
    };
    (projected, corrected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere() -> CollisionSphere {
        CollisionSphere::new(Vector3::new(1.0, 2.0, 3.0), 0.5)
    }

    #[test]
    fn inside_particle_lands_on_surface() {
        let sphere = sphere();
        let position = sphere.center + Vector3::new(0.1, 0.05, -0.02);
        let velocity = Vector3::new(-3.0, 1.0, 0.5);
        let (projected, corrected) = resolve_sphere(position, velocity, &sphere);

        let distance = (projected - sphere.center).magnitude();
        assert!((distance - sphere.radius).abs() < 1e-5);

        // Outward velocity component must be non-negative after correction.
        let normal = (projected - sphere.center) / sphere.radius;
        assert!(corrected.dot(normal) >= -1e-6);
    }

    #[test]
    fn tangential_velocity_survives() {
        let sphere = CollisionSphere::new(Vector3::new(0.0, 0.0, 0.0), 1.0);
        let position = Vector3::new(0.5, 0.0, 0.0);
        let velocity = Vector3::new(-2.0, 3.0, 0.0);
        let (_, corrected) = resolve_sphere(position, velocity, &sphere);
        // Inward x component removed, tangential y untouched.
        assert!((corrected.x - 0.0).abs() < 1e-6);
        assert!((corrected.y - 3.0).abs() < 1e-6);
    }

    #[test]
    fn outward_velocity_is_untouched() {
        let sphere = CollisionSphere::new(Vector3::new(0.0, 0.0, 0.0), 1.0);
        let position = Vector3::new(0.5, 0.0, 0.0);
        let velocity = Vector3::new(4.0, 0.0, 0.0);
        let (projected, corrected) = resolve_sphere(position, velocity, &sphere);
        assert_eq!(corrected, velocity);
        assert!((projected.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn outside_particle_passes_through() {
        let sphere = sphere();
        let position = sphere.center + Vector3::new(2.0, 0.0, 0.0);
        let velocity = Vector3::new(-1.0, 0.0, 0.0);
        assert_eq!(resolve_sphere(position, velocity, &sphere), (position, velocity));
    }

    #[test]
    fn center_degenerate_case_uses_fallback_axis() {
        let sphere = CollisionSphere::new(Vector3::new(0.0, 0.0, 0.0), 1.0);
        let (projected, _) =
            resolve_sphere(Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0), &sphere);
        assert_eq!(projected, Vector3::unit_z());
    }

    #[test]
    fn disabled_sphere_never_collides() {
        let sphere = CollisionSphere::none();
        let position = Vector3::new(0.0, 0.0, 0.0);
        let velocity = Vector3::new(1.0, 1.0, 1.0);
        assert_eq!(resolve_sphere(position, velocity, &sphere), (position, velocity));
    }
}
