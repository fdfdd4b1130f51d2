//! Punctual lights.
//!
//! Area lights are not a separate type: any object with an emissive
//! material is sampled as a light by the renderer.

use lux_math::{Color, DVec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    Point,
    /// Parallel rays travelling along `direction`.
    Directional { direction: DVec3 },
    /// Cone around `direction`; angles are half-angles in degrees.
    Spot {
        direction: DVec3,
        inner_angle: f64,
        outer_angle: f64,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub position: DVec3,
    pub color: Color,
    pub intensity: f64,
}

impl Light {
    pub fn point(position: DVec3, color: Color, intensity: f64) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            color,
            intensity,
        }
    }

    /// A directional light. A zero direction falls back to -Z.
    pub fn directional(direction: DVec3, color: Color, intensity: f64) -> Self {
        Self {
            kind: LightKind::Directional {
                direction: direction.try_normalize().unwrap_or(DVec3::NEG_Z),
            },
            position: DVec3::ZERO,
            color,
            intensity,
        }
    }

    /// A spot light with the default 10/12.5 degree cone.
    pub fn spot(position: DVec3, direction: DVec3, color: Color, intensity: f64) -> Self {
        Self {
            kind: LightKind::Spot {
                direction: direction.try_normalize().unwrap_or(DVec3::NEG_Z),
                inner_angle: 10.0,
                outer_angle: 12.5,
            },
            position,
            color,
            intensity,
        }
    }

    /// Set the cone of a spot light. Has no effect on other kinds.
    pub fn with_cone(mut self, inner: f64, outer: f64) -> Self {
        if let LightKind::Spot {
            inner_angle,
            outer_angle,
            ..
        } = &mut self.kind
        {
            *inner_angle = inner.min(outer);
            *outer_angle = outer.max(inner);
        }
        self
    }

    /// Unit vector from `point` toward the light.
    pub fn direction_from_point(&self, point: DVec3) -> DVec3 {
        match self.kind {
            LightKind::Directional { direction } => -direction,
            LightKind::Point | LightKind::Spot { .. } => {
                (self.position - point).normalize_or_zero()
            }
        }
    }

    /// Distance a shadow ray has to cover to reach the light.
    pub fn distance_from_point(&self, point: DVec3) -> f64 {
        match self.kind {
            LightKind::Directional { .. } => f64::INFINITY,
            LightKind::Point | LightKind::Spot { .. } => self.position.distance(point),
        }
    }

    /// Irradiance-like factor arriving at `point` on a surface facing
    /// `normal`, ignoring occlusion.
    pub fn light_factor(&self, point: DVec3, normal: DVec3) -> Color {
        let to_light = self.direction_from_point(point);
        let cos_theta = normal.dot(to_light).max(0.0);

        match self.kind {
            LightKind::Directional { .. } => self.color * self.intensity * cos_theta,
            LightKind::Point => self.attenuated(point) * cos_theta,
            LightKind::Spot {
                direction,
                inner_angle,
                outer_angle,
            } => {
                let cos_inner = inner_angle.to_radians().cos();
                let cos_outer = outer_angle.to_radians().cos();
                let cos_angle = (-to_light).dot(direction);
                let cone = if cos_inner - cos_outer > f64::EPSILON {
                    ((cos_angle - cos_outer) / (cos_inner - cos_outer)).clamp(0.0, 1.0)
                } else if cos_angle >= cos_outer {
                    1.0
                } else {
                    0.0
                };
                self.attenuated(point) * cos_theta * cone
            }
        }
    }

    /// Inverse-square falloff, infinite at the light position.
    fn attenuated(&self, point: DVec3) -> Color {
        let d2 = self.position.distance_squared(point);
        if d2 <= 0.0 {
            return Color::ZERO;
        }
        self.color * self.intensity / d2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_light_inverse_square() {
        let light = Light::point(DVec3::new(0.0, 2.0, 0.0), Color::ONE, 8.0);
        let factor = light.light_factor(DVec3::ZERO, DVec3::Y);

        assert!((factor - Color::splat(2.0)).length() < 1e-12);
        assert!((light.distance_from_point(DVec3::ZERO) - 2.0).abs() < 1e-12);
        assert_eq!(light.light_factor(DVec3::ZERO, -DVec3::Y), Color::ZERO);
    }

    #[test]
    fn test_directional_light() {
        let light = Light::directional(DVec3::new(0.0, -1.0, 0.0), Color::new(1.0, 0.5, 0.0), 2.0);
        let n = DVec3::new(1.0, 1.0, 0.0).normalize();

        assert_eq!(light.direction_from_point(DVec3::splat(7.0)), DVec3::Y);
        assert!(light.distance_from_point(DVec3::ZERO).is_infinite());

        let factor = light.light_factor(DVec3::ZERO, n);
        let expected = Color::new(2.0, 1.0, 0.0) * n.y;
        assert!((factor - expected).length() < 1e-12);
    }

    #[test]
    fn test_spot_light_cone() {
        let light = Light::spot(DVec3::new(0.0, 1.0, 0.0), -DVec3::Y, Color::ONE, 1.0);

        // Straight below: full intensity
        let center = light.light_factor(DVec3::ZERO, DVec3::Y);
        assert!((center.x - 1.0).abs() < 1e-12);

        // Well outside the 12.5 degree outer cone
        let outside = light.light_factor(DVec3::new(1.0, 0.0, 0.0), DVec3::Y);
        assert_eq!(outside, Color::ZERO);

        // Between inner and outer: partial
        let angle = 11.25_f64.to_radians();
        let edge = DVec3::new(angle.tan(), 0.0, 0.0);
        let partial = light.light_factor(edge, DVec3::Y).x;
        let unshadowed = light.attenuated(edge).x * light.direction_from_point(edge).y;
        assert!(partial > 0.0 && partial < unshadowed);
    }

    #[test]
    fn test_with_cone_only_affects_spot() {
        let point = Light::point(DVec3::ZERO, Color::ONE, 1.0).with_cone(5.0, 6.0);
        assert_eq!(point.kind, LightKind::Point);

        let spot = Light::spot(DVec3::ZERO, DVec3::X, Color::ONE, 1.0).with_cone(20.0, 15.0);
        assert!(matches!(
            spot.kind,
            LightKind::Spot { inner_angle, outer_angle, .. } if inner_angle == 15.0 && outer_angle == 20.0
        ));
    }
}
