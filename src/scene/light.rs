use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels in (points away from the source).
    pub direction: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    /// Distance at which the light's influence reaches zero. `0` = unbounded.
    pub range: f32,
}

// High-level abstraction: light component in the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional(DirectionalLight),
    Point(PointLight),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
    pub cast_shadows: bool,
}

impl Light {
    #[must_use]
    pub fn new_directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Directional(DirectionalLight {
                direction: direction.normalize_or(Vec3::NEG_Y),
            }),
            cast_shadows: true,
        }
    }

    #[must_use]
    pub fn new_point(position: Vec3, color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Point(PointLight {
                position,
                range: range.max(0.0),
            }),
            cast_shadows: true,
        }
    }

    #[must_use]
    pub fn without_shadows(mut self) -> Self {
        self.cast_shadows = false;
        self
    }

    /// Unit vector from `point` towards the light, the distance to it
    /// (`f32::MAX` for directional lights) and the distance attenuation.
    #[must_use]
    pub fn incidence(&self, point: Vec3) -> (Vec3, f32, f32) {
        match self.kind {
            LightKind::Directional(d) => (-d.direction, f32::MAX, 1.0),
            LightKind::Point(p) => {
                let to_light = p.position - point;
                let distance = to_light.length().max(1e-6);
                let falloff = if p.range > 0.0 {
                    let ratio = (distance / p.range).clamp(0.0, 1.0);
                    let window = (1.0 - ratio.powi(4)).max(0.0);
                    window * window
                } else {
                    1.0
                };
                (to_light / distance, distance, falloff / (distance * distance))
            }
        }
    }
}
