//! Ready-made scenes.
//!
//! Small, fully analytic scenes used by the demo and the integration tests.
//! Every actor here has an [`AnalyticShape`](crate::resources::AnalyticShape),
//! so all presets also render on the wgpu backend.

use std::sync::Arc;

use glam::{Vec3, Vec4};

use crate::resources::{
    Material, PlaneOptions, SphereOptions, Texture, create_box, create_plane, create_sphere,
};
use crate::scene::{Actor, Camera, Light};

/// Camera, actors and lights of one scene.
#[derive(Debug, Clone)]
pub struct ScenePreset {
    pub camera: Camera,
    pub actors: Vec<Actor>,
    pub lights: Vec<Light>,
}

fn key_light() -> Light {
    Light::new_directional(Vec3::new(-0.4, -1.0, -0.3), Vec3::ONE, 2.5)
}

/// A single opaque, non-reflective quad filling the view.
#[must_use]
pub fn opaque_plane() -> ScenePreset {
    let wall = create_plane(PlaneOptions {
        center: Vec3::ZERO,
        half_u: Vec3::new(4.0, 0.0, 0.0),
        half_v: Vec3::new(0.0, 4.0, 0.0),
    });
    ScenePreset {
        camera: Camera::look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y, 60f32.to_radians()),
        actors: vec![Actor::new(
            "wall",
            wall,
            Material::diffuse(Vec3::new(0.7, 0.5, 0.3)),
        )],
        lights: vec![Light::new_directional(Vec3::NEG_Z, Vec3::ONE, 1.0)],
    }
}

/// A polished metal sphere resting above a diffuse checkered floor.
#[must_use]
pub fn mirror_sphere_over_floor() -> ScenePreset {
    let floor_texture = Arc::new(Texture::checker(
        8,
        Vec4::new(0.9, 0.9, 0.9, 1.0),
        Vec4::new(0.2, 0.2, 0.2, 1.0),
    ));
    let floor = Actor::new(
        "floor",
        create_plane(PlaneOptions::default()),
        Material::diffuse(Vec3::new(0.8, 0.6, 0.4)).with_albedo_texture(floor_texture),
    );
    let sphere = Actor::new(
        "mirror",
        create_sphere(SphereOptions {
            center: Vec3::new(0.0, 1.2, 0.0),
            radius: 1.0,
        }),
        Material::mirror(Vec3::new(0.95, 0.93, 0.88)),
    );
    ScenePreset {
        camera: Camera::look_at(
            Vec3::new(0.0, 1.6, 4.5),
            Vec3::new(0.0, 0.9, 0.0),
            Vec3::Y,
            50f32.to_radians(),
        ),
        actors: vec![floor, sphere],
        lights: vec![key_light()],
    }
}

/// A solid glass ball in front of a diffuse backdrop.
#[must_use]
pub fn glass_sphere(refractive_index: f32) -> ScenePreset {
    let ball = Actor::new(
        "glass",
        create_sphere(SphereOptions {
            center: Vec3::ZERO,
            radius: 1.0,
        }),
        Material::glass(refractive_index),
    );
    ScenePreset {
        camera: Camera::look_at(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO, Vec3::Y, 45f32.to_radians()),
        actors: vec![ball, backdrop(-4.0)],
        lights: vec![key_light()],
    }
}

/// Two concentric glass balls, the inner one denser.
#[must_use]
pub fn nested_glass_shells(outer_index: f32, inner_index: f32) -> ScenePreset {
    let outer = Actor::new(
        "outer shell",
        create_sphere(SphereOptions {
            center: Vec3::ZERO,
            radius: 1.2,
        }),
        Material::glass(outer_index),
    );
    let inner = Actor::new(
        "inner shell",
        create_sphere(SphereOptions {
            center: Vec3::ZERO,
            radius: 0.6,
        }),
        Material::glass(inner_index),
    );
    ScenePreset {
        camera: Camera::look_at(Vec3::new(0.0, 0.0, 4.5), Vec3::ZERO, Vec3::Y, 45f32.to_radians()),
        actors: vec![outer, inner, backdrop(-4.0)],
        lights: vec![key_light()],
    }
}

/// Two facing mirrors (normals pointing inward) with a diffuse box between them.
#[must_use]
pub fn hall_of_mirrors() -> ScenePreset {
    let mirror_material = Material::mirror(Vec3::splat(0.9)).with_roughness(0.05);
    let left = create_plane(PlaneOptions {
        center: Vec3::new(-2.0, 1.0, 0.0),
        half_u: Vec3::new(0.0, 1.5, 0.0),
        half_v: Vec3::new(0.0, 0.0, 3.0),
    });
    let right = create_plane(PlaneOptions {
        center: Vec3::new(2.0, 1.0, 0.0),
        half_u: Vec3::new(0.0, 0.0, 3.0),
        half_v: Vec3::new(0.0, 1.5, 0.0),
    });
    ScenePreset {
        camera: Camera::look_at(
            Vec3::new(0.3, 1.2, 4.0),
            Vec3::new(-0.5, 1.0, 0.0),
            Vec3::Y,
            55f32.to_radians(),
        ),
        actors: vec![
            Actor::new("floor", create_plane(PlaneOptions::default()), Material::diffuse(Vec3::splat(0.6))),
            Actor::new("left mirror", left, mirror_material.clone()),
            Actor::new("right mirror", right, mirror_material),
            Actor::new(
                "crate",
                create_box(Vec3::new(0.0, 0.5, 0.0), Vec3::splat(1.0)),
                Material::diffuse(Vec3::new(0.8, 0.3, 0.2)),
            ),
        ],
        lights: vec![
            key_light(),
            Light::new_point(Vec3::new(0.0, 2.5, 1.0), Vec3::new(1.0, 0.9, 0.7), 6.0, 8.0),
        ],
    }
}

fn backdrop(z: f32) -> Actor {
    Actor::new(
        "backdrop",
        create_plane(PlaneOptions {
            center: Vec3::new(0.0, 0.0, z),
            half_u: Vec3::new(8.0, 0.0, 0.0),
            half_v: Vec3::new(0.0, 8.0, 0.0),
        }),
        Material::diffuse(Vec3::new(0.2, 0.4, 0.8)),
    )
}
