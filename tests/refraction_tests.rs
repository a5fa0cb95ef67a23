//! Refraction Tests
//!
//! Tests for:
//! - Medium stack push/pop through solid and nested glass
//! - Snell bending of refraction rays
//! - Transmission weights at normal incidence
//! - Reflection and refraction siblings sharing their parent's weight

use glam::{Vec3, Vec4, Vec4Swizzles};

use prism::prelude::*;
use prism::renderer::core::{BranchKind, Kernel, LevelKind, TraceVariant};
use prism::renderer::optics::{MediumStack, dielectric_f0};
use prism::renderer::software::Capture;
use prism::resources::{PlaneOptions, create_box, create_plane};
use prism::scene::presets::{self, ScenePreset};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Center of a 17×17 frame: its primary ray runs exactly along the view axis.
const CENTER: (i32, i32) = (8, 8);

fn refract_through(scene: &ScenePreset, depth: u32, kernels: &[Kernel]) -> Vec<Capture> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = RendererConfig {
        width: 17,
        height: 17,
        max_level_count: 4,
        radiance_mip_levels: 3,
        ..Default::default()
    };
    let mut renderer = Renderer::new(SoftwareDispatch::new(), config).unwrap();
    for kernel in kernels {
        renderer.dispatch_mut().capture(*kernel);
    }
    let settings = FrameSettings {
        max_level_count: depth,
        branches: Branches::REFRACTION,
        contribution_epsilon: 0.0,
        ..Default::default()
    };
    renderer
        .render(&scene.camera, &scene.actors, &scene.lights, &settings)
        .unwrap();
    renderer.dispatch_mut().take_captures()
}

/// Medium stack of each refraction level along the center pixel, by depth.
fn center_stacks(scene: &ScenePreset, depth: u32) -> Vec<MediumStack> {
    let captures = refract_through(scene, depth, &[Kernel::GenerateRefractionRays]);
    assert_eq!(captures.len(), depth as usize);
    captures
        .iter()
        .map(|c| MediumStack::unpack(c.outputs[2].load(CENTER.0, CENTER.1)))
        .collect()
}

fn assert_stack(stack: MediumStack, previous: f32, current: f32, depth: u32) {
    assert!(
        approx(stack.previous, previous) && approx(stack.current, current) && stack.depth == depth,
        "expected ({previous}, {current}, {depth}), got {stack:?}"
    );
}

// ============================================================================
// Medium stack
// ============================================================================

#[test]
fn solid_ball_returns_to_the_ambient_medium() {
    let stacks = center_stacks(&presets::glass_sphere(1.5), 2);
    assert_stack(stacks[0], 1.0, 1.5, 1);
    assert_stack(stacks[1], 1.0, 1.0, 0);
}

#[test]
fn nested_shells_push_and_pop_in_order() {
    let scene = presets::nested_glass_shells(1.3, 1.6);

    // Enter outer, enter inner, exit inner: back in the outer glass.
    let stacks = center_stacks(&scene, 3);
    assert_stack(stacks[0], 1.0, 1.3, 1);
    assert_stack(stacks[1], 1.3, 1.6, 2);
    assert_stack(stacks[2], 1.0, 1.3, 1);

    // ... and out of the outer shell into the ambient medium.
    let stacks = center_stacks(&scene, 4);
    assert_stack(stacks[3], 1.0, 1.0, 0);
}

#[test]
fn rays_that_hit_nothing_keep_the_parent_stack() {
    let scene = presets::glass_sphere(1.5);
    let captures = refract_through(&scene, 1, &[Kernel::GenerateRefractionRays]);
    let outputs = &captures[0].outputs;

    // Corner pixels see the backdrop, which does not transmit.
    let direction = outputs[1].load(0, 0);
    assert_eq!(direction, Vec4::ZERO);
    assert_stack(MediumStack::unpack(outputs[2].load(0, 0)), 1.0, 1.0, 0);
}

// ============================================================================
// Directions & weights
// ============================================================================

#[test]
fn refraction_rays_obey_snell() {
    let index = 1.5;
    let scene = presets::glass_sphere(index);
    let captures = refract_through(
        &scene,
        1,
        &[
            Kernel::GeneratePrimaryRays,
            Kernel::TraceActor(TraceVariant::Primary),
            Kernel::GenerateRefractionRays,
        ],
    );
    let find = |kernel| {
        captures
            .iter()
            .rev()
            .find(|c| c.kernel == kernel)
            .map(|c| &c.outputs)
            .unwrap()
    };
    let primary = &find(Kernel::GeneratePrimaryRays)[1];
    let hits = find(Kernel::TraceActor(TraceVariant::Primary));
    let refracted = &find(Kernel::GenerateRefractionRays)[1];

    let mut checked = 0;
    for y in 0..17 {
        for x in 0..17 {
            // Only ball hits: the ball is the only transmissive actor.
            if hits[4].load(x, y).x != index {
                continue;
            }
            let incident = primary.load(x, y).xyz();
            let normal: Vec3 = hits[1].load(x, y).xyz();
            let transmitted = refracted.load(x, y).xyz();
            let sin_i = incident.cross(normal).length();
            let sin_t = transmitted.cross(normal).length();
            assert!(
                (sin_i - index * sin_t).abs() < 1e-3,
                "pixel ({x}, {y}): sin {sin_i} vs {index} × {sin_t}"
            );
            assert!(transmitted.dot(normal) < 0.0, "ray must continue into the ball");
            checked += 1;
        }
    }
    assert!(checked > 10, "the ball should cover part of the frame");
}

#[test]
fn transmission_weight_compounds_through_both_surfaces() {
    let scene = presets::glass_sphere(1.5);
    let captures = refract_through(
        &scene,
        2,
        &[Kernel::ComputeContribution(BranchKind::Refraction)],
    );
    assert_eq!(captures.len(), 2);

    // Clear glass, head-on: each surface passes 1 - F0.
    let pass = 1.0 - dielectric_f0(1.0, 1.5);
    let mut expected = 1.0;
    for capture in &captures {
        expected *= pass;
        let weight = capture.outputs[0].load(CENTER.0, CENTER.1).x;
        assert!(approx(weight, expected), "weight {weight}, expected {expected}");
    }
}

/// A glass cube on a floor, seen from above a corner. Rays entering through
/// one face and meeting a perpendicular face are totally reflected inside.
fn glass_block() -> ScenePreset {
    ScenePreset {
        camera: Camera::look_at(
            Vec3::new(2.2, 2.6, 3.0),
            Vec3::new(0.0, 0.7, 0.0),
            Vec3::Y,
            50f32.to_radians(),
        ),
        actors: vec![
            Actor::new(
                "block",
                create_box(Vec3::new(0.0, 0.8, 0.0), Vec3::splat(1.4)),
                Material::glass(1.5),
            ),
            Actor::new(
                "floor",
                create_plane(PlaneOptions::default()),
                Material::diffuse(Vec3::splat(0.6)),
            ),
        ],
        lights: vec![Light::new_directional(Vec3::new(-0.4, -1.0, -0.3), Vec3::ONE, 2.0)],
    }
}

#[test]
fn sibling_weights_never_exceed_their_parent() {
    let _ = env_logger::builder().is_test(true).try_init();
    let scene = glass_block();
    let config = RendererConfig {
        width: 32,
        height: 24,
        max_level_count: 4,
        radiance_mip_levels: 3,
        ..Default::default()
    };
    let mut renderer = Renderer::new(SoftwareDispatch::new(), config).unwrap();
    for kernel in [
        Kernel::ComputeContribution(BranchKind::Reflection),
        Kernel::ComputeContribution(BranchKind::Refraction),
        Kernel::GenerateRefractionRays,
    ] {
        renderer.dispatch_mut().capture(kernel);
    }
    let settings = FrameSettings {
        max_level_count: 2,
        contribution_epsilon: 0.0,
        ..Default::default()
    };
    renderer
        .render(&scene.camera, &scene.actors, &scene.lights, &settings)
        .unwrap();
    let captures = renderer.dispatch_mut().take_captures();

    // Depth-first order: each depth-1 level is followed by its two children.
    let check = |parent: Option<&Capture>, children: &[&Capture]| {
        let Some(parent) = parent else { return };
        assert_eq!(children.len(), 2, "both branches below {:?}", parent.level);
        let weights = &parent.outputs[0];
        for (i, w) in weights.texels().iter().enumerate() {
            let sum: f32 = children.iter().map(|c| c.outputs[0].texels()[i].x).sum();
            assert!(sum <= w.x + 1e-5, "texel {i}: children carry {sum}, parent {}", w.x);
        }
    };

    let mut parent = None;
    let mut children = Vec::new();
    let mut internally_reflected = 0;
    for capture in &captures {
        let tag = capture.level.unwrap();
        match (capture.kernel, tag.depth) {
            (Kernel::ComputeContribution(_), 1) => {
                check(parent, &children);
                parent = Some(capture);
                children.clear();
            }
            (Kernel::ComputeContribution(_), _) => children.push(capture),
            (Kernel::GenerateRefractionRays, 2) => {
                let inside = parent.and_then(|p| p.level).map(|t| t.kind)
                    == Some(LevelKind::Branch(BranchKind::Refraction));
                if inside {
                    // Leaving the block pops the stack; only TIR keeps it.
                    let directions = capture.outputs[1].texels();
                    let stacks = capture.outputs[2].texels();
                    internally_reflected += directions
                        .iter()
                        .zip(stacks)
                        .filter(|(d, s)| **d != Vec4::ZERO && MediumStack::unpack(**s).depth == 1)
                        .count();
                }
            }
            _ => {}
        }
    }
    check(parent, &children);
    assert!(internally_reflected > 0, "the block should reflect some rays internally");
}
