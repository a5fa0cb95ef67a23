//! Recursion Driver Tests
//!
//! Tests for:
//! - Depth bound and level counts per branch configuration
//! - Pool usage along the depth-first walk (peak sets, no aliasing)
//! - Miss propagation and multiplicative contribution weights
//! - Primary-only frames and single-bounce compositing
//! - Reflection blur leaving polished surfaces sharp

use std::collections::HashMap;

use glam::{Vec3, Vec4, Vec4Swizzles};

use prism::prelude::*;
use prism::renderer::core::{BranchKind, Kernel, LevelKind, TraceVariant};
use prism::renderer::graph::PoolEvent;
use prism::renderer::optics::{self, HIT_DISTANCE_MISS};
use prism::renderer::settings::ReflectionBlurSettings;
use prism::renderer::software::Capture;
use prism::renderer::software::image::Image;
use prism::resources::{PlaneOptions, create_plane};
use prism::scene::presets::{self, ScenePreset};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn renderer(width: u32, height: u32) -> Renderer<SoftwareDispatch> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = RendererConfig {
        width,
        height,
        max_level_count: 4,
        radiance_mip_levels: 3,
        ..Default::default()
    };
    Renderer::new(SoftwareDispatch::new(), config).unwrap()
}

fn render(renderer: &mut Renderer<SoftwareDispatch>, scene: &ScenePreset, settings: &FrameSettings) -> FrameOutput {
    renderer
        .render(&scene.camera, &scene.actors, &scene.lights, settings)
        .unwrap()
}

/// Outputs of the last capture of `kernel` taken for a level at `depth`.
fn last_outputs(captures: &[Capture], kernel: Kernel, depth: u32) -> &[Image] {
    captures
        .iter()
        .rev()
        .find(|c| c.kernel == kernel && c.level.is_some_and(|tag| tag.depth == depth))
        .map(|c| c.outputs.as_slice())
        .unwrap_or_else(|| panic!("{kernel:?} was not captured at depth {depth}"))
}

fn hdr_texels(renderer: &Renderer<SoftwareDispatch>, output: &FrameOutput) -> Vec<Vec4> {
    renderer.dispatch().image(output.hdr).unwrap().texels().to_vec()
}

// ============================================================================
// Depth bound
// ============================================================================

#[test]
fn full_tree_is_walked_up_to_the_requested_depth() {
    let scene = presets::hall_of_mirrors();
    let mut renderer = renderer(16, 12);

    for depth in 0..=3u32 {
        let settings = FrameSettings {
            max_level_count: depth,
            contribution_epsilon: 0.0,
            ..Default::default()
        };
        renderer.dispatch_mut().clear_history();
        let output = render(&mut renderer, &scene, &settings);

        // Two children per level, no early-out: 2 + 4 + ... + 2^depth.
        let expected = (1u32 << (depth + 1)) - 2;
        assert_eq!(output.stats.levels_rendered, expected, "depth {depth}");
        assert_eq!(output.stats.deepest_level, depth);
        assert_eq!(output.stats.peak_active_sets, depth as usize + 1);
        assert_eq!(output.stats.early_outs, 0);

        let history = renderer.dispatch().history();
        let deepest = history
            .iter()
            .filter_map(|r| r.level)
            .map(|tag| tag.depth)
            .max()
            .unwrap();
        assert_eq!(deepest, depth, "no pass may run below the requested depth");
        let secondary_generations = history
            .iter()
            .filter(|r| {
                matches!(
                    r.kernel,
                    Kernel::GenerateReflectionRays | Kernel::GenerateRefractionRays
                )
            })
            .count() as u32;
        assert_eq!(secondary_generations, expected);
        assert_eq!(renderer.pool().active_count(), 0, "every set returned");
    }
}

#[test]
fn single_branch_walks_a_chain() {
    let scene = presets::hall_of_mirrors();
    let mut renderer = renderer(16, 12);
    let settings = FrameSettings {
        max_level_count: 4,
        branches: Branches::REFLECTION,
        contribution_epsilon: 0.0,
        ..Default::default()
    };
    renderer.dispatch_mut().clear_history();
    let output = render(&mut renderer, &scene, &settings);

    assert_eq!(output.stats.levels_rendered, 4);
    assert_eq!(output.stats.peak_active_sets, 5);
    assert!(renderer.dispatch().history().iter().all(|r| {
        r.level.is_none_or(|tag| {
            matches!(tag.kind, LevelKind::Root | LevelKind::Branch(BranchKind::Reflection))
        })
    }));
}

#[test]
fn negligible_contribution_stops_the_descent() {
    // Nothing in this scene refracts.
    let scene = presets::opaque_plane();
    let mut renderer = renderer(12, 12);
    let settings = FrameSettings {
        max_level_count: 3,
        branches: Branches::REFRACTION,
        ..Default::default()
    };
    let output = render(&mut renderer, &scene, &settings);

    assert_eq!(output.stats.levels_rendered, 1);
    assert_eq!(output.stats.early_outs, 1);
    assert_eq!(output.stats.deepest_level, 1);
}

// ============================================================================
// Pool usage
// ============================================================================

#[test]
fn live_levels_never_share_a_set() {
    let scene = presets::nested_glass_shells(1.4, 1.8);
    let mut renderer = renderer(16, 12);
    let settings = FrameSettings {
        max_level_count: 3,
        contribution_epsilon: 0.0,
        ..Default::default()
    };
    // Twice, so the second frame runs on recycled sets.
    render(&mut renderer, &scene, &settings);
    renderer.dispatch_mut().clear_history();
    let output = render(&mut renderer, &scene, &settings);
    assert!(output.stats.peak_active_sets <= 4);

    let mut holders = HashMap::new();
    for event in renderer.pool().events() {
        match *event {
            PoolEvent::Acquired { set, owner } => {
                assert!(
                    holders.insert(set, owner).is_none(),
                    "set {set:?} handed to level {} while still held",
                    owner.ordinal
                );
            }
            PoolEvent::Released { set, owner } => {
                assert_eq!(holders.remove(&set), Some(owner), "release by a non-owner");
            }
            PoolEvent::Created { .. } | PoolEvent::Destroyed { .. } => {}
        }
    }
    assert!(holders.is_empty(), "sets leaked past the frame: {holders:?}");

    for record in renderer.dispatch().history() {
        for read in &record.reads {
            assert!(
                record.read_writes.iter().all(|write| !write.overlaps(read)),
                "{:?} reads a view it writes",
                record.kernel
            );
        }
    }
}

#[test]
fn second_frame_reuses_the_pooled_sets() {
    let scene = presets::hall_of_mirrors();
    let mut renderer = renderer(16, 12);
    let settings = FrameSettings {
        contribution_epsilon: 0.0,
        ..Default::default()
    };
    render(&mut renderer, &scene, &settings);
    let sets = renderer.pool().total_set_count();
    render(&mut renderer, &scene, &settings);

    assert_eq!(renderer.pool().total_set_count(), sets);
    assert!(
        !renderer
            .pool()
            .events()
            .iter()
            .any(|e| matches!(e, PoolEvent::Created { .. })),
        "steady-state frames must not allocate"
    );
    assert_eq!(renderer.frame_index(), 2);
}

// ============================================================================
// Weights
// ============================================================================

/// Two facing half-silvered mirrors with the camera between them, looking
/// straight at one.
fn mirror_corridor(albedo: f32) -> ScenePreset {
    let material = Material::mirror(Vec3::splat(albedo));
    let back = create_plane(PlaneOptions {
        center: Vec3::new(0.0, 0.0, -2.0),
        half_u: Vec3::new(10.0, 0.0, 0.0),
        half_v: Vec3::new(0.0, 10.0, 0.0),
    });
    let front = create_plane(PlaneOptions {
        center: Vec3::new(0.0, 0.0, 2.0),
        half_u: Vec3::new(0.0, 10.0, 0.0),
        half_v: Vec3::new(10.0, 0.0, 0.0),
    });
    ScenePreset {
        camera: Camera::look_at(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, 40f32.to_radians()),
        actors: vec![
            Actor::new("back mirror", back, material.clone()),
            Actor::new("front mirror", front, material),
        ],
        lights: Vec::new(),
    }
}

#[test]
fn weights_multiply_along_the_chain() {
    let scene = mirror_corridor(0.5);
    let mut renderer = renderer(17, 17);
    renderer
        .dispatch_mut()
        .capture(Kernel::ComputeContribution(BranchKind::Reflection));
    let settings = FrameSettings {
        max_level_count: 3,
        branches: Branches::REFLECTION,
        contribution_epsilon: 0.0,
        ..Default::default()
    };
    render(&mut renderer, &scene, &settings);
    let captures = renderer.dispatch_mut().take_captures();
    assert_eq!(captures.len(), 3);

    // Normal incidence on a metal: every bounce keeps half.
    let mut expected = 1.0;
    for capture in &captures {
        expected *= 0.5;
        let weight = capture.outputs[0].load(8, 8).x;
        assert!(
            approx(weight, expected),
            "depth {:?}: weight {weight}, expected {expected}",
            capture.level.map(|t| t.depth)
        );
    }

    // Deeper weights never exceed their parent's anywhere on screen.
    for pair in captures.windows(2) {
        for (parent, child) in pair[0].outputs[0].texels().iter().zip(pair[1].outputs[0].texels()) {
            assert!(child.x <= parent.x + EPSILON);
        }
    }
}

#[test]
fn misses_spawn_nothing_below_them() {
    let scene = presets::mirror_sphere_over_floor();
    let mut renderer = renderer(32, 24);
    for kernel in [
        Kernel::TraceActor(TraceVariant::Primary),
        Kernel::TraceActor(TraceVariant::Secondary),
        Kernel::ComputeContribution(BranchKind::Reflection),
    ] {
        renderer.dispatch_mut().capture(kernel);
    }
    let settings = FrameSettings {
        max_level_count: 2,
        branches: Branches::REFLECTION,
        contribution_epsilon: 0.0,
        ..Default::default()
    };
    let output = render(&mut renderer, &scene, &settings);
    let captures = renderer.dispatch_mut().take_captures();
    let hdr = hdr_texels(&renderer, &output);
    let background = Vec3::from_array(settings.background);

    for depth in 0..2 {
        let kernel = if depth == 0 {
            Kernel::TraceActor(TraceVariant::Primary)
        } else {
            Kernel::TraceActor(TraceVariant::Secondary)
        };
        let hits = &last_outputs(&captures, kernel, depth)[0];
        let weights = &last_outputs(
            &captures,
            Kernel::ComputeContribution(BranchKind::Reflection),
            depth + 1,
        )[0];

        let mut misses = 0;
        for (i, (hit, weight)) in hits.texels().iter().zip(weights.texels()).enumerate() {
            if hit.w == HIT_DISTANCE_MISS {
                misses += 1;
                assert_eq!(weight.x, 0.0, "texel {i} at depth {} has weight", depth + 1);
                if depth == 0 {
                    assert!(
                        (hdr[i].xyz() - background).abs().max_element() < EPSILON,
                        "sky texel {i} should show the background only"
                    );
                }
            }
        }
        assert!(misses > 0, "scene should have misses at depth {depth}");
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn primary_only_frame_is_direct_shading() {
    let scene = presets::opaque_plane();
    let mut renderer = renderer(16, 16);
    let settings = FrameSettings {
        max_level_count: 0,
        ..Default::default()
    };
    renderer.dispatch_mut().clear_history();
    let output = render(&mut renderer, &scene, &settings);
    assert_eq!(output.stats.levels_rendered, 0);
    assert!(renderer.dispatch().history().iter().all(|r| !matches!(
        r.kernel,
        Kernel::GenerateReflectionRays | Kernel::GenerateRefractionRays | Kernel::Combine(_)
    )));

    // Lit head-on by a unit white light: ambient + Lambert + the
    // dielectric specular floor of a fully rough surface.
    let albedo = Vec3::new(0.7, 0.5, 0.3);
    let ambient = Vec3::from_array(settings.ambient);
    let expected = ambient * albedo + (albedo + Vec3::splat(0.04)) / std::f32::consts::PI;
    for texel in hdr_texels(&renderer, &output) {
        assert!(
            (texel.xyz() - expected).abs().max_element() < EPSILON,
            "{texel} vs {expected}"
        );
    }
}

#[test]
fn first_reflection_adds_its_fresnel_weighted_radiance() {
    let scene = presets::opaque_plane();
    let mut renderer = renderer(16, 16);
    let direct = FrameSettings {
        max_level_count: 0,
        branches: Branches::REFLECTION,
        ..Default::default()
    };
    let output = render(&mut renderer, &scene, &direct);
    let before = hdr_texels(&renderer, &output);

    let one_bounce = FrameSettings {
        max_level_count: 1,
        ..direct.clone()
    };
    let output = render(&mut renderer, &scene, &one_bounce);
    let after = hdr_texels(&renderer, &output);

    // Every reflection leaves into the sky; a rough dielectric keeps F0.
    let added = Vec3::from_array(direct.background) * optics::DEFAULT_DIELECTRIC_F0;
    for (a, b) in before.iter().zip(&after) {
        assert!(((*b - *a).xyz() - added).abs().max_element() < EPSILON);
    }
}

#[test]
fn mirror_sphere_shows_the_floor() {
    let scene = presets::mirror_sphere_over_floor();
    let mut renderer = renderer(32, 24);
    let direct = FrameSettings {
        max_level_count: 0,
        branches: Branches::REFLECTION,
        reflection_blur: ReflectionBlurSettings {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let output = render(&mut renderer, &scene, &direct);
    let before = hdr_texels(&renderer, &output);

    for kernel in [
        Kernel::TraceActor(TraceVariant::Primary),
        Kernel::TraceActor(TraceVariant::Secondary),
        Kernel::GenerateReflectionRays,
        Kernel::ComputeContribution(BranchKind::Reflection),
        Kernel::ShadeLight,
    ] {
        renderer.dispatch_mut().capture(kernel);
    }
    let settings = FrameSettings {
        max_level_count: 1,
        ..direct.clone()
    };
    let output = render(&mut renderer, &scene, &settings);
    let after = hdr_texels(&renderer, &output);
    let captures = renderer.dispatch_mut().take_captures();

    let root = last_outputs(&captures, Kernel::TraceActor(TraceVariant::Primary), 0);
    let bounce = last_outputs(&captures, Kernel::TraceActor(TraceVariant::Secondary), 1);
    let directions = &last_outputs(&captures, Kernel::GenerateReflectionRays, 1)[1];
    let weights = &last_outputs(&captures, Kernel::ComputeContribution(BranchKind::Reflection), 1)[0];
    let radiance = &last_outputs(&captures, Kernel::ShadeLight, 1)[0];

    let mut floor_in_sphere = 0;
    for i in 0..after.len() {
        let weight = weights.texels()[i].x;
        let added = (after[i] - before[i]).xyz();
        let expected = radiance.texels()[i].xyz() * weight;
        assert!(
            (added - expected).abs().max_element() < EPSILON,
            "texel {i}: composite gained {added}, level radiance × weight is {expected}"
        );

        let on_sphere = root[0].texels()[i].w != HIT_DISTANCE_MISS && root[3].texels()[i].w == 1.0;
        let sees_floor = bounce[0].texels()[i].w != HIT_DISTANCE_MISS && bounce[0].texels()[i].y.abs() < 1e-3;
        if on_sphere && sees_floor {
            floor_in_sphere += 1;
            let fresnel = optics::reflection_weight(
                directions.texels()[i].xyz(),
                root[1].texels()[i].xyz(),
                root[2].texels()[i].xyz(),
                1.0,
                0.0,
                0.0,
                direct.ambient_refractive_index,
            );
            assert!(approx(weight, fresnel), "texel {i}: weight {weight}, Fresnel {fresnel}");
            assert!(added.x > added.z, "the warm floor should tint the sphere");
        }
    }
    assert!(floor_in_sphere > 0, "the sphere should reflect the floor somewhere");
}

#[test]
fn reflection_blur_leaves_polished_surfaces_sharp() {
    let scene = presets::mirror_sphere_over_floor();
    let mut renderer = renderer(48, 36);
    let direct = FrameSettings {
        max_level_count: 0,
        branches: Branches::REFLECTION,
        ..Default::default()
    };
    assert!(direct.reflection_blur.enabled, "blur is on by default");
    let output = render(&mut renderer, &scene, &direct);
    let before = hdr_texels(&renderer, &output);

    for kernel in [
        Kernel::TraceActor(TraceVariant::Primary),
        Kernel::ComputeContribution(BranchKind::Reflection),
        Kernel::ShadeLight,
        Kernel::HitDistanceSearch,
    ] {
        renderer.dispatch_mut().capture(kernel);
    }
    let settings = FrameSettings {
        max_level_count: 1,
        ..direct.clone()
    };
    let output = render(&mut renderer, &scene, &settings);
    let after = hdr_texels(&renderer, &output);
    let captures = renderer.dispatch_mut().take_captures();

    let root = last_outputs(&captures, Kernel::TraceActor(TraceVariant::Primary), 0);
    let weights = &last_outputs(&captures, Kernel::ComputeContribution(BranchKind::Reflection), 1)[0];
    let radiance = &last_outputs(&captures, Kernel::ShadeLight, 1)[0];
    let radii = &last_outputs(&captures, Kernel::HitDistanceSearch, 1)[0];

    let (mut sharp, mut blurred) = (0, 0);
    for i in 0..after.len() {
        let weight = weights.texels()[i].x;
        if weight <= 0.0 {
            continue;
        }
        let polished = root[1].texels()[i].w == 0.0;
        let radius = radii.texels()[i].x;
        if polished {
            sharp += 1;
            assert_eq!(radius, 0.0, "texel {i}: polished surface got blur radius {radius}");
            let added = (after[i] - before[i]).xyz();
            let expected = radiance.texels()[i].xyz() * weight;
            assert!(
                (added - expected).abs().max_element() < EPSILON,
                "texel {i}: composite gained {added}, level radiance × weight is {expected}"
            );
        } else if radius > 0.0 {
            blurred += 1;
        }
    }
    assert!(sharp > 20, "the sphere should cover part of the frame");
    assert!(blurred > 0, "the rough floor should take the blurred path");
}
