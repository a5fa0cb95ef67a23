//! Configuration Tests
//!
//! Tests for:
//! - Structural config validation (extent, capacity vs depth, mip chain)
//! - Frame settings JSON parsing, defaults and validation
//! - Per-frame depth checks against the configured ceiling

use prism::prelude::*;
use prism::renderer::settings::BlurMode;
use prism::scene::presets;

fn small_config() -> RendererConfig {
    RendererConfig {
        width: 16,
        height: 12,
        max_level_count: 2,
        radiance_mip_levels: 3,
        ..Default::default()
    }
}

// ============================================================================
// RendererConfig
// ============================================================================

#[test]
fn default_config_is_valid() {
    let config = RendererConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.max_render_target_count, 10);
    assert_eq!(config.supported_level_count(), 9);
}

#[test]
fn zero_extent_is_rejected() {
    let config = RendererConfig {
        width: 0,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(RenderError::InvalidConfig(_))));
}

#[test]
fn depth_beyond_pool_capacity_is_rejected() {
    let config = RendererConfig {
        max_render_target_count: 3,
        max_level_count: 3,
        ..Default::default()
    };
    match config.validate() {
        Err(RenderError::DepthExceedsCapacity {
            requested,
            supported,
        }) => {
            assert_eq!(requested, 3);
            assert_eq!(supported, 2);
        }
        other => panic!("expected DepthExceedsCapacity, got {other:?}"),
    }

    let fits = RendererConfig {
        max_render_target_count: 4,
        max_level_count: 3,
        ..Default::default()
    };
    assert!(fits.validate().is_ok());
}

#[test]
fn mip_chain_longer_than_extent_is_rejected() {
    // 16 px covers at most 5 levels: 16, 8, 4, 2, 1.
    let config = RendererConfig {
        width: 16,
        height: 16,
        radiance_mip_levels: 6,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(RenderError::InvalidConfig(_))));

    let none = RendererConfig {
        radiance_mip_levels: 0,
        ..small_config()
    };
    assert!(matches!(none.validate(), Err(RenderError::InvalidConfig(_))));
}

#[test]
fn renderer_refuses_invalid_config() {
    let config = RendererConfig {
        max_render_target_count: 1,
        max_level_count: 4,
        ..Default::default()
    };
    let result = Renderer::new(SoftwareDispatch::new(), config);
    assert!(matches!(
        result,
        Err(RenderError::DepthExceedsCapacity { .. })
    ));
}

// ============================================================================
// FrameSettings parsing
// ============================================================================

#[test]
fn empty_json_yields_defaults() {
    let settings = FrameSettings::from_json_str("{}").unwrap();
    assert_eq!(settings, FrameSettings::default());
}

#[test]
fn camel_case_fields_are_parsed() {
    let settings = FrameSettings::from_json_str(
        r#"{
            "maxLevelCount": 3,
            "branches": "REFLECTION",
            "traversal": "RefractionFirst",
            "contributionEpsilon": 0.0,
            "ambientRefractiveIndex": 1.33,
            "shadows": { "maxLevel": 0, "blur": { "mode": "SinglePass", "radius": 4 } },
            "reflectionBlur": { "enabled": false },
            "toneMapping": "Reinhard",
            "activeView": "PrimaryHitDistance"
        }"#,
    )
    .unwrap();

    assert_eq!(settings.max_level_count, 3);
    assert_eq!(settings.branches, Branches::REFLECTION);
    assert!(settings.traces_reflections());
    assert!(!settings.traces_refractions());
    assert_eq!(settings.traversal, TraversalOrder::RefractionFirst);
    assert!(settings.contribution_epsilon.abs() < f32::EPSILON);
    assert!((settings.ambient_refractive_index - 1.33).abs() < 1e-6);
    assert_eq!(settings.shadows.max_level, 0);
    assert!(settings.shadows.enabled, "unspecified nested fields keep their defaults");
    assert_eq!(settings.shadows.blur.mode, BlurMode::SinglePass);
    assert_eq!(settings.shadows.blur.radius, 4);
    assert!(!settings.reflection_blur.enabled);
    assert_eq!(settings.tone_mapping, ToneMappingMode::Reinhard);
    assert_eq!(settings.active_view, ActiveView::PrimaryHitDistance);

    assert!(settings.shadows_at(0));
    assert!(!settings.shadows_at(1));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let err = FrameSettings::from_json_str(r#"{ "maxLevelCount": "two" }"#).unwrap_err();
    assert!(matches!(err, RenderError::SettingsParse(_)), "got {err}");
}

#[test]
fn settings_load_from_file() {
    let path = std::env::temp_dir().join(format!("prism-settings-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "exposure": 2.0, "branches": "REFRACTION" }"#).unwrap();
    let settings = FrameSettings::from_json_file(&path);
    std::fs::remove_file(&path).ok();

    let settings = settings.unwrap();
    assert!((settings.exposure - 2.0).abs() < f32::EPSILON);
    assert_eq!(settings.branches, Branches::REFRACTION);

    let missing = FrameSettings::from_json_file(std::env::temp_dir().join("prism-no-such-file.json"));
    assert!(matches!(missing, Err(RenderError::Io(_))));
}

#[test]
fn settings_round_trip_through_json() {
    let settings = FrameSettings {
        max_level_count: 1,
        branches: Branches::REFRACTION,
        exposure: 0.5,
        ..Default::default()
    };
    let json = serde_json::to_string(&settings).unwrap();
    assert!(json.contains("\"maxLevelCount\":1"));
    assert_eq!(FrameSettings::from_json_str(&json).unwrap(), settings);
}

// ============================================================================
// FrameSettings validation
// ============================================================================

#[test]
fn non_finite_and_negative_values_are_rejected() {
    let cases = [
        FrameSettings {
            exposure: f32::NAN,
            ..Default::default()
        },
        FrameSettings {
            ray_bias: -1.0,
            ..Default::default()
        },
        FrameSettings {
            ambient_refractive_index: 0.0,
            ..Default::default()
        },
        FrameSettings {
            position_threshold: f32::INFINITY,
            ..Default::default()
        },
    ];
    for settings in cases {
        assert!(
            matches!(settings.validate(), Err(RenderError::InvalidConfig(_))),
            "{settings:?} should be rejected"
        );
    }
    assert!(FrameSettings::default().validate().is_ok());
}

#[test]
fn frame_deeper_than_config_fails_before_any_dispatch() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut renderer = Renderer::new(SoftwareDispatch::new(), small_config()).unwrap();
    renderer.dispatch_mut().clear_history();

    let scene = presets::opaque_plane();
    let settings = FrameSettings {
        max_level_count: 3,
        ..Default::default()
    };
    let err = renderer
        .render(&scene.camera, &scene.actors, &scene.lights, &settings)
        .unwrap_err();

    assert!(
        matches!(
            err,
            RenderError::DepthExceedsCapacity {
                requested: 3,
                supported: 2
            }
        ),
        "got {err}"
    );
    assert!(renderer.dispatch().history().is_empty());
    assert_eq!(renderer.frame_index(), 0);
    assert_eq!(renderer.pool().active_count(), 0);
}

#[test]
fn invalid_frame_settings_fail_the_frame() {
    let mut renderer = Renderer::new(SoftwareDispatch::new(), small_config()).unwrap();
    let scene = presets::opaque_plane();
    let settings = FrameSettings {
        exposure: -1.0,
        ..Default::default()
    };
    let result = renderer.render(&scene.camera, &scene.actors, &scene.lights, &settings);
    assert!(matches!(result, Err(RenderError::InvalidConfig(_))));
    assert_eq!(renderer.frame_index(), 0);
}
