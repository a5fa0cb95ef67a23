//! Renders one of the preset scenes and writes the selected view as a PNG.
//!
//! ```text
//! cargo run --example render_scene -- [scene] [settings.json] [out.png]
//! cargo run --example render_scene --features gpu -- mirror settings.json out.png --gpu
//! ```
//!
//! Scenes: `plane`, `mirror` (default), `glass`, `shells`, `hall`.

use anyhow::{Context, bail};
use glam::Vec4;

use prism::prelude::*;
use prism::scene::presets::{self, ScenePreset};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;

fn scene(name: &str) -> anyhow::Result<ScenePreset> {
    Ok(match name {
        "plane" => presets::opaque_plane(),
        "mirror" => presets::mirror_sphere_over_floor(),
        "glass" => presets::glass_sphere(1.5),
        "shells" => presets::nested_glass_shells(1.3, 1.7),
        "hall" => presets::hall_of_mirrors(),
        other => bail!("unknown scene '{other}'"),
    })
}

/// Maps a view texel to 8-bit RGBA. Single-channel views are shown as grey,
/// hit distances compressed into `[0, 1)`.
fn to_rgba8(texel: Vec4, view: ActiveView) -> [u8; 4] {
    let color = match view {
        ActiveView::PrimaryShadow => Vec4::new(texel.x, texel.x, texel.x, 1.0),
        ActiveView::PrimaryHitDistance => {
            let d = texel.x / (1.0 + texel.x);
            Vec4::new(d, d, d, 1.0)
        }
        ActiveView::PrimaryContribution => Vec4::new(texel.x, texel.y, 0.0, 1.0),
        ActiveView::Hdr => (texel / (Vec4::ONE + texel)).with_w(1.0),
        ActiveView::ToneMapped | ActiveView::PrimaryAlbedo => texel.with_w(1.0),
    };
    let bytes = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [bytes.x as u8, bytes.y as u8, bytes.z as u8, bytes.w as u8]
}

fn save(texels: &[Vec4], view: ActiveView, path: &str) -> anyhow::Result<()> {
    let pixels: Vec<u8> = texels.iter().flat_map(|t| to_rgba8(*t, view)).collect();
    let image = image::RgbaImage::from_raw(WIDTH, HEIGHT, pixels)
        .context("view extent does not match the output size")?;
    image.save(path).with_context(|| format!("writing {path}"))?;
    log::info!("Wrote {path}");
    Ok(())
}

fn render<D: GpuDispatch>(
    dispatch: D,
    scene: &ScenePreset,
    settings: &FrameSettings,
    read: impl FnOnce(&mut D, TargetId) -> anyhow::Result<Vec<Vec4>>,
) -> anyhow::Result<Vec<Vec4>> {
    let config = RendererConfig {
        width: WIDTH,
        height: HEIGHT,
        max_level_count: settings.max_level_count.max(4),
        ..Default::default()
    };
    let mut renderer = Renderer::new(dispatch, config)?;
    let output = renderer.render(&scene.camera, &scene.actors, &scene.lights, settings)?;
    log::info!(
        "Rendered {} secondary levels (deepest {}, {} early-outs, peak {} target sets)",
        output.stats.levels_rendered,
        output.stats.deepest_level,
        output.stats.early_outs,
        output.stats.peak_active_sets
    );
    read(renderer.dispatch_mut(), output.view)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let use_gpu = args.iter().any(|a| a == "--gpu");
    let positional: Vec<&str> = args
        .iter()
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .collect();

    let scene = scene(positional.first().copied().unwrap_or("mirror"))?;
    let settings = match positional.get(1) {
        Some(path) => FrameSettings::from_json_file(path)
            .with_context(|| format!("loading settings from {path}"))?,
        None => FrameSettings::default(),
    };
    let out = positional.get(2).copied().unwrap_or("render.png");

    let texels = if use_gpu {
        render_gpu(&scene, &settings)?
    } else {
        render(SoftwareDispatch::new(), &scene, &settings, |dispatch, view| {
            Ok(dispatch
                .image(view)
                .context("view target missing")?
                .texels()
                .to_vec())
        })?
    };
    save(&texels, settings.active_view, out)
}

#[cfg(feature = "gpu")]
fn render_gpu(scene: &ScenePreset, settings: &FrameSettings) -> anyhow::Result<Vec<Vec4>> {
    use prism::renderer::core::TargetView;

    let dispatch = WgpuDispatch::new("shaders")?;
    render(dispatch, scene, settings, |dispatch, view| {
        let texels = dispatch.read_texels(TargetView::whole(view))?;
        Ok(texels.into_iter().map(Vec4::from_array).collect())
    })
}

#[cfg(not(feature = "gpu"))]
fn render_gpu(_scene: &ScenePreset, _settings: &FrameSettings) -> anyhow::Result<Vec<Vec4>> {
    bail!("built without the `gpu` feature")
}
