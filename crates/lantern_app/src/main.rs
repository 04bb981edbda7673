use std::path::{Path, PathBuf};

use clap::Parser;

use lantern_core::ShadingMode;
use lantern_shading::{Frame, FramePass, SurfaceSource};
use lantern_texel::{ClusterBuffer, ExhaustiveAssigner, LightAssigner, LightBuffer};

mod error;
mod floor;
mod gpu;
mod scene;

use error::AppError;
use scene::SceneConfig;

/// Shades the floor scene with clustered lights in deferred and forward+ mode.
#[derive(Parser, Debug, PartialEq)]
#[command(name = "lantern", author, version, about, long_about = None)]
struct Options {
    /// Scene description; the built-in scene is used when omitted
    #[arg(value_name = "SCENE")]
    scene: Option<PathBuf>,

    /// Directory the PNG frames are written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    out: PathBuf,

    /// Also render both modes on the GPU
    #[arg(long)]
    gpu: bool,
}

/// Writes tightly packed RGBA8 rows to `dir/name`.
fn save_rgba(pixels: &[u8], width: u32, height: u32, dir: &Path, name: &str) -> Result<(), AppError> {
    let path = dir.join(name);
    image::save_buffer(&path, pixels, width, height, image::ColorType::Rgba8).map_err(|source| {
        AppError::WriteImage {
            path: path.clone(),
            source,
        }
    })?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

fn write_png(frame: &Frame, dir: &Path, name: &str) -> Result<(), AppError> {
    save_rgba(&frame.to_rgba8(), frame.width, frame.height, dir, name)
}

fn run(options: Options) -> Result<(), AppError> {
    let scene = match &options.scene {
        Some(path) => {
            log::info!("Loading scene {}", path.display());
            SceneConfig::load(path)?
        }
        None => SceneConfig::default(),
    };
    if scene.threads > 0 {
        lantern_core::init_compute_pool(scene.threads);
    }

    let lights = scene.resolved_lights();
    let config = scene.resolved_clusters(lights.len());
    config.validate()?;

    let eye = scene.camera.transform();
    let uniforms = scene.camera.lens.frame_uniforms(&eye, scene.width, scene.height)?;

    let assignment = ExhaustiveAssigner.assign(&config, &lights);
    let light_buffer = LightBuffer::encode(&config, scene.format, &lights)?;
    let cluster_buffer = ClusterBuffer::encode(&config, scene.format, &assignment)?;

    let (gbuffer, fragments) = floor::rasterize(&scene, &eye);
    let maps = floor::material_maps(&scene.floor);

    let deferred = FramePass::new(config, ShadingMode::Deferred, &light_buffer, &cluster_buffer)?
        .shade(&uniforms, SurfaceSource::Deferred(&gbuffer))?;
    let forward = FramePass::new(config, ShadingMode::ForwardPlus, &light_buffer, &cluster_buffer)?
        .with_specular(scene.specular)
        .shade(
            &uniforms,
            SurfaceSource::ForwardPlus {
                target: &fragments,
                maps: &maps,
            },
        )?;

    std::fs::create_dir_all(&options.out).map_err(|source| AppError::OutputDir {
        path: options.out.clone(),
        source,
    })?;
    write_png(&deferred, &options.out, "deferred.png")?;
    write_png(&forward, &options.out, "forward_plus.png")?;

    if options.gpu {
        gpu::run(
            gpu::GpuInputs {
                scene: &scene,
                uniforms: &uniforms,
                lights: &light_buffer,
                clusters: &cluster_buffer,
                gbuffer: &gbuffer,
                maps: &maps,
            },
            config,
            &options.out,
        )?;
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Options::parse()) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_builtin_scene_in_cwd() {
        let options = Options::try_parse_from(["lantern"]).unwrap();
        assert_eq!(options.scene, None);
        assert_eq!(options.out, PathBuf::from("."));
        assert!(!options.gpu);
    }

    #[test]
    fn reads_scene_out_and_gpu() {
        let options = Options::try_parse_from(["lantern", "scene.json", "--out", "frames", "--gpu"]).unwrap();
        assert_eq!(options.scene, Some(PathBuf::from("scene.json")));
        assert_eq!(options.out, PathBuf::from("frames"));
        assert!(options.gpu);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(Options::try_parse_from(["lantern", "--out"]).is_err());
        assert!(Options::try_parse_from(["lantern", "--fast"]).is_err());
        assert!(Options::try_parse_from(["lantern", "a.json", "b.json"]).is_err());
    }

    #[test]
    fn help_is_reported_as_display_help() {
        let err = Options::try_parse_from(["lantern", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn packed_rows_are_written_as_png() {
        let dir = std::env::temp_dir().join(format!("lantern-rgba-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let pixels: Vec<u8> = (0..3 * 2).flat_map(|i| [i as u8 * 40, 0, 0, 255]).collect();

        save_rgba(&pixels, 3, 2, &dir, "deferred_gpu.png").unwrap();

        let image = image::open(dir.join("deferred_gpu.png")).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, [200, 0, 0, 255]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn small_scene_renders_both_modes() {
        let dir = std::env::temp_dir().join(format!("lantern-test-{}", std::process::id()));
        let scene = SceneConfig {
            width: 24,
            height: 16,
            ..Default::default()
        };
        let scene_path = dir.join("scene.json");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&scene_path, serde_json::to_string(&scene).unwrap()).unwrap();

        run(Options {
            scene: Some(scene_path),
            out: dir.clone(),
            gpu: false,
        })
        .unwrap();

        for name in ["deferred.png", "forward_plus.png"] {
            let image = image::open(dir.join(name)).unwrap().to_rgba8();
            assert_eq!(image.dimensions(), (24, 16));
            assert!(image.pixels().any(|p| p.0[0] > 0));
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
