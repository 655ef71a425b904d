//! Simple path tracer example.
//!
//! Builds a small scene in code, renders it progressively and saves a PNG.
//!
//! Usage: `cargo run --example simple_render -- [params.json] [output.png]`
//! where the optional JSON file holds any subset of `TraceParams` fields.

use anyhow::{Context, Result};
use lumen_core::{Camera, Color, Environment, Frame, Material, Object, Scene, Shape, Vec2, Vec3};
use lumen_renderer::{init_state, trace_samples, RenderState, TraceParams};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = std::env::args().skip(1);
    let params = match args.next() {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?
        }
        None => TraceParams {
            resolution: 480,
            samples: 64,
            ..Default::default()
        },
    };
    let output = args.next().unwrap_or_else(|| "output.png".to_string());

    let mut scene = build_scene();
    let progress = |stage: &str, done: usize, total: usize| {
        log::debug!("{stage}: {done}/{total}");
    };
    scene.build_bvh(Some(&progress))?;

    let camera = scene
        .camera(params.camera)
        .context("scene has no camera at the requested index")?;
    let mut state = init_state(&scene, camera, &params);

    let start = std::time::Instant::now();
    for sample in 0..params.samples {
        trace_samples(&mut state, &scene, camera, &params, None)?;
        if (sample + 1) % 16 == 0 {
            log::info!("{} / {} samples", sample + 1, params.samples);
        }
    }
    log::info!("Rendered in {:?}", start.elapsed());

    save_png(&state, &output)?;
    log::info!("Saved to {}", output);
    Ok(())
}

fn quad(size: f32) -> Shape {
    Shape::triangles(
        vec![[0, 1, 2], [0, 2, 3]],
        vec![
            Vec3::new(-size, 0.0, size),
            Vec3::new(size, 0.0, size),
            Vec3::new(size, 0.0, -size),
            Vec3::new(-size, 0.0, -size),
        ],
    )
    .with_texcoords(vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y])
}

fn tetrahedron() -> Shape {
    Shape::triangles(
        vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
        vec![
            Vec3::new(-0.5, 0.0, 0.5),
            Vec3::new(0.5, 0.0, 0.5),
            Vec3::new(0.0, 0.0, -0.5),
            Vec3::new(0.0, 0.9, 0.0),
        ],
    )
}

fn build_scene() -> Scene {
    let mut scene = Scene::new();

    scene.add_camera(
        Camera::new()
            .with_position(Vec3::new(0.0, 1.2, 4.0), Vec3::new(0.0, 0.4, 0.0), Vec3::Y)
            .with_lens(0.035, 1.5, 0.036),
    );

    let floor = scene.add_shape(quad(4.0));
    let light = scene.add_shape(quad(0.6));
    let tetra = scene.add_shape(tetrahedron());

    // A row of hairs and a scatter of points next to the solids
    let hairs = (0..12)
        .flat_map(|i| {
            let x = -1.8 + i as f32 * 0.05;
            [Vec3::new(x, 0.0, 0.8), Vec3::new(x + 0.1, 0.8, 0.6)]
        })
        .collect::<Vec<_>>();
    let lines = (0..12u32).map(|i| [2 * i, 2 * i + 1]).collect();
    let hairs = scene.add_shape(Shape::lines(lines, hairs).with_radius(vec![0.01; 24]));

    let dots = (0..40)
        .map(|i| {
            let a = i as f32 * 0.7;
            Vec3::new(1.6 + 0.3 * a.cos(), 0.05 + i as f32 * 0.02, 0.5 + 0.3 * a.sin())
        })
        .collect::<Vec<_>>();
    let dots = scene.add_shape(Shape::points((0..40).collect(), dots).with_radius(vec![0.03; 40]));

    let gray = scene.add_material(Material::diffuse(Color::splat(0.6)));
    let mut gold = Material::diffuse(Color::new(1.0, 0.78, 0.34));
    gold.set_metallic(1.0, None);
    gold.set_roughness(0.3, None);
    let gold = scene.add_material(gold);
    let mut glass = Material::diffuse(Color::ONE);
    glass.set_transmission(1.0, true, 0.01, None);
    let glass = scene.add_material(glass);
    let mut plastic = Material::diffuse(Color::new(0.1, 0.3, 0.8));
    plastic.set_specular(1.0, None);
    plastic.set_roughness(0.2, None);
    let plastic = scene.add_material(plastic);
    let lamp = scene.add_material(Material::emissive(Color::splat(12.0)));

    scene.add_object(Object::new(floor, gray));
    scene.add_object(Object::new(tetra, gold).with_frame(Frame::from_translation(Vec3::new(-0.9, 0.0, 0.0))));
    scene.add_object(Object::new(tetra, glass).with_frame(Frame::from_translation(Vec3::new(0.0, 0.0, 0.3))));
    scene.add_object(
        Object::new(tetra, plastic).with_frame(Frame::from_scale_rotation_translation(
            Vec3::new(0.8, 1.4, 0.8),
            lumen_math::Quat::from_rotation_y(0.6),
            Vec3::new(0.9, 0.0, 0.0),
        )),
    );
    scene.add_object(Object::new(hairs, plastic));
    scene.add_object(Object::new(dots, gold));
    scene.add_object(
        Object::new(light, lamp).with_frame(
            Frame::from_translation(Vec3::new(0.0, 2.5, 0.0)) * Frame::from_rotation_x(std::f32::consts::PI),
        ),
    );

    scene.add_environment(Environment::new(Color::new(0.05, 0.07, 0.1)));

    let stats = scene.stats();
    log::info!(
        "Built scene: {} shapes, {} objects, {} primitives",
        stats.shapes,
        stats.objects,
        stats.primitives
    );
    scene
}

fn save_png(state: &RenderState, path: &str) -> Result<()> {
    let pixels = state
        .render()
        .iter()
        .flat_map(|color| {
            let rgb = color.truncate().to_array().map(|c| (255.0 * c.max(0.0).sqrt().min(1.0)) as u8);
            [rgb[0], rgb[1], rgb[2], 255]
        })
        .collect::<Vec<u8>>();

    let image = image::RgbaImage::from_raw(state.width(), state.height(), pixels)
        .context("render buffer does not match the image size")?;
    image.save(path).with_context(|| format!("writing {path}"))?;
    Ok(())
}
