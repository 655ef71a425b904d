//! Progressive sampling driver.
//!
//! A [`RenderState`] holds one accumulator and one random stream per pixel.
//! Each call to [`trace_samples`] adds exactly one sample to every pixel and
//! refreshes the normalized output buffer, either on the calling thread or
//! on a rayon pool that splits the image into disjoint rows.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use lumen_core::{Camera, ProgressCallback, Scene};
use lumen_math::{UVec2, Vec2, Vec4};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, UnitDisc};
use rayon::prelude::*;

use crate::config::{RenderError, RenderResult, TraceParams};
use crate::shader::Shader;

/// Seed of the stream that hands out per-pixel seeds.
const PIXEL_SEED_STREAM: u64 = 1301081;

/// Accumulated radiance and random stream of one pixel.
#[derive(Debug, Clone)]
pub struct Pixel {
    pub accumulated: Vec4,
    pub samples: u32,
    rng: SmallRng,
}

/// Per-pixel sampling state plus the normalized image.
#[derive(Debug, Clone)]
pub struct RenderState {
    size: UVec2,
    pixels: Vec<Pixel>,
    render: Vec<Vec4>,
}

impl RenderState {
    pub fn width(&self) -> u32 {
        self.size.x
    }

    pub fn height(&self) -> u32 {
        self.size.y
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Samples taken by every pixel so far.
    ///
    /// Pixels can disagree after a cancelled call; this reports the
    /// smallest count.
    pub fn samples(&self) -> u32 {
        self.pixels.iter().map(|p| p.samples).min().unwrap_or(0)
    }

    /// Linear radiance in `xyz` and coverage in `w`, row-major from the top
    /// left.
    pub fn render(&self) -> &[Vec4] {
        &self.render
    }

    /// The render buffer as interleaved RGBA floats.
    pub fn render_f32(&self) -> &[f32] {
        bytemuck::cast_slice(&self.render)
    }

    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.render[(y * self.size.x + x) as usize]
    }
}

/// Allocate the render state for `camera` at `params.resolution`.
///
/// Pixel streams depend only on `params.seed` and the pixel's scan order,
/// so a fresh state with the same parameters replays the same samples.
pub fn init_state(scene: &Scene, camera: &Camera, params: &TraceParams) -> RenderState {
    let size = camera.image_size(params.resolution);
    let count = size.x as usize * size.y as usize;
    if count == 0 {
        log::warn!("Render state has no pixels ({}x{})", size.x, size.y);
    }

    let mut seeds = SmallRng::seed_from_u64(PIXEL_SEED_STREAM);
    let pixels = (0..count)
        .map(|_| Pixel {
            accumulated: Vec4::ZERO,
            samples: 0,
            rng: SmallRng::seed_from_u64(params.seed ^ seeds.gen::<u64>()),
        })
        .collect();

    let stats = scene.stats();
    log::info!(
        "Render state {}x{}, shader {}, {} objects",
        size.x,
        size.y,
        params.shader,
        stats.objects
    );

    RenderState {
        size,
        pixels,
        render: vec![Vec4::ZERO; count],
    }
}

/// Add one sample to every pixel.
pub fn trace_samples(
    state: &mut RenderState,
    scene: &Scene,
    camera: &Camera,
    params: &TraceParams,
    progress: Option<ProgressCallback>,
) -> RenderResult<()> {
    trace_samples_with(state, scene, camera, params, None, progress)
}

/// Add one sample to every pixel, giving up on the remaining rows once
/// `stop` is set.
///
/// Rows already traced keep their new sample; the rest keep their previous
/// count.
pub fn trace_samples_with_stop(
    state: &mut RenderState,
    scene: &Scene,
    camera: &Camera,
    params: &TraceParams,
    stop: &AtomicBool,
) -> RenderResult<()> {
    trace_samples_with(state, scene, camera, params, Some(stop), None)
}

fn trace_samples_with(
    state: &mut RenderState,
    scene: &Scene,
    camera: &Camera,
    params: &TraceParams,
    stop: Option<&AtomicBool>,
    progress: Option<ProgressCallback>,
) -> RenderResult<()> {
    if scene.bvh().is_none() {
        return Err(RenderError::MissingBvh);
    }

    let size = state.size;
    if size.x == 0 || size.y == 0 {
        log::warn!("Nothing to trace in a {}x{} image", size.x, size.y);
        return Ok(());
    }

    let shader = params.shader.shader();
    let width = size.x as usize;
    let height = size.y as usize;
    let stopped = || stop.is_some_and(|flag| flag.load(Ordering::Relaxed));
    let report = |done: usize| {
        if let Some(progress) = progress {
            progress("trace samples", done, height);
        }
    };

    if params.noparallel {
        let rows = state.pixels.chunks_mut(width).zip(state.render.chunks_mut(width));
        for (j, (pixels, render)) in rows.enumerate() {
            if stopped() {
                break;
            }
            trace_row(pixels, render, j, size, scene, camera, shader, params);
            report(j + 1);
        }
        return Ok(());
    }

    let threads = std::thread::available_parallelism().map_or(1, |n| n.get());
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    let finished = AtomicUsize::new(0);

    pool.install(|| {
        state
            .pixels
            .par_chunks_mut(width)
            .zip(state.render.par_chunks_mut(width))
            .enumerate()
            .for_each(|(j, (pixels, render))| {
                if stopped() {
                    return;
                }
                trace_row(pixels, render, j, size, scene, camera, shader, params);
                report(finished.fetch_add(1, Ordering::Relaxed) + 1);
            });
    });

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn trace_row(
    pixels: &mut [Pixel],
    render: &mut [Vec4],
    j: usize,
    size: UVec2,
    scene: &Scene,
    camera: &Camera,
    shader: &dyn Shader,
    params: &TraceParams,
) {
    for (i, (pixel, out)) in pixels.iter_mut().zip(render.iter_mut()).enumerate() {
        let rng = &mut pixel.rng;
        let jitter = Vec2::new(rng.gen(), rng.gen());
        let lens = if camera.aperture > 0.0 {
            let [x, y]: [f32; 2] = UnitDisc.sample(rng);
            Vec2::new(x, y)
        } else {
            Vec2::ZERO
        };
        let uv = Vec2::new(
            (i as f32 + jitter.x) / size.x as f32,
            (j as f32 + jitter.y) / size.y as f32,
        );

        let ray = camera.eval_ray(uv, lens);
        let mut radiance = shader.shade(scene, &ray, 0, rng, params);
        if !radiance.is_finite() {
            radiance = Vec4::W;
        }

        pixel.accumulated += clamp_radiance(radiance, params.clamp);
        pixel.samples += 1;
        *out = pixel.accumulated / pixel.samples as f32;
    }
}

/// Scale the color down so its largest channel is at most `max`. Coverage
/// is left alone.
pub fn clamp_radiance(radiance: Vec4, max: f32) -> Vec4 {
    let peak = radiance.truncate().max_element();
    if peak > max {
        (radiance.truncate() * (max / peak)).extend(radiance.w)
    } else {
        radiance
    }
}

/// Render `params.samples` samples per pixel from camera `params.camera`.
///
/// The scene BVH must already be built.
pub fn render(scene: &Scene, params: &TraceParams, progress: Option<ProgressCallback>) -> RenderResult<RenderState> {
    let camera = scene
        .camera(params.camera)
        .ok_or(RenderError::MissingCamera {
            index: params.camera,
            count: scene.cameras().len(),
        })?;

    let start = Instant::now();
    let mut state = init_state(scene, camera, params);
    let total = params.samples as usize;

    for sample in 0..total {
        if let Some(progress) = progress {
            progress("render image", sample, total);
        }
        trace_samples(&mut state, scene, camera, params, None)?;
        log::debug!("Sample {}/{} done", sample + 1, total);
    }
    if let Some(progress) = progress {
        progress("render image", total, total);
    }

    log::info!(
        "Rendered {}x{} at {} spp in {:.2}s",
        state.width(),
        state.height(),
        params.samples,
        start.elapsed().as_secs_f32()
    );
    Ok(state)
}
